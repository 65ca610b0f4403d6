use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Randomized parameters drawn fresh for every trial slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialConfig {
    pub selected_target_index: usize,
    pub delay_duration: Duration,
}

/// Timing data of a completed trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub reaction_time: Duration,
    /// `None` when the target was pressed without a recorded departure from home.
    pub movement_time: Option<Duration>,
    pub target_index: usize,
}

impl Measurement {
    pub fn reaction_time_ms(&self) -> f64 {
        self.reaction_time.as_secs_f64() * 1000.0
    }

    pub fn movement_time_ms(&self) -> Option<f64> {
        self.movement_time.map(|mt| mt.as_secs_f64() * 1000.0)
    }

    pub fn summary(&self) -> String {
        let mut msg = format!("RT: {:.1} ms", self.reaction_time_ms());
        if let Some(mt) = self.movement_time_ms() {
            msg.push_str(&format!("  |  MT: {mt:.1} ms"));
        }
        msg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrialOutcome {
    Aborted,
    Completed(Measurement),
}

impl TrialOutcome {
    pub fn measurement(&self) -> Option<&Measurement> {
        match self {
            TrialOutcome::Completed(m) => Some(m),
            TrialOutcome::Aborted => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, TrialOutcome::Aborted)
    }
}
