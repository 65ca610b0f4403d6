/// Phases a single trial moves through.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum TrialPhase {
    #[default]
    WaitHome,
    Delay,
    Illuminated,
    Feedback,
    Aborted,
    Done,
}

/// How often the phase wants to be polled.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum TickRate {
    /// Display-rate pacing for phases that only need to look smooth.
    Coarse,
    /// As fast as practical; RT/MT resolution depends on it.
    Fine,
}

impl TrialPhase {
    pub fn tick_rate(&self) -> TickRate {
        match self {
            TrialPhase::Illuminated => TickRate::Fine,
            _ => TickRate::Coarse,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TrialPhase::Done)
    }

    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            TrialPhase::WaitHome => Some("Place mouse in the home circle..."),
            TrialPhase::Delay => Some("Stay in home circle..."),
            _ => None,
        }
    }

    pub fn shows_layout(&self) -> bool {
        matches!(
            self,
            TrialPhase::WaitHome | TrialPhase::Delay | TrialPhase::Illuminated
        )
    }
}
