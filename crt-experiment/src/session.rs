use crate::config::SessionConfig;
use crate::error::{ConfigError, SessionError};
use crate::input::Cycle;
use crate::recorder::{ResultRecorder, TrialRecord};
use crate::scene::Scene;
use crate::state::{TrialEffect, TrialStateMachine};
use crate::trial::sample_trial;
use crt_core::{Frame, Palette, TargetLayout, TickRate, TrialOutcome};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};

/// What the front end should do after a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStep {
    /// Present this frame and keep ticking.
    Running(Frame),
    /// Every slot has been consumed.
    Finished,
    /// Quit was requested; exit without persisting anything else.
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Running,
    Finished,
    Quit,
}

/// End-of-session dump, one entry per consumed slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub n_trials: usize,
    pub completed: usize,
    pub aborted: usize,
    pub outcomes: Vec<TrialOutcome>,
}

/// Runs `n_trials` slots back to back over one shared layout.
///
/// Tick-driven: the front end drains its input into a [`Cycle`] at the rate
/// reported by [`SessionController::tick_rate_hz`] and presents whatever frame
/// comes back. Aborted slots are not retried.
pub struct SessionController<R: Rng, Rec: ResultRecorder> {
    config: SessionConfig,
    layout: TargetLayout,
    scene: Scene,
    rng: R,
    recorder: Rec,
    trial: TrialStateMachine,
    outcomes: Vec<TrialOutcome>,
    status: Status,
}

impl<R: Rng, Rec: ResultRecorder> SessionController<R, Rec> {
    pub fn new(config: SessionConfig, mut rng: R, recorder: Rec) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = config.layout();
        let scene = Scene::new(config.field_width, config.field_height, Palette::default());
        let trial = Self::start_trial(&config, &mut rng, 1);

        Ok(Self {
            config,
            layout,
            scene,
            rng,
            recorder,
            trial,
            outcomes: Vec::new(),
            status: Status::Running,
        })
    }

    fn start_trial(config: &SessionConfig, rng: &mut R, number: usize) -> TrialStateMachine {
        let trial = sample_trial(rng, config.n_targets, config.delay_range_s());
        tracing::info!(
            trial = number,
            of = config.n_trials,
            target = trial.selected_target_index,
            delay_ms = trial.delay_duration.as_millis() as u64,
            "trial started"
        );
        TrialStateMachine::new(number, trial)
    }

    pub fn tick(&mut self, cycle: &Cycle) -> Result<SessionStep, SessionError> {
        match self.status {
            Status::Finished => return Ok(SessionStep::Finished),
            Status::Quit => return Ok(SessionStep::Quit),
            Status::Running => {}
        }

        let effect = self.trial.step(
            cycle,
            &self.layout,
            self.config.feedback_dwell(),
            self.config.abort_dwell(),
        );

        match effect {
            Some(TrialEffect::Completed(measurement)) => {
                self.outcomes.push(TrialOutcome::Completed(measurement));
                self.recorder.append(&TrialRecord::now(&measurement))?;
            }
            Some(TrialEffect::Aborted) => {
                self.outcomes.push(TrialOutcome::Aborted);
            }
            Some(TrialEffect::Finished(_)) => {
                let consumed = self.trial.number();
                if consumed >= self.config.n_trials {
                    self.finish()?;
                    return Ok(SessionStep::Finished);
                }
                self.trial = Self::start_trial(&self.config, &mut self.rng, consumed + 1);
            }
            Some(TrialEffect::Quit) => {
                tracing::warn!(
                    trial = self.trial.number(),
                    phase = ?self.trial.phase(),
                    "quit requested, abandoning session"
                );
                self.status = Status::Quit;
                return Ok(SessionStep::Quit);
            }
            None => {}
        }

        Ok(SessionStep::Running(self.frame()))
    }

    fn finish(&mut self) -> Result<(), SessionError> {
        self.status = Status::Finished;
        let summary = self.summary();
        tracing::info!(
            trials = summary.n_trials,
            completed = summary.completed,
            aborted = summary.aborted,
            "session finished"
        );

        if let Some(path) = &self.config.summary_path {
            let file = File::create(path).map_err(|source| SessionError::Summary {
                path: path.clone(),
                source,
            })?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &summary)?;
            writer.flush().map_err(|source| SessionError::Summary {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path = %path.display(), "session summary written");
        }
        Ok(())
    }

    /// Frame for the current state of the active trial.
    pub fn frame(&self) -> Frame {
        if self.status != Status::Running {
            return Frame::default();
        }
        self.scene.frame(
            self.trial.state(),
            &self.layout,
            self.trial.config().selected_target_index,
            self.trial.number(),
            self.config.n_trials,
        )
    }

    pub fn tick_rate_hz(&self) -> f64 {
        match self.trial.phase().tick_rate() {
            TickRate::Coarse => self.config.coarse_tick_hz,
            TickRate::Fine => self.config.fine_tick_hz,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let aborted = self.outcomes.iter().filter(|o| o.is_aborted()).count();
        SessionSummary {
            n_trials: self.config.n_trials,
            completed: self.outcomes.len() - aborted,
            aborted,
            outcomes: self.outcomes.clone(),
        }
    }

    pub fn outcomes(&self) -> &[TrialOutcome] {
        &self.outcomes
    }

    pub fn current_trial(&self) -> &TrialStateMachine {
        &self.trial
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn layout(&self) -> &TargetLayout {
        &self.layout
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn recorder(&self) -> &Rec {
        &self.recorder
    }

    pub fn is_finished(&self) -> bool {
        self.status == Status::Finished
    }

    pub fn is_quit(&self) -> bool {
        self.status == Status::Quit
    }
}
