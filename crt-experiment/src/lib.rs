pub mod config;
pub mod error;
pub mod input;
pub mod recorder;
pub mod scene;
pub mod session;
pub mod state;
pub mod trial;

pub use config::SessionConfig;
pub use error::{ConfigError, RecorderError, SessionError};
pub use input::{Cycle, EventQueue};
pub use recorder::{CsvRecorder, ResultRecorder, TrialRecord};
pub use scene::Scene;
pub use session::{SessionController, SessionStep, SessionSummary};
pub use state::{TrialContext, TrialEffect, TrialState, TrialStateMachine, transition};
pub use trial::sample_trial;
