pub mod event;
pub mod frame;
pub mod geometry;
pub mod phase;
pub mod trial;

pub use event::PointerEvent;
pub use frame::{Circle, Frame, Palette, Rgba, TextOverlay};
pub use geometry::{Point, TargetLayout, distance, generate_target_positions};
pub use phase::{TickRate, TrialPhase};
pub use trial::{Measurement, TrialConfig, TrialOutcome};
