pub mod pacer;
pub mod timer;

pub use pacer::Pacer;
pub use timer::{HighPrecisionTimer, ManualTimer, PacingStats, Timer};
