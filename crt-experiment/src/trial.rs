use crt_core::TrialConfig;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Draws the target first, then the pre-illumination delay.
pub fn sample_trial<R: Rng>(
    rng: &mut R,
    n_targets: usize,
    delay_s: RangeInclusive<f64>,
) -> TrialConfig {
    let selected_target_index = rng.random_range(0..n_targets);
    let delay = rng.random_range(delay_s);
    TrialConfig {
        selected_target_index,
        delay_duration: Duration::from_secs_f64(delay),
    }
}
