use std::ops::RangeInclusive;

use crate::{
    config::SyncConfig,
    error::{SyncError, SyncResult},
    model::{Activity, Sample},
};

/// Removes the dead time at the start and end of a ride, i.e. everything
/// before the first and after the last sample faster than `min_speed`.
///
/// If the ride never gets above `min_speed` nothing is left, and that is
/// reported as a degenerate track rather than an empty activity.
pub fn crop(mut activity: Activity, config: &SyncConfig) -> SyncResult<Activity> {
    let Some(range) = moving_range(&activity.samples, config.min_speed) else {
        return Err(SyncError::Degenerate(format!(
            "no sample faster than {} km/h, track too short",
            config.min_speed
        )));
    };

    let mut samples = std::mem::take(&mut activity.samples);
    samples.truncate(range.end() + 1);
    samples.drain(..*range.start());

    Ok(activity.with_samples(samples))
}

/// Returns the indices of the first and last samples faster than
/// `min_speed`, or None if there are none. Samples with no speed never
/// count as moving.
pub fn moving_range(samples: &[Sample], min_speed: f64) -> Option<RangeInclusive<usize>> {
    let is_moving = |s: &Sample| s.speed.is_some_and(|v| v > min_speed);

    let first = samples.iter().position(is_moving)?;
    let last = samples.iter().rposition(is_moving)?;
    Some(first..=last)
}
