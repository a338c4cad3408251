//! The fixup pipeline. Takes the raw-ish activity produced by the assembler
//! and turns it into something a fitness site will accept: dead time at the
//! start and end removed, no samples without GPS, one sample every
//! `update_period` seconds and speeds that agree with the positions.
//!
//! Every stage consumes the activity and hands back a new one. Nothing is
//! edited in place behind another stage's back.

use log::{debug, info};
use logging_timer::time;

use crate::{
    config::SyncConfig,
    error::{SyncError, SyncResult},
    model::{Activity, Sample},
};

mod classify;
mod crop;
mod extrapolate;
mod speed;

pub use classify::{classify_static, is_static};
pub use crop::{crop, moving_range};
pub use extrapolate::{extrapolate, leg_fraction};
pub use speed::recompute_speed;

/// A single step of the pipeline.
pub type Stage = fn(Activity, &SyncConfig) -> SyncResult<Activity>;

/// The stages that only make sense for a ride that actually went
/// somewhere, in the order they must run.
const MOVING_STAGES: [(&str, Stage); 4] = [
    ("crop", crop),
    ("filter_missing_fix", filter_missing_fix),
    ("extrapolate", extrapolate),
    ("recompute_speed", recompute_speed),
];

/// Runs every fixup on the activity. Static rides are classified and then
/// left alone apart from refreshing the start time.
///
/// Returns `SyncError::Degenerate` if nothing is left at the end, which is
/// what happens to a ride that never got above `min_speed`.
#[time]
pub fn fixup(activity: Activity, config: &SyncConfig) -> SyncResult<Activity> {
    let mut activity = classify_static(activity, config)?;

    if activity.is_static {
        info!(
            "Track starting at {} is static, skipping the moving fixups",
            activity.start_timestamp
        );
    } else {
        for (name, stage) in MOVING_STAGES {
            let before = activity.len();
            activity = stage(activity, config)?;
            debug!("fixup {name}: {before} -> {} samples", activity.len());
        }
    }

    refresh_timestamp(activity)
}

/// Drops every sample that has no GPS fix. Resampling interpolates
/// positions, so these are no use to it.
pub fn filter_missing_fix(activity: Activity, _config: &SyncConfig) -> SyncResult<Activity> {
    let samples: Vec<Sample> = activity
        .samples
        .iter()
        .filter(|s| s.has_fix())
        .cloned()
        .collect();
    Ok(activity.with_samples(samples))
}

/// Points the activity's start time at its (possibly new) first sample.
pub fn refresh_timestamp(mut activity: Activity) -> SyncResult<Activity> {
    if activity.is_empty() {
        return Err(SyncError::Degenerate(
            "no samples left after fixups".to_owned(),
        ));
    }

    activity.refresh_start_timestamp();
    Ok(activity)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::{Position, Sample, Timestamp};

    /// A sample with a fix and a speed, which is what most of the pipeline
    /// tests need.
    pub(crate) fn moving(t: Timestamp, lat: f64, lon: f64, speed: f64) -> Sample {
        Sample {
            timestamp: t,
            position: Some(Position::new(lat, lon, 100.0)),
            speed: Some(speed),
            ..Default::default()
        }
    }

    pub(crate) fn timestamps(samples: &[Sample]) -> Vec<Timestamp> {
        samples.iter().map(|s| s.timestamp).collect()
    }
}
