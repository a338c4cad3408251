use log::{debug, warn};
use logging_timer::time;

use crate::{
    error::{SyncError, SyncResult},
    formatting::is_valid_timestamp,
    geodesic::SECONDS_PER_HOUR,
    model::{Activity, Position, RawPoint, RawSample, RawTrack, Sample, Timestamp},
};

/// Why a raw point did not make it into the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discard {
    NoSample,
    TimestampOutOfRange,
    TimestampMismatch,
    NotAscending,
}

/// Merges all the segments of a raw track into a single, linear list of
/// samples. Points are never reordered. A point is dropped when it has no
/// sample, when its fix and sample disagree about the time, or when it does
/// not move time forward; all three mean the device wrote junk. A point is
/// never dropped just because it has no fix.
///
/// The running distance is integrated from the device's own speed readings
/// and stored on each sample once it becomes non-zero.
///
/// Returns an error if nothing survives.
#[time]
pub fn assemble(track: &RawTrack) -> SyncResult<Activity> {
    let mut samples: Vec<Sample> = Vec::with_capacity(track.num_points());
    let mut discarded = 0;
    let mut distance_km = 0.0;
    let mut prev_timestamp: Option<Timestamp> = None;

    for (segment_idx, segment) in track.segments.iter().enumerate() {
        for point in &segment.points {
            let sample = match check_point(point, prev_timestamp) {
                Ok(s) => s,
                Err(reason) => {
                    warn!("Discarding point in segment {segment_idx}: {reason:?} {point:?}");
                    discarded += 1;
                    continue;
                }
            };

            if let (Some(prev), Some(speed)) = (prev_timestamp, sample.speed) {
                let dt = (sample.timestamp - prev) as f64;
                distance_km += speed * (dt / SECONDS_PER_HOUR);
            }

            let mut s = Sample {
                timestamp: sample.timestamp,
                position: point
                    .fix
                    .as_ref()
                    .map(|fix| Position::new(fix.lat, fix.lon, fix.ele)),
                temperature: sample.temperature,
                heart_rate: sample.heart_rate,
                cadence: sample.cadence,
                speed: sample.speed,
                distance: None,
            };
            if distance_km != 0.0 {
                s.distance = Some(distance_km);
            }

            prev_timestamp = Some(s.timestamp);
            samples.push(s);
        }
    }

    debug!(
        "Assembled {} segments with {} points into {} samples ({} discarded)",
        track.segments.len(),
        track.num_points(),
        samples.len(),
        discarded
    );

    if samples.is_empty() {
        return Err(SyncError::Malformed(format!(
            "none of the {} points in the track are usable",
            track.num_points()
        )));
    }

    Ok(Activity::new(samples))
}

fn check_point(
    point: &RawPoint,
    prev_timestamp: Option<Timestamp>,
) -> Result<&RawSample, Discard> {
    let sample = point.sample.as_ref().ok_or(Discard::NoSample)?;

    if !is_valid_timestamp(sample.timestamp) {
        return Err(Discard::TimestampOutOfRange);
    }

    if let Some(fix) = &point.fix {
        if fix.timestamp != sample.timestamp {
            return Err(Discard::TimestampMismatch);
        }
    }

    if let Some(prev) = prev_timestamp {
        if sample.timestamp <= prev {
            return Err(Discard::NotAscending);
        }
    }

    Ok(sample)
}
