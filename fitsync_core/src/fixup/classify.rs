use crate::{
    config::SyncConfig,
    error::SyncResult,
    geodesic::METRES_PER_KM,
    model::{Activity, Sample},
};

/// Decides, once for the whole ride, whether it went anywhere.
pub fn classify_static(mut activity: Activity, config: &SyncConfig) -> SyncResult<Activity> {
    activity.is_static = is_static(&activity.samples, config.move_distance / METRES_PER_KM);
    Ok(activity)
}

/// A ride is static if no fix is more than `threshold_km` from the first
/// fix. The reference point is fixed: slow drift that never takes you
/// `threshold_km` from where you started still counts as static, which is
/// what GPS wander on an indoor trainer looks like.
///
/// A ride with no fixes at all is static.
pub fn is_static(samples: &[Sample], threshold_km: f64) -> bool {
    let mut fixes = samples.iter().filter_map(|s| s.position.as_ref());

    let Some(reference) = fixes.next() else {
        return true;
    };

    !fixes.any(|p| reference.distance_km(p) > threshold_km)
}
