use crate::{
    config::SyncConfig,
    error::SyncResult,
    geodesic::SECONDS_PER_HOUR,
    model::{Activity, Position, Sample, Timestamp},
};

/// Recalculates the speed of every sample from the distance to the
/// previous sample with a fix. After resampling the device's own speeds
/// no longer agree with the positions, and sites like Strava derive their
/// numbers from the positions.
///
/// The first sample with a fix gets a speed of 0. Samples without a fix
/// get no speed at all.
pub fn recompute_speed(activity: Activity, _config: &SyncConfig) -> SyncResult<Activity> {
    let mut prev: Option<(Timestamp, Position)> = None;

    let samples: Vec<Sample> = activity
        .samples
        .iter()
        .map(|s| {
            let mut s = s.clone();
            s.speed = match s.position {
                None => None,
                Some(pos) => {
                    let speed = match prev {
                        Some((t, p)) if s.timestamp > t => {
                            let dt = (s.timestamp - t) as f64;
                            (p.distance_km(&pos) / dt) * SECONDS_PER_HOUR
                        }
                        _ => 0.0,
                    };
                    prev = Some((s.timestamp, pos));
                    Some(speed)
                }
            };
            s
        })
        .collect();

    Ok(activity.with_samples(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixup::test_support::moving;
    use pretty_assertions::assert_eq;

    #[test]
    fn speed_from_distance_over_time() {
        // 0.001 degrees of latitude is ~111m; over 10s that is ~40 km/h.
        let activity = Activity::new(vec![
            moving(0, 0.0, 0.0, 99.0),
            Sample::new(5),
            moving(10, 0.001, 0.0, 99.0),
        ]);

        let activity = recompute_speed(activity, &SyncConfig::default()).unwrap();
        let expected = 6367.0 * 0.001_f64.to_radians() / 10.0 * 3600.0;

        assert_eq!(activity.samples[0].speed, Some(0.0));
        assert_eq!(activity.samples[1].speed, None);
        assert!((activity.samples[2].speed.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn stationary_fixes_have_zero_speed() {
        let activity = Activity::new(vec![moving(0, 5.0, 5.0, 12.0), moving(1, 5.0, 5.0, 12.0)]);

        let activity = recompute_speed(activity, &SyncConfig::default()).unwrap();
        assert_eq!(activity.samples[1].speed, Some(0.0));
    }
}
