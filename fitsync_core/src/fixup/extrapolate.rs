use log::debug;

use crate::{
    config::SyncConfig,
    error::SyncResult,
    model::{Activity, Sample},
};

/// Fills the gaps between recorded samples so that there is one sample
/// every `update_period` seconds, counting from the first sample. Real
/// samples are always kept, so if they are not on the grid the grid
/// restarts from each of them.
///
/// Sensor fields present at both ends of a gap are interpolated linearly.
/// Speed is too, but position is moved along the gap in proportion to the
/// distance covered (from the interpolated speed) rather than the time
/// elapsed. See `leg_fraction`.
///
/// Every sample is expected to have a fix; run `filter_missing_fix` first.
pub fn extrapolate(mut activity: Activity, config: &SyncConfig) -> SyncResult<Activity> {
    let period = i64::from(config.update_period.max(1));
    let mut samples = std::mem::take(&mut activity.samples).into_iter();

    let Some(first) = samples.next() else {
        return Ok(activity);
    };

    let mut result = Vec::with_capacity(samples.len() + 1);
    let mut held_legs = 0;
    let mut prev = first.clone();
    result.push(first);

    for next in samples {
        if next.timestamp <= prev.timestamp {
            debug!(
                "extrapolate: dropping sample at {} which is not after {}",
                next.timestamp, prev.timestamp
            );
            continue;
        }

        let leg = Leg::new(&prev, &next);
        let mut t = prev.timestamp.saturating_add(period);
        if t < next.timestamp && !(leg.length > 0.0) {
            held_legs += 1;
        }

        while t < next.timestamp {
            let synthetic = leg.step(&prev, t, period as f64);
            result.push(synthetic.clone());
            prev = synthetic;
            t = t.saturating_add(period);
        }

        prev = next.clone();
        result.push(next);
    }

    if held_legs > 0 {
        debug!("extrapolate: held position over {held_legs} zero-length legs");
    }

    Ok(activity.with_samples(result))
}

/// What fraction of a leg's (lat, lon) delta to move in one step.
///
/// `leg_length` is the leg's average speed times its duration. The step
/// covers the average of the two speeds either side of it for `period`
/// seconds, so the fraction is that distance over the leg's. When the leg
/// has no length (the rider was stopped at both ends) the position is held.
pub fn leg_fraction(prev_speed: f64, next_speed: f64, period: f64, leg_length: f64) -> f64 {
    if !leg_length.is_finite() || leg_length <= 0.0 {
        return 0.0;
    }

    ((prev_speed + next_speed) / 2.0) * period / leg_length
}

/// The rates of change across the gap between two real samples. All rates
/// are per second.
#[derive(Debug, Default)]
struct Leg {
    alt: Option<f64>,
    temperature: Option<f64>,
    heart_rate: Option<f64>,
    cadence: Option<f64>,
    distance: Option<f64>,
    speed: f64,
    length: f64,
    dlat: f64,
    dlon: f64,
}

impl Leg {
    fn new(start: &Sample, end: &Sample) -> Self {
        let dt = (end.timestamp - start.timestamp) as f64;
        let rate = |a: Option<f64>, b: Option<f64>| match (a, b) {
            (Some(a), Some(b)) => Some((b - a) / dt),
            _ => None,
        };

        let start_speed = start.speed.unwrap_or_default();
        let end_speed = end.speed.unwrap_or_default();

        let mut leg = Self {
            alt: None,
            temperature: rate(start.temperature, end.temperature),
            heart_rate: rate(start.heart_rate, end.heart_rate),
            cadence: rate(start.cadence, end.cadence),
            distance: rate(start.distance, end.distance),
            speed: (end_speed - start_speed) / dt,
            length: ((start_speed + end_speed) / 2.0) * dt,
            dlat: 0.0,
            dlon: 0.0,
        };

        if let (Some(a), Some(b)) = (start.position, end.position) {
            leg.alt = rate(Some(a.alt), Some(b.alt));
            leg.dlat = b.lat - a.lat;
            leg.dlon = b.lon - a.lon;
        }

        leg
    }

    /// Makes the synthetic sample that follows `prev` on this leg.
    fn step(&self, prev: &Sample, timestamp: i64, period: f64) -> Sample {
        let mut next = prev.clone();
        next.timestamp = timestamp;

        advance(&mut next.temperature, self.temperature, period);
        advance(&mut next.heart_rate, self.heart_rate, period);
        advance(&mut next.cadence, self.cadence, period);
        advance(&mut next.distance, self.distance, period);

        let prev_speed = prev.speed.unwrap_or_default();
        let speed = prev_speed + self.speed * period;
        next.speed = Some(speed);

        if let Some(pos) = next.position.as_mut() {
            if let Some(rate) = self.alt {
                pos.alt += rate * period;
            }
            let i = leg_fraction(prev_speed, speed, period, self.length);
            pos.lat += i * self.dlat;
            pos.lon += i * self.dlon;
        }

        next
    }
}

fn advance(value: &mut Option<f64>, rate: Option<f64>, period: f64) {
    if let (Some(v), Some(r)) = (value.as_mut(), rate) {
        *v += r * period;
    }
}
