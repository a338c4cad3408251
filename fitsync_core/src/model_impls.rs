use geo::{point, Point};

use crate::{
    geodesic::distance_km,
    model::{Activity, Position, RawHistory, RawTrack, Sample, Timestamp},
};

impl RawTrack {
    /// Returns the total number of points across all segments.
    pub fn num_points(&self) -> usize {
        self.segments.iter().map(|segment| segment.points.len()).sum()
    }

    /// The timestamp of the first usable sample, if there is one. This is
    /// what outputs for the track get named after.
    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.segments
            .iter()
            .flat_map(|segment| segment.points.iter())
            .find_map(|p| p.sample.as_ref().map(|s| s.timestamp))
    }
}

impl RawHistory {
    /// Returns the total number of points across all tracks.
    pub fn num_points(&self) -> usize {
        self.tracks.iter().map(|t| t.num_points()).sum()
    }
}

impl Position {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    /// Makes a geo-Point based on the lat-lon coordinates of this position.
    /// n.b. x=lon, y=lat. If you do it the other way round the
    /// distances are wrong - a lot wrong.
    pub fn as_geo_point(&self) -> Point {
        point! { x: self.lon, y: self.lat }
    }

    /// Great-circle distance to `other`, in km.
    pub fn distance_km(&self, other: &Position) -> f64 {
        distance_km(self.as_geo_point(), other.as_geo_point())
    }
}

impl Sample {
    /// Creates a sample that has nothing but a timestamp.
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    pub fn with_position(timestamp: Timestamp, lat: f64, lon: f64, alt: f64) -> Self {
        Self {
            timestamp,
            position: Some(Position::new(lat, lon, alt)),
            ..Default::default()
        }
    }

    pub fn has_fix(&self) -> bool {
        self.position.is_some()
    }
}

impl Activity {
    /// Creates an unclassified activity from a list of samples.
    pub fn new(samples: Vec<Sample>) -> Self {
        let mut activity = Self {
            samples,
            is_static: false,
            start_timestamp: 0,
        };
        activity.refresh_start_timestamp();
        activity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Replaces the whole sample sequence. Stages never edit samples in
    /// place; they build a new sequence and swap it in.
    pub fn with_samples(mut self, samples: Vec<Sample>) -> Self {
        self.samples = samples;
        self
    }

    /// Points `start_timestamp` at the first sample. Leaves it alone if
    /// there are no samples.
    pub fn refresh_start_timestamp(&mut self) {
        if let Some(first) = self.samples.first() {
            self.start_timestamp = first.timestamp;
        }
    }

    pub fn end_timestamp(&self) -> Option<Timestamp> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Seconds between the first and last samples.
    pub fn duration_secs(&self) -> i64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0,
        }
    }

    /// The cumulative distance of the ride in km, taken from the last
    /// sample that carries one.
    pub fn distance_km(&self) -> f64 {
        self.samples
            .iter()
            .rev()
            .find_map(|s| s.distance)
            .unwrap_or_default()
    }

    /// True if every timestamp is strictly greater than the one before.
    pub fn is_strictly_ascending(&self) -> bool {
        self.samples
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    }
}
