/// Unix time, in whole seconds.
pub type Timestamp = i64;
pub type Lat = f64; // -90..90
pub type Lon = f64; // -180..180

// The raw side. These mirror what the device hands us: a list of segments
// per ride, each a list of (track point, lap point) pairs, either of which
// can be missing.

/// A GPS fix as recorded by the device.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFix {
    pub timestamp: Timestamp,
    pub lat: Lat,
    pub lon: Lon,
    /// Elevation in metres.
    pub ele: f64,
}

/// A lap/sensor point as recorded by the device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSample {
    pub timestamp: Timestamp,
    /// Speed in km/h.
    pub speed: Option<f64>,
    /// Cadence in rpm.
    pub cadence: Option<f64>,
    /// Heart rate in bpm.
    pub heart_rate: Option<f64>,
    /// Air temperature in Celsius.
    pub temperature: Option<f64>,
}

/// One recorded instant. The fix is missing when the device had no GPS
/// lock. A missing sample happens very rarely and means the pair is junk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPoint {
    pub fix: Option<RawFix>,
    pub sample: Option<RawSample>,
}

/// A continuous span of recording. The device starts a new one whenever
/// recording is paused.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSegment {
    pub points: Vec<RawPoint>,
}

/// A single ride, as stored on the device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTrack {
    pub segments: Vec<RawSegment>,
}

/// Identity of the device a history was read from. Ends up in the
/// file_id message of the FIT file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Device {
    /// Product name, for logging.
    pub product: String,
    pub serial: u32,
}

/// Everything read off a device in one go, oldest ride first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHistory {
    pub device: Device,
    pub tracks: Vec<RawTrack>,
}

// The canonical side.

/// Where a sample was taken. Latitude, longitude and altitude always
/// come together; a sample without a fix has no Position at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: Lat,
    pub lon: Lon,
    /// Altitude in metres.
    pub alt: f64,
}

/// The canonical per-instant record. All sensor values are kept as f64 so
/// that resampling does not quantise them; the encoders round on output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub position: Option<Position>,
    /// Air temperature in Celsius.
    pub temperature: Option<f64>,
    /// Heart rate in bpm.
    pub heart_rate: Option<f64>,
    /// Cadence in rpm.
    pub cadence: Option<f64>,
    /// Speed in km/h.
    pub speed: Option<f64>,
    /// Cumulative distance from the start of the ride, in km.
    pub distance: Option<f64>,
}

/// A ride in canonical form: samples in strictly ascending time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    pub samples: Vec<Sample>,
    /// True if the ride was classified as stationary (indoor trainer).
    pub is_static: bool,
    /// The timestamp of the first sample. Kept up to date by the fixup
    /// pipeline, which may crop or regenerate the start of the ride.
    pub start_timestamp: Timestamp,
}
