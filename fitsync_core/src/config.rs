/// These are the parameters that control screening and the fixup
/// pipeline. Loading them is the job of the caller; the command line
/// front end fills them in from its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Rides shorter than this, in km, are not synced.
    pub min_distance: f64,

    /// Rides shorter than this, in seconds, are not synced.
    pub min_time: i64,

    /// The speed, in km/h, you must exceed to be considered riding. Used
    /// to crop dead time off the start and end of a track.
    pub min_speed: f64,

    /// If no fix strays further than this many metres from the first fix
    /// the track is treated as a static (indoor trainer) ride.
    pub move_distance: f64,

    /// Spacing, in seconds, of the resampled track.
    pub update_period: u32,

    /// Tracks that started more than this many days ago are ignored.
    pub oldest: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_distance: 5.0,
            min_time: 600,
            min_speed: 2.0,
            move_distance: 100.0,
            update_period: 1,
            oldest: 30,
        }
    }
}
