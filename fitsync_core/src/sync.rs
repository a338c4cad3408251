//! Drives a whole history download: each track is assembled, screened,
//! fixed up and encoded, and the results handed to an `ActivitySink`.

use std::fmt;

use anyhow::Result;
use log::{debug, info, warn};
use logging_timer::time;

use crate::{
    assemble::assemble,
    config::SyncConfig,
    error::{SyncError, SyncResult},
    fit::{encode_activity, Profile},
    fixup::fixup,
    formatting::{format_compact_utc_date, timestamp_to_utc},
    gpx_writer::encode_gpx,
    model::{Activity, Device, RawHistory, RawTrack, Timestamp},
};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputFormat {
    Fit,
    Gpx,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Fit, OutputFormat::Gpx];

    /// The format tag handed to an uploader along with the bytes.
    pub fn tag(self) -> &'static str {
        match self {
            OutputFormat::Fit => "fit",
            OutputFormat::Gpx => "gpx",
        }
    }

    pub fn extension(self) -> &'static str {
        self.tag()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One activity encoded in one format.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedActivity {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    /// Start of the activity after fixups.
    pub start_timestamp: Timestamp,
}

/// Somewhere to put encoded activities, e.g. a directory or an uploader.
pub trait ActivitySink {
    /// True if an output for this stem and format has already been taken.
    fn contains(&self, stem: &str, format: OutputFormat) -> bool;

    fn accept(&mut self, stem: &str, activity: &EncodedActivity) -> Result<()>;
}

/// Keeps everything it is given, in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub outputs: Vec<(String, EncodedActivity)>,
}

impl ActivitySink for MemorySink {
    fn contains(&self, stem: &str, format: OutputFormat) -> bool {
        self.outputs
            .iter()
            .any(|(s, a)| s == stem && a.format == format)
    }

    fn accept(&mut self, stem: &str, activity: &EncodedActivity) -> Result<()> {
        self.outputs.push((stem.to_string(), activity.clone()));
        Ok(())
    }
}

/// The name outputs for a track starting at `start_timestamp` are stored
/// under, "YYYYMMDDHHMMSS" in UTC.
pub fn output_stem(start_timestamp: Timestamp) -> Result<String> {
    let date = timestamp_to_utc(start_timestamp)?;
    format_compact_utc_date(&date)
}

/// Decides whether a freshly assembled activity is worth syncing at all.
/// Returns `SyncError::Skipped` saying why not.
pub fn screen(activity: &Activity, config: &SyncConfig, now: Timestamp) -> SyncResult<()> {
    let distance = activity.distance_km();
    if distance < config.min_distance {
        return Err(SyncError::Skipped(format!(
            "distance {distance:.2} km is less than {} km",
            config.min_distance
        )));
    }

    let duration = activity.duration_secs();
    if duration < config.min_time {
        return Err(SyncError::Skipped(format!(
            "duration {duration}s is less than {}s",
            config.min_time
        )));
    }

    let age = now.saturating_sub(activity.start_timestamp);
    if age > i64::from(config.oldest) * SECONDS_PER_DAY {
        return Err(SyncError::Skipped(format!(
            "started {:.1} days ago, the limit is {}",
            age as f64 / SECONDS_PER_DAY as f64,
            config.oldest
        )));
    }

    Ok(())
}

/// Takes one raw track all the way to encoded output in each of `formats`.
pub fn process_track(
    raw: &RawTrack,
    device: &Device,
    config: &SyncConfig,
    profile: &Profile,
    now: Timestamp,
    formats: &[OutputFormat],
) -> SyncResult<Vec<EncodedActivity>> {
    let activity = assemble(raw)?;
    screen(&activity, config, now)?;
    let activity = fixup(activity, config)?;

    formats
        .iter()
        .map(|&format| {
            let bytes = match format {
                OutputFormat::Fit => encode_activity(&activity, device, profile)?,
                OutputFormat::Gpx => encode_gpx(&activity, &track_name(device))
                    .map_err(|e| SyncError::Malformed(format!("{e:#}")))?,
            };

            Ok(EncodedActivity {
                format,
                bytes,
                start_timestamp: activity.start_timestamp,
            })
        })
        .collect()
}

fn track_name(device: &Device) -> String {
    if device.product.is_empty() {
        "Ride".to_string()
    } else {
        format!("Ride recorded by {}", device.product)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    /// Outputs were handed to the sink in these formats.
    Encoded(Vec<OutputFormat>),
    /// Every requested output was already in the sink.
    AlreadySynced,
    Skipped(String),
    Degenerate(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackReport {
    /// The output stem, if the track had a usable start time.
    pub stem: Option<String>,
    pub outcome: TrackOutcome,
}

/// What happened to each track, in the order they were processed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub tracks: Vec<TrackReport>,
}

impl SyncReport {
    pub fn encoded(&self) -> usize {
        self.count(|o| matches!(o, TrackOutcome::Encoded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TrackOutcome::Failed(_)))
    }

    /// Tracks that produced nothing for a benign reason.
    pub fn not_synced(&self) -> usize {
        self.tracks.len() - self.encoded() - self.failed()
    }

    fn count<F: Fn(&TrackOutcome) -> bool>(&self, f: F) -> usize {
        self.tracks.iter().filter(|t| f(&t.outcome)).count()
    }
}

/// Processes every track in the history, newest first, handing the
/// outputs to `sink`. A failing track is logged and reported and the
/// rest carry on. Unless `force` is set, tracks whose outputs the sink
/// already has are not processed again.
#[time]
pub fn sync_history<S: ActivitySink + ?Sized>(
    history: &RawHistory,
    config: &SyncConfig,
    profile: &Profile,
    now: Timestamp,
    formats: &[OutputFormat],
    sink: &mut S,
    force: bool,
) -> SyncReport {
    let mut report = SyncReport::default();

    for (idx, raw) in history.tracks.iter().enumerate().rev() {
        let stem = raw.first_timestamp().and_then(|t| match output_stem(t) {
            Ok(stem) => Some(stem),
            Err(e) => {
                warn!("Track {idx}: cannot name outputs: {e:#}");
                None
            }
        });

        let outcome = sync_track(raw, stem.as_deref(), &history.device, config, profile, now, formats, sink, force);
        match &outcome {
            TrackOutcome::Encoded(done) => info!("Track {idx} ({stem:?}): synced as {done:?}"),
            TrackOutcome::AlreadySynced => debug!("Track {idx} ({stem:?}): already synced"),
            TrackOutcome::Skipped(why) => info!("Track {idx} ({stem:?}): skipped, {why}"),
            TrackOutcome::Degenerate(why) => info!("Track {idx} ({stem:?}): nothing to sync, {why}"),
            TrackOutcome::Failed(why) => warn!("Track {idx} ({stem:?}): failed, {why}"),
        }

        report.tracks.push(TrackReport { stem, outcome });
    }

    info!(
        "Synced {} of {} tracks from {} ({} failed)",
        report.encoded(),
        report.tracks.len(),
        history.device.product,
        report.failed()
    );

    report
}

#[allow(clippy::too_many_arguments)]
fn sync_track<S: ActivitySink + ?Sized>(
    raw: &RawTrack,
    stem: Option<&str>,
    device: &Device,
    config: &SyncConfig,
    profile: &Profile,
    now: Timestamp,
    formats: &[OutputFormat],
    sink: &mut S,
    force: bool,
) -> TrackOutcome {
    if !force {
        if let Some(stem) = stem {
            if formats.iter().all(|&f| sink.contains(stem, f)) {
                return TrackOutcome::AlreadySynced;
            }
        }
    }

    let encoded = match process_track(raw, device, config, profile, now, formats) {
        Ok(encoded) => encoded,
        Err(SyncError::Skipped(why)) => return TrackOutcome::Skipped(why),
        Err(SyncError::Degenerate(why)) => return TrackOutcome::Degenerate(why),
        Err(e) => return TrackOutcome::Failed(e.to_string()),
    };

    // Anything that got this far had a sample, so it has a stem.
    let Some(stem) = stem else {
        return TrackOutcome::Failed("track has no start time".to_string());
    };

    let mut written = Vec::with_capacity(encoded.len());
    for activity in &encoded {
        if let Err(e) = sink.accept(stem, activity) {
            return TrackOutcome::Failed(format!("{e:#}"));
        }
        written.push(activity.format);
    }

    TrackOutcome::Encoded(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fit::fit_crc_is_valid,
        model::{RawFix, RawPoint, RawSample, RawSegment},
    };
    use pretty_assertions::assert_eq;

    const START: Timestamp = 1_400_000_000;
    const NOW: Timestamp = START + 2 * SECONDS_PER_DAY;

    /// About 10m of latitude, i.e. 36 km/h when covered in a second.
    const STEP_DEG: f64 = 0.01 / (6367.0 * std::f64::consts::PI / 180.0);

    fn device() -> Device {
        Device {
            product: "Rider 40".to_string(),
            serial: 12345678,
        }
    }

    fn point(t: Timestamp, lat: f64, speed: f64) -> RawPoint {
        RawPoint {
            fix: Some(RawFix {
                timestamp: t,
                lat,
                lon: -1.0,
                ele: 50.0,
            }),
            sample: Some(RawSample {
                timestamp: t,
                speed: Some(speed),
                heart_rate: Some(120.0),
                ..Default::default()
            }),
        }
    }

    /// A 20 minute ride north at 36 km/h, 12 km in all.
    fn ride(start: Timestamp) -> RawTrack {
        let points = (0..1200)
            .map(|i| point(start + i, 50.0 + STEP_DEG * i as f64, 36.0))
            .collect();
        RawTrack {
            segments: vec![RawSegment { points }],
        }
    }

    fn history(tracks: Vec<RawTrack>) -> RawHistory {
        RawHistory {
            device: device(),
            tracks,
        }
    }

    fn sync(history: &RawHistory, sink: &mut MemorySink, force: bool) -> SyncReport {
        sync_history(
            history,
            &SyncConfig::default(),
            &Profile::new(),
            NOW,
            &OutputFormat::ALL,
            sink,
            force,
        )
    }

    #[test]
    fn stem_is_compact_utc() {
        assert_eq!(output_stem(START).unwrap(), "20140513165320");
    }

    #[test]
    fn encodes_every_requested_format() {
        let encoded = process_track(
            &ride(START),
            &device(),
            &SyncConfig::default(),
            &Profile::new(),
            NOW,
            &OutputFormat::ALL,
        )
        .unwrap();

        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded[0].format, OutputFormat::Fit);
        assert!(fit_crc_is_valid(&encoded[0].bytes));
        assert_eq!(&encoded[0].bytes[8..12], b".FIT");
        assert_eq!(encoded[1].format, OutputFormat::Gpx);
        assert!(encoded[1].bytes.starts_with(b"<?xml"));
        assert!(encoded.iter().all(|e| e.start_timestamp == START));
    }

    #[test]
    fn screening() {
        let config = SyncConfig::default();
        let activity = assemble(&ride(START)).unwrap();
        assert!(screen(&activity, &config, NOW).is_ok());

        let short = SyncConfig {
            min_distance: 20.0,
            ..Default::default()
        };
        assert!(matches!(screen(&activity, &short, NOW), Err(SyncError::Skipped(_))));

        let long = SyncConfig {
            min_time: 3600,
            ..Default::default()
        };
        assert!(matches!(screen(&activity, &long, NOW), Err(SyncError::Skipped(_))));

        let later = START + 31 * SECONDS_PER_DAY;
        assert!(matches!(screen(&activity, &config, later), Err(SyncError::Skipped(_))));
    }

    #[test]
    fn age_limit_is_exact_to_the_second() {
        let config = SyncConfig::default();
        let activity = assemble(&ride(START)).unwrap();
        let limit = START + 30 * SECONDS_PER_DAY;

        assert!(screen(&activity, &config, limit).is_ok());
        assert!(matches!(screen(&activity, &config, limit + 1), Err(SyncError::Skipped(_))));
        assert!(matches!(
            screen(&activity, &config, limit + 23 * 3600),
            Err(SyncError::Skipped(_))
        ));
    }

    #[test]
    fn newest_track_is_synced_first() {
        let older = ride(START);
        let newer = ride(START + 10_000);
        let mut sink = MemorySink::default();

        let report = sync(&history(vec![older, newer]), &mut sink, false);

        assert_eq!(report.encoded(), 2);
        let stems: Vec<_> = sink.outputs.iter().map(|(s, a)| (s.as_str(), a.format)).collect();
        assert_eq!(
            stems,
            vec![
                ("20140513194000", OutputFormat::Fit),
                ("20140513194000", OutputFormat::Gpx),
                ("20140513165320", OutputFormat::Fit),
                ("20140513165320", OutputFormat::Gpx),
            ]
        );
    }

    #[test]
    fn already_synced_tracks_are_left_alone_unless_forced() {
        let history = history(vec![ride(START)]);
        let mut sink = MemorySink::default();

        sync(&history, &mut sink, false);
        let report = sync(&history, &mut sink, false);
        assert_eq!(report.tracks[0].outcome, TrackOutcome::AlreadySynced);
        assert_eq!(sink.outputs.len(), 2);

        let report = sync(&history, &mut sink, true);
        assert_eq!(report.encoded(), 1);
        assert_eq!(sink.outputs.len(), 4);
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let junk = RawTrack {
            segments: vec![RawSegment {
                points: vec![RawPoint::default(), RawPoint::default()],
            }],
        };
        let mut too_short = ride(START + 20_000);
        too_short.segments[0].points.truncate(60);

        let history = history(vec![ride(START), junk, too_short]);
        let mut sink = MemorySink::default();
        let report = sync(&history, &mut sink, false);

        assert_eq!(report.tracks.len(), 3);
        assert!(matches!(report.tracks[0].outcome, TrackOutcome::Skipped(_)));
        assert!(matches!(report.tracks[1].outcome, TrackOutcome::Failed(_)));
        assert_eq!(report.tracks[1].stem, None);
        assert!(matches!(report.tracks[2].outcome, TrackOutcome::Encoded(_)));
        assert_eq!((report.encoded(), report.failed(), report.not_synced()), (1, 1, 1));
    }

    #[test]
    fn ride_that_never_gets_going_is_degenerate() {
        // Crawling along at 1 km/h, but drifting far enough to not count
        // as static.
        let points = (0..20)
            .map(|i| point(START + i, 50.0 + 0.002 * i as f64, 1.0))
            .collect();
        let raw = RawTrack {
            segments: vec![RawSegment { points }],
        };
        let config = SyncConfig {
            min_distance: 0.0,
            min_time: 0,
            ..Default::default()
        };

        let result = process_track(&raw, &device(), &config, &Profile::new(), NOW, &OutputFormat::ALL);
        assert!(matches!(result, Err(SyncError::Degenerate(_))));
    }

    #[test]
    fn indoor_trainer_ride_is_encoded_untouched() {
        // The wheel sensor says 30 km/h but the bike never moves.
        let points = (0..900).map(|i| point(START + i, 50.0, 30.0)).collect();
        let raw = RawTrack {
            segments: vec![RawSegment { points }],
        };

        let encoded = process_track(
            &raw,
            &device(),
            &SyncConfig::default(),
            &Profile::new(),
            NOW,
            &[OutputFormat::Gpx],
        )
        .unwrap();

        let gpx = String::from_utf8(encoded[0].bytes.clone()).unwrap();
        assert_eq!(gpx.matches("<trkpt ").count(), 900);
    }
}
