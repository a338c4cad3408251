//! Encoding of activities as FIT files, the binary format Garmin devices
//! record and every fitness site understands.

use log::info;
use logging_timer::time;

use crate::{
    error::{SyncError, SyncResult},
    geodesic::METRES_PER_KM,
    model::{Activity, Device, Sample, Timestamp},
};

mod crc;
mod profile;
mod writer;

pub use crc::{fit_crc, fit_crc_byte, fit_crc_is_valid, fit_crc_update};
pub use profile::{BaseType, EnumType, FieldSpec, MessageSpec, Profile, ResolvedField, SubfieldSpec};
pub use writer::{FitWriter, Value, FILE_TAG, HEADER_SIZE, PROFILE_VERSION, PROTOCOL_VERSION};

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z).
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

const FILE_ID: u8 = 0;
const RECORD: u8 = 1;

const FILE_ID_FIELDS: [&str; 5] = [
    "type",
    "manufacturer",
    "garmin_product",
    "serial_number",
    "time_created",
];

const RECORD_FIELDS: [&str; 9] = [
    "timestamp",
    "position_lat",
    "position_long",
    "altitude",
    "heart_rate",
    "cadence",
    "distance",
    "speed",
    "temperature",
];

pub fn to_fit_timestamp(timestamp: Timestamp) -> i64 {
    timestamp - FIT_EPOCH_OFFSET
}

/// Degrees to FIT semicircles, where 2^31 semicircles is 180 degrees.
/// Angles wrap around the circle, so 180 and -180 both come out as
/// `i32::MIN`.
pub fn deg_to_semicircles(deg: f64) -> i32 {
    let semicircles = (deg / 180.0 * 2f64.powi(31)).round() as i64;
    semicircles as i32
}

pub fn kmh_to_mps(kmh: f64) -> f64 {
    kmh / 3.6
}

/// Encodes the activity as a complete FIT activity file: a file_id message
/// identifying the device followed by one record message per sample.
///
/// Fitness sites are picky about who made a file, so the device always
/// claims to be a Garmin Edge 500 carrying the real serial number.
#[time]
pub fn encode_activity(activity: &Activity, device: &Device, profile: &Profile) -> SyncResult<Vec<u8>> {
    if activity.is_empty() {
        return Err(SyncError::Degenerate(
            "cannot encode an activity with no samples".to_string(),
        ));
    }

    let mut w = FitWriter::new(profile);

    w.define(FILE_ID, "file_id", &FILE_ID_FIELDS)?;
    w.write_data(
        FILE_ID,
        &[
            "activity".into(),
            "garmin".into(),
            "edge500".into(),
            device.serial.into(),
            Value::Number(to_fit_timestamp(activity.start_timestamp) as f64),
        ],
    )?;

    w.define(RECORD, "record", &RECORD_FIELDS)?;
    for sample in &activity.samples {
        w.write_data(RECORD, &record_values(sample))?;
    }

    let records = w.data_messages() - 1;
    let file = w.finish();
    info!(
        "Encoded FIT file for {} (serial {}): {records} records, {} bytes",
        device.product,
        device.serial,
        file.len()
    );

    Ok(file)
}

fn record_values(s: &Sample) -> [Value; RECORD_FIELDS.len()] {
    let pos = s.position;
    [
        Value::Number(to_fit_timestamp(s.timestamp) as f64),
        pos.map(|p| deg_to_semicircles(p.lat)).into(),
        pos.map(|p| deg_to_semicircles(p.lon)).into(),
        pos.map(|p| p.alt).into(),
        s.heart_rate.into(),
        s.cadence.into(),
        s.distance.map(|km| km * METRES_PER_KM).into(),
        s.speed.map(kmh_to_mps).into(),
        s.temperature.into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use fitparser::profile::MesgNum;
    use pretty_assertions::assert_eq;

    fn device() -> Device {
        Device {
            product: "Rider 40".to_string(),
            serial: 12345678,
        }
    }

    fn full_sample(t: Timestamp) -> Sample {
        Sample {
            timestamp: t,
            position: Some(Position::new(51.5, -0.12, 35.2)),
            temperature: Some(18.0),
            heart_rate: Some(132.0),
            cadence: Some(80.0),
            speed: Some(21.6),
            distance: Some(1.25),
        }
    }

    fn as_f64(value: &fitparser::Value) -> Option<f64> {
        match value {
            fitparser::Value::Float32(v) => Some(*v as f64),
            fitparser::Value::Float64(v) => Some(*v),
            fitparser::Value::SInt8(v) => Some(*v as f64),
            fitparser::Value::UInt8(v) => Some(*v as f64),
            fitparser::Value::SInt16(v) => Some(*v as f64),
            fitparser::Value::UInt16(v) => Some(*v as f64),
            fitparser::Value::SInt32(v) => Some(*v as f64),
            fitparser::Value::UInt32(v) => Some(*v as f64),
            fitparser::Value::UInt8z(v) => Some(*v as f64),
            fitparser::Value::UInt16z(v) => Some(*v as f64),
            fitparser::Value::UInt32z(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn field<'a>(record: &'a fitparser::FitDataRecord, names: &[&str]) -> Option<&'a fitparser::Value> {
        record
            .fields()
            .iter()
            .find(|f| names.contains(&f.name()))
            .map(|f| f.value())
    }

    #[test]
    fn semicircle_conversion() {
        assert_eq!(deg_to_semicircles(45.0), 536870912);
        assert_eq!(deg_to_semicircles(-90.0), -1073741824);
        assert_eq!(deg_to_semicircles(0.0), 0);
        assert_eq!(deg_to_semicircles(180.0), i32::MIN);
        assert_eq!(deg_to_semicircles(-180.0), i32::MIN);
        assert_eq!(deg_to_semicircles(179.9999), 2_147_482_455);
    }

    #[test]
    fn antimeridian_longitude_is_a_real_position() {
        let activity = Activity::new(vec![Sample::with_position(1_400_000_000, -41.0, 180.0, 10.0)]);
        let file = encode_activity(&activity, &device(), &Profile::new()).unwrap();

        let record = &file[file.len() - 2 - 24..file.len() - 2];
        assert_eq!(&record[5..9], &deg_to_semicircles(-41.0).to_le_bytes()[..]);
        assert_eq!(&record[9..13], &i32::MIN.to_le_bytes()[..]);
    }

    #[test]
    fn fit_epoch() {
        // 2014-05-13T16:53:20Z
        assert_eq!(to_fit_timestamp(1_400_000_000), 768_934_400);
    }

    #[test]
    fn empty_activity_is_degenerate() {
        let result = encode_activity(&Activity::default(), &device(), &Profile::new());
        assert!(matches!(result, Err(SyncError::Degenerate(_))));
    }

    #[test]
    fn file_passes_crc_and_has_the_right_length() {
        let activity = Activity::new(vec![full_sample(1_400_000_000), full_sample(1_400_000_001)]);
        let file = encode_activity(&activity, &device(), &Profile::new()).unwrap();

        assert!(fit_crc_is_valid(&file));
        let data_len = u32::from_le_bytes(file[4..8].try_into().unwrap()) as usize;
        assert_eq!(file.len(), HEADER_SIZE as usize + data_len + 2);

        let mut tampered = file.clone();
        let middle = tampered.len() / 2;
        tampered[middle] ^= 0x80;
        assert!(!fit_crc_is_valid(&tampered));
    }

    #[test]
    fn round_trips_through_a_fit_decoder() {
        let activity = Activity::new(vec![full_sample(1_400_000_000), full_sample(1_400_000_001)]);
        let file = encode_activity(&activity, &device(), &Profile::new()).unwrap();

        let records = fitparser::from_bytes(&file).unwrap();
        let file_ids: Vec<_> = records.iter().filter(|r| r.kind() == MesgNum::FileId).collect();
        let samples: Vec<_> = records.iter().filter(|r| r.kind() == MesgNum::Record).collect();
        assert_eq!(file_ids.len(), 1);
        assert_eq!(samples.len(), 2);

        let serial = field(file_ids[0], &["serial_number"]).and_then(as_f64);
        assert_eq!(serial, Some(12345678.0));

        let first = samples[0];
        match field(first, &["timestamp"]) {
            Some(fitparser::Value::Timestamp(ts)) => assert_eq!(ts.timestamp(), 1_400_000_000),
            other => panic!("unexpected timestamp {other:?}"),
        }

        let lat = field(first, &["position_lat"]).and_then(as_f64).unwrap();
        assert_eq!(lat, deg_to_semicircles(51.5) as f64);
        let lon = field(first, &["position_long"]).and_then(as_f64).unwrap();
        assert_eq!(lon, deg_to_semicircles(-0.12) as f64);

        let alt = field(first, &["enhanced_altitude", "altitude"]).and_then(as_f64).unwrap();
        assert!((alt - 35.2).abs() <= 0.2, "{alt}");
        let speed = field(first, &["enhanced_speed", "speed"]).and_then(as_f64).unwrap();
        assert!((speed - 6.0).abs() <= 0.001, "{speed}");
        let distance = field(first, &["distance"]).and_then(as_f64).unwrap();
        assert!((distance - 1250.0).abs() <= 0.01, "{distance}");

        assert_eq!(field(first, &["heart_rate"]).and_then(as_f64), Some(132.0));
        assert_eq!(field(first, &["cadence"]).and_then(as_f64), Some(80.0));
        assert_eq!(field(first, &["temperature"]).and_then(as_f64), Some(18.0));
    }

    #[test]
    fn missing_fields_are_written_as_invalid() {
        let mut sample = Sample::new(1_400_000_000);
        sample.heart_rate = Some(90.0);
        let activity = Activity::new(vec![sample]);
        let file = encode_activity(&activity, &device(), &Profile::new()).unwrap();

        // The last data message is the record: header byte, then the
        // fields in definition order.
        let record = &file[file.len() - 2 - 24..file.len() - 2];
        assert_eq!(record[0], RECORD);
        assert_eq!(&record[1..5], &768_934_400u32.to_le_bytes()[..]);
        assert_eq!(&record[5..9], &[0xFF, 0xFF, 0xFF, 0x7F][..]);
        assert_eq!(&record[9..13], &[0xFF, 0xFF, 0xFF, 0x7F][..]);
        assert_eq!(&record[13..15], &[0xFF, 0xFF][..]);
        assert_eq!(record[15], 90);
        assert_eq!(record[16], 0xFF);
        assert_eq!(&record[17..21], &[0xFF; 4][..]);
        assert_eq!(&record[21..23], &[0xFF, 0xFF][..]);
        assert_eq!(record[23], 0x7F);
    }
}
