//! Reads a history dump, the XML form of everything a device hands over
//! in one download. The layout is
//!
//! ```text
//! <history product="..." serial="...">
//!   <track>
//!     <segment>
//!       <point>
//!         <fix time="..." lat="..." lon="..." ele="..."/>
//!         <sample time="..." speed="..." cadence="..." hr="..." temp="..."/>
//!       </point>
//!     </segment>
//!   </track>
//! </history>
//! ```
//!
//! Either child of a point may be missing.

#![allow(clippy::single_match)]

use std::{borrow::Cow, path::Path};

use anyhow::{bail, Context, Result};
use history::{parse_history, parse_history_attributes};
use log::info;
use logging_timer::time;
use quick_xml::{events::Event, Reader};

use crate::{
    error::{SyncError, SyncResult},
    model::RawHistory,
};

mod attributes;
mod history;
mod track;

#[time]
pub fn read_history_from_file<P: AsRef<Path>>(input_file: P) -> Result<RawHistory> {
    let input_file = input_file.as_ref();
    info!("Reading history dump {:?}", input_file);
    let contents =
        std::fs::read(input_file).with_context(|| format!("Failed to read {:?}", input_file))?;
    let history = read_history_from_slice(&contents)
        .with_context(|| format!("Failed to parse {:?}", input_file))?;
    info!(
        "Read {} tracks with {} points from {} (serial {})",
        history.tracks.len(),
        history.num_points(),
        history.device.product,
        history.device.serial
    );
    Ok(history)
}

/// Parses a complete dump. Any problem with the document is reported as
/// `SyncError::Malformed` with the full chain of context.
pub fn read_history_from_slice(data: &[u8]) -> SyncResult<RawHistory> {
    let xml_reader = Reader::from_reader(data);
    read_history_from_reader(xml_reader).map_err(|e| SyncError::Malformed(format!("{e:#}")))
}

fn read_history_from_reader(mut xml_reader: Reader<&[u8]>) -> Result<RawHistory> {
    let mut history: Option<RawHistory> = None;

    loop {
        match xml_reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"history" if history.is_none() => {
                    let device = parse_history_attributes(&e, &xml_reader)?;
                    let tracks = parse_history(&mut xml_reader)?;
                    history = Some(RawHistory { device, tracks });
                }
                e => bail!("Unexpected Start element {:?}", xml_reader.bytes_to_cow(e)),
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"history" if history.is_none() => {
                    let device = parse_history_attributes(&e, &xml_reader)?;
                    history = Some(RawHistory {
                        device,
                        tracks: Vec::new(),
                    });
                }
                e => bail!("Unexpected Empty element {:?}", xml_reader.bytes_to_cow(e)),
            },
            Ok(Event::Eof) => {
                // The closing '</history>' was consumed by parse_history().
                return history.context("Did not find the 'history' element");
            }
            Err(e) => bail!("Error at position {}: {:?}", xml_reader.error_position(), e),
            _ => (),
        }
    }
}

pub(crate) trait XmlReaderConversions {
    fn bytes_to_cow<'a, 'b>(&'a self, bytes: &'b [u8]) -> Result<Cow<'b, str>>;
    fn bytes_to_string(&self, bytes: &[u8]) -> Result<String>;
    fn cow_to_string(&self, bytes: Cow<'_, [u8]>) -> Result<String>;
}

impl<R> XmlReaderConversions for Reader<R> {
    #[inline]
    fn bytes_to_cow<'a, 'b>(&'a self, bytes: &'b [u8]) -> Result<Cow<'b, str>> {
        Ok(self.decoder().decode(bytes)?)
    }

    #[inline]
    fn bytes_to_string(&self, bytes: &[u8]) -> Result<String> {
        Ok(self.bytes_to_cow(bytes)?.into())
    }

    #[inline]
    fn cow_to_string(&self, bytes: Cow<'_, [u8]>) -> Result<String> {
        match bytes {
            Cow::Borrowed(slice) => Ok(self.bytes_to_string(slice)?),
            Cow::Owned(vec) => Ok(self.bytes_to_string(&vec)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Device, RawFix, RawSample};
    use pretty_assertions::assert_eq;

    const DUMP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<history product="Rider 40" serial="12345678">
  <!-- oldest ride first -->
  <track>
    <segment>
      <point>
        <fix time="1400000000" lat="51.5" lon="-0.12" ele="35.2"/>
        <sample time="1400000000" speed="21.4" cadence="80" hr="132" temp="18.5"/>
      </point>
      <point>
        <sample time="1400000001" speed="21.0"/>
      </point>
      <point>
        <fix time="1400000002" lat="51.5001" lon="-0.12" ele="35.0"/>
      </point>
    </segment>
    <segment/>
  </track>
  <track/>
</history>
"#;

    #[test]
    fn reads_a_complete_dump() {
        let history = read_history_from_slice(DUMP.as_bytes()).unwrap();

        assert_eq!(
            history.device,
            Device {
                product: "Rider 40".to_string(),
                serial: 12345678
            }
        );
        assert_eq!(history.tracks.len(), 2);
        assert_eq!(history.tracks[0].segments.len(), 2);
        assert!(history.tracks[1].segments.is_empty());
        assert_eq!(history.num_points(), 3);

        let points = &history.tracks[0].segments[0].points;
        assert_eq!(
            points[0].fix,
            Some(RawFix {
                timestamp: 1_400_000_000,
                lat: 51.5,
                lon: -0.12,
                ele: 35.2
            })
        );
        assert_eq!(
            points[0].sample,
            Some(RawSample {
                timestamp: 1_400_000_000,
                speed: Some(21.4),
                cadence: Some(80.0),
                heart_rate: Some(132.0),
                temperature: Some(18.5),
            })
        );
        assert_eq!(points[1].fix, None);
        assert_eq!(points[1].sample.as_ref().unwrap().heart_rate, None);
        assert_eq!(points[2].sample, None);
    }

    #[test]
    fn fix_and_sample_may_have_closing_tags() {
        let dump = r#"<history product="x" serial="1"><track><segment><point>
            <fix time="5" lat="1" lon="2" ele="3"></fix>
            <sample time="5"></sample>
        </point></segment></track></history>"#;

        let history = read_history_from_slice(dump.as_bytes()).unwrap();
        let point = &history.tracks[0].segments[0].points[0];
        assert_eq!(point.fix.as_ref().unwrap().ele, 3.0);
        assert_eq!(point.sample.as_ref().unwrap().timestamp, 5);
    }

    #[test]
    fn empty_history() {
        let history = read_history_from_slice(br#"<history product="x" serial="7"/>"#).unwrap();
        assert_eq!(history.device.serial, 7);
        assert!(history.tracks.is_empty());
    }

    #[test]
    fn errors_name_the_problem() {
        let err = |doc: &str| match read_history_from_slice(doc.as_bytes()) {
            Err(SyncError::Malformed(msg)) => msg,
            other => panic!("expected Malformed, got {other:?}"),
        };

        let msg = err(r#"<history product="x"/>"#);
        assert!(msg.contains("'serial'"), "{msg}");

        let msg = err(r#"<history product="x" serial="1"><track><lap/></track></history>"#);
        assert!(msg.contains("lap"), "{msg}");

        let msg = err(
            r#"<history product="x" serial="1"><track><segment><point>
               <fix time="1" lat="north" lon="2" ele="3"/></point></segment></track></history>"#,
        );
        assert!(msg.contains("lat=north"), "{msg}");

        let msg = err(
            r#"<history product="x" serial="1"><track><segment><point>
               <sample time="9223372036854775807"/></point></segment></track></history>"#,
        );
        assert!(msg.contains("time=9223372036854775807"), "{msg}");

        let msg = err("");
        assert!(msg.contains("'history'"), "{msg}");
    }
}
