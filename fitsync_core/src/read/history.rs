use anyhow::{bail, Result};
use log::debug;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::model::{Device, RawTrack};

use super::{attributes::Attributes, track::parse_track, XmlReaderConversions};

pub(crate) fn parse_history_attributes<R>(
    tag: &BytesStart<'_>,
    xml_reader: &Reader<R>,
) -> Result<Device> {
    let mut attributes = Attributes::new(tag, xml_reader)?;
    let product = attributes.get_optional::<String>("product")?.unwrap_or_default();
    let serial = attributes.get("serial")?;

    if !attributes.is_empty() {
        debug!("Ignoring history attributes {:?}", attributes.remaining_keys());
    }

    Ok(Device { product, serial })
}

/// Reads tracks until the closing '</history>'.
pub(crate) fn parse_history(xml_reader: &mut Reader<&[u8]>) -> Result<Vec<RawTrack>> {
    let mut tracks = Vec::new();

    loop {
        match xml_reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"track" => {
                    tracks.push(parse_track(xml_reader)?);
                }
                e => bail!("Unexpected Start element {:?}", xml_reader.bytes_to_cow(e)),
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"track" => {
                    tracks.push(RawTrack::default());
                }
                e => bail!("Unexpected Empty element {:?}", xml_reader.bytes_to_cow(e)),
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"history" => {
                    return Ok(tracks);
                }
                _ => {}
            },
            // Whitespace between elements.
            Ok(Event::Text(_)) | Ok(Event::Comment(_)) => {}
            e => bail!("Unexpected element {:?}", e),
        }
    }
}
