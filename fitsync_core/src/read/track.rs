use anyhow::{bail, ensure, Context, Result};
use log::debug;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::{
    formatting::is_valid_timestamp,
    model::{RawFix, RawPoint, RawSample, RawSegment, RawTrack, Timestamp},
};

use super::{attributes::Attributes, XmlReaderConversions};

pub(crate) fn parse_track(xml_reader: &mut Reader<&[u8]>) -> Result<RawTrack> {
    let mut track = RawTrack::default();

    loop {
        match xml_reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"segment" => {
                    track.segments.push(parse_segment(xml_reader)?);
                }
                e => bail!("Unexpected Start element {:?}", xml_reader.bytes_to_cow(e)),
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"segment" => {
                    track.segments.push(RawSegment::default());
                }
                e => bail!("Unexpected Empty element {:?}", xml_reader.bytes_to_cow(e)),
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"track" => {
                    return Ok(track);
                }
                _ => {}
            },
            Ok(Event::Text(_)) | Ok(Event::Comment(_)) => {}
            e => bail!("Unexpected element {:?}", e),
        }
    }
}

fn parse_segment(xml_reader: &mut Reader<&[u8]>) -> Result<RawSegment> {
    let mut segment = RawSegment::default();

    loop {
        match xml_reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"point" => {
                    let index = segment.points.len();
                    let point = parse_point(xml_reader)
                        .with_context(|| format!("Failed to read point {index}"))?;
                    segment.points.push(point);
                }
                e => bail!("Unexpected Start element {:?}", xml_reader.bytes_to_cow(e)),
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"point" => {
                    segment.points.push(RawPoint::default());
                }
                e => bail!("Unexpected Empty element {:?}", xml_reader.bytes_to_cow(e)),
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"segment" => {
                    return Ok(segment);
                }
                _ => {}
            },
            Ok(Event::Text(_)) | Ok(Event::Comment(_)) => {}
            e => bail!("Unexpected element {:?}", e),
        }
    }
}

fn parse_point(xml_reader: &mut Reader<&[u8]>) -> Result<RawPoint> {
    let mut point = RawPoint::default();

    loop {
        match xml_reader.read_event() {
            Ok(Event::Start(e)) => {
                read_point_child(&e, xml_reader, &mut point)?;
                xml_reader.read_to_end(e.name())?;
            }
            Ok(Event::Empty(e)) => {
                read_point_child(&e, xml_reader, &mut point)?;
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"point" => {
                    return Ok(point);
                }
                _ => {}
            },
            Ok(Event::Text(_)) | Ok(Event::Comment(_)) => {}
            e => bail!("Unexpected element {:?}", e),
        }
    }
}

fn read_point_child<R>(tag: &BytesStart<'_>, xml_reader: &Reader<R>, point: &mut RawPoint) -> Result<()> {
    match tag.name().as_ref() {
        b"fix" => point.fix = Some(parse_fix(tag, xml_reader)?),
        b"sample" => point.sample = Some(parse_sample(tag, xml_reader)?),
        e => bail!("Unexpected element {:?} in 'point'", xml_reader.bytes_to_cow(e)),
    }
    Ok(())
}

fn parse_fix<R>(tag: &BytesStart<'_>, xml_reader: &Reader<R>) -> Result<RawFix> {
    let mut attributes = Attributes::new(tag, xml_reader)?;
    let fix = RawFix {
        timestamp: get_time(&mut attributes)?,
        lat: attributes.get("lat")?,
        lon: attributes.get("lon")?,
        ele: attributes.get("ele")?,
    };
    log_unused(&attributes);
    Ok(fix)
}

fn parse_sample<R>(tag: &BytesStart<'_>, xml_reader: &Reader<R>) -> Result<RawSample> {
    let mut attributes = Attributes::new(tag, xml_reader)?;
    let sample = RawSample {
        timestamp: get_time(&mut attributes)?,
        speed: attributes.get_optional("speed")?,
        cadence: attributes.get_optional("cadence")?,
        heart_rate: attributes.get_optional("hr")?,
        temperature: attributes.get_optional("temp")?,
    };
    log_unused(&attributes);
    Ok(sample)
}

fn get_time(attributes: &mut Attributes) -> Result<Timestamp> {
    let time: Timestamp = attributes.get("time")?;
    ensure!(is_valid_timestamp(time), "Attribute 'time={time}' is out of range");
    Ok(time)
}

fn log_unused(attributes: &Attributes) {
    if !attributes.is_empty() {
        debug!("Ignoring attributes {:?}", attributes.remaining_keys());
    }
}
