use std::io::Write;

use anyhow::{Context, Result};
use log::debug;
use logging_timer::time;
use quick_xml::escape::escape;

use crate::{
    byte_counter::ByteCounter,
    formatting::{format_utc_date, timestamp_to_utc},
    model::{Activity, Position, Sample},
};

pub const GPX_CREATOR: &str = env!("CARGO_PKG_NAME");

const GPX_NAMESPACES: [(&str, &str); 5] = [
    ("xmlns", "http://www.topografix.com/GPX/1/1"),
    ("xmlns:gpxtpx", "http://www.garmin.com/xmlschemas/TrackPointExtension/v1"),
    ("xmlns:gpxx", "http://www.garmin.com/xmlschemas/GpxExtensions/v3"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    (
        "xsi:schemaLocation",
        "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd \
         http://www.garmin.com/xmlschemas/TrackPointExtension/v1 \
         http://www.garmin.com/xmlschemas/TrackPointExtensionv1.xsd",
    ),
];

/// Encodes the activity as a GPX 1.1 document held in memory.
pub fn encode_gpx(activity: &Activity, track_name: &str) -> Result<Vec<u8>> {
    let mut w = ByteCounter::new(Vec::with_capacity(activity.len() * 256));
    write_gpx_to_writer(&mut w, activity, track_name)?;
    debug!("GPX document for '{track_name}', {} bytes", w.bytes_written());
    Ok(w.into_inner())
}

/// Writes the activity as a single track with a single segment. Samples
/// without a fix cannot be represented in GPX and are left out.
#[time]
pub fn write_gpx_to_writer<W: Write>(w: &mut W, activity: &Activity, track_name: &str) -> Result<()> {
    write_declaration_element(w).context("Failed to write <xml...> element")?;
    write_gpx_element_open(w).context("Failed to write <gpx> element")?;
    write_metadata_element(w, activity).context("Failed to write <metadata> element")?;
    write_track(w, activity, track_name)
        .with_context(|| format!("Failed to write <trk> {:?}", track_name))?;
    write_gpx_element_close(w).context("Failed to write </gpx> element")?;

    w.flush()?;
    Ok(())
}

fn write_declaration_element<W: Write>(w: &mut W) -> Result<()> {
    writeln!(w, "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>")?;
    Ok(())
}

fn write_gpx_element_open<W: Write>(w: &mut W) -> Result<()> {
    writeln!(w, "<gpx creator=\"{}\" version=\"1.1\"", GPX_CREATOR)?;
    for (key, value) in GPX_NAMESPACES {
        writeln!(w, "  {}=\"{}\"", key, value)?;
    }
    writeln!(w, ">")?;
    Ok(())
}

fn write_gpx_element_close<W: Write>(w: &mut W) -> Result<()> {
    writeln!(w, "</gpx>")?;
    Ok(())
}

fn write_metadata_element<W: Write>(w: &mut W, activity: &Activity) -> Result<()> {
    writeln!(w, "  <metadata>")?;
    if let Some(first) = activity.samples.first() {
        let time = timestamp_to_utc(first.timestamp)?;
        writeln!(w, "    <time>{}</time>", format_utc_date(&time)?)?;
    }
    writeln!(w, "  </metadata>")?;
    Ok(())
}

fn write_track<W: Write>(w: &mut W, activity: &Activity, track_name: &str) -> Result<()> {
    writeln!(w, "  <trk>")?;
    writeln!(w, "    <name>{}</name>", escape(track_name))?;
    writeln!(w, "    <trkseg>")?;

    for s in &activity.samples {
        if let Some(pos) = &s.position {
            write_trackpoint(w, s, pos)?;
        }
    }

    writeln!(w, "    </trkseg>")?;
    writeln!(w, "  </trk>")?;
    Ok(())
}

fn write_trackpoint<W: Write>(w: &mut W, sample: &Sample, pos: &Position) -> Result<()> {
    writeln!(
        w,
        "      <trkpt lat=\"{:.6}\" lon=\"{:.6}\">",
        pos.lat, pos.lon
    )?;
    writeln!(w, "        <ele>{:.1}</ele>", pos.alt)?;

    let t = timestamp_to_utc(sample.timestamp)?;
    writeln!(w, "        <time>{}</time>", format_utc_date(&t)?)?;

    write_extensions(w, sample).context("Failed to write Garmin trackpoint extensions")?;
    writeln!(w, "      </trkpt>")?;

    Ok(())
}

fn write_extensions<W: Write>(w: &mut W, sample: &Sample) -> Result<()> {
    if sample.cadence.is_none() && sample.heart_rate.is_none() && sample.temperature.is_none() {
        return Ok(());
    }

    writeln!(w, "        <extensions>")?;
    writeln!(w, "          <gpxtpx:TrackPointExtension>")?;
    if let Some(cad) = sample.cadence {
        writeln!(w, "            <gpxtpx:cad>{:.0}</gpxtpx:cad>", cad)?;
    }
    if let Some(hr) = sample.heart_rate {
        writeln!(w, "            <gpxtpx:hr>{:.0}</gpxtpx:hr>", hr)?;
    }
    if let Some(atemp) = sample.temperature {
        writeln!(w, "            <gpxtpx:atemp>{:.2}</gpxtpx:atemp>", atemp)?;
    }
    writeln!(w, "          </gpxtpx:TrackPointExtension>")?;
    writeln!(w, "        </extensions>")?;
    Ok(())
}
