use std::path::{Path, PathBuf};

use clap::{arg, command, value_parser, Parser, ValueEnum};
use fitsync_core::{config::SyncConfig, sync::OutputFormat};

/*
 fitsync [--force] [--output-dir DIR] [--format fit --format gpx] \
   [--min-distance KM] [--min-time SECS] [--min-speed KMH] \
   [--move-distance METRES] [--update-period SECS] [--oldest DAYS] \
   FILES

 FILES are history dumps, one per device download.
*/

/// Returns the parsed command line options. Uses the 'wild' crate to do glob
/// expansion on Windows. so that Windows and Linux behave identically.
pub fn parse_args() -> Args {
    Args::parse_from(wild::args())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Fit,
    Gpx,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Fit => OutputFormat::Fit,
            FormatArg::Gpx => OutputFormat::Gpx,
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(
        short,
        long,
        default_value = "false",
        help = "Write output files even if they already exist"
    )]
    pub force: bool,

    #[arg(
        short,
        long,
        default_value = ".",
        help = "Directory to write the .fit and .gpx files to"
    )]
    pub output_dir: PathBuf,

    #[arg(
        long = "format",
        value_enum,
        default_values_t = [FormatArg::Fit, FormatArg::Gpx],
        help = "Output format, may be given more than once"
    )]
    pub formats: Vec<FormatArg>,

    #[arg(
        long,
        default_value = "5.0",
        help = "Rides shorter than this, in km, are not synced"
    )]
    pub min_distance: f64,

    #[arg(
        long,
        default_value = "600",
        help = "Rides shorter than this, in seconds, are not synced"
    )]
    pub min_time: i64,

    #[arg(
        long,
        default_value = "2.0",
        help = "The speed, in km/h, you must exceed to be considered riding. \
                Dead time at the start and end of a ride is cropped."
    )]
    pub min_speed: f64,

    #[arg(
        long,
        default_value = "100.0",
        help = "A ride that never strays this many metres from its first fix \
                is treated as an indoor trainer ride and left as recorded"
    )]
    pub move_distance: f64,

    #[arg(
        long,
        default_value = "1",
        help = "Spacing, in seconds, of the resampled track",
        value_parser = value_parser!(u32).range(1..)
    )]
    pub update_period: u32,

    #[arg(
        long,
        default_value = "30",
        help = "Rides that started more than this many days ago are ignored"
    )]
    pub oldest: u32,

    #[arg(help = "List of history dumps to process. Any file that does not have an 'xml' extension will be ignored.")]
    pub files: Vec<PathBuf>,
}

impl Args {
    /// Returns the input files, with anything that is not an xml file
    /// filtered out.
    pub fn files(&self) -> Vec<PathBuf> {
        self.files.iter().filter(|f| is_xml_file(f)).cloned().collect()
    }

    pub fn output_formats(&self) -> Vec<OutputFormat> {
        let mut formats: Vec<OutputFormat> = self.formats.iter().map(|&f| f.into()).collect();
        formats.sort();
        formats.dedup();
        formats
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            min_distance: self.min_distance,
            min_time: self.min_time,
            min_speed: self.min_speed,
            move_distance: self.move_distance,
            update_period: self.update_period,
            oldest: self.oldest,
        }
    }
}

fn is_xml_file<P: AsRef<Path>>(p: P) -> bool {
    p.as_ref()
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("fitsync").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_match_the_library() {
        let args = parse(&["a.xml"]).unwrap();
        assert_eq!(args.sync_config(), SyncConfig::default());
        assert_eq!(args.output_formats(), vec![OutputFormat::Fit, OutputFormat::Gpx]);
        assert!(!args.force);
    }

    #[test]
    fn explicit_options() {
        let args = parse(&[
            "--force",
            "--format",
            "gpx",
            "--update-period",
            "5",
            "--min-speed",
            "3.5",
            "-o",
            "out",
            "a.xml",
            "b.XML",
            "notes.txt",
        ])
        .unwrap();

        assert!(args.force);
        assert_eq!(args.output_formats(), vec![OutputFormat::Gpx]);
        assert_eq!(args.sync_config().update_period, 5);
        assert_eq!(args.sync_config().min_speed, 3.5);
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert_eq!(args.files(), vec![PathBuf::from("a.xml"), PathBuf::from("b.XML")]);
    }

    #[test]
    fn zero_update_period_is_rejected() {
        assert!(parse(&["--update-period", "0", "a.xml"]).is_err());
    }
}
