use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use args::{parse_args, Args};
use clap::builder::styling::AnsiColor;
use env_logger::Builder;
use fitsync_core::{
    fit::Profile,
    read::read_history_from_file,
    sync::{sync_history, SyncReport},
};
use log::{debug, error, info, warn};
use logging_timer::time;
use rayon::prelude::*;
use sink::DirectorySink;
use time::OffsetDateTime;

mod args;
mod sink;

pub const PROGRAM_NAME: &str = env!("CARGO_PKG_NAME");

#[time]
fn main() -> Result<()> {
    configure_logging();
    info!("Starting {PROGRAM_NAME}");

    let args = parse_args();
    debug!("{:?}", &args);
    if args.force {
        info!("'--force' specified, all existing output files will be overwritten");
    }

    let input_files = args.files();
    if input_files.is_empty() {
        warn!("No .xml history dumps specified, exiting");
        return Ok(());
    }

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", args.output_dir))?;

    let profile = Profile::new();
    let now = OffsetDateTime::now_utc().unix_timestamp();

    // Each dump is independent, so they are processed in parallel. Outputs
    // are named by start time so two dumps cannot write the same file
    // unless they contain the same ride.
    let results: Vec<(&Path, Result<SyncReport>)> = input_files
        .par_iter()
        .map(|f| (f.as_path(), process_file(f, &args, &profile, now)))
        .collect();

    let mut failed_files = 0;
    let mut totals = (0, 0, 0);
    for (f, result) in results {
        match result {
            Ok(report) => {
                totals.0 += report.encoded();
                totals.1 += report.not_synced();
                totals.2 += report.failed();
            }
            Err(e) => {
                error!("{:?}: {e:#}", f);
                failed_files += 1;
            }
        }
    }

    info!(
        "Finished: {} tracks synced, {} not needed, {} failed",
        totals.0, totals.1, totals.2
    );

    if failed_files > 0 {
        bail!("{failed_files} of {} history dumps could not be read", input_files.len());
    }

    Ok(())
}

fn process_file(input_file: &Path, args: &Args, profile: &Profile, now: i64) -> Result<SyncReport> {
    let history = read_history_from_file(input_file)?;
    let mut sink = DirectorySink::new(&args.output_dir);

    Ok(sync_history(
        &history,
        &args.sync_config(),
        profile,
        now,
        &args.output_formats(),
        &mut sink,
        args.force,
    ))
}

fn configure_logging() {
    let mut builder = Builder::from_default_env();

    builder.format(|buf, record| {
        let level_style = buf.default_level_style(record.level());
        let level_style = match record.level() {
            log::Level::Error => level_style.fg_color(Some(AnsiColor::Red.into())),
            log::Level::Warn => level_style.fg_color(Some(AnsiColor::Yellow.into())),
            log::Level::Info => level_style.fg_color(Some(AnsiColor::Green.into())),
            log::Level::Debug => level_style.fg_color(Some(AnsiColor::Blue.into())),
            log::Level::Trace => level_style.fg_color(Some(AnsiColor::Magenta.into())),
        };

        let line_number_style = buf
            .default_level_style(record.level())
            .fg_color(Some(AnsiColor::Cyan.into()));

        match (record.file(), record.line()) {
            (Some(file), Some(line)) => writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}/{line_number_style}{}{line_number_style:#}] {}",
                buf.timestamp(),
                record.level(),
                file,
                line,
                record.args()
            ),
            (Some(file), None) => writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}] {}",
                buf.timestamp(),
                record.level(),
                file,
                record.args()
            ),
            (None, _) => writeln!(
                buf,
                "[{} {level_style}{}{level_style:#}] {}",
                buf.timestamp(),
                record.level(),
                record.args()
            ),
        }
    });

    builder.init();
}
