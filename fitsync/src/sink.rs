use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fitsync_core::sync::{ActivitySink, EncodedActivity, OutputFormat};
use log::info;

/// Writes each output to `<dir>/<stem>.<ext>`. An output counts as already
/// synced if its file exists.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
        }
    }

    pub fn path_for(&self, stem: &str, format: OutputFormat) -> PathBuf {
        self.dir.join(format!("{stem}.{}", format.extension()))
    }
}

impl ActivitySink for DirectorySink {
    fn contains(&self, stem: &str, format: OutputFormat) -> bool {
        self.path_for(stem, format).exists()
    }

    fn accept(&mut self, stem: &str, activity: &EncodedActivity) -> Result<()> {
        let output_file = self.path_for(stem, activity.format);
        std::fs::write(&output_file, &activity.bytes)
            .with_context(|| format!("Failed to write {:?}", output_file))?;
        info!(
            "{} file {:?}, {} Kb",
            activity.format.tag().to_uppercase(),
            output_file,
            activity.bytes.len() / 1024
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_and_finds_outputs() {
        let dir = std::env::temp_dir().join(format!("fitsync-sink-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut sink = DirectorySink::new(&dir);

        let activity = EncodedActivity {
            format: OutputFormat::Gpx,
            bytes: b"<gpx/>".to_vec(),
            start_timestamp: 0,
        };

        assert!(!sink.contains("19700101000000", OutputFormat::Gpx));
        sink.accept("19700101000000", &activity).unwrap();
        assert!(sink.contains("19700101000000", OutputFormat::Gpx));
        assert!(!sink.contains("19700101000000", OutputFormat::Fit));

        let written = std::fs::read(dir.join("19700101000000.gpx")).unwrap();
        assert_eq!(written, b"<gpx/>");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
