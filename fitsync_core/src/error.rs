use thiserror::Error;

/// Everything that can go wrong while turning one raw track into encoded
/// output. Errors are local to a single track; a batch carries on with the
/// next one.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The raw data could not be turned into an activity at all.
    #[error("malformed track: {0}")]
    Malformed(String),

    /// The track survived assembly but a fixup stage left nothing usable.
    /// Callers should not upload anything for it.
    #[error("degenerate track: {0}")]
    Degenerate(String),

    /// A message, field or enumeration symbol is missing from the FIT
    /// profile. This is a configuration mismatch, not a data problem.
    #[error("unknown FIT {kind} '{name}'")]
    Schema { kind: &'static str, name: String },

    /// The track was screened out (too short, too old...).
    #[error("track skipped: {0}")]
    Skipped(String),
}

impl SyncError {
    pub(crate) fn schema<S: Into<String>>(kind: &'static str, name: S) -> Self {
        Self::Schema {
            kind,
            name: name.into(),
        }
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
