use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Bad magic, unsupported version or data type, unknown record count.
    #[error("Invalid file format: {0}")]
    Format(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Sample range [{first}, {last}] is outside of the {samples} recorded samples")]
    OutOfRange { first: u64, last: u64, samples: u64 },

    #[error("Channel index {0} out of range")]
    InvalidChannelIndex(usize),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File is discontinuous")]
    DiscontinuousFile,
}

impl SigError {
    pub fn format<S: Into<String>>(s: S) -> Self {
        Self::Format(s.into())
    }

    pub fn invalid_argument<S: Into<String>>(s: S) -> Self {
        Self::InvalidArgument(s.into())
    }
}

pub type Result<T> = std::result::Result<T, SigError>;
