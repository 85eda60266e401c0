use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Every failure is fatal for the run, each kind maps to its own exit status.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("input file {} cannot be read", path.display())]
    MissingFile { path: PathBuf },

    #[error("directory {} does not exist", path.display())]
    MissingDirectory { path: PathBuf },

    #[error("malformed parameter file {}: {source}", path.display())]
    Params {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required marker token is absent from the vocabulary, or a pattern does not compile.
    #[error("configuration error: {0}")]
    Config(String),

    /// Aligned vocabulary, idf and vector inputs disagree in length.
    #[error("format error: {0}")]
    Format(String),

    #[error("{location}: cannot parse {token:?} as a number")]
    Parse { location: String, token: String },

    #[error("{location}: index {index} is outside the vocabulary (size {vocab_size})")]
    Range {
        location: String,
        index: i128,
        vocab_size: usize,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        ExtractError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Attach a `file:line` location to token level errors.
    pub fn at(self, path: &Path, line: usize) -> Self {
        let location = format!("{}:{}", path.display(), line);
        match self {
            ExtractError::Parse { token, .. } => ExtractError::Parse { location, token },
            ExtractError::Range {
                index, vocab_size, ..
            } => ExtractError::Range {
                location,
                index,
                vocab_size,
            },
            other => other,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            ExtractError::Usage(_) => 1,
            ExtractError::MissingFile { .. } => 2,
            ExtractError::MissingDirectory { .. } => 3,
            ExtractError::Params { .. } => 4,
            ExtractError::Config(_) => 5,
            ExtractError::Format(_) => 6,
            ExtractError::Parse { .. } => 7,
            ExtractError::Range { .. } => 8,
            ExtractError::Io { .. } => 9,
        }
    }
}

impl From<&ExtractError> for ExitCode {
    fn from(err: &ExtractError) -> Self {
        ExitCode::from(err.exit_code())
    }
}
