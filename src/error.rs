use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for stitch operations
#[derive(Error, Debug)]
pub enum StitchError {
    /// IO error outside of include resolution (stdin, output file)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Include target does not exist or is not a regular file
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Include target exists but could not be read as UTF-8 text
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Delimiter fragments did not form a valid regex
    #[error("Invalid directive pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Inclusion chain grew past the configured depth
    #[error("Inclusion depth limit of {depth} exceeded while including {path}")]
    DepthExceeded { path: PathBuf, depth: usize },

    /// Too many substitutions at one level, usually a pattern that regenerates itself
    #[error(
        "Replacement limit of {limit} reached; the directive pattern may be matching its own expansion"
    )]
    ReplacementLimit { limit: usize },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StitchError>;
