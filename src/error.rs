use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MapError>;

#[derive(Debug, Error)]
pub enum MapError {
    /// Malformed or missing fields in the location list, or an invalid
    /// connection / scope.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("could not place the following location on the map: {common_name}")]
    LocationNotFound { common_name: String },

    #[error("missing {kind} file: {}", path.display())]
    MissingResource { kind: &'static str, path: PathBuf },

    /// Non-fatal. Logged as a warning and the render proceeds.
    #[error("scope `{scope}` matches no {what}")]
    EmptySelection { scope: String, what: &'static str },

    #[error("malformed dataset {}: {reason}", path.display())]
    Dataset { path: PathBuf, reason: String },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MapError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MapError::Io { path: path.into(), source }
    }

    pub fn dataset(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        MapError::Dataset { path: path.into(), reason: reason.to_string() }
    }
}
