use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by a poll cycle. Config loading stays on `anyhow`.
#[derive(Error, Debug)]
pub enum Error {
    /// The gateway could not be reached or the request did not complete.
    #[error("could not reach gateway at {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The gateway answered with a non-success status.
    #[error("gateway at {endpoint} returned {status}")]
    HttpStatus {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    /// The response body is not well-formed XML.
    #[error("malformed gateway response: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("sensor element #{element} is missing attribute `{attribute}`")]
    MissingAttribute {
        element: usize,
        attribute: &'static str,
    },

    #[error("sensor element #{element} has non-numeric `{attribute}`: {value:?}")]
    InvalidNumber {
        element: usize,
        attribute: &'static str,
        value: String,
    },

    /// A file name did not match the current month's output pattern.
    #[error("file name {file_name:?} does not match the current output pattern")]
    Naming { file_name: String },

    /// Refused to initialize over an existing file.
    #[error("output file {} already exists", path.display())]
    FileConflict { path: PathBuf },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            Self::Xml(_) | Self::MissingAttribute { .. } | Self::InvalidNumber { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            _ if self.is_network() => "network",
            _ if self.is_parse() => "parse",
            Self::Naming { .. } => "naming",
            Self::FileConflict { .. } => "file_conflict",
            _ => "io",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
