use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures of one export call.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no section content could be generated")]
    NoContent,

    #[error("Typst compilation failed: {0}")]
    Compile(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read report data: {0}")]
    Data(#[from] DataError),
}

/// Errors loading the company data file.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid report data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure to produce the markdown for one section. Never fatal on its own.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("no content available for section \"{0}\"")]
    Missing(String),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Upstream(String),
}

/// Failure to produce one chart image. The chart slot is dropped.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("no data for chart {0}")]
    Unavailable(String),

    #[error("cannot read chart {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("chart {key} is not valid base64: {source}")]
    Decode {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("chart {0} is not a PNG or JPEG image")]
    Format(String),
}
