use thiserror::Error;

/// Error types for statement decoding.
///
/// A ParseError always aborts the whole file; individually malformed rows
/// are recovered by skipping and only surface here as `NoUsableLines` when
/// nothing survived.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty file")]
    Empty,

    #[error("unsupported statement format: {0}")]
    Unsupported(String),

    /// The CSV header has no recognizable column for a mandatory field.
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("no usable transactions in file")]
    NoUsableLines,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("malformed content: {0}")]
    Malformed(String),
}

/// Type alias for Result with ParseError
pub type Result<T> = std::result::Result<T, ParseError>;
