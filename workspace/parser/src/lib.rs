//! Statement decoding: turns raw uploaded bank files (CSV, OFX/QFX) into a
//! normalized sequence of transaction lines plus whatever statement-level
//! metadata the file declares. This crate is pure: no database, no I/O
//! beyond the byte slice it is handed.

pub mod error;
pub mod formats;
mod text;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

pub use crate::error::{ParseError, Result};
pub use crate::formats::{CsvParser, OfxParser};
pub use crate::text::{file_stem, round2};

/// One normalized transaction row, independent of the source format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    pub date: NaiveDate,
    pub description: String,
    /// Signed movement amount, rounded to 2 decimal places.
    pub amount: Decimal,
    /// Running balance after the movement, when the file provides one.
    pub balance: Option<Decimal>,
    pub document_number: Option<String>,
    /// External transaction identifier (OFX FITID).
    pub fit_id: Option<String>,
}

/// Statement-level metadata extracted opportunistically; every field is
/// optional and omitted when the file does not declare it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementMeta {
    pub opening_balance: Option<Decimal>,
    pub closing_balance: Option<Decimal>,
    pub closing_balance_date: Option<NaiveDate>,
    pub account_number: Option<String>,
    pub bank_id: Option<String>,
    pub range_start: Option<NaiveDate>,
    pub range_end: Option<NaiveDate>,
}

/// A fully decoded statement file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    /// Human label for the statement, defaulting to the file name stem.
    pub reference: String,
    /// Normalized lines in original file order.
    pub lines: Vec<NormalizedLine>,
    pub meta: StatementMeta,
}

/// A format-specific statement decoder.
pub trait StatementParser: Send + Sync {
    /// Whether this parser handles the given file extension / MIME type.
    fn supports(&self, extension: &str, mime_type: Option<&str>) -> bool;

    /// Decode the raw bytes. Fails when the content is empty, not this
    /// format, or yields zero usable transactions.
    fn parse(&self, raw: &[u8], file_name: &str) -> Result<ParsedStatement>;
}

/// The parser selector: an ordered, explicit list of decoders. Order
/// matters on ambiguous uploads, so registration is configuration, not
/// discovery.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn StatementParser>>,
}

impl ParserRegistry {
    /// An empty registry; parsers are tried in registration order.
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// The default configuration: CSV before OFX.
    pub fn with_default_parsers() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CsvParser));
        registry.register(Box::new(OfxParser));
        registry
    }

    pub fn register(&mut self, parser: Box<dyn StatementParser>) {
        self.parsers.push(parser);
    }

    /// The first registered parser that supports the upload.
    pub fn find(&self, extension: &str, mime_type: Option<&str>) -> Option<&dyn StatementParser> {
        let found = self
            .parsers
            .iter()
            .find(|p| p.supports(extension, mime_type))
            .map(|p| p.as_ref());
        debug!(
            "Parser lookup for extension={:?} mime={:?}: {}",
            extension,
            mime_type,
            if found.is_some() { "hit" } else { "miss" }
        );
        found
    }

    /// Like [`find`](Self::find), but failing with the error the import
    /// pipeline propagates.
    pub fn select(&self, extension: &str, mime_type: Option<&str>) -> Result<&dyn StatementParser> {
        self.find(extension, mime_type).ok_or_else(|| {
            ParseError::Unsupported(format!(
                "no parser for extension {:?} (mime {:?})",
                extension, mime_type
            ))
        })
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_default_parsers()
    }
}
