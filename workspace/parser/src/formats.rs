//! The format-specific decoders. Each submodule implements
//! [`StatementParser`](crate::StatementParser) for one family of bank
//! export formats.

pub mod csv;
pub mod ofx;

pub use csv::CsvParser;
pub use ofx::OfxParser;
