//! Delimited-text statement decoder. Handles the delimiter and header
//! variance of real bank exports: the delimiter is sniffed from the header
//! row and column names are matched against synonym sets, case- and
//! accent-insensitively.

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, trace, warn};

use crate::error::{ParseError, Result};
use crate::text::{file_stem, fold, parse_amount, parse_date};
use crate::{NormalizedLine, ParsedStatement, StatementMeta, StatementParser};

/// Candidate delimiters, comma first; ties in the header count resolve
/// toward the earlier entry.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

const DATE_SYNONYMS: &[&str] = &[
    "data",
    "date",
    "dt",
    "data movimento",
    "data mov",
    "data lancamento",
    "fecha",
];
const DESCRIPTION_SYNONYMS: &[&str] = &[
    "descricao",
    "description",
    "historico",
    "memo",
    "lancamento",
    "detalhes",
    "narrative",
];
const AMOUNT_SYNONYMS: &[&str] = &["valor", "amount", "montante", "valor (r$)", "value"];
const BALANCE_SYNONYMS: &[&str] = &["saldo", "balance", "saldo (r$)", "running balance"];
const DOCUMENT_SYNONYMS: &[&str] = &[
    "documento",
    "doc",
    "num doc",
    "numero documento",
    "document",
    "cheque",
];

/// Decoder for CSV/TXT statement exports with a mandatory header row.
pub struct CsvParser;

/// Resolved column positions for one file.
struct ColumnMap {
    date: usize,
    description: usize,
    amount: usize,
    balance: Option<usize>,
    document: Option<usize>,
}

impl ColumnMap {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let folded: Vec<String> = headers.iter().map(fold).collect();
        let position = |synonyms: &[&str]| {
            folded
                .iter()
                .position(|cell| synonyms.contains(&cell.as_str()))
        };

        Ok(Self {
            date: position(DATE_SYNONYMS).ok_or(ParseError::MissingColumn("date"))?,
            description: position(DESCRIPTION_SYNONYMS)
                .ok_or(ParseError::MissingColumn("description"))?,
            amount: position(AMOUNT_SYNONYMS).ok_or(ParseError::MissingColumn("amount"))?,
            balance: position(BALANCE_SYNONYMS),
            document: position(DOCUMENT_SYNONYMS),
        })
    }
}

/// Pick the delimiter occurring most often in the header row.
fn detect_delimiter(header_line: &str) -> u8 {
    let mut best = DELIMITERS[0];
    let mut best_count = 0usize;
    for candidate in DELIMITERS {
        let count = header_line.bytes().filter(|b| *b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

impl StatementParser for CsvParser {
    fn supports(&self, extension: &str, mime_type: Option<&str>) -> bool {
        let extension = extension.to_lowercase();
        if matches!(extension.as_str(), "csv" | "txt") {
            return true;
        }
        matches!(
            mime_type,
            Some("text/csv") | Some("application/csv") | Some("text/plain")
        )
    }

    fn parse(&self, raw: &[u8], file_name: &str) -> Result<ParsedStatement> {
        if raw.is_empty() {
            return Err(ParseError::Empty);
        }
        let content = String::from_utf8_lossy(raw);
        let header_line = content
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or(ParseError::Empty)?;
        let delimiter = detect_delimiter(header_line);
        debug!(
            "Parsing CSV statement {:?} with delimiter {:?}",
            file_name, delimiter as char
        );

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(content.as_bytes());
        let headers = reader.headers()?.clone();
        let columns = ColumnMap::locate(&headers)?;
        let expected_fields = headers.len();

        let mut lines = Vec::new();
        let mut skipped = 0usize;
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    trace!("Skipping unreadable row: {}", err);
                    skipped += 1;
                    continue;
                }
            };
            // Short rows cannot be mapped to the header and are dropped.
            if record.len() < expected_fields {
                skipped += 1;
                continue;
            }
            let date = record.get(columns.date).and_then(parse_date);
            let amount = record.get(columns.amount).and_then(parse_amount);
            let (Some(date), Some(amount)) = (date, amount) else {
                trace!("Skipping row without a parseable date or amount");
                skipped += 1;
                continue;
            };

            let description = record
                .get(columns.description)
                .unwrap_or_default()
                .trim()
                .to_string();
            let balance = columns
                .balance
                .and_then(|idx| record.get(idx))
                .and_then(parse_amount);
            let document_number = columns
                .document
                .and_then(|idx| record.get(idx))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);

            lines.push(NormalizedLine {
                date,
                description,
                amount,
                balance,
                document_number,
                fit_id: None,
            });
        }

        if skipped > 0 {
            warn!(
                "Skipped {} unusable row(s) while parsing {:?}",
                skipped, file_name
            );
        }
        if lines.is_empty() {
            return Err(ParseError::NoUsableLines);
        }

        Ok(ParsedStatement {
            reference: file_stem(file_name),
            lines,
            meta: StatementMeta::default(),
        })
    }
}
