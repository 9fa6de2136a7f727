//! OFX/QFX statement decoder. Real-world OFX is frequently SGML with
//! unclosed single-line value tags; the decoder first rewrites those into
//! well-formed pairs and escapes bare ampersands, then walks the XML with
//! quick-xml. Both the bank (`STMTTRN`) and credit-card (`CCSTMTTRN`)
//! transaction paths are read; the first non-empty list wins.

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace, warn};

use crate::error::{ParseError, Result};
use crate::text::{file_stem, parse_amount, parse_ofx_date};
use crate::{NormalizedLine, ParsedStatement, StatementMeta, StatementParser};

/// Start of the OFX payload; everything before it (the key/value header
/// block) is discarded.
static OFX_ROOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<OFX>").unwrap());

/// A value tag opened on its own line and never closed:
/// `<TRNAMT>-300.00` becomes `<TRNAMT>-300.00</TRNAMT>`.
static UNCLOSED_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)<([A-Za-z0-9_.]+)>([^<\r\n]+?)[ \t]*\r?$").unwrap());

/// An ampersand that does not begin a recognized entity.
static BARE_AMPERSAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(amp;|lt;|gt;|quot;|apos;|#\d+;)?").unwrap());

/// Decoder for OFX and QFX statement files.
pub struct OfxParser;

/// Accumulates the child values of one STMTTRN/CCSTMTTRN node.
#[derive(Default)]
struct TxnFields {
    amount: Option<String>,
    memo: Option<String>,
    name: Option<String>,
    posted: Option<String>,
    user_date: Option<String>,
    fit_id: Option<String>,
    check_number: Option<String>,
}

impl TxnFields {
    /// Normalize into a line; `None` when the date or amount does not
    /// resolve, in which case the transaction is skipped.
    fn into_line(self) -> Option<NormalizedLine> {
        let date = self
            .posted
            .as_deref()
            .and_then(parse_ofx_date)
            .or_else(|| self.user_date.as_deref().and_then(parse_ofx_date))?;
        let amount = self.amount.as_deref().and_then(parse_amount)?;
        let description = self
            .memo
            .or(self.name)
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        Some(NormalizedLine {
            date,
            description,
            amount,
            balance: None,
            document_number: self.check_number,
            fit_id: self.fit_id,
        })
    }
}

/// Repair SGML-style OFX into parseable XML.
fn normalize_sgml(raw: &str) -> Result<String> {
    let root = OFX_ROOT
        .find(raw)
        .ok_or_else(|| ParseError::Malformed("missing <OFX> root element".to_string()))?;
    let body = &raw[root.start()..];
    let escaped = BARE_AMPERSAND.replace_all(body, |caps: &regex::Captures<'_>| {
        match caps.get(1) {
            Some(entity) => format!("&{}", entity.as_str()),
            None => "&amp;".to_string(),
        }
    });
    Ok(UNCLOSED_TAG.replace_all(&escaped, "<$1>$2</$1>").into_owned())
}

fn parent_is(stack: &[String], name: &str) -> bool {
    stack.len() >= 2 && stack[stack.len() - 2] == name
}

impl StatementParser for OfxParser {
    fn supports(&self, extension: &str, mime_type: Option<&str>) -> bool {
        let extension = extension.to_lowercase();
        if matches!(extension.as_str(), "ofx" | "qfx") {
            return true;
        }
        matches!(
            mime_type,
            Some("application/x-ofx") | Some("application/ofx")
        )
    }

    fn parse(&self, raw: &[u8], file_name: &str) -> Result<ParsedStatement> {
        if raw.is_empty() {
            return Err(ParseError::Empty);
        }
        let content = String::from_utf8_lossy(raw);
        let normalized = normalize_sgml(&content)?;
        debug!("Parsing OFX statement {:?}", file_name);

        let mut reader = Reader::from_str(&normalized);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<String> = Vec::new();
        let mut bank_lines: Vec<NormalizedLine> = Vec::new();
        let mut card_lines: Vec<NormalizedLine> = Vec::new();
        let mut current: Option<TxnFields> = None;
        let mut meta = StatementMeta::default();
        let mut transaction_uid: Option<String> = None;
        let mut skipped = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).to_uppercase();
                    if matches!(name.as_str(), "STMTTRN" | "CCSTMTTRN") {
                        current = Some(TxnFields::default());
                    }
                    stack.push(name);
                }
                Ok(Event::End(_)) => {
                    let Some(name) = stack.pop() else { continue };
                    if matches!(name.as_str(), "STMTTRN" | "CCSTMTTRN") {
                        if let Some(fields) = current.take() {
                            match fields.into_line() {
                                Some(line) if name == "STMTTRN" => bank_lines.push(line),
                                Some(line) => card_lines.push(line),
                                None => {
                                    trace!("Skipping transaction without date or amount");
                                    skipped += 1;
                                }
                            }
                        }
                    }
                }
                Ok(Event::Text(text)) => {
                    let value = text
                        .unescape()
                        .map_err(|err| ParseError::Xml(err.to_string()))?
                        .trim()
                        .to_string();
                    if value.is_empty() {
                        continue;
                    }
                    let Some(tag) = stack.last().map(String::as_str) else {
                        continue;
                    };
                    if let Some(fields) = current.as_mut() {
                        match tag {
                            "TRNAMT" => fields.amount = Some(value),
                            "MEMO" => fields.memo = Some(value),
                            "NAME" => fields.name = Some(value),
                            "DTPOSTED" => fields.posted = Some(value),
                            "DTUSER" => fields.user_date = Some(value),
                            "FITID" => fields.fit_id = Some(value),
                            "CHECKNUM" => fields.check_number = Some(value),
                            _ => {}
                        }
                    } else {
                        match tag {
                            "TRNUID" => transaction_uid = Some(value),
                            "ACCTID" => meta.account_number = Some(value),
                            "BANKID" => meta.bank_id = Some(value),
                            "DTSTART" if parent_is(&stack, "BANKTRANLIST") => {
                                meta.range_start = parse_ofx_date(&value);
                            }
                            "DTEND" if parent_is(&stack, "BANKTRANLIST") => {
                                meta.range_end = parse_ofx_date(&value);
                            }
                            "BALAMT" if parent_is(&stack, "LEDGERBAL") => {
                                meta.closing_balance = parse_amount(&value);
                            }
                            "DTASOF" if parent_is(&stack, "LEDGERBAL") => {
                                meta.closing_balance_date = parse_ofx_date(&value);
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(ParseError::Xml(err.to_string())),
            }
        }

        if skipped > 0 {
            warn!(
                "Skipped {} unusable transaction(s) while parsing {:?}",
                skipped, file_name
            );
        }

        // Bank statement path first, credit-card path as the fallback.
        let lines = if !bank_lines.is_empty() {
            bank_lines
        } else {
            card_lines
        };
        if lines.is_empty() {
            return Err(ParseError::NoUsableLines);
        }

        let reference = transaction_uid.unwrap_or_else(|| file_stem(file_name));
        Ok(ParsedStatement {
            reference,
            lines,
            meta,
        })
    }
}
