//! Field-level helpers shared by the CSV and OFX decoders: tolerant date
//! parsing, locale-agnostic amount parsing and diacritic folding for header
//! matching.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use std::sync::LazyLock;

/// The fixed formats tried before falling back to the generic parser.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y"];

/// Amounts like "1.500,50" or "-300,00": a comma with digits on both sides
/// marks the comma as the decimal separator and dots as thousands noise.
static DECIMAL_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+,\d+").unwrap());

/// Lowercase and strip the diacritics that show up in bank export headers,
/// so "Descrição" matches the "descricao" synonym.
pub fn fold(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            _ => c,
        })
        .collect()
}

/// Parse a transaction date, trying the fixed format list first and a
/// handful of generic shapes after.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    generic_date(trimmed)
}

fn generic_date(trimmed: &str) -> Option<NaiveDate> {
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }
    for format in ["%Y/%m/%d", "%d.%m.%Y", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    None
}

/// Parse an OFX timestamp: 8-digit `YYYYMMDD` or 14-digit `YYYYMMDDHHMMSS`
/// (timezone suffixes like "[-3:BRT]" are ignored), else the generic parser.
pub fn parse_ofx_date(raw: &str) -> Option<NaiveDate> {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 14 {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&digits[..14], "%Y%m%d%H%M%S") {
            return Some(dt.date());
        }
    }
    if digits.len() >= 8 {
        if let Ok(date) = NaiveDate::parse_from_str(&digits[..8], "%Y%m%d") {
            return Some(date);
        }
    }
    parse_date(raw)
}

/// Parse a monetary amount, auto-detecting decimal-comma vs thousands-dot
/// notation, and round to 2 decimal places. Currency symbols and whitespace
/// are discarded.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '-' | ',' | '.'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    if DECIMAL_COMMA.is_match(&cleaned) {
        cleaned = cleaned.replace('.', "").replace(',', ".");
    } else {
        cleaned = cleaned.replace(',', "");
    }
    Decimal::from_str(&cleaned).ok().map(round2)
}

/// Round to 2 decimal places, away from zero on the midpoint.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The file name without directories or the final extension; the default
/// statement reference.
pub fn file_stem(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}
