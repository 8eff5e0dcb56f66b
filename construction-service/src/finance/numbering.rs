use crate::models::DocumentType;
use chrono::{Datelike, Utc};

/// `{PREFIX}-{year}-{sequence:03}`
pub fn format_document_number(prefix: &str, year: i32, sequence: i64) -> String {
    format!("{}-{}-{:03}", prefix, year, sequence)
}

/// Number for the next document of `document_type` in the current UTC year.
///
/// Persistence allocates `existing_count` atomically from `document_sequences`.
pub fn generate_document_number(document_type: DocumentType, existing_count: i64) -> String {
    format_document_number(
        document_type.prefix(),
        Utc::now().year(),
        existing_count + 1,
    )
}

/// Split a `{PREFIX}-{year}-{sequence}` number into its parts.
///
/// Only known prefixes and all-digit years and sequences are recognised.
pub fn parse_document_number(number: &str) -> Option<(&'static str, i32, i64)> {
    let mut parts = number.splitn(3, '-');
    let prefix = match parts.next()? {
        "EST" => DocumentType::Estimate.prefix(),
        "INV" => DocumentType::Invoice.prefix(),
        "CO" => DocumentType::ChangeOrder.prefix(),
        _ => return None,
    };
    let year = parts.next().filter(|p| all_digits(p))?.parse().ok()?;
    let sequence = parts.next().filter(|p| all_digits(p))?.parse().ok()?;
    Some((prefix, year, sequence))
}

fn all_digits(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}
