//! # Record extraction
//!
//! Turns the tables of a category document into [`StudentRecord`]s. Columns are
//! fixed: 0 is the sequence number, 1 the name, 2 an optional note. Every row of
//! every top-level table is considered, in document order, and kept only if its
//! name passes [`is_record_name`].
//!
//! The documents carry no schema marker, so header and filler rows are told
//! apart from students by that one predicate. Existing documents rely on its
//! exact behaviour, including the length cutoff.

use crate::docx::{self, DocxError};
use crate::models::{Category, StudentRecord};

/// Shortest name, in characters, that counts as a student.
///
/// Kept for compatibility with existing documents: it also drops genuine
/// three-letter names.
pub const MIN_NAME_CHARS: usize = 4;

/// Text that marks a header row wherever it appears in the name cell.
const HEADER_MARKER: &str = "NOME";

/// Whether a name cell belongs to a student row rather than a header or filler.
pub fn is_record_name(name: &str) -> bool {
    let name = name.trim();
    name.chars().count() >= MIN_NAME_CHARS && !name.to_uppercase().contains(HEADER_MARKER)
}

/// Every student row of a `.docx`, tagged with the caller's category.
pub fn extract_records(docx: &[u8], category: Category) -> Result<Vec<StudentRecord>, DocxError> {
    let document = docx::read_tables(docx)?;

    let records = document
        .tables
        .iter()
        .flat_map(|table| table.rows.iter())
        .filter_map(|row| {
            let name = row.get(1)?.trim();
            if !is_record_name(name) {
                return None;
            }
            Some(StudentRecord {
                sequence_number: row.first().map(|c| c.trim().to_string()).unwrap_or_default(),
                name: name.to_uppercase(),
                category,
                note: row.get(2).map(|c| c.trim().to_string()).unwrap_or_default(),
            })
        })
        .collect();

    Ok(records)
}

/// Records whose name contains `query`, ignoring case. A blank query matches
/// nothing.
pub fn filter_by_name<'a>(records: &'a [StudentRecord], query: &str) -> Vec<&'a StudentRecord> {
    let needle = query.trim().to_uppercase();
    if needle.is_empty() {
        return Vec::new();
    }
    records.iter().filter(|r| r.name.contains(&needle)).collect()
}
