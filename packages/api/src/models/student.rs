//! # Student records
//!
//! A [`StudentRecord`] is never stored on its own: it is rebuilt from a row of a
//! category document on every read. The [`Category`] comes from *which*
//! document the row was found in, not from anything written in the row.
//!
//! [`NewStudent`] is the input of an append, before validation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::records::is_record_name;

/// Sequence number written when the caller leaves it blank.
pub const DEFAULT_SEQUENCE: &str = "S/N";

/// The two student lists kept by the secretariat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Former students whose files are archived.
    Passivo,
    /// Students who completed their studies.
    Concluinte,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Passivo, Category::Concluinte];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Passivo => "Passivo",
            Category::Concluinte => "Concluinte",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub sequence_number: String,
    /// Trimmed and upper-cased.
    pub name: String,
    pub category: Category,
    pub note: String,
}

/// A row to append, as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    #[serde(default)]
    pub sequence_number: String,
    pub name: String,
    #[serde(default)]
    pub note: String,
}

impl NewStudent {
    /// Normalise and check the input. The returned row is what gets written:
    /// trimmed cells, the name as typed and [`DEFAULT_SEQUENCE`] for a blank
    /// sequence number. Upper-casing happens when records are read.
    ///
    /// A name that the extractor would skip is refused, since the row could
    /// never be found again.
    pub fn validate(&self) -> Result<NewStudent, CoreError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("name is required".to_string()));
        }
        if !is_record_name(name) {
            return Err(CoreError::Validation(format!(
                "\"{name}\" would not be listed as a student; use the full name"
            )));
        }

        let sequence = self.sequence_number.trim();
        Ok(NewStudent {
            sequence_number: if sequence.is_empty() {
                DEFAULT_SEQUENCE.to_string()
            } else {
                sequence.to_string()
            },
            name: name.to_string(),
            note: self.note.trim().to_string(),
        })
    }
}
