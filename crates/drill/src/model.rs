use recap_core::Grid;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Detail table
// ---------------------------------------------------------------------------

/// Grid produced by a drill-down. Row 0 is the header.
#[derive(Debug, Clone)]
pub struct DetailTable {
    pub sheet_name: String,
    pub grid: Grid,
}

impl DetailTable {
    pub fn header(&self) -> Vec<String> {
        self.grid.normalized_row(0)
    }

    pub fn data_rows(&self) -> usize {
        self.grid.height().saturating_sub(1)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Identity of a record across the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub identifier: String,
    pub type_code: String,
}

/// One extracted detail row, every field already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub identifier: String,
    pub type_code: String,
    pub description: String,
    pub date: String,
    /// Dynamically resolved fields, in profile order. Empty when unresolved.
    pub fields: Vec<String>,
    pub source_file: String,
}

impl Record {
    pub fn key(&self) -> IdentityKey {
        IdentityKey {
            identifier: self.identifier.clone(),
            type_code: self.type_code.clone(),
        }
    }

    /// Flat row in output column order.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(5 + self.fields.len());
        row.push(self.identifier.clone());
        row.push(self.type_code.clone());
        row.push(self.description.clone());
        row.push(self.date.clone());
        row.extend(self.fields.iter().cloned());
        row.push(self.source_file.clone());
        row
    }
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Duplicate { first_seen_in: String },
}

// ---------------------------------------------------------------------------
// Failures + report
// ---------------------------------------------------------------------------

/// File name used for failures that are not tied to a single file.
pub const SYSTEM_FILE: &str = "SYSTEM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AnchorsNotFound,
    DrillDownRejected,
    EngineInteractionFailure,
    SystemFailure,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnchorsNotFound => write!(f, "anchors_not_found"),
            Self::DrillDownRejected => write!(f, "drill_down_rejected"),
            Self::EngineInteractionFailure => write!(f, "engine_interaction_failure"),
            Self::SystemFailure => write!(f, "system_failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one batch. Records themselves live in the session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files_total: usize,
    pub files_succeeded: usize,
    pub records_admitted: usize,
    pub duplicates_rejected: usize,
    pub failures: Vec<FileFailure>,
    /// True when a system failure ended the batch.
    pub aborted: bool,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
