use serde::Serialize;

use crate::model::{BatchReport, FileFailure};

/// Where the orchestrator is within the current file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Opening,
    Scanning { sheet: String },
    Extracting { sheet: String },
    Done,
}

/// Notifications published by a running batch, in order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    Progress {
        done: usize,
        total: usize,
        message: String,
    },
    Phase {
        file: String,
        #[serde(flatten)]
        phase: Phase,
    },
    FileSucceeded {
        file: String,
        sheet: String,
        admitted: usize,
        duplicates: usize,
    },
    FileFailed {
        #[serde(flatten)]
        failure: FileFailure,
    },
    Finished {
        report: BatchReport,
    },
}
