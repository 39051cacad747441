use std::fmt;

use serde::{Deserialize, Serialize};

/// Which engine call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineOp {
    Launch,
    Open,
    ListSheets,
    ReadGrid,
    ReadCell,
    ExpandDetail,
    Close,
}

impl fmt::Display for EngineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Launch => write!(f, "launch"),
            Self::Open => write!(f, "open"),
            Self::ListSheets => write!(f, "list sheets"),
            Self::ReadGrid => write!(f, "read grid"),
            Self::ReadCell => write!(f, "read cell"),
            Self::ExpandDetail => write!(f, "expand detail"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// A raw failure reported by the spreadsheet engine.
///
/// `message` is kept verbatim; the classifier inspects it. `fatal` marks the
/// engine itself as gone (not just one file), which ends the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub op: EngineOp,
    pub message: String,
    pub fatal: bool,
}

impl EngineError {
    pub fn new(op: EngineOp, message: impl Into<String>) -> Self {
        Self { op, message: message.into(), fatal: false }
    }

    pub fn fatal(op: EngineOp, message: impl Into<String>) -> Self {
        Self { op, message: message.into(), fatal: true }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

#[derive(Debug)]
pub enum DrillError {
    /// TOML parse / deserialization error.
    ProfileParse(String),
    /// Profile validation error (duplicate field, empty chain, etc.).
    ProfileValidation(String),
    /// A mandatory search parameter is empty.
    MissingParameter(&'static str),
    /// A search pattern does not compile as a regular expression.
    InvalidPattern { name: &'static str, pattern: String, reason: String },
    /// Session file read/write/parse error.
    Session(String),
    /// Stored records and the profile disagree on the number of output columns.
    HeaderMismatch { stored: usize, profile: usize },
    /// The background batch thread could not be started or panicked.
    Worker(String),
}

impl fmt::Display for DrillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProfileParse(msg) => write!(f, "profile parse error: {msg}"),
            Self::ProfileValidation(msg) => write!(f, "profile validation error: {msg}"),
            Self::MissingParameter(name) => write!(f, "{name} must not be empty"),
            Self::InvalidPattern { name, pattern, reason } => {
                write!(f, "{name} '{pattern}' is not a valid regular expression: {reason}")
            }
            Self::Session(msg) => write!(f, "session error: {msg}"),
            Self::HeaderMismatch { stored, profile } => write!(
                f,
                "stored records have {stored} columns but the profile produces {profile}"
            ),
            Self::Worker(msg) => write!(f, "batch worker error: {msg}"),
        }
    }
}

impl std::error::Error for DrillError {}
