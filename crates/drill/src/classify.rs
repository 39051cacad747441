//! Map raw engine failure messages onto readable, stable categories.
//!
//! Purely string based: the engine gives us no structured error codes, only
//! whatever text the automation layer produced.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::EngineError;

pub const NOT_EXPANDABLE: &str =
    "drill-down failed: cell is not part of a pivot table or the sheet is locked";
pub const COMMUNICATION: &str = "engine communication error (COM error)";

/// Category of an engine failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineFault {
    /// The target cell refused the expand-detail request.
    NotExpandable,
    /// The host application reported an error with a description.
    Application(String),
    /// Automation-level failure without a usable description.
    Communication,
    /// Anything unrecognized; the raw message is kept.
    Other(String),
}

impl EngineFault {
    pub fn message(&self) -> String {
        match self {
            Self::NotExpandable => NOT_EXPANDABLE.to_string(),
            Self::Application(desc) => format!("excel error: {desc}"),
            Self::Communication => COMMUNICATION.to_string(),
            Self::Other(raw) => raw.clone(),
        }
    }
}

impl std::fmt::Display for EngineFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

fn app_description() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Microsoft Excel', '(.*?)',").expect("static pattern compiles")
    })
}

/// Classify a raw engine message.
pub fn classify_message(raw: &str) -> EngineFault {
    if raw.contains("ShowDetail") {
        return EngineFault::NotExpandable;
    }
    if raw.contains("Exception occurred") || raw.contains("-2147") {
        if let Some(caps) = app_description().captures(raw) {
            let desc = caps[1].to_string();
            if desc.contains("ShowDetail") {
                return EngineFault::NotExpandable;
            }
            return EngineFault::Application(desc);
        }
        return EngineFault::Communication;
    }
    EngineFault::Other(raw.to_string())
}

pub fn classify(err: &EngineError) -> EngineFault {
    classify_message(&err.message)
}
