//! Session-wide deduplication state.
//!
//! The identity map and the admitted records only change together: `admit`
//! appends to both, `Session::reset` clears both.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DrillError;
use crate::model::{Admission, IdentityKey, Record};

/// Identity key → file that first produced it, plus the admitted records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "LedgerSnapshot", into = "LedgerSnapshot")]
pub struct Ledger {
    owners: HashMap<IdentityKey, String>,
    records: Vec<Record>,
}

impl Ledger {
    /// Admit a record unless its identity key was already seen.
    pub fn admit(&mut self, record: Record) -> Admission {
        let key = record.key();
        if let Some(first) = self.owners.get(&key) {
            log::info!(
                "duplicate {} / {} in {} (first seen in {})",
                key.identifier,
                key.type_code,
                record.source_file,
                first
            );
            return Admission::Duplicate { first_seen_in: first.clone() };
        }
        self.owners.insert(key, record.source_file.clone());
        self.records.push(record);
        Admission::Accepted
    }

    pub fn owner_of(&self, key: &IdentityKey) -> Option<&str> {
        self.owners.get(key).map(String::as_str)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// On-disk form. Owners are rebuilt from records, which carry their source.
#[derive(Serialize, Deserialize)]
struct LedgerSnapshot {
    records: Vec<Record>,
}

impl From<LedgerSnapshot> for Ledger {
    fn from(snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Ledger::default();
        for record in snapshot.records {
            ledger.admit(record);
        }
        ledger
    }
}

impl From<Ledger> for LedgerSnapshot {
    fn from(ledger: Ledger) -> Self {
        Self { records: ledger.records }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State that outlives a single batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub version: u32,
    /// Output header row the stored records were extracted under.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    headers: Vec<String>,
    ledger: Ledger,
}

pub const SESSION_VERSION: u32 = 1;

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self { version: SESSION_VERSION, headers: Vec::new(), ledger: Ledger::default() }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Tie the session to an output header row.
    ///
    /// An empty session takes `headers` as is. A session holding records only
    /// accepts a row of the same width as those records.
    pub fn bind_headers(&mut self, headers: Vec<String>) -> Result<(), DrillError> {
        if let Some(width) = self.records().first().map(|r| r.to_row().len()) {
            if width != headers.len() {
                return Err(DrillError::HeaderMismatch { stored: width, profile: headers.len() });
            }
            if !self.headers.is_empty() {
                return Ok(());
            }
        }
        self.headers = headers;
        Ok(())
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn admit(&mut self, record: Record) -> Admission {
        self.ledger.admit(record)
    }

    pub fn records(&self) -> &[Record] {
        self.ledger.records()
    }

    /// Forget every identity and every admitted record.
    pub fn reset(&mut self) {
        self.headers.clear();
        self.ledger = Ledger::default();
    }

    /// Load a session file; a missing file is a fresh session.
    pub fn load(path: &Path) -> Result<Self, DrillError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let json = fs::read_to_string(path)
            .map_err(|e| DrillError::Session(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| DrillError::Session(format!("cannot parse {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), DrillError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DrillError::Session(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| DrillError::Session(e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| DrillError::Session(format!("cannot write {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, code: &str, desc: &str, file: &str) -> Record {
        Record {
            identifier: id.into(),
            type_code: code.into(),
            description: desc.into(),
            date: String::new(),
            fields: vec![],
            source_file: file.into(),
        }
    }

    #[test]
    fn second_admission_of_same_key_is_rejected() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.admit(rec("1", "8204", "a", "jan.xlsx")), Admission::Accepted);
        assert_eq!(
            ledger.admit(rec("1", "8204", "different", "feb.xlsx")),
            Admission::Duplicate { first_seen_in: "jan.xlsx".into() }
        );
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.records()[0].description, "a");
    }

    #[test]
    fn key_is_identifier_and_type_code() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.admit(rec("1", "8204", "", "a")), Admission::Accepted);
        assert_eq!(ledger.admit(rec("1", "8205", "", "a")), Admission::Accepted);
        assert_eq!(ledger.admit(rec("2", "8204", "", "a")), Admission::Accepted);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn reset_clears_identities_and_records_together() {
        let mut session = Session::new();
        session.admit(rec("1", "8204", "", "a"));
        session.reset();
        assert!(session.records().is_empty());
        assert_eq!(session.admit(rec("1", "8204", "", "b")), Admission::Accepted);
        assert_eq!(session.ledger().owner_of(&rec("1", "8204", "", "").key()), Some("b"));
    }

    #[test]
    fn session_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");

        let mut session = Session::new();
        session.admit(rec("1", "8204", "x", "jan.xlsx"));
        session.save(&path).unwrap();

        let mut loaded = Session::load(&path).unwrap();
        assert_eq!(loaded, session);
        assert_eq!(
            loaded.admit(rec("1", "8204", "y", "mar.xlsx")),
            Admission::Duplicate { first_seen_in: "jan.xlsx".into() }
        );
    }

    #[test]
    fn missing_session_file_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::load(&dir.path().join("nope.json")).unwrap();
        assert!(session.records().is_empty());
    }

    #[test]
    fn default_session_carries_current_version() {
        assert_eq!(Session::default(), Session::new());
        let loaded: Session = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded.version, SESSION_VERSION);
    }

    #[test]
    fn headers_bind_once_records_exist() {
        let mut session = Session::new();
        session.bind_headers(vec!["a".into(); 5]).unwrap();
        session.admit(rec("1", "8204", "", "a"));

        session.bind_headers(vec!["b".into(); 5]).unwrap();
        assert_eq!(session.headers(), vec!["a".to_string(); 5]);

        let err = session.bind_headers(vec!["c".into(); 6]).unwrap_err();
        assert!(err.to_string().contains("have 5 columns but the profile produces 6"));

        session.reset();
        assert!(session.headers().is_empty());
        session.bind_headers(vec!["c".into(); 6]).unwrap();
    }
}
