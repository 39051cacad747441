use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::DrillError;
use crate::extract::ColumnLayout;
use crate::schema::FieldChain;

pub const DEFAULT_ROW_PATTERN: &str = "bandar.*lampung";
pub const DEFAULT_COL_KEYWORD: &str = "Grand Total";
pub const DEFAULT_CODE_FILTER: &str = "8204";
/// Last zero-based column of an xlsx sheet (XFD).
pub const MAX_COLUMN: usize = 16_383;

// ---------------------------------------------------------------------------
// Top-level profile
// ---------------------------------------------------------------------------

/// Everything about a report family that is not a per-run search parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    /// Sheet names never scanned (compared trimmed, case-insensitively).
    pub blacklist: Vec<String>,
    pub search: SearchDefaults,
    pub layout: ColumnLayout,
    pub fields: Vec<FieldConfig>,
    pub output: OutputLabels,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "default".into(),
            blacklist: vec!["TABEL".into(), "TABLE".into(), "SHEET1".into()],
            search: SearchDefaults::default(),
            layout: ColumnLayout::default(),
            fields: vec![FieldConfig {
                name: "Unit".into(),
                candidates: vec![
                    "Primary Unit Name".into(),
                    "Operational Unit Name".into(),
                    "Operational Unit Code".into(),
                ],
                fallback_column: None,
            }],
            output: OutputLabels::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub row_pattern: String,
    pub col_keyword: String,
    pub code_filter: String,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            row_pattern: DEFAULT_ROW_PATTERN.into(),
            col_keyword: DEFAULT_COL_KEYWORD.into(),
            code_filter: DEFAULT_CODE_FILTER.into(),
        }
    }
}

/// A dynamically located detail column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    /// Header spellings in priority order.
    #[serde(default)]
    pub candidates: Vec<String>,
    /// Column used when no candidate is in the header.
    #[serde(default)]
    pub fallback_column: Option<usize>,
}

impl FieldConfig {
    pub fn chain(&self) -> FieldChain {
        let candidates: Vec<&str> = self.candidates.iter().map(String::as_str).collect();
        let chain = FieldChain::new(&self.name, &candidates);
        match self.fallback_column {
            Some(col) => chain.with_fallback_column(col),
            None => chain,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLabels {
    pub identifier: String,
    pub type_code: String,
    pub description: String,
    pub date: String,
    pub source: String,
}

impl Default for OutputLabels {
    fn default() -> Self {
        Self {
            identifier: "Case No".into(),
            type_code: "Case Type".into(),
            description: "Description".into(),
            date: "Date".into(),
            source: "Source".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl Profile {
    pub fn from_toml(input: &str) -> Result<Self, DrillError> {
        let profile: Profile =
            toml::from_str(input).map_err(|e| DrillError::ProfileParse(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), DrillError> {
        if self.layout.max_column() > MAX_COLUMN {
            return Err(DrillError::ProfileValidation(format!(
                "layout columns must not exceed {MAX_COLUMN}"
            )));
        }

        if self.layout.identifier == self.layout.type_code {
            return Err(DrillError::ProfileValidation(format!(
                "layout.identifier and layout.type_code both point at column {}",
                self.layout.identifier
            )));
        }

        if self.blacklist.iter().any(|s| s.trim().is_empty()) {
            return Err(DrillError::ProfileValidation(
                "blacklist entries must not be empty".into(),
            ));
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(DrillError::ProfileValidation("field with empty name".into()));
            }
            if !names.insert(field.name.to_lowercase()) {
                return Err(DrillError::ProfileValidation(format!(
                    "field '{}' is defined twice",
                    field.name
                )));
            }
            if field.candidates.is_empty() && field.fallback_column.is_none() {
                return Err(DrillError::ProfileValidation(format!(
                    "field '{}' needs at least one candidate or a fallback_column",
                    field.name
                )));
            }
            if field.fallback_column.is_some_and(|c| c > MAX_COLUMN) {
                return Err(DrillError::ProfileValidation(format!(
                    "field '{}' fallback_column must not exceed {MAX_COLUMN}",
                    field.name
                )));
            }
            if field.candidates.iter().any(|c| c.trim().is_empty()) {
                return Err(DrillError::ProfileValidation(format!(
                    "field '{}' has an empty candidate",
                    field.name
                )));
            }
        }

        Ok(())
    }

    pub fn chains(&self) -> Vec<FieldChain> {
        self.fields.iter().map(FieldConfig::chain).collect()
    }

    pub fn is_blacklisted(&self, sheet_name: &str) -> bool {
        let name = sheet_name.trim().to_uppercase();
        self.blacklist.iter().any(|b| b.trim().to_uppercase() == name)
    }

    /// Output header row, matching `Record::to_row`.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![
            self.output.identifier.clone(),
            self.output.type_code.clone(),
            self.output.description.clone(),
            self.output.date.clone(),
        ];
        headers.extend(self.fields.iter().map(|f| f.name.clone()));
        headers.push(self.output.source.clone());
        headers
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
name = "Complaint recap"
blacklist = ["Tabel", "Table", "Sheet1", "Pivot Cache"]

[search]
row_pattern = "palembang"
col_keyword = "Total"
code_filter = "^82"

[layout]
identifier = 0
type_code = 2
description = 3
date = 5

[[fields]]
name = "Unit"
candidates = ["Primary Unit Name", "Operational Unit Name", "Operational Unit Code"]
fallback_column = 18

[[fields]]
name = "Branch"
candidates = ["Branch Office"]

[output]
identifier = "No Kasus"
source = "Sumber"
"#;

    #[test]
    fn parse_full_profile() {
        let p = Profile::from_toml(FULL).unwrap();
        assert_eq!(p.name, "Complaint recap");
        assert_eq!(p.search.code_filter, "^82");
        assert_eq!(p.layout.type_code, 2);
        assert_eq!(p.fields.len(), 2);
        assert_eq!(p.fields[0].fallback_column, Some(18));
        assert_eq!(p.output.identifier, "No Kasus");
        assert_eq!(p.output.date, "Date");
        assert_eq!(
            p.headers(),
            vec!["No Kasus", "Case Type", "Description", "Date", "Unit", "Branch", "Sumber"]
        );
    }

    #[test]
    fn empty_document_is_the_default_profile() {
        let p = Profile::from_toml("").unwrap();
        assert_eq!(p.search.row_pattern, DEFAULT_ROW_PATTERN);
        assert_eq!(p.search.col_keyword, DEFAULT_COL_KEYWORD);
        assert_eq!(p.search.code_filter, DEFAULT_CODE_FILTER);
        assert_eq!(p.layout, ColumnLayout::default());
        assert_eq!(p.fields[0].candidates.len(), 3);
        assert!(p.is_blacklisted(" sheet1 "));
        assert!(p.is_blacklisted("Tabel"));
        assert!(!p.is_blacklisted("Pivot"));
    }

    #[test]
    fn partial_layout_keeps_other_defaults() {
        let p = Profile::from_toml("[layout]\ndate = 7\n").unwrap();
        assert_eq!(p.layout.identifier, 0);
        assert_eq!(p.layout.date, 7);
    }

    #[test]
    fn reject_duplicate_field() {
        let input = r#"
[[fields]]
name = "Unit"
candidates = ["a"]

[[fields]]
name = "unit"
candidates = ["b"]
"#;
        let err = Profile::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("defined twice"));
    }

    #[test]
    fn reject_field_without_candidates() {
        let err = Profile::from_toml("[[fields]]\nname = \"Unit\"\n").unwrap_err();
        assert!(err.to_string().contains("at least one candidate"));
    }

    #[test]
    fn reject_identity_columns_overlap() {
        let err = Profile::from_toml("[layout]\nidentifier = 1\n").unwrap_err();
        assert!(err.to_string().contains("both point at column 1"));
    }

    #[test]
    fn reject_columns_past_sheet_edge() {
        let input = "[[fields]]\nname = \"Unit\"\nfallback_column = 9223372036854775807\n";
        let err = Profile::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("must not exceed 16383"));

        let err = Profile::from_toml("[layout]\ndate = 16384\n").unwrap_err();
        assert!(err.to_string().contains("layout columns"));

        assert!(Profile::from_toml("[layout]\ndate = 16383\n").is_ok());
    }

    #[test]
    fn reject_unparseable_toml() {
        let err = Profile::from_toml("blacklist = [").unwrap_err();
        assert!(matches!(err, DrillError::ProfileParse(_)));
    }
}
