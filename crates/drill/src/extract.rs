use recap_core::normalize;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{DetailTable, Record};
use crate::schema::FieldMap;

/// Fixed positions of the identity-bearing columns in a detail table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub identifier: usize,
    pub type_code: usize,
    pub description: usize,
    pub date: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            identifier: 0,
            type_code: 1,
            description: 3,
            date: 4,
        }
    }
}

impl ColumnLayout {
    pub fn max_column(&self) -> usize {
        self.identifier
            .max(self.type_code)
            .max(self.description)
            .max(self.date)
    }
}

/// Turn the data rows of a detail table into records.
///
/// Rows whose type code does not match `code_filter` are dropped. Row order is
/// kept and nothing is deduplicated here.
pub fn extract(
    detail: &DetailTable,
    layout: &ColumnLayout,
    fields: &FieldMap,
    code_filter: &Regex,
    source_file: &str,
) -> Vec<Record> {
    let grid = &detail.grid;
    if grid.height() < 2 {
        log::info!("detail sheet '{}' has no data rows", detail.sheet_name);
        return Vec::new();
    }

    let mut records = Vec::new();

    for r in 1..grid.height() {
        let cell = |c: usize| normalize(grid.get(r, c));

        let type_code = cell(layout.type_code);
        if !code_filter.is_match(&type_code) {
            continue;
        }

        records.push(Record {
            identifier: cell(layout.identifier),
            type_code,
            description: cell(layout.description),
            date: cell(layout.date),
            fields: fields
                .columns()
                .map(|col| col.map(cell).unwrap_or_default())
                .collect(),
            source_file: source_file.to_string(),
        });
    }

    if records.is_empty() {
        log::info!(
            "detail sheet '{}' opened but no type code matches '{}'",
            detail.sheet_name,
            code_filter.as_str()
        );
    }
    records
}
