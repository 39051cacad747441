//! In-memory spreadsheet engine driven by JSON fixtures.
//!
//! A fixture describes the sheets of one workbook, which cells can be
//! expanded and what detail sheet each expansion produces. Faults can be
//! injected per operation (and optionally per sheet) to exercise the failure
//! paths of the orchestrator.
//!
//! ```json
//! {
//!   "sheets": [{
//!     "name": "Recap",
//!     "origin": [0, 0],
//!     "rows": [["Region", "Grand Total"], ["Bandar Lampung", 12]],
//!     "drill": [{ "row": 1, "col": 1, "detail": { "name": "Sheet2", "rows": [] } }]
//!   }],
//!   "faults": [{ "op": "close", "message": "busy" }]
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use recap_core::{CellValue, Coord, Grid};
use serde::{Deserialize, Serialize};

use crate::engine::{SheetRef, SpreadsheetEngine};
use crate::error::{EngineError, EngineOp};

/// Message produced when a cell that is not part of a pivot table is expanded.
pub const NOT_A_PIVOT_CELL: &str = "Unable to get the ShowDetail property of the Range class";

// ---------------------------------------------------------------------------
// Fixture format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureBook {
    #[serde(default)]
    pub sheets: Vec<FixtureSheet>,
    #[serde(default)]
    pub faults: Vec<FixtureFault>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureSheet {
    pub name: String,
    /// Sheet coordinate of `rows[0][0]`.
    #[serde(default)]
    pub origin: (usize, usize),
    #[serde(default)]
    pub rows: Vec<Vec<FixtureCell>>,
    #[serde(default)]
    pub drill: Vec<DrillTarget>,
}

/// A cell that accepts expansion. `detail: None` accepts but creates nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillTarget {
    pub row: usize,
    pub col: usize,
    #[serde(default)]
    pub detail: Option<FixtureSheet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixtureCell {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Date { date: NaiveDateTime },
}

impl From<&FixtureCell> for CellValue {
    fn from(cell: &FixtureCell) -> Self {
        match cell {
            FixtureCell::Empty => CellValue::Empty,
            FixtureCell::Bool(b) => CellValue::Bool(*b),
            FixtureCell::Number(n) => CellValue::Number(*n),
            FixtureCell::Text(s) => CellValue::Text(s.clone()),
            FixtureCell::Date { date } => CellValue::DateTime(*date),
        }
    }
}

impl From<&str> for FixtureCell {
    fn from(s: &str) -> Self {
        FixtureCell::Text(s.to_string())
    }
}

impl From<f64> for FixtureCell {
    fn from(n: f64) -> Self {
        FixtureCell::Number(n)
    }
}

/// Injected failure: `op` fails (on `sheet` only, when given).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureFault {
    pub op: EngineOp,
    #[serde(default)]
    pub sheet: Option<String>,
    pub message: String,
    #[serde(default)]
    pub fatal: bool,
}

impl FixtureSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<FixtureCell>>) -> Self {
        Self { name: name.into(), rows, ..Default::default() }
    }

    pub fn with_origin(mut self, row: usize, col: usize) -> Self {
        self.origin = (row, col);
        self
    }

    pub fn with_drill(mut self, row: usize, col: usize, detail: Option<FixtureSheet>) -> Self {
        self.drill.push(DrillTarget { row, col, detail });
        self
    }

    fn grid(&self) -> Grid {
        let cells = self
            .rows
            .iter()
            .map(|row| row.iter().map(CellValue::from).collect())
            .collect();
        Grid::new(cells, Coord::new(self.origin.0, self.origin.1))
    }
}

impl FixtureBook {
    pub fn new(sheets: Vec<FixtureSheet>) -> Self {
        Self { sheets, faults: Vec::new() }
    }

    pub fn with_fault(mut self, op: EngineOp, sheet: Option<&str>, message: &str, fatal: bool) -> Self {
        self.faults.push(FixtureFault {
            op,
            sheet: sheet.map(str::to_string),
            message: message.to_string(),
            fatal,
        });
        self
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Calls the engine saw, shared with whoever holds a clone.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        if let Ok(mut entries) = self.0.lock() {
            entries.push(entry);
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn opened(&self) -> usize {
        self.count("open ")
    }

    pub fn closed(&self) -> usize {
        self.count("close ")
    }

    pub fn shutdowns(&self) -> usize {
        self.count("shutdown")
    }
}

struct MemorySheet {
    name: String,
    grid: Grid,
    drill: Vec<DrillTarget>,
}

pub struct MemoryWorkbook {
    path: PathBuf,
    sheets: Vec<MemorySheet>,
    active: usize,
    faults: Vec<FixtureFault>,
}

impl MemoryWorkbook {
    fn from_fixture(path: &Path, book: FixtureBook) -> Self {
        let sheets = book
            .sheets
            .into_iter()
            .map(|s| MemorySheet { name: s.name.clone(), grid: s.grid(), drill: s.drill })
            .collect();
        Self { path: path.to_path_buf(), sheets, active: 0, faults: book.faults }
    }

    fn check(&self, op: EngineOp, sheet: Option<&str>) -> Result<(), EngineError> {
        let hit = self.faults.iter().find(|f| {
            f.op == op && (f.sheet.is_none() || f.sheet.as_deref() == sheet)
        });
        match hit {
            Some(f) if f.fatal => Err(EngineError::fatal(op, f.message.clone())),
            Some(f) => Err(EngineError::new(op, f.message.clone())),
            None => Ok(()),
        }
    }

    fn sheet(&self, sheet: &SheetRef, op: EngineOp) -> Result<&MemorySheet, EngineError> {
        self.sheets
            .get(sheet.index)
            .filter(|s| s.name == sheet.name)
            .ok_or_else(|| EngineError::new(op, format!("no sheet '{}'", sheet.name)))
    }

    fn sheet_ref(&self, index: usize) -> SheetRef {
        SheetRef { index, name: self.sheets[index].name.clone() }
    }
}

/// Engine over fixtures registered up front or loaded from JSON files.
#[derive(Default)]
pub struct MemoryEngine {
    books: HashMap<PathBuf, FixtureBook>,
    journal: Journal,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `book` for `path` instead of reading the file.
    pub fn with_workbook(mut self, path: impl Into<PathBuf>, book: FixtureBook) -> Self {
        self.books.insert(path.into(), book);
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    fn load(&self, path: &Path) -> Result<FixtureBook, EngineError> {
        if let Some(book) = self.books.get(path) {
            return Ok(book.clone());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::new(EngineOp::Open, format!("cannot open {}: {}", path.display(), e))
        })?;
        FixtureBook::from_json(&text).map_err(|e| {
            EngineError::new(EngineOp::Open, format!("{} is not a workbook: {}", path.display(), e))
        })
    }
}

impl SpreadsheetEngine for MemoryEngine {
    type Workbook = MemoryWorkbook;

    fn open(&mut self, path: &Path) -> Result<MemoryWorkbook, EngineError> {
        let book = MemoryWorkbook::from_fixture(path, self.load(path)?);
        book.check(EngineOp::Open, None)?;
        self.journal.push(format!("open {}", path.display()));
        Ok(book)
    }

    fn sheets(&mut self, book: &MemoryWorkbook) -> Result<Vec<SheetRef>, EngineError> {
        book.check(EngineOp::ListSheets, None)?;
        Ok((0..book.sheets.len()).map(|i| book.sheet_ref(i)).collect())
    }

    fn read_grid(&mut self, book: &MemoryWorkbook, sheet: &SheetRef) -> Result<Grid, EngineError> {
        book.check(EngineOp::ReadGrid, Some(&sheet.name))?;
        Ok(book.sheet(sheet, EngineOp::ReadGrid)?.grid.clone())
    }

    fn cell_value(
        &mut self,
        book: &MemoryWorkbook,
        sheet: &SheetRef,
        at: Coord,
    ) -> Result<CellValue, EngineError> {
        book.check(EngineOp::ReadCell, Some(&sheet.name))?;
        Ok(book.sheet(sheet, EngineOp::ReadCell)?.grid.at(at).clone())
    }

    fn expand_detail(
        &mut self,
        book: &mut MemoryWorkbook,
        sheet: &SheetRef,
        at: Coord,
    ) -> Result<(), EngineError> {
        book.check(EngineOp::ExpandDetail, Some(&sheet.name))?;
        let target = book
            .sheet(sheet, EngineOp::ExpandDetail)?
            .drill
            .iter()
            .find(|t| t.row == at.row && t.col == at.col)
            .cloned()
            .ok_or_else(|| EngineError::new(EngineOp::ExpandDetail, NOT_A_PIVOT_CELL))?;

        self.journal.push(format!("expand {} {at}", sheet.name));
        if let Some(detail) = target.detail {
            book.sheets.push(MemorySheet {
                name: detail.name.clone(),
                grid: detail.grid(),
                drill: Vec::new(),
            });
            book.active = book.sheets.len() - 1;
        }
        Ok(())
    }

    fn active_sheet(&mut self, book: &MemoryWorkbook) -> Result<SheetRef, EngineError> {
        if book.sheets.is_empty() {
            return Err(EngineError::new(EngineOp::ListSheets, "workbook has no sheets"));
        }
        Ok(book.sheet_ref(book.active))
    }

    fn close(&mut self, book: MemoryWorkbook) -> Result<(), EngineError> {
        self.journal.push(format!("close {}", book.path.display()));
        book.check(EngineOp::Close, None)
    }

    fn shutdown(&mut self) -> Result<(), EngineError> {
        self.journal.push("shutdown".into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_cells_parse_from_json() {
        let book = FixtureBook::from_json(
            r#"{"sheets":[{"name":"S","origin":[2,1],"rows":[[null,true,8204,"x",{"date":"2024-01-15T00:00:00"}]]}]}"#,
        )
        .unwrap();
        let grid = book.sheets[0].grid();
        assert_eq!(grid.origin(), Coord::new(2, 1));
        assert_eq!(grid.get(0, 0), &CellValue::Empty);
        assert_eq!(grid.get(0, 1), &CellValue::Bool(true));
        assert_eq!(grid.get(0, 2), &CellValue::Number(8204.0));
        assert_eq!(grid.get(0, 3), &CellValue::Text("x".into()));
        assert!(matches!(grid.get(0, 4), CellValue::DateTime(_)));
    }

    #[test]
    fn expand_registered_target_adds_active_sheet() {
        let detail = FixtureSheet::new("Sheet9", vec![vec!["Case No".into()]]);
        let book = FixtureBook::new(vec![
            FixtureSheet::new("Recap", vec![vec!["a".into(), 3.0.into()]]).with_drill(0, 1, Some(detail)),
        ]);
        let mut engine = MemoryEngine::new().with_workbook("a.json", book);
        let mut wb = engine.open(Path::new("a.json")).unwrap();
        let recap = engine.sheets(&wb).unwrap()[0].clone();

        engine.expand_detail(&mut wb, &recap, Coord::new(0, 1)).unwrap();
        assert_eq!(engine.sheets(&wb).unwrap().len(), 2);
        assert_eq!(engine.active_sheet(&wb).unwrap().name, "Sheet9");
    }

    #[test]
    fn expand_unregistered_cell_is_rejected() {
        let book = FixtureBook::new(vec![FixtureSheet::new("Recap", vec![vec!["a".into()]])]);
        let mut engine = MemoryEngine::new().with_workbook("a.json", book);
        let mut wb = engine.open(Path::new("a.json")).unwrap();
        let recap = engine.sheets(&wb).unwrap()[0].clone();

        let err = engine.expand_detail(&mut wb, &recap, Coord::new(0, 0)).unwrap_err();
        assert!(err.message.contains("ShowDetail"));
    }

    #[test]
    fn faults_fire_on_matching_sheet_only() {
        let book = FixtureBook::new(vec![
            FixtureSheet::new("A", vec![vec!["a".into()]]),
            FixtureSheet::new("B", vec![vec!["b".into()]]),
        ])
        .with_fault(EngineOp::ReadGrid, Some("B"), "boom", false);
        let mut engine = MemoryEngine::new().with_workbook("a.json", book);
        let wb = engine.open(Path::new("a.json")).unwrap();
        let sheets = engine.sheets(&wb).unwrap();

        assert!(engine.read_grid(&wb, &sheets[0]).is_ok());
        let err = engine.read_grid(&wb, &sheets[1]).unwrap_err();
        assert_eq!(err.message, "boom");
        assert!(!err.fatal);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let mut engine = MemoryEngine::new();
        let err = engine.open(Path::new("/nonexistent/recap.json")).err().unwrap();
        assert_eq!(err.op, EngineOp::Open);
    }

    #[test]
    fn journal_tracks_close() {
        let book = FixtureBook::new(vec![FixtureSheet::new("A", vec![])]);
        let mut engine = MemoryEngine::new().with_workbook("a.json", book);
        let journal = engine.journal();
        let wb = engine.open(Path::new("a.json")).unwrap();
        engine.close(wb).unwrap();
        assert_eq!(journal.opened(), 1);
        assert_eq!(journal.closed(), 1);
    }
}
