//! The spreadsheet engine seam.
//!
//! The engine owns workbooks, reads sheets into [`Grid`] snapshots and performs
//! the pivot "show detail" expansion. Everything above this trait is pure.

use std::path::Path;

use recap_core::{CellValue, Coord, Grid};

use crate::error::EngineError;

/// A sheet within an open workbook, by position and display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    pub index: usize,
    pub name: String,
}

pub trait SpreadsheetEngine {
    type Workbook;

    fn open(&mut self, path: &Path) -> Result<Self::Workbook, EngineError>;

    /// Sheets in workbook order.
    fn sheets(&mut self, book: &Self::Workbook) -> Result<Vec<SheetRef>, EngineError>;

    /// Snapshot of the sheet's used range. An empty sheet yields an empty grid.
    fn read_grid(&mut self, book: &Self::Workbook, sheet: &SheetRef) -> Result<Grid, EngineError>;

    fn cell_value(
        &mut self,
        book: &Self::Workbook,
        sheet: &SheetRef,
        at: Coord,
    ) -> Result<CellValue, EngineError>;

    /// Ask the engine to expand the summary cell at `at` into a new sheet.
    ///
    /// Success does not imply a sheet was created; callers compare the sheet
    /// count before and after.
    fn expand_detail(
        &mut self,
        book: &mut Self::Workbook,
        sheet: &SheetRef,
        at: Coord,
    ) -> Result<(), EngineError>;

    /// The sheet the engine currently has focused.
    fn active_sheet(&mut self, book: &Self::Workbook) -> Result<SheetRef, EngineError>;

    fn close(&mut self, book: Self::Workbook) -> Result<(), EngineError>;

    /// Release the engine session. Called once per batch.
    fn shutdown(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}
