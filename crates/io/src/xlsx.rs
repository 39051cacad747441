// Read-only spreadsheet engine over calamine

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDateTime;
use recap_core::{CellValue, Coord, Grid};
use recap_drill::{EngineError, EngineOp, SheetRef, SpreadsheetEngine};

/// Sheets are read eagerly on open; a sheet that fails to parse keeps its
/// error until someone asks for its grid.
pub struct CalamineWorkbook {
    path: PathBuf,
    sheets: Vec<(String, Result<Grid, String>)>,
}

/// Engine backed by calamine (xlsx, xls, xlsb, ods).
///
/// It reads what is stored in the file. Pivot detail expansion needs a live
/// spreadsheet application, so `expand_detail` always fails and the
/// orchestrator reports the file as not expandable.
#[derive(Debug, Default)]
pub struct CalamineEngine;

impl CalamineEngine {
    pub fn new() -> Self {
        Self
    }

    fn sheet<'a>(
        book: &'a CalamineWorkbook,
        sheet: &SheetRef,
        op: EngineOp,
    ) -> Result<&'a Grid, EngineError> {
        match book.sheets.get(sheet.index) {
            Some((_, Ok(grid))) => Ok(grid),
            Some((name, Err(e))) => Err(EngineError::new(
                op,
                format!("Failed to read sheet '{}': {}", name, e),
            )),
            None => Err(EngineError::new(op, format!("no sheet '{}'", sheet.name))),
        }
    }
}

impl SpreadsheetEngine for CalamineEngine {
    type Workbook = CalamineWorkbook;

    fn open(&mut self, path: &Path) -> Result<CalamineWorkbook, EngineError> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            EngineError::new(EngineOp::Open, format!("Failed to open Excel file: {}", e))
        })?;

        let names: Vec<String> = workbook.sheet_names().to_vec();
        let sheets = names
            .into_iter()
            .map(|name| {
                let grid = workbook
                    .worksheet_range(&name)
                    .map(|range| grid_from_range(&range))
                    .map_err(|e| e.to_string());
                (name, grid)
            })
            .collect();

        log::debug!("opened {}", path.display());
        Ok(CalamineWorkbook { path: path.to_path_buf(), sheets })
    }

    fn sheets(&mut self, book: &CalamineWorkbook) -> Result<Vec<SheetRef>, EngineError> {
        Ok(book
            .sheets
            .iter()
            .enumerate()
            .map(|(index, (name, _))| SheetRef { index, name: name.clone() })
            .collect())
    }

    fn read_grid(&mut self, book: &CalamineWorkbook, sheet: &SheetRef) -> Result<Grid, EngineError> {
        Self::sheet(book, sheet, EngineOp::ReadGrid).cloned()
    }

    fn cell_value(
        &mut self,
        book: &CalamineWorkbook,
        sheet: &SheetRef,
        at: Coord,
    ) -> Result<CellValue, EngineError> {
        Ok(Self::sheet(book, sheet, EngineOp::ReadCell)?.at(at).clone())
    }

    fn expand_detail(
        &mut self,
        book: &mut CalamineWorkbook,
        sheet: &SheetRef,
        at: Coord,
    ) -> Result<(), EngineError> {
        Err(EngineError::new(
            EngineOp::ExpandDetail,
            format!(
                "ShowDetail is not available in read-only mode ({} '{}' {})",
                book.path.display(),
                sheet.name,
                at
            ),
        ))
    }

    fn active_sheet(&mut self, book: &CalamineWorkbook) -> Result<SheetRef, EngineError> {
        book.sheets
            .first()
            .map(|(name, _)| SheetRef { index: 0, name: name.clone() })
            .ok_or_else(|| EngineError::new(EngineOp::ListSheets, "Excel file contains no sheets"))
    }

    fn close(&mut self, book: CalamineWorkbook) -> Result<(), EngineError> {
        log::debug!("closed {}", book.path.display());
        Ok(())
    }
}

/// Snapshot a calamine range. The range start becomes the grid origin, since
/// data may not begin at A1.
pub fn grid_from_range(range: &Range<Data>) -> Grid {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let cells = range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect();
    Grid::new(cells, Coord::new(start_row as usize, start_col as usize))
}

pub fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => CellValue::DateTime(dt),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => s
            .parse::<NaiveDateTime>()
            .map(CellValue::DateTime)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
