use recap_core::Coord;

use crate::engine::{SheetRef, SpreadsheetEngine};
use crate::error::EngineError;
use crate::model::DetailTable;

/// Why a drill-down produced no detail sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotProduced {
    /// The target cell is empty.
    EmptyCell,
    /// The engine accepted the request but no sheet appeared.
    NoNewSheet,
}

impl std::fmt::Display for NotProduced {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCell => write!(f, "target cell is empty"),
            Self::NoNewSheet => write!(f, "expanding the target cell produced no new sheet"),
        }
    }
}

#[derive(Debug)]
pub enum DrillOutcome {
    Produced(DetailTable),
    NotProduced(NotProduced),
}

/// Expand `target` on `sheet` and read back the generated detail sheet.
///
/// A real drill-down is told apart from an ineligible cell by the workbook's
/// sheet count: it must grow.
pub fn drill_down<E: SpreadsheetEngine>(
    engine: &mut E,
    book: &mut E::Workbook,
    sheet: &SheetRef,
    target: Coord,
) -> Result<DrillOutcome, EngineError> {
    if engine.cell_value(book, sheet, target)?.is_empty() {
        log::warn!("target cell {target} on '{}' is empty", sheet.name);
        return Ok(DrillOutcome::NotProduced(NotProduced::EmptyCell));
    }

    let before = engine.sheets(book)?.len();
    engine.expand_detail(book, sheet, target)?;
    if engine.sheets(book)?.len() <= before {
        log::warn!("expanding {target} on '{}' produced no new sheet", sheet.name);
        return Ok(DrillOutcome::NotProduced(NotProduced::NoNewSheet));
    }

    let detail = engine.active_sheet(book)?;
    let grid = engine.read_grid(book, &detail)?;
    log::info!(
        "detail sheet '{}' opened with {} data rows",
        detail.name,
        grid.height().saturating_sub(1)
    );
    Ok(DrillOutcome::Produced(DetailTable { sheet_name: detail.name, grid }))
}
