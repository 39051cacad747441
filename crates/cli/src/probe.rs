//! `recap probe`: dry run of the anchor search on one workbook.

use std::path::{Path, PathBuf};

use recap_config::{EngineKind, Settings};
use recap_core::{normalize, Coord};
use recap_drill::{
    resolve_anchors, Anchors, CompiledSearch, MemoryEngine, Profile, SearchParams,
    SpreadsheetEngine,
};
use recap_io::CalamineEngine;
use serde::Serialize;

use crate::{load_profile, CliError};

#[derive(Debug, Serialize)]
struct SheetProbe {
    name: String,
    blacklisted: bool,
    rows: usize,
    cols: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    anchors: Option<Anchors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<Coord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_value: Option<String>,
}

pub fn cmd_probe(
    file: PathBuf,
    row: Option<String>,
    col: Option<String>,
    profile: Option<PathBuf>,
    engine: Option<EngineKind>,
    json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    let profile = load_profile(profile, settings)?;
    let mut search = SearchParams::from_profile(&profile);
    if let Some(row) = row {
        search.row_pattern = row;
    }
    if let Some(col) = col {
        search.col_keyword = col;
    }
    let search = search.compile()?;

    let sheets = match engine.unwrap_or(settings.engine) {
        EngineKind::Memory => probe_with(MemoryEngine::new(), &file, &profile, &search)?,
        EngineKind::Xlsx => probe_with(CalamineEngine::new(), &file, &profile, &search)?,
    };

    if json {
        let json = serde_json::to_string_pretty(&sheets)
            .map_err(|e| CliError::general(format!("cannot serialize probe: {e}")))?;
        println!("{}", json);
        return Ok(());
    }

    for s in &sheets {
        let status = if s.blacklisted {
            "skipped (blacklisted)".to_string()
        } else if s.rows == 0 {
            "empty".to_string()
        } else {
            match (&s.anchors, &s.target_value) {
                (Some(a), Some(value)) => format!(
                    "row anchor {} + column anchor {} -> target {} = '{}'",
                    a.row_anchor,
                    a.col_anchor,
                    a.target(),
                    value
                ),
                _ => "anchors not found".to_string(),
            }
        };
        println!("{:<24} {}x{}  {}", s.name, s.rows, s.cols, status);
    }
    Ok(())
}

fn probe_with<E: SpreadsheetEngine>(
    mut engine: E,
    path: &Path,
    profile: &Profile,
    search: &CompiledSearch,
) -> Result<Vec<SheetProbe>, CliError> {
    let result = match engine.open(path) {
        Ok(book) => {
            let result = probe_book(&mut engine, &book, profile, search);
            if let Err(e) = engine.close(book) {
                log::warn!("{}: close failed: {e}", path.display());
            }
            result
        }
        Err(e) => Err(CliError::io(recap_drill::classify(&e).message())),
    };
    if let Err(e) = engine.shutdown() {
        log::warn!("engine shutdown failed: {e}");
    }
    result
}

fn probe_book<E: SpreadsheetEngine>(
    engine: &mut E,
    book: &E::Workbook,
    profile: &Profile,
    search: &CompiledSearch,
) -> Result<Vec<SheetProbe>, CliError> {
    let sheets = engine
        .sheets(book)
        .map_err(|e| CliError::general(e.to_string()))?;

    let mut out = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let blacklisted = profile.is_blacklisted(&sheet.name);
        let mut probe = SheetProbe {
            name: sheet.name.clone(),
            blacklisted,
            rows: 0,
            cols: 0,
            anchors: None,
            target: None,
            target_value: None,
        };
        if !blacklisted {
            let grid = engine
                .read_grid(book, &sheet)
                .map_err(|e| CliError::general(format!("{}: {e}", sheet.name)))?;
            probe.rows = grid.height();
            probe.cols = grid.width();
            probe.anchors = resolve_anchors(&grid, &search.row_pattern, &search.col_keyword);
            if let Some(anchors) = &probe.anchors {
                let target = anchors.target();
                probe.target = Some(target);
                probe.target_value = Some(normalize(grid.at(target)));
            }
        }
        out.push(probe);
    }
    Ok(out)
}
