//! Batch orchestration: files in order, sheets in order, first success wins.
//!
//! Failure scoping:
//! - a sheet failure is recorded and the next sheet is tried;
//! - a file failure is recorded and the next file is processed;
//! - only a system failure (engine launch, or a fatal engine error) ends the
//!   batch early.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use regex::{Regex, RegexBuilder};

use crate::classify::{classify, EngineFault};
use crate::config::Profile;
use crate::drilldown::{drill_down, DrillOutcome, NotProduced};
use crate::engine::{SheetRef, SpreadsheetEngine};
use crate::error::{DrillError, EngineError};
use crate::events::{BatchEvent, Phase};
use crate::extract::extract;
use crate::ledger::Session;
use crate::model::{Admission, BatchReport, DetailTable, FailureKind, FileFailure, SYSTEM_FILE};
use crate::resolve::resolve_anchors;
use crate::schema::{FieldChain, FieldMap};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// The three user-supplied search parameters.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub row_pattern: String,
    pub col_keyword: String,
    pub code_filter: String,
}

impl SearchParams {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            row_pattern: profile.search.row_pattern.clone(),
            col_keyword: profile.search.col_keyword.clone(),
            code_filter: profile.search.code_filter.clone(),
        }
    }

    /// Validate and compile. Runs before any file is touched.
    pub fn compile(&self) -> Result<CompiledSearch, DrillError> {
        let code_filter = self.code_filter.trim();
        if self.row_pattern.trim().is_empty() {
            return Err(DrillError::MissingParameter("row pattern"));
        }
        if self.col_keyword.trim().is_empty() {
            return Err(DrillError::MissingParameter("column keyword"));
        }
        if code_filter.is_empty() {
            return Err(DrillError::MissingParameter("code filter"));
        }
        Ok(CompiledSearch {
            row_pattern: case_insensitive("row pattern", &self.row_pattern)?,
            col_keyword: self.col_keyword.clone(),
            code_filter: case_insensitive("code filter", code_filter)?,
        })
    }
}

fn case_insensitive(name: &'static str, pattern: &str) -> Result<Regex, DrillError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| DrillError::InvalidPattern {
            name,
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

#[derive(Debug, Clone)]
pub struct CompiledSearch {
    pub row_pattern: Regex,
    pub col_keyword: String,
    pub code_filter: Regex,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

struct Context<'a> {
    profile: &'a Profile,
    search: &'a CompiledSearch,
    chains: Vec<FieldChain>,
    events: &'a Sender<BatchEvent>,
}

impl Context<'_> {
    fn emit(&self, event: BatchEvent) {
        // A dropped receiver must not stop the batch.
        let _ = self.events.send(event);
    }

    fn phase(&self, file: &str, phase: Phase) {
        log::debug!("{file}: {phase:?}");
        self.emit(BatchEvent::Phase { file: file.to_string(), phase });
    }
}

/// Run one batch against a freshly launched engine session.
///
/// The engine is launched once, used for every file in order, and shut down
/// once at the end. Admitted records accumulate in `session`.
pub fn run_batch<E, L>(
    session: &mut Session,
    profile: &Profile,
    files: &[PathBuf],
    search: &CompiledSearch,
    launch: L,
    events: &Sender<BatchEvent>,
) -> BatchReport
where
    E: SpreadsheetEngine,
    L: FnOnce() -> Result<E, EngineError>,
{
    let ctx = Context { profile, search, chains: profile.chains(), events };
    let total = files.len();
    let mut report = BatchReport { files_total: total, ..Default::default() };

    log::info!(
        "batch start: {} files, row='{}', col='{}', code='{}'",
        total,
        search.row_pattern.as_str(),
        search.col_keyword,
        search.code_filter.as_str()
    );
    ctx.emit(BatchEvent::Started { total });
    ctx.emit(BatchEvent::Progress { done: 0, total, message: "launching engine".into() });

    let mut engine = match launch() {
        Ok(engine) => engine,
        Err(err) => {
            log::error!("engine launch failed: {err}");
            record_system_failure(&ctx, &mut report, &err);
            ctx.emit(BatchEvent::Finished { report: report.clone() });
            return report;
        }
    };

    for (idx, path) in files.iter().enumerate() {
        let file = display_name(path);
        ctx.emit(BatchEvent::Progress {
            done: idx,
            total,
            message: format!("processing ({}/{}): {}", idx + 1, total, file),
        });

        match process_file(&mut engine, path, &file, &ctx, session) {
            Ok(done) => {
                log::info!("{file}: saved {} records from '{}'", done.admitted, done.sheet);
                report.files_succeeded += 1;
                report.records_admitted += done.admitted;
                report.duplicates_rejected += done.duplicates;
                ctx.emit(BatchEvent::FileSucceeded {
                    file: file.clone(),
                    sheet: done.sheet,
                    admitted: done.admitted,
                    duplicates: done.duplicates,
                });
            }
            Err(FileError::Failed(failure)) => {
                log::error!("{}: {}", failure.file, failure.message);
                ctx.emit(BatchEvent::FileFailed { failure: failure.clone() });
                report.failures.push(failure);
            }
            Err(FileError::System(err)) => {
                log::error!("{file}: engine lost: {err}");
                record_system_failure(&ctx, &mut report, &err);
                break;
            }
        }

        ctx.emit(BatchEvent::Progress { done: idx + 1, total, message: format!("done: {file}") });
    }

    if let Err(err) = engine.shutdown() {
        log::warn!("engine shutdown failed: {err}");
    }

    log::info!(
        "batch finished: {} ok, {} failed, {} records, {} duplicates",
        report.files_succeeded,
        report.failures.len(),
        report.records_admitted,
        report.duplicates_rejected
    );
    ctx.emit(BatchEvent::Finished { report: report.clone() });
    report
}

fn record_system_failure(ctx: &Context<'_>, report: &mut BatchReport, err: &EngineError) {
    let failure = FileFailure {
        file: SYSTEM_FILE.to_string(),
        kind: FailureKind::SystemFailure,
        message: err.message.clone(),
    };
    ctx.emit(BatchEvent::FileFailed { failure: failure.clone() });
    report.failures.push(failure);
    report.aborted = true;
}

/// Base name of the path, as shown to the user and stored on records.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Per file
// ---------------------------------------------------------------------------

struct FileDone {
    sheet: String,
    admitted: usize,
    duplicates: usize,
}

enum FileError {
    Failed(FileFailure),
    System(EngineError),
}

impl FileError {
    fn engine(file: &str, err: EngineError) -> Self {
        if err.fatal {
            return Self::System(err);
        }
        Self::Failed(FileFailure {
            file: file.to_string(),
            kind: FailureKind::EngineInteractionFailure,
            message: classify(&err).message(),
        })
    }
}

fn process_file<E: SpreadsheetEngine>(
    engine: &mut E,
    path: &Path,
    file: &str,
    ctx: &Context<'_>,
    session: &mut Session,
) -> Result<FileDone, FileError> {
    ctx.phase(file, Phase::Opening);
    let mut book = engine.open(path).map_err(|e| FileError::engine(file, e))?;

    let outcome = scan_workbook(engine, &mut book, file, ctx, session);

    // Closed on every path; a close failure never changes the outcome.
    if let Err(err) = engine.close(book) {
        log::warn!("{file}: close failed: {err}");
    }
    ctx.phase(file, Phase::Done);
    outcome
}

/// What one sheet contributed when it did not produce a detail table.
enum SheetDiagnostic {
    Rejected { sheet: String, reason: NotProduced },
    Failed { sheet: String, fault: EngineFault },
}

enum SheetOutcome {
    Produced(DetailTable),
    Empty,
    Unresolved,
    Rejected(NotProduced),
}

fn scan_workbook<E: SpreadsheetEngine>(
    engine: &mut E,
    book: &mut E::Workbook,
    file: &str,
    ctx: &Context<'_>,
    session: &mut Session,
) -> Result<FileDone, FileError> {
    let sheets = engine.sheets(book).map_err(|e| FileError::engine(file, e))?;
    let mut diagnostics = Vec::new();
    let mut unresolved = 0;

    for sheet in &sheets {
        if ctx.profile.is_blacklisted(&sheet.name) {
            log::warn!("{file}: skipping blacklisted sheet '{}'", sheet.name);
            continue;
        }
        ctx.phase(file, Phase::Scanning { sheet: sheet.name.clone() });

        match scan_sheet(engine, book, sheet, ctx) {
            Ok(SheetOutcome::Produced(detail)) => {
                ctx.phase(file, Phase::Extracting { sheet: sheet.name.clone() });
                return Ok(admit_detail(&detail, file, &sheet.name, ctx, session));
            }
            Ok(SheetOutcome::Empty) => {
                log::debug!("{file}: sheet '{}' is empty", sheet.name);
            }
            Ok(SheetOutcome::Unresolved) => {
                log::debug!("{file}: anchors not found on '{}'", sheet.name);
                unresolved += 1;
            }
            Ok(SheetOutcome::Rejected(reason)) => {
                diagnostics.push(SheetDiagnostic::Rejected { sheet: sheet.name.clone(), reason });
            }
            Err(err) if err.fatal => return Err(FileError::System(err)),
            Err(err) => {
                log::warn!("{file}: skipping sheet '{}': {err}", sheet.name);
                diagnostics.push(SheetDiagnostic::Failed {
                    sheet: sheet.name.clone(),
                    fault: classify(&err),
                });
            }
        }
    }

    Err(FileError::Failed(file_failure(file, &diagnostics, unresolved, ctx.search)))
}

fn scan_sheet<E: SpreadsheetEngine>(
    engine: &mut E,
    book: &mut E::Workbook,
    sheet: &SheetRef,
    ctx: &Context<'_>,
) -> Result<SheetOutcome, EngineError> {
    let grid = engine.read_grid(book, sheet)?;
    if grid.is_empty() {
        return Ok(SheetOutcome::Empty);
    }

    let Some(anchors) = resolve_anchors(&grid, &ctx.search.row_pattern, &ctx.search.col_keyword)
    else {
        return Ok(SheetOutcome::Unresolved);
    };

    Ok(match drill_down(engine, book, sheet, anchors.target())? {
        DrillOutcome::Produced(detail) => SheetOutcome::Produced(detail),
        DrillOutcome::NotProduced(reason) => SheetOutcome::Rejected(reason),
    })
}

fn admit_detail(
    detail: &DetailTable,
    file: &str,
    sheet: &str,
    ctx: &Context<'_>,
    session: &mut Session,
) -> FileDone {
    let fields = FieldMap::resolve(&detail.header(), &ctx.chains);
    let records = extract(detail, &ctx.profile.layout, &fields, &ctx.search.code_filter, file);

    let mut done = FileDone { sheet: sheet.to_string(), admitted: 0, duplicates: 0 };
    for record in records {
        match session.admit(record) {
            Admission::Accepted => done.admitted += 1,
            Admission::Duplicate { .. } => done.duplicates += 1,
        }
    }
    done
}

/// Build the failure for a file where no sheet produced a detail table.
///
/// Engine errors win. A rejected drill-down is the file's kind only when every
/// sheet that was scanned got that far; otherwise the anchors were not found.
fn file_failure(
    file: &str,
    diagnostics: &[SheetDiagnostic],
    unresolved: usize,
    search: &CompiledSearch,
) -> FileFailure {
    let any_failed = diagnostics.iter().any(|d| matches!(d, SheetDiagnostic::Failed { .. }));
    let kind = if any_failed {
        FailureKind::EngineInteractionFailure
    } else if !diagnostics.is_empty() && unresolved == 0 {
        FailureKind::DrillDownRejected
    } else {
        FailureKind::AnchorsNotFound
    };

    let mut parts = Vec::with_capacity(diagnostics.len() + 1);
    if kind == FailureKind::AnchorsNotFound {
        parts.push(format!(
            "row pattern '{}' or column keyword '{}' not found",
            search.row_pattern.as_str(),
            search.col_keyword
        ));
    }
    parts.extend(diagnostics.iter().map(|d| match d {
        SheetDiagnostic::Rejected { sheet, reason } => format!("{sheet}: {reason}"),
        SheetDiagnostic::Failed { sheet, fault } => format!("{sheet}: {fault}"),
    }));

    FileFailure { file: file.to_string(), kind, message: parts.join("; ") }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(row: &str, col: &str, code: &str) -> SearchParams {
        SearchParams { row_pattern: row.into(), col_keyword: col.into(), code_filter: code.into() }
    }

    #[test]
    fn empty_code_filter_is_rejected() {
        let err = params("bandar", "Grand Total", "   ").compile().unwrap_err();
        assert!(matches!(err, DrillError::MissingParameter("code filter")));
    }

    #[test]
    fn empty_row_pattern_and_keyword_are_rejected() {
        assert!(params("", "Grand Total", "8204").compile().is_err());
        assert!(params("bandar", " ", "8204").compile().is_err());
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = params("bandar(", "Grand Total", "8204").compile().unwrap_err();
        assert!(err.to_string().contains("row pattern 'bandar('"));
    }

    #[test]
    fn code_filter_is_trimmed_and_case_insensitive() {
        let compiled = params("BANDAR", "x", "  abc ").compile().unwrap();
        assert!(compiled.code_filter.is_match("xABCx"));
        assert!(compiled.row_pattern.is_match("bandar lampung"));
    }

    #[test]
    fn display_name_is_base_name() {
        assert_eq!(display_name(Path::new("/tmp/reports/jan.xlsx")), "jan.xlsx");
    }

    #[test]
    fn rejection_beside_unresolved_sheets_reads_as_anchors_not_found() {
        let search = params("bandar", "Grand Total", "8204").compile().unwrap();
        let rejected = [SheetDiagnostic::Rejected {
            sheet: "Pivot".into(),
            reason: NotProduced::NoNewSheet,
        }];

        let only = file_failure("a.xlsx", &rejected, 0, &search);
        assert_eq!(only.kind, FailureKind::DrillDownRejected);
        assert_eq!(only.message, "Pivot: expanding the target cell produced no new sheet");

        let mixed = file_failure("a.xlsx", &rejected, 2, &search);
        assert_eq!(mixed.kind, FailureKind::AnchorsNotFound);
        assert_eq!(
            mixed.message,
            "row pattern 'bandar' or column keyword 'Grand Total' not found; \
             Pivot: expanding the target cell produced no new sheet"
        );
    }
}
