//! `recap run` and `recap export`.

use std::path::{Path, PathBuf};

use recap_config::{EngineKind, Settings};
use recap_drill::{
    spawn_batch, BatchEvent, BatchHandle, BatchReport, BatchRequest, MemoryEngine, Profile,
    SearchParams, Session,
};
use recap_io::CalamineEngine;
use serde::Serialize;

use crate::exit_codes::{EXIT_ERROR, EXIT_FILES_FAILED};
use crate::{load_profile, session_path, CliError};

pub struct RunArgs {
    pub files: Vec<PathBuf>,
    pub row: Option<String>,
    pub col: Option<String>,
    pub code: Option<String>,
    pub profile: Option<PathBuf>,
    pub session: Option<PathBuf>,
    pub engine: Option<EngineKind>,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    report: &'a BatchReport,
    session_records: usize,
    session_file: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
}

pub fn cmd_run(args: RunArgs, settings: &Settings) -> Result<(), CliError> {
    let profile = load_profile(args.profile, settings)?;

    let mut search = SearchParams::from_profile(&profile);
    if let Some(row) = args.row {
        search.row_pattern = row;
    }
    if let Some(col) = args.col {
        search.col_keyword = col;
    }
    if let Some(code) = args.code {
        search.code_filter = code;
    }

    let path = session_path(args.session, settings);
    let session = Session::load(&path)?;
    let request = BatchRequest { files: args.files, search };
    let progress = !(args.quiet || args.json);

    let (session, report) = match args.engine.unwrap_or(settings.engine) {
        EngineKind::Memory => drive(
            spawn_batch(session, profile.clone(), request, || Ok(MemoryEngine::new()))?,
            progress,
        )?,
        EngineKind::Xlsx => drive(
            spawn_batch(session, profile.clone(), request, || Ok(CalamineEngine::new()))?,
            progress,
        )?,
    };
    session.save(&path)?;

    if let Some(out) = &args.output {
        let n = write_export(&profile, &session, out)?;
        if !args.json {
            eprintln!("exported {} records to {}", n, out.display());
        }
    }

    if args.json {
        let output = RunOutput {
            report: &report,
            session_records: session.records().len(),
            session_file: &path,
            output: args.output.as_deref(),
        };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::general(format!("cannot serialize report: {e}")))?;
        println!("{}", json);
    } else {
        print_summary(&report, session.records().len());
    }

    if report.aborted {
        Err(CliError::silent(EXIT_ERROR))
    } else if report.has_failures() {
        Err(CliError::silent(EXIT_FILES_FAILED))
    } else {
        Ok(())
    }
}

/// Drain the event channel until the worker finishes, then take the session back.
fn drive(handle: BatchHandle, progress: bool) -> Result<(Session, BatchReport), CliError> {
    for event in handle.events.iter() {
        if progress {
            render(&event);
        }
    }
    Ok(handle.join()?)
}

fn render(event: &BatchEvent) {
    match event {
        BatchEvent::Progress { done, total, message } => {
            eprintln!("[{}/{}] {}", done, total, message);
        }
        BatchEvent::Phase { file, phase } => log::debug!("{file}: {phase:?}"),
        BatchEvent::FileSucceeded { file, sheet, admitted, duplicates } => {
            eprintln!(
                "  ok    {}: {} records from '{}' ({} duplicates)",
                file, admitted, sheet, duplicates
            );
        }
        BatchEvent::FileFailed { failure } => {
            eprintln!("  FAIL  {}: [{}] {}", failure.file, failure.kind, failure.message);
        }
        BatchEvent::Started { .. } | BatchEvent::Finished { .. } => {}
    }
}

fn print_summary(report: &BatchReport, session_records: usize) {
    println!(
        "files:    {}/{} succeeded",
        report.files_succeeded, report.files_total
    );
    println!(
        "records:  {} admitted, {} duplicates rejected",
        report.records_admitted, report.duplicates_rejected
    );
    println!("session:  {} records", session_records);

    if report.has_failures() {
        println!("failures:");
        for f in &report.failures {
            println!("  {}  {}  {}", f.file, f.kind, f.message);
        }
    }
    if report.aborted {
        println!("batch aborted: remaining files were not processed");
    }
}

// ============================================================================
// export
// ============================================================================

fn write_export(profile: &Profile, session: &Session, out: &Path) -> Result<usize, CliError> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| CliError::io(format!("cannot create {}: {e}", parent.display())))?;
    }
    let headers = match session.headers() {
        [] => profile.headers(),
        stored => stored.to_vec(),
    };
    if let Some(record) = session.records().iter().find(|r| r.to_row().len() != headers.len()) {
        return Err(CliError::general(format!(
            "record {} has {} columns but the header row has {}",
            record.identifier,
            record.to_row().len(),
            headers.len()
        ))
        .with_hint("run `recap reset` and process the files again with one profile"));
    }
    recap_io::export(&headers, session.records(), out).map_err(CliError::io)
}

pub fn cmd_export(
    profile: Option<PathBuf>,
    session: Option<PathBuf>,
    output: Option<PathBuf>,
    settings: &Settings,
) -> Result<(), CliError> {
    let profile = load_profile(profile, settings)?;
    let session = Session::load(&session_path(session, settings))?;
    if session.records().is_empty() {
        return Err(CliError::general("session has no records to export")
            .with_hint("run `recap run <FILES>` first"));
    }

    let out = output.unwrap_or_else(|| {
        let name = recap_io::default_file_name(chrono::Local::now().naive_local());
        settings.export_dir.clone().unwrap_or_default().join(name)
    });
    let n = write_export(&profile, &session, &out)?;
    println!("exported {} records to {}", n, out.display());
    Ok(())
}
