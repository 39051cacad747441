//! Background batch thread.
//!
//! The batch runs on its own named thread so the caller stays responsive.
//! The engine is launched on that thread and never leaves it; the session is
//! moved in and handed back by [`BatchHandle::join`].

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::batch::{run_batch, SearchParams};
use crate::config::Profile;
use crate::engine::SpreadsheetEngine;
use crate::error::{DrillError, EngineError};
use crate::events::BatchEvent;
use crate::ledger::Session;
use crate::model::BatchReport;

const THREAD_NAME: &str = "recap-batch";

/// Files to process plus the search parameters for this run.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub files: Vec<PathBuf>,
    pub search: SearchParams,
}

/// Handle returned by [`spawn_batch`].
pub struct BatchHandle {
    pub events: mpsc::Receiver<BatchEvent>,
    thread: JoinHandle<(Session, BatchReport)>,
}

impl BatchHandle {
    /// Wait for the batch to finish and take the session back.
    pub fn join(self) -> Result<(Session, BatchReport), DrillError> {
        self.thread
            .join()
            .map_err(|_| DrillError::Worker("batch thread panicked".into()))
    }
}

/// Validate the request and start the batch on a background thread.
///
/// Parameter errors and a session whose records do not fit the profile's
/// output columns are returned here, before the thread exists and before any
/// engine is launched.
pub fn spawn_batch<E, L>(
    mut session: Session,
    profile: Profile,
    request: BatchRequest,
    launch: L,
) -> Result<BatchHandle, DrillError>
where
    E: SpreadsheetEngine + 'static,
    L: FnOnce() -> Result<E, EngineError> + Send + 'static,
{
    let search = request.search.compile()?;
    session.bind_headers(profile.headers())?;
    let files = request.files;
    let (event_tx, event_rx) = mpsc::channel::<BatchEvent>();

    let thread = std::thread::Builder::new()
        .name(THREAD_NAME.into())
        .spawn(move || {
            let report = run_batch(&mut session, &profile, &files, &search, launch, &event_tx);
            (session, report)
        })
        .map_err(|e| DrillError::Worker(e.to_string()))?;

    Ok(BatchHandle { events: event_rx, thread })
}
