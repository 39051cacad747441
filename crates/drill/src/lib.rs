//! `recap-drill`: drill-down recap engine.
//!
//! Finds the drill cell of a summary report by fuzzy row/column hints, expands
//! it through a [`SpreadsheetEngine`], maps the detail sheet's drifting header
//! onto output fields, and accumulates identity-deduplicated records across a
//! whole batch of files.
//!
//! # Flow
//!
//! ```text
//! files ─► open ─► sheets (blacklist) ─► resolve anchors ─► drill_down
//!                                                             │
//!        Session ◄── Ledger::admit ◄── extract ◄── FieldMap ◄─┘
//! ```

pub mod batch;
pub mod classify;
pub mod config;
pub mod drilldown;
pub mod engine;
pub mod error;
pub mod events;
pub mod extract;
pub mod ledger;
pub mod memory;
pub mod model;
pub mod resolve;
pub mod schema;
pub mod worker;

pub use batch::{display_name, run_batch, CompiledSearch, SearchParams};
pub use classify::{classify, classify_message, EngineFault};
pub use config::Profile;
pub use drilldown::{drill_down, DrillOutcome, NotProduced};
pub use engine::{SheetRef, SpreadsheetEngine};
pub use error::{DrillError, EngineError, EngineOp};
pub use events::{BatchEvent, Phase};
pub use extract::{extract, ColumnLayout};
pub use ledger::{Ledger, Session};
pub use memory::{FixtureBook, FixtureSheet, MemoryEngine};
pub use model::{
    Admission, BatchReport, DetailTable, FailureKind, FileFailure, IdentityKey, Record,
};
pub use resolve::{resolve_anchors, Anchors};
pub use schema::{first_match, resolve_field, FieldChain, FieldMap};
pub use worker::{spawn_batch, BatchHandle, BatchRequest};
