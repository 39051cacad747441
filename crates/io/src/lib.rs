// File I/O: calamine-backed engine and recap export

pub mod export;
pub mod xlsx;

pub use export::{default_file_name, export, ExportFormat};
pub use xlsx::CalamineEngine;
