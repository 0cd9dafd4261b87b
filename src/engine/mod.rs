// 8.0: versioned configuration engine. one instance per domain coordinates draft edits,
// publishes, rollbacks, diffs, bulk import and export.
// synchronous and lock-guarded. the only I/O is whatever bytes callers hand in or take out.

mod config;
mod core;
mod diff;
mod export;
mod import;
mod publish;
mod results;
mod rollback;
mod state;

pub use config::EngineConfig;
pub use core::ConfigEngine;
pub use export::ExportFormat;
pub use import::{CancelToken, ImportMode, ImportRow};
pub use results::{BatchResult, ConfigError, RowError};
pub use state::EngineSnapshot;
