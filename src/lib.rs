// perps-config: versioned configuration engine for the perps admin platform.
// every domain gets draft edits, atomic publish, forward-only rollback, diffs,
// bulk import and export. no network or storage I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: ItemId, VersionId, VersionTag, Partition, EntityKind
//   2.x  validation.rs: validation gate, field errors
//   3.x  item.rs: ConfigItem and snapshots
//   4.x  history.rs: append-only version ledger
//   5.x  repository.rs: draft and published partitions
//   6.x  diff.rs: snapshot comparison
//   7.x  config.rs: engine limits, env presets
//   8.x  engine/: per-domain engine: publish, rollback, diff, import, export, state
//   9.x  domains/: fees, margin tiers, calendar, risk rules, instruments, icons, nav
//   10.x query.rs: list filtering, sorting, pagination
//   11.x events.rs: state transition events for audit
//   12.x codec.rs: csv and json row formats
//   13.x registry.rs: one engine per domain, JSON admin contract

// core versioning modules
pub mod diff;
pub mod engine;
pub mod history;
pub mod item;
pub mod repository;
pub mod types;
pub mod validation;

// domain catalogue
pub mod domains;

// integration modules
pub mod codec;
pub mod config;
pub mod events;
pub mod query;
pub mod registry;

// re exports for convenience
pub use config::{AdminConfig, Environment, SettingsError};
pub use diff::{DiffResult, DiffSummary, DiffTarget, Modified};
pub use domains::*;
pub use engine::*;
pub use events::{Event, EventId, EventPayload};
pub use history::{CommitKind, VersionRecord, VersionSummary};
pub use item::{ConfigItem, Snapshot};
pub use query::{ListQuery, Page, SortOrder};
pub use registry::{AdminRegistry, AdminService};
pub use types::*;
pub use validation::{FieldError, ValidationResult};
