//! Engine configuration options.

use serde::{Deserialize, Serialize};

use crate::types::VersionTag;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Tag of the first version ever published.
    pub initial_tag: VersionTag,
    /// Actor recorded when a caller does not name one.
    pub default_actor: String,
    /// Rows past this many in one import are reported as failed.
    pub max_import_rows: usize,
    pub csv_delimiter: u8,
    pub pretty_json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            default_page_size: 20,
            max_page_size: 200,
            initial_tag: VersionTag::default(),
            default_actor: "system".to_string(),
            max_import_rows: 10_000,
            csv_delimiter: b',',
            pretty_json: false,
        }
    }
}
