// 8.0.2: result types and errors for engine operations.

use serde::{Deserialize, Serialize};

use crate::types::{EntityKind, ItemId, Partition, VersionId};
use crate::validation::ValidationResult;

/// One failed row or item, keyed by id (or "row N" when the row had none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub id: String,
    pub reason: String,
}

impl RowError {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of a bulk operation. per-row failures are data here, not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<RowError>,
    /// Rows looked at before the batch finished or stopped.
    pub processed: usize,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn record_success(&mut self) {
        self.success_count += 1;
        self.processed += 1;
    }

    pub fn record_failure(&mut self, error: RowError) {
        self.failed_count += 1;
        self.processed += 1;
        self.errors.push(error);
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count > 0
    }

    pub fn summary(&self) -> String {
        let mut text = format!("{} succeeded, {} failed", self.success_count, self.failed_count);
        if self.cancelled {
            text.push_str(", cancelled");
        }
        text
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{kind} {id} not found in {partition}")]
    NotFound {
        kind: EntityKind,
        id: ItemId,
        partition: Partition,
    },

    #[error("{kind} version {reference} not found")]
    VersionNotFound { kind: EntityKind, reference: String },

    #[error("nothing to publish for {0}")]
    EmptyPublish(EntityKind),

    #[error("{kind} history moved: expected latest {expected:?}, found {actual:?}")]
    Conflict {
        kind: EntityKind,
        expected: Option<VersionId>,
        actual: Option<VersionId>,
    },

    #[error("validation failed: {}", .0.summary())]
    Validation(ValidationResult),

    #[error("publish rejected: {}", .0.summary())]
    PublishRejected(BatchResult),

    #[error("{kind} {id} already has a pending draft")]
    DraftExists { kind: EntityKind, id: ItemId },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export failed: {0}")]
    Export(String),

    #[error("snapshot rejected: {0}")]
    Snapshot(String),
}
