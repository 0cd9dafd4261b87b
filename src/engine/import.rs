// 8.5 engine/import.rs: bulk-load external rows into drafts.
// each row is validated on its own; failures are collected, successes land immediately.
// merge and update take the write lock per row so readers interleave. replace holds it
// for the whole batch. a cancel takes effect between rows either way, and rows committed
// before it stay committed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::core::{ConfigEngine, EngineState};
use super::export::ExportFormat;
use super::results::{BatchResult, ConfigError, RowError};
use crate::codec::{self, RawRow};
use crate::domains::ConfigDomain;
use crate::events::{EventPayload, ImportedEvent};
use crate::types::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// add new ids; an id already present in drafts or published fails its row, untouched
    #[default]
    Merge,
    /// clear pending changes when the first row is taken up, then write every row
    Replace,
    /// only overwrite ids that already exist
    Update,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Merge => "merge",
            ImportMode::Replace => "replace",
            ImportMode::Update => "update",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(ImportMode::Merge),
            "replace" => Ok(ImportMode::Replace),
            "update" => Ok(ImportMode::Update),
            other => Err(ConfigError::InvalidReference(format!("import mode {other}"))),
        }
    }
}

/// Shared flag a caller flips to stop an import between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A typed import row. rows without an id get a generated one (merge and replace only).
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow<P> {
    pub id: Option<ItemId>,
    pub payload: P,
}

impl<P> ImportRow<P> {
    pub fn new(payload: P) -> Self {
        Self { id: None, payload }
    }

    pub fn with_id(id: impl Into<ItemId>, payload: P) -> Self {
        Self {
            id: Some(id.into()),
            payload,
        }
    }
}

fn row_label(index: usize, id: Option<&ItemId>) -> String {
    id.map_or_else(|| format!("row {}", index + 1), |id| id.as_str().to_string())
}

impl<D: ConfigDomain> ConfigEngine<D> {
    pub fn import_batch(&self, rows: Vec<ImportRow<D::Payload>>, mode: ImportMode) -> BatchResult {
        self.run_import(rows.into_iter().map(Ok), mode, None, &self.config.default_actor)
    }

    pub fn import_batch_as(&self, rows: Vec<ImportRow<D::Payload>>, mode: ImportMode, actor: &str) -> BatchResult {
        self.run_import(rows.into_iter().map(Ok), mode, None, actor)
    }

    /// Rows are pulled one at a time, so a lazy source can stop early through the token.
    /// In replace mode the source is pulled under the write lock and must not call back
    /// into this engine.
    pub fn import_with_cancel(
        &self,
        rows: impl IntoIterator<Item = ImportRow<D::Payload>>,
        mode: ImportMode,
        cancel: &CancelToken,
    ) -> BatchResult {
        self.run_import(rows.into_iter().map(Ok), mode, Some(cancel), &self.config.default_actor)
    }

    /// Untyped rows (`id` plus payload fields), as produced by a JSON export.
    pub fn import_values(&self, rows: Vec<serde_json::Value>, mode: ImportMode) -> BatchResult {
        self.import_values_as(rows, mode, &self.config.default_actor)
    }

    pub fn import_values_as(&self, rows: Vec<serde_json::Value>, mode: ImportMode, actor: &str) -> BatchResult {
        let typed = rows.into_iter().enumerate().map(|(index, value)| {
            let raw = RawRow::from_json(value).map_err(|reason| RowError::new(row_label(index, None), reason))?;
            Self::typed(index, raw)
        });
        self.run_import(typed, mode, None, actor)
    }

    /// A JSON array of row objects. a body that is not an array fails the whole import.
    pub fn import_json(&self, bytes: &[u8], mode: ImportMode) -> Result<BatchResult, ConfigError> {
        self.import_json_as(bytes, mode, &self.config.default_actor)
    }

    fn import_json_as(&self, bytes: &[u8], mode: ImportMode, actor: &str) -> Result<BatchResult, ConfigError> {
        let rows: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
        Ok(self.import_values_as(rows, mode, actor))
    }

    /// CSV with a header row, decoded using the domain's column schema.
    pub fn import_csv(&self, bytes: &[u8], mode: ImportMode) -> Result<BatchResult, ConfigError> {
        self.import_csv_as(bytes, mode, &self.config.default_actor)
    }

    fn import_csv_as(&self, bytes: &[u8], mode: ImportMode, actor: &str) -> Result<BatchResult, ConfigError> {
        let rows = codec::decode_csv(bytes, D::COLUMNS, self.config.csv_delimiter)?;
        let typed = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| row.and_then(|raw| Self::typed(index, raw)));
        Ok(self.run_import(typed, mode, None, actor))
    }

    pub fn import(&self, bytes: &[u8], format: ExportFormat, mode: ImportMode) -> Result<BatchResult, ConfigError> {
        self.import_as(bytes, format, mode, &self.config.default_actor)
    }

    pub fn import_as(
        &self,
        bytes: &[u8],
        format: ExportFormat,
        mode: ImportMode,
        actor: &str,
    ) -> Result<BatchResult, ConfigError> {
        match format {
            ExportFormat::Csv => self.import_csv_as(bytes, mode, actor),
            ExportFormat::Json => self.import_json_as(bytes, mode, actor),
        }
    }

    fn typed(index: usize, raw: RawRow) -> Result<ImportRow<D::Payload>, RowError> {
        match serde_json::from_value(raw.fields) {
            Ok(payload) => Ok(ImportRow { id: raw.id, payload }),
            Err(e) => Err(RowError::new(
                row_label(index, raw.id.as_ref()),
                format!("invalid payload: {e}"),
            )),
        }
    }

    fn run_import(
        &self,
        rows: impl Iterator<Item = Result<ImportRow<D::Payload>, RowError>>,
        mode: ImportMode,
        cancel: Option<&CancelToken>,
        actor: &str,
    ) -> BatchResult {
        let mut batch = BatchResult::default();

        // replace holds the lock for the whole batch so no other write lands between the
        // clear and the last row. the clear waits for the first row to pass the cancel check.
        let mut held = (mode == ImportMode::Replace).then(|| self.write());
        let mut cleared = false;

        for (index, row) in rows.enumerate() {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                batch.cancelled = true;
                warn!(entity = %D::KIND, processed = batch.processed, "import cancelled");
                break;
            }
            if let Some(state) = held.as_mut().filter(|_| !cleared) {
                state.repo.clear_pending();
                cleared = true;
            }
            if index >= self.config.max_import_rows {
                let label = match &row {
                    Ok(row) => row_label(index, row.id.as_ref()),
                    Err(e) => e.id.clone(),
                };
                batch.record_failure(RowError::new(
                    label,
                    format!("exceeds import limit of {} rows", self.config.max_import_rows),
                ));
                continue;
            }

            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    batch.record_failure(e);
                    continue;
                }
            };

            let label = row_label(index, row.id.as_ref());
            let result = D::validate(&row.payload);
            if !result.is_valid() {
                batch.record_failure(RowError::new(label, result.summary()));
                continue;
            }

            let written = match held.as_mut() {
                Some(state) => Self::write_row(state, row, mode, actor),
                None => Self::write_row(&mut self.write(), row, mode, actor),
            };
            match written {
                Ok(id) => {
                    debug!(entity = %D::KIND, %id, %mode, "row imported");
                    batch.record_success();
                }
                Err(reason) => batch.record_failure(RowError::new(label, reason)),
            }
        }

        let mut state = held.unwrap_or_else(|| self.write());
        // an empty replace still empties the drafts
        if mode == ImportMode::Replace && !cleared && !batch.cancelled {
            state.repo.clear_pending();
        }
        info!(
            entity = %D::KIND,
            %mode,
            succeeded = batch.success_count,
            failed = batch.failed_count,
            cancelled = batch.cancelled,
            "import finished"
        );
        state.record(
            actor,
            EventPayload::Imported(ImportedEvent {
                mode,
                success_count: batch.success_count,
                failed_count: batch.failed_count,
                cancelled: batch.cancelled,
            }),
        );
        batch
    }

    fn write_row(
        state: &mut EngineState<D>,
        row: ImportRow<D::Payload>,
        mode: ImportMode,
        actor: &str,
    ) -> Result<ItemId, String> {
        let now = state.now();
        let id = match (mode, row.id) {
            (ImportMode::Merge, Some(id)) if state.repo.drafts().contains_key(&id) => {
                return Err(format!("{id} already has a draft"));
            }
            (ImportMode::Merge, Some(id)) if state.repo.contains(&id) => {
                return Err(format!("{id} already published"));
            }
            (ImportMode::Update, None) => return Err("update requires an id".to_string()),
            (ImportMode::Update, Some(id)) if !state.repo.contains(&id) => {
                return Err(format!("{id} does not exist"));
            }
            (_, Some(id)) => id,
            (_, None) => state.repo.next_id(),
        };
        state.repo.put_draft(id.clone(), row.payload, actor, now);
        Ok(id)
    }
}
