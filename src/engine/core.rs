// 8.0 engine/core.rs: one engine per configuration domain. holds both partitions, the
// version ledger and the audit log behind a single lock.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;
use tracing::debug;

use super::config::EngineConfig;
use super::results::ConfigError;
use crate::domains::ConfigDomain;
use crate::events::{Event, EventPayload};
use crate::events::EventLog;
use crate::history::{VersionHistory, VersionRecord};
use crate::item::{ConfigItem, Snapshot};
use crate::query::{effective_page_size, select, ListQuery, Page};
use crate::repository::EntityRepository;
use crate::types::{EntityKind, ItemId, Partition, Timestamp, VersionId, VersionRef};

/// Everything one domain owns. publish, rollback and restore replace parts of it under the
/// write lock, so a reader always sees a published partition that matches the ledger.
pub(super) struct EngineState<D: ConfigDomain> {
    pub(super) repo: EntityRepository<D>,
    pub(super) history: VersionHistory<D::Payload>,
    pub(super) events: EventLog,
    pub(super) pinned_time: Option<Timestamp>,
}

impl<D: ConfigDomain> EngineState<D> {
    pub(super) fn now(&self) -> Timestamp {
        self.pinned_time.unwrap_or_else(Timestamp::now)
    }

    pub(super) fn record(&mut self, actor: &str, payload: EventPayload) {
        let now = self.now();
        self.events.record(now, D::KIND, actor, payload);
    }

    pub(super) fn latest_id(&self) -> Option<VersionId> {
        self.history.latest().map(|r| r.version_id)
    }

    /// Fails with `Conflict` when the caller's view of the ledger is stale.
    pub(super) fn expect_base(&self, base: Base) -> Result<(), ConfigError> {
        let actual = self.latest_id();
        match base {
            Base::Any => Ok(()),
            Base::Exactly(expected) if expected == actual => Ok(()),
            Base::Exactly(expected) => Err(ConfigError::Conflict {
                kind: D::KIND,
                expected,
                actual,
            }),
        }
    }

    pub(super) fn resolve(&self, reference: &VersionRef) -> Result<&VersionRecord<D::Payload>, ConfigError> {
        self.history
            .resolve(reference)
            .ok_or_else(|| ConfigError::VersionNotFound {
                kind: D::KIND,
                reference: reference.to_string(),
            })
    }
}

/// What a ledger-changing call expects the latest version to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Base {
    Any,
    Exactly(Option<VersionId>),
}

/** 8.1: the per-domain engine. all state lives here */
pub struct ConfigEngine<D: ConfigDomain> {
    pub(super) config: EngineConfig,
    pub(super) state: RwLock<EngineState<D>>,
}

impl<D: ConfigDomain> Default for ConfigEngine<D> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<D: ConfigDomain> ConfigEngine<D> {
    pub fn new(config: EngineConfig) -> Self {
        let state = EngineState {
            repo: EntityRepository::new(),
            history: VersionHistory::new(D::KIND, config.initial_tag.clone()),
            events: EventLog::new(config.max_events),
            pinned_time: None,
        };
        Self {
            config,
            state: RwLock::new(state),
        }
    }

    pub fn kind(&self) -> EntityKind {
        D::KIND
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(super) fn read(&self) -> RwLockReadGuard<'_, EngineState<D>> {
        self.state.read()
    }

    pub(super) fn write(&self) -> RwLockWriteGuard<'_, EngineState<D>> {
        self.state.write()
    }

    // clock: wall time unless pinned. tests and replays pin it.
    pub fn set_time(&self, timestamp: Timestamp) {
        self.write().pinned_time = Some(timestamp);
    }

    pub fn advance_time(&self, millis: i64) {
        let mut state = self.write();
        let now = state.now();
        state.pinned_time = Some(Timestamp::from_millis(now.as_millis() + millis));
    }

    pub fn time(&self) -> Timestamp {
        self.read().now()
    }

    pub fn create_draft(&self, payload: D::Payload) -> Result<ConfigItem<D::Payload>, ConfigError> {
        self.create_draft_as(payload, &self.config.default_actor)
    }

    pub fn create_draft_as(&self, payload: D::Payload, actor: &str) -> Result<ConfigItem<D::Payload>, ConfigError> {
        let mut state = self.write();
        let now = state.now();
        let item = state.repo.create_draft(payload, actor, now)?;
        debug!(entity = %D::KIND, id = %item.id, actor, "draft created");
        state.record(actor, EventPayload::DraftCreated { id: item.id.clone() });
        Ok(item)
    }

    /// Apply a partial JSON payload to a draft.
    pub fn update_draft(&self, id: &ItemId, patch: &serde_json::Value) -> Result<ConfigItem<D::Payload>, ConfigError> {
        self.update_draft_as(id, patch, &self.config.default_actor)
    }

    pub fn update_draft_as(
        &self,
        id: &ItemId,
        patch: &serde_json::Value,
        actor: &str,
    ) -> Result<ConfigItem<D::Payload>, ConfigError> {
        let mut state = self.write();
        let now = state.now();
        let item = state.repo.update_draft(id, patch, now)?;
        debug!(entity = %D::KIND, %id, actor, "draft updated");
        state.record(actor, EventPayload::DraftUpdated { id: id.clone() });
        Ok(item)
    }

    /// False when there was nothing pending for `id`.
    pub fn delete_draft(&self, id: &ItemId) -> bool {
        self.delete_draft_as(id, &self.config.default_actor)
    }

    pub fn delete_draft_as(&self, id: &ItemId, actor: &str) -> bool {
        let mut state = self.write();
        let removed = state.repo.delete_draft(id);
        if removed {
            debug!(entity = %D::KIND, %id, actor, "draft deleted");
            state.record(actor, EventPayload::DraftDeleted { id: id.clone() });
        }
        removed
    }

    pub fn checkout(&self, id: &ItemId) -> Result<ConfigItem<D::Payload>, ConfigError> {
        self.checkout_as(id, &self.config.default_actor)
    }

    pub fn checkout_as(&self, id: &ItemId, actor: &str) -> Result<ConfigItem<D::Payload>, ConfigError> {
        let mut state = self.write();
        let now = state.now();
        let draft = state.repo.checkout(id, now)?;
        debug!(entity = %D::KIND, %id, actor, "published item checked out");
        state.record(actor, EventPayload::DraftCheckedOut { id: id.clone() });
        Ok(draft)
    }

    /// Stage removal of a published item. takes effect on the next publish.
    pub fn retire(&self, id: &ItemId) -> Result<(), ConfigError> {
        self.retire_as(id, &self.config.default_actor)
    }

    pub fn retire_as(&self, id: &ItemId, actor: &str) -> Result<(), ConfigError> {
        let mut state = self.write();
        state.repo.retire(id)?;
        debug!(entity = %D::KIND, %id, actor, "published item retired");
        state.record(actor, EventPayload::ItemRetired { id: id.clone() });
        Ok(())
    }

    pub fn get_by_id(&self, id: &ItemId, partition: Partition) -> Result<ConfigItem<D::Payload>, ConfigError> {
        self.read().repo.get(id, partition).cloned()
    }

    pub fn list_drafts(&self, query: &ListQuery) -> Page<ConfigItem<D::Payload>> {
        let page_size = self.page_size(query);
        let state = self.read();
        select::<D>(state.repo.drafts().values(), query, page_size)
    }

    pub fn list_published(&self, query: &ListQuery) -> Page<ConfigItem<D::Payload>> {
        let page_size = self.page_size(query);
        let published = self.published();
        select::<D>(published.values(), query, page_size)
    }

    pub fn list(&self, partition: Partition, query: &ListQuery) -> Page<ConfigItem<D::Payload>> {
        match partition {
            Partition::Draft => self.list_drafts(query),
            Partition::Published => self.list_published(query),
        }
    }

    fn page_size(&self, query: &ListQuery) -> u32 {
        effective_page_size(query.page_size, self.config.default_page_size, self.config.max_page_size)
    }

    /// The live published partition. the returned snapshot never changes under the caller.
    pub fn published(&self) -> Arc<Snapshot<D::Payload>> {
        self.read().repo.published()
    }

    pub fn drafts(&self) -> Snapshot<D::Payload> {
        self.read().repo.drafts().clone()
    }

    pub fn retired(&self) -> Vec<ItemId> {
        self.read().repo.retired().iter().cloned().collect()
    }

    /// Drafts plus staged retirements.
    pub fn pending_count(&self) -> usize {
        let state = self.read();
        state.repo.drafts().len() + state.repo.retired().len()
    }

    /// Version records, newest first.
    pub fn versions(&self, page: u32, page_size: u32) -> Page<VersionRecord<D::Payload>> {
        let page_size = effective_page_size(page_size, self.config.default_page_size, self.config.max_page_size);
        self.read().history.list(page, page_size).map(Clone::clone)
    }

    pub fn version_count(&self) -> usize {
        self.read().history.len()
    }

    pub fn latest_version(&self) -> Option<VersionRecord<D::Payload>> {
        self.read().history.latest().cloned()
    }

    pub fn latest_version_id(&self) -> Option<VersionId> {
        self.read().latest_id()
    }

    pub fn get_version(&self, id: VersionId) -> Result<VersionRecord<D::Payload>, ConfigError> {
        self.find_version(&VersionRef::Id(id))
    }

    /// Look a version up by ledger id or by tag.
    pub fn find_version(&self, reference: &VersionRef) -> Result<VersionRecord<D::Payload>, ConfigError> {
        self.read().resolve(reference).cloned()
    }

    pub fn events(&self) -> Vec<Event> {
        self.read().events.events().to_vec()
    }

    pub fn recent_events(&self, count: usize) -> Vec<Event> {
        self.read().events.recent(count).to_vec()
    }
}
