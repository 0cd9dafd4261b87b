//! Entity repository.
//!
//! Owns both partitions of one entity type. Drafts change item by item; the published
//! partition is only ever swapped wholesale (publish or rollback), which is why it sits
//! behind an `Arc` that readers can hold while a new snapshot is installed.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domains::ConfigDomain;
use crate::engine::ConfigError;
use crate::item::{ConfigItem, Snapshot};
use crate::types::{ItemId, Partition, Timestamp};

pub struct EntityRepository<D: ConfigDomain> {
    drafts: Snapshot<D::Payload>,
    published: Arc<Snapshot<D::Payload>>,
    /// Published ids the next publish removes.
    retired: BTreeSet<ItemId>,
    next_seq: u64,
}

impl<D: ConfigDomain> Default for EntityRepository<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: ConfigDomain> EntityRepository<D> {
    pub fn new() -> Self {
        Self {
            drafts: Snapshot::new(),
            published: Arc::new(Snapshot::new()),
            retired: BTreeSet::new(),
            next_seq: 1,
        }
    }

    pub(crate) fn from_parts(
        drafts: Snapshot<D::Payload>,
        published: Arc<Snapshot<D::Payload>>,
        retired: BTreeSet<ItemId>,
        next_seq: u64,
    ) -> Self {
        Self {
            drafts,
            published,
            retired,
            next_seq,
        }
    }

    fn not_found(id: &ItemId, partition: Partition) -> ConfigError {
        ConfigError::NotFound {
            kind: D::KIND,
            id: id.clone(),
            partition,
        }
    }

    /// Next free generated id, skipping anything already present in either partition.
    pub fn next_id(&mut self) -> ItemId {
        loop {
            let id = ItemId::new(format!("{}-{:04}", D::ID_PREFIX, self.next_seq));
            self.next_seq += 1;
            if !self.contains(&id) {
                return id;
            }
        }
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.drafts.contains_key(id) || self.published.contains_key(id)
    }

    pub fn create_draft(&mut self, payload: D::Payload, actor: &str, now: Timestamp) -> Result<ConfigItem<D::Payload>, ConfigError> {
        let result = D::validate(&payload);
        if !result.is_valid() {
            return Err(ConfigError::Validation(result));
        }
        let id = self.next_id();
        let item = ConfigItem::draft(id.clone(), payload, actor, now);
        self.drafts.insert(id, item.clone());
        Ok(item)
    }

    /// Merge the top-level keys of `patch` over the draft's payload, validate, replace.
    pub fn update_draft(
        &mut self,
        id: &ItemId,
        patch: &serde_json::Value,
        now: Timestamp,
    ) -> Result<ConfigItem<D::Payload>, ConfigError> {
        let existing = self
            .drafts
            .get(id)
            .ok_or_else(|| Self::not_found(id, Partition::Draft))?;

        let patch = patch
            .as_object()
            .ok_or_else(|| ConfigError::InvalidPayload("patch must be a JSON object".to_string()))?;
        let mut merged = serde_json::to_value(&existing.payload)?;
        let fields = merged
            .as_object_mut()
            .ok_or_else(|| ConfigError::InvalidPayload("payload is not an object".to_string()))?;
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
        let payload: D::Payload =
            serde_json::from_value(merged).map_err(|e| ConfigError::InvalidPayload(e.to_string()))?;

        let result = D::validate(&payload);
        if !result.is_valid() {
            return Err(ConfigError::Validation(result));
        }

        let item = ConfigItem {
            payload,
            updated_at: now,
            ..existing.clone()
        };
        self.drafts.insert(id.clone(), item.clone());
        Ok(item)
    }

    /// Write a validated row straight into drafts. used by import.
    pub(crate) fn put_draft(&mut self, id: ItemId, payload: D::Payload, actor: &str, now: Timestamp) -> ConfigItem<D::Payload> {
        let item = match self.drafts.get(&id).or_else(|| self.published.get(&id)) {
            Some(existing) => ConfigItem {
                payload,
                status: Partition::Draft,
                updated_at: now,
                ..existing.clone()
            },
            None => ConfigItem::draft(id.clone(), payload, actor, now),
        };
        self.retired.remove(&id);
        self.drafts.insert(id, item.clone());
        item
    }

    /// Open a pending edit of a published item.
    pub fn checkout(&mut self, id: &ItemId, now: Timestamp) -> Result<ConfigItem<D::Payload>, ConfigError> {
        if self.drafts.contains_key(id) {
            return Err(ConfigError::DraftExists {
                kind: D::KIND,
                id: id.clone(),
            });
        }
        let published = self
            .published
            .get(id)
            .ok_or_else(|| Self::not_found(id, Partition::Published))?;
        let draft = published.checked_out(now);
        self.retired.remove(id);
        self.drafts.insert(id.clone(), draft.clone());
        Ok(draft)
    }

    /// Mark a published id for removal by the next publish. drops any pending edit of it.
    pub fn retire(&mut self, id: &ItemId) -> Result<(), ConfigError> {
        if !self.published.contains_key(id) {
            return Err(Self::not_found(id, Partition::Published));
        }
        self.drafts.remove(id);
        self.retired.insert(id.clone());
        Ok(())
    }

    /// Remove a pending change. a retirement counts as one.
    pub fn delete_draft(&mut self, id: &ItemId) -> bool {
        let removed_draft = self.drafts.remove(id).is_some();
        let removed_retirement = self.retired.remove(id);
        removed_draft || removed_retirement
    }

    pub fn get(&self, id: &ItemId, partition: Partition) -> Result<&ConfigItem<D::Payload>, ConfigError> {
        let found = match partition {
            Partition::Draft => self.drafts.get(id),
            Partition::Published => self.published.get(id),
        };
        found.ok_or_else(|| Self::not_found(id, partition))
    }

    pub fn drafts(&self) -> &Snapshot<D::Payload> {
        &self.drafts
    }

    pub fn published(&self) -> Arc<Snapshot<D::Payload>> {
        Arc::clone(&self.published)
    }

    pub fn retired(&self) -> &BTreeSet<ItemId> {
        &self.retired
    }

    pub fn has_pending(&self) -> bool {
        !self.drafts.is_empty() || !self.retired.is_empty()
    }

    /// What publish would install right now: published, minus retirements, overridden by drafts.
    pub fn effective(&self) -> Snapshot<D::Payload> {
        let mut next: Snapshot<D::Payload> = self
            .published
            .iter()
            .filter(|(id, _)| !self.retired.contains(*id))
            .map(|(id, item)| (id.clone(), item.clone()))
            .collect();
        for (id, draft) in &self.drafts {
            next.insert(id.clone(), draft.clone());
        }
        next
    }

    /// Swap in a new published partition. a retirement only survives while its id is published.
    pub(crate) fn replace_published(&mut self, snapshot: Arc<Snapshot<D::Payload>>) {
        self.published = snapshot;
        let published = &self.published;
        self.retired.retain(|id| published.contains_key(id));
    }

    pub(crate) fn clear_pending(&mut self) {
        self.drafts.clear();
        self.retired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{FeeTemplate, TradingFees};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn repo() -> EntityRepository<TradingFees> {
        EntityRepository::new()
    }

    fn fee(level: u8) -> FeeTemplate {
        FeeTemplate::new(level, dec!(0.001), dec!(0.002))
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let mut r = repo();
        let a = r.create_draft(fee(1), "ops", Timestamp::from_millis(1)).unwrap();
        let b = r.create_draft(fee(2), "ops", Timestamp::from_millis(2)).unwrap();
        assert_eq!(a.id.as_str(), "fee-0001");
        assert_eq!(b.id.as_str(), "fee-0002");
        assert!(a.version.is_empty());
        assert_eq!(r.drafts().len(), 2);
    }

    #[test]
    fn create_rejects_invalid_payload() {
        let mut r = repo();
        let err = r
            .create_draft(FeeTemplate::new(1, dec!(2), dec!(3)), "ops", Timestamp::from_millis(1))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(r.drafts().is_empty());
    }

    #[test]
    fn update_merges_partial_payload() {
        let mut r = repo();
        let item = r.create_draft(fee(1), "ops", Timestamp::from_millis(1)).unwrap();
        let updated = r
            .update_draft(&item.id, &json!({"taker_rate": "0.004"}), Timestamp::from_millis(5))
            .unwrap();
        assert_eq!(updated.payload.taker_rate, dec!(0.004));
        assert_eq!(updated.payload.maker_rate, dec!(0.001));
        assert_eq!(updated.created_at, Timestamp::from_millis(1));
        assert_eq!(updated.updated_at, Timestamp::from_millis(5));
    }

    #[test]
    fn update_missing_draft_is_not_found() {
        let mut r = repo();
        let err = r
            .update_draft(&ItemId::from("fee-9999"), &json!({}), Timestamp::from_millis(1))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { partition: Partition::Draft, .. }));
    }

    #[test]
    fn invalid_update_leaves_draft_untouched() {
        let mut r = repo();
        let item = r.create_draft(fee(1), "ops", Timestamp::from_millis(1)).unwrap();
        let err = r
            .update_draft(&item.id, &json!({"maker_rate": "0.5"}), Timestamp::from_millis(2))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(r.get(&item.id, Partition::Draft).unwrap(), &item);
    }

    #[test]
    fn delete_only_touches_drafts() {
        let mut r = repo();
        let item = r.create_draft(fee(1), "ops", Timestamp::from_millis(1)).unwrap();
        assert!(r.delete_draft(&item.id));
        assert!(!r.delete_draft(&item.id));
        assert!(!r.has_pending());
    }

    #[test]
    fn effective_applies_drafts_over_published() {
        let mut r = repo();
        let published = ConfigItem::draft(ItemId::from("fee-0001"), fee(1), "ops", Timestamp::from_millis(0));
        let mut snapshot = Snapshot::new();
        snapshot.insert(published.id.clone(), published.clone());
        snapshot.insert(
            ItemId::from("fee-0002"),
            ConfigItem::draft(ItemId::from("fee-0002"), fee(2), "ops", Timestamp::from_millis(0)),
        );
        r.replace_published(Arc::new(snapshot));

        r.checkout(&published.id, Timestamp::from_millis(3)).unwrap();
        r.update_draft(&published.id, &json!({"name": "VIP one"}), Timestamp::from_millis(4))
            .unwrap();
        r.retire(&ItemId::from("fee-0002")).unwrap();

        let next = r.effective();
        assert_eq!(next.len(), 1);
        assert_eq!(next[&published.id].payload.name, "VIP one");

        // generated ids skip published ones
        assert_eq!(r.next_id().as_str(), "fee-0003");
    }

    #[test]
    fn checkout_twice_conflicts() {
        let mut r = repo();
        let item = ConfigItem::draft(ItemId::from("fee-0001"), fee(1), "ops", Timestamp::from_millis(0));
        r.replace_published(Arc::new(Snapshot::from([(item.id.clone(), item.clone())])));
        r.checkout(&item.id, Timestamp::from_millis(1)).unwrap();
        assert!(matches!(
            r.checkout(&item.id, Timestamp::from_millis(2)),
            Err(ConfigError::DraftExists { .. })
        ));
    }
}
