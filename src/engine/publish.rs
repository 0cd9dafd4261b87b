// 8.2 engine/publish.rs: promote pending changes into a new published version.
// read-validate-replace runs under one write lock, so publishes of one domain never interleave.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::core::{Base, ConfigEngine};
use super::results::{BatchResult, ConfigError, RowError};
use crate::domains::ConfigDomain;
use crate::events::{EventPayload, PublishedEvent};
use crate::history::{CommitKind, CommitMeta, VersionRecord};
use crate::item::Snapshot;
use crate::types::VersionId;

impl<D: ConfigDomain> ConfigEngine<D> {
    pub fn publish(&self, notes: &str, tags: &[&str]) -> Result<VersionRecord<D::Payload>, ConfigError> {
        let actor = self.config.default_actor.clone();
        self.publish_as(&actor, notes, tags)
    }

    pub fn publish_as(&self, actor: &str, notes: &str, tags: &[&str]) -> Result<VersionRecord<D::Payload>, ConfigError> {
        self.commit_publish(actor, notes, tags, Base::Any)
    }

    /// Publish only if `base` is still the latest version (`None`: nothing published yet).
    pub fn publish_expecting(
        &self,
        base: Option<VersionId>,
        notes: &str,
        tags: &[&str],
    ) -> Result<VersionRecord<D::Payload>, ConfigError> {
        let actor = self.config.default_actor.clone();
        self.commit_publish(&actor, notes, tags, Base::Exactly(base))
    }

    fn commit_publish(
        &self,
        actor: &str,
        notes: &str,
        tags: &[&str],
        base: Base,
    ) -> Result<VersionRecord<D::Payload>, ConfigError> {
        let mut state = self.write();
        state.expect_base(base)?;

        if !state.repo.has_pending() {
            return Err(ConfigError::EmptyPublish(D::KIND));
        }

        // every draft on its own, then the whole set it would produce
        let mut failures: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (id, draft) in state.repo.drafts() {
            let result = D::validate(&draft.payload);
            if !result.is_valid() {
                failures.entry(id.to_string()).or_default().push(result.summary());
            }
        }
        let next = state.repo.effective();
        for error in D::validate_set(&next) {
            failures.entry(error.id).or_default().push(error.reason);
        }

        if !failures.is_empty() {
            let mut batch = BatchResult::default();
            for id in state.repo.drafts().keys() {
                if !failures.contains_key(id.as_str()) {
                    batch.record_success();
                }
            }
            for (id, reasons) in failures {
                batch.record_failure(RowError::new(id, reasons.join("; ")));
            }
            warn!(entity = %D::KIND, failed = batch.failed_count, "publish rejected");
            state.record(
                actor,
                EventPayload::PublishRejected {
                    failed: batch.failed_count,
                    reason: batch.summary(),
                },
            );
            return Err(ConfigError::PublishRejected(batch));
        }

        let tag = state.history.next_tag();
        let snapshot: Snapshot<D::Payload> = next
            .into_iter()
            .map(|(id, item)| {
                let promoted = item.promoted(&tag);
                (id, promoted)
            })
            .collect();
        let snapshot = Arc::new(snapshot);

        let drafts_applied = state.repo.drafts().len();
        let retired = state.repo.retired().len();
        let now = state.now();
        let record = state.history.append(
            Arc::clone(&snapshot),
            CommitMeta {
                created_by: actor.to_string(),
                notes: notes.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                kind: CommitKind::Publish,
            },
            now,
        );
        state.repo.replace_published(snapshot);
        state.repo.clear_pending();

        info!(
            entity = %D::KIND,
            version = %record.version_tag,
            drafts_applied,
            retired,
            items = record.item_count(),
            "published"
        );
        state.record(
            actor,
            EventPayload::Published(PublishedEvent {
                version_id: record.version_id,
                version_tag: record.version_tag.clone(),
                drafts_applied,
                retired,
                item_count: record.item_count(),
            }),
        );
        Ok(record)
    }
}
