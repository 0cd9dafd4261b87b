// 8.3 engine/rollback.rs: republish a historical snapshot as a new version.
// forward only. the ledger grows, nothing in it is rewritten, pending drafts stay put.

use std::sync::Arc;
use tracing::info;

use super::core::{Base, ConfigEngine};
use super::results::ConfigError;
use crate::domains::ConfigDomain;
use crate::events::{EventPayload, RolledBackEvent};
use crate::history::{CommitKind, CommitMeta, VersionRecord};
use crate::types::{VersionId, VersionRef};

impl<D: ConfigDomain> ConfigEngine<D> {
    /// `notes` defaults to "rollback to {tag}".
    pub fn rollback(&self, target: &VersionRef, notes: Option<&str>) -> Result<VersionRecord<D::Payload>, ConfigError> {
        let actor = self.config.default_actor.clone();
        self.rollback_as(&actor, target, notes)
    }

    pub fn rollback_as(
        &self,
        actor: &str,
        target: &VersionRef,
        notes: Option<&str>,
    ) -> Result<VersionRecord<D::Payload>, ConfigError> {
        self.commit_rollback(actor, target, notes, Base::Any)
    }

    pub fn rollback_expecting(
        &self,
        base: Option<VersionId>,
        target: &VersionRef,
        notes: Option<&str>,
    ) -> Result<VersionRecord<D::Payload>, ConfigError> {
        let actor = self.config.default_actor.clone();
        self.commit_rollback(&actor, target, notes, Base::Exactly(base))
    }

    fn commit_rollback(
        &self,
        actor: &str,
        target: &VersionRef,
        notes: Option<&str>,
        base: Base,
    ) -> Result<VersionRecord<D::Payload>, ConfigError> {
        let mut state = self.write();
        state.expect_base(base)?;

        let (target_id, target_tag, snapshot) = {
            let target = state.resolve(target)?;
            (target.version_id, target.version_tag.clone(), Arc::clone(&target.snapshot))
        };
        let notes = notes.map_or_else(|| format!("rollback to {target_tag}"), str::to_string);

        let now = state.now();
        let record = state.history.append(
            Arc::clone(&snapshot),
            CommitMeta {
                created_by: actor.to_string(),
                notes,
                tags: Vec::new(),
                kind: CommitKind::Rollback {
                    target_id,
                    target_tag: target_tag.clone(),
                },
            },
            now,
        );
        state.repo.replace_published(snapshot);

        info!(
            entity = %D::KIND,
            version = %record.version_tag,
            target = %target_tag,
            items = record.item_count(),
            "rolled back"
        );
        state.record(
            actor,
            EventPayload::RolledBack(RolledBackEvent {
                version_id: record.version_id,
                version_tag: record.version_tag.clone(),
                target_id,
                target_tag,
            }),
        );
        Ok(record)
    }
}
