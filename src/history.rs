// 4.0 history.rs: append-only version ledger for one entity type.
// records are immutable once appended; "what is published" is always the latest record.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::item::Snapshot;
use crate::query::{paginate, Page};
use crate::types::{EntityKind, Timestamp, VersionId, VersionRef, VersionTag};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommitKind {
    Publish,
    Rollback { target_id: VersionId, target_tag: VersionTag },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord<P> {
    pub version_id: VersionId,
    pub entity: EntityKind,
    pub version_tag: VersionTag,
    pub created_at: Timestamp,
    pub created_by: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub kind: CommitKind,
    /// Exact published content at this version, shared with the repository that installed it.
    pub snapshot: Arc<Snapshot<P>>,
}

impl<P> VersionRecord<P> {
    pub fn item_count(&self) -> usize {
        self.snapshot.len()
    }

    pub fn summary(&self) -> VersionSummary {
        VersionSummary {
            version_id: self.version_id,
            entity: self.entity,
            version_tag: self.version_tag.clone(),
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            notes: self.notes.clone(),
            tags: self.tags.clone(),
            kind: self.kind.clone(),
            item_count: self.item_count(),
        }
    }
}

/// A record without its snapshot, for version lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version_id: VersionId,
    pub entity: EntityKind,
    pub version_tag: VersionTag,
    pub created_at: Timestamp,
    pub created_by: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub kind: CommitKind,
    pub item_count: usize,
}

/// Metadata the caller supplies for a new commit.
#[derive(Debug, Clone)]
pub struct CommitMeta {
    pub created_by: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub kind: CommitKind,
}

#[derive(Debug)]
pub struct VersionHistory<P> {
    entity: EntityKind,
    initial_tag: VersionTag,
    records: Vec<VersionRecord<P>>,
}

impl<P: Clone> VersionHistory<P> {
    pub fn new(entity: EntityKind, initial_tag: VersionTag) -> Self {
        Self {
            entity,
            initial_tag,
            records: Vec::new(),
        }
    }

    /// Rebuild from persisted records, which must already be in append order.
    pub(crate) fn from_records(entity: EntityKind, initial_tag: VersionTag, records: Vec<VersionRecord<P>>) -> Self {
        Self {
            entity,
            initial_tag,
            records,
        }
    }

    /// Tag the next append will receive.
    pub fn next_tag(&self) -> VersionTag {
        match self.records.last() {
            Some(last) => last.version_tag.next_minor(),
            None => self.initial_tag.clone(),
        }
    }

    pub fn next_id(&self) -> VersionId {
        VersionId(self.records.last().map_or(1, |r| r.version_id.0 + 1))
    }

    pub fn append(&mut self, snapshot: Arc<Snapshot<P>>, meta: CommitMeta, now: Timestamp) -> VersionRecord<P> {
        let record = VersionRecord {
            version_id: self.next_id(),
            entity: self.entity,
            version_tag: self.next_tag(),
            created_at: now,
            created_by: meta.created_by,
            notes: meta.notes,
            tags: meta.tags,
            kind: meta.kind,
            snapshot,
        };
        self.records.push(record.clone());
        record
    }

    pub fn latest(&self) -> Option<&VersionRecord<P>> {
        self.records.last()
    }

    pub fn get(&self, id: VersionId) -> Option<&VersionRecord<P>> {
        // restored ledgers may have gaps, so no index arithmetic
        self.records.iter().find(|r| r.version_id == id)
    }

    pub fn find_by_tag(&self, tag: &VersionTag) -> Option<&VersionRecord<P>> {
        self.records.iter().find(|r| &r.version_tag == tag)
    }

    pub fn resolve(&self, reference: &VersionRef) -> Option<&VersionRecord<P>> {
        match reference {
            VersionRef::Id(id) => self.get(*id),
            VersionRef::Tag(tag) => self.find_by_tag(tag),
        }
    }

    /// Newest first by creation time; ledger order breaks ties.
    pub fn newest_first(&self) -> Vec<&VersionRecord<P>> {
        let mut ordered: Vec<&VersionRecord<P>> = self.records.iter().collect();
        ordered.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.version_id.cmp(&a.version_id))
        });
        ordered
    }

    pub fn list(&self, page: u32, page_size: u32) -> Page<&VersionRecord<P>> {
        paginate(self.newest_first(), page, page_size)
    }

    pub fn records(&self) -> &[VersionRecord<P>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
