// 3.0 item.rs: one configuration record plus the bookkeeping the ledger needs.
// payload is the domain data; everything else is bookkeeping and never diffed or exported.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{ItemId, Partition, Timestamp, VersionTag};

/// A full partition keyed by id. ordered so snapshots serialize identically every time.
pub type Snapshot<P> = BTreeMap<ItemId, ConfigItem<P>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem<P> {
    pub id: ItemId,
    pub payload: P,
    pub status: Partition,
    /// Tag of the version that last touched this item. empty for unpublished drafts.
    pub version: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub created_by: String,
}

impl<P> ConfigItem<P> {
    pub fn draft(id: ItemId, payload: P, actor: &str, now: Timestamp) -> Self {
        Self {
            id,
            payload,
            status: Partition::Draft,
            version: String::new(),
            created_at: now,
            updated_at: now,
            created_by: actor.to_string(),
        }
    }

    pub fn is_draft(&self) -> bool {
        self.status == Partition::Draft
    }
}

impl<P: Clone> ConfigItem<P> {
    // 3.1: publish restamps promoted drafts with the new tag
    pub(crate) fn promoted(&self, tag: &VersionTag) -> Self {
        Self {
            status: Partition::Published,
            version: tag.to_string(),
            ..self.clone()
        }
    }

    // a pending edit of a published item keeps its identity and provenance
    pub(crate) fn checked_out(&self, now: Timestamp) -> Self {
        Self {
            status: Partition::Draft,
            updated_at: now,
            ..self.clone()
        }
    }
}

impl<P: PartialEq> ConfigItem<P> {
    /// Content equality. bookkeeping (status, version, timestamps) is ignored.
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id && self.payload == other.payload
    }
}
