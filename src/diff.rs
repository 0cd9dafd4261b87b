//! Diff engine.
//!
//! Compares two snapshots by id. Ids only in `to` are added, ids only in `from` are
//! deleted, ids in both with unequal payloads are modified. Bookkeeping fields never
//! count as a change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::engine::ConfigError;
use crate::item::{ConfigItem, Snapshot};
use crate::types::{ItemId, VersionRef};

/// One side of a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffTarget {
    /// What the next publish would install (published, retirements applied, drafts on top).
    Draft,
    Published,
    Version(VersionRef),
}

impl fmt::Display for DiffTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffTarget::Draft => f.write_str("draft"),
            DiffTarget::Published => f.write_str("published"),
            DiffTarget::Version(r) => write!(f, "{r}"),
        }
    }
}

impl FromStr for DiffTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(DiffTarget::Draft),
            "published" | "current" => Ok(DiffTarget::Published),
            _ => s.parse().map(DiffTarget::Version),
        }
    }
}

impl From<VersionRef> for DiffTarget {
    fn from(r: VersionRef) -> Self {
        DiffTarget::Version(r)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modified<P> {
    pub id: ItemId,
    pub before: ConfigItem<P>,
    pub after: ConfigItem<P>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult<P> {
    pub added: Vec<ConfigItem<P>>,
    pub modified: Vec<Modified<P>>,
    pub deleted: Vec<ConfigItem<P>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl<P> Default for DiffResult<P> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            modified: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<P> DiffResult<P> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            added: self.added.len(),
            modified: self.modified.len(),
            deleted: self.deleted.len(),
        }
    }

    /// The same comparison seen from the other side.
    pub fn reversed(self) -> Self {
        Self {
            added: self.deleted,
            modified: self
                .modified
                .into_iter()
                .map(|m| Modified {
                    id: m.id,
                    before: m.after,
                    after: m.before,
                })
                .collect(),
            deleted: self.added,
        }
    }
}

/// Walks both id-ordered snapshots once; every list comes out sorted by id.
pub fn compute<P: Clone + PartialEq>(from: &Snapshot<P>, to: &Snapshot<P>) -> DiffResult<P> {
    let mut result = DiffResult::default();

    for (id, before) in from {
        match to.get(id) {
            None => result.deleted.push(before.clone()),
            Some(after) if before.payload != after.payload => result.modified.push(Modified {
                id: id.clone(),
                before: before.clone(),
                after: after.clone(),
            }),
            Some(_) => {}
        }
    }
    result.added = to
        .iter()
        .filter(|(id, _)| !from.contains_key(*id))
        .map(|(_, item)| item.clone())
        .collect();

    result
}
