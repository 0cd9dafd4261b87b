// 8.7 engine/state.rs: dump and restore one engine's tables (drafts, published, retired,
// version ledger). restore verifies the dump before anything is replaced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use super::core::ConfigEngine;
use super::results::ConfigError;
use crate::domains::ConfigDomain;
use crate::history::{VersionHistory, VersionRecord};
use crate::item::Snapshot;
use crate::repository::EntityRepository;
use crate::types::{EntityKind, ItemId, Partition};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot<P> {
    pub entity: EntityKind,
    pub drafts: Snapshot<P>,
    pub published: Snapshot<P>,
    pub retired: BTreeSet<ItemId>,
    pub versions: Vec<VersionRecord<P>>,
    pub next_seq: u64,
}

fn reject(reason: impl Into<String>) -> ConfigError {
    ConfigError::Snapshot(reason.into())
}

impl<D: ConfigDomain> ConfigEngine<D> {
    pub fn snapshot(&self) -> EngineSnapshot<D::Payload> {
        let state = self.read();
        EngineSnapshot {
            entity: D::KIND,
            drafts: state.repo.drafts().clone(),
            published: (*state.repo.published()).clone(),
            retired: state.repo.retired().clone(),
            versions: state.history.records().to_vec(),
            next_seq: state.repo.next_seq(),
        }
    }

    pub fn save_state(&self) -> Result<Vec<u8>, ConfigError> {
        let snapshot = self.snapshot();
        let bytes = if self.config.pretty_json {
            serde_json::to_vec_pretty(&snapshot)?
        } else {
            serde_json::to_vec(&snapshot)?
        };
        Ok(bytes)
    }

    pub fn load_state(&self, bytes: &[u8]) -> Result<(), ConfigError> {
        let snapshot: EngineSnapshot<D::Payload> = serde_json::from_slice(bytes)?;
        self.restore(snapshot)
    }

    /// Replace all tables with `snapshot`. the event log is kept.
    pub fn restore(&self, snapshot: EngineSnapshot<D::Payload>) -> Result<(), ConfigError> {
        Self::verify(&snapshot)?;

        let EngineSnapshot {
            drafts,
            retired,
            versions,
            next_seq,
            ..
        } = snapshot;
        // share the ledger's Arc so published and latest version stay one allocation
        let published = versions
            .last()
            .map_or_else(|| Arc::new(Snapshot::new()), |r| Arc::clone(&r.snapshot));
        let version_count = versions.len();
        let draft_count = drafts.len();

        let mut state = self.write();
        state.repo = EntityRepository::from_parts(drafts, published, retired, next_seq);
        state.history = VersionHistory::from_records(D::KIND, self.config.initial_tag.clone(), versions);

        info!(entity = %D::KIND, versions = version_count, drafts = draft_count, "state restored");
        Ok(())
    }

    fn verify(snapshot: &EngineSnapshot<D::Payload>) -> Result<(), ConfigError> {
        if snapshot.entity != D::KIND {
            return Err(reject(format!("dump is for {}, engine is {}", snapshot.entity, D::KIND)));
        }
        if snapshot.next_seq == 0 {
            return Err(reject("next_seq must be at least 1"));
        }

        for pair in snapshot.versions.windows(2) {
            if pair[1].version_id <= pair[0].version_id {
                return Err(reject(format!("version ids out of order at {}", pair[1].version_id)));
            }
            if pair[1].version_tag <= pair[0].version_tag {
                return Err(reject(format!("version tags out of order at {}", pair[1].version_tag)));
            }
        }
        if let Some(record) = snapshot.versions.iter().find(|r| r.entity != D::KIND) {
            return Err(reject(format!("version {} belongs to {}", record.version_id, record.entity)));
        }

        let latest = snapshot.versions.last().map(|r| r.snapshot.as_ref());
        let expected_published = latest.cloned().unwrap_or_default();
        if snapshot.published != expected_published {
            return Err(reject("published partition does not match the latest version"));
        }

        for (partition, items) in [(Partition::Draft, &snapshot.drafts), (Partition::Published, &snapshot.published)] {
            if let Some((key, item)) = items.iter().find(|(key, item)| **key != item.id || item.status != partition) {
                return Err(reject(format!("{partition} entry {key} is inconsistent with item {}", item.id)));
            }
        }
        if let Some(id) = snapshot.retired.iter().find(|id| !snapshot.published.contains_key(*id)) {
            return Err(reject(format!("retired id {id} is not published")));
        }
        for (id, draft) in &snapshot.drafts {
            let result = D::validate(&draft.payload);
            if !result.is_valid() {
                return Err(reject(format!("draft {id}: {}", result.summary())));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{Instrument, Instruments, ListingStatus};
    use crate::types::{Timestamp, VersionTag};
    use rust_decimal_macros::dec;

    fn instrument(symbol: &str) -> Instrument {
        let (base, quote) = symbol.split_once('-').unwrap();
        Instrument {
            symbol: symbol.to_string(),
            base_asset: base.to_string(),
            quote_asset: quote.to_string(),
            tick_size: dec!(0.1),
            lot_size: dec!(0.001),
            min_order_size: dec!(0.001),
            max_leverage: 50,
            status: ListingStatus::Listed,
        }
    }

    fn populated() -> ConfigEngine<Instruments> {
        let engine = ConfigEngine::default();
        engine.set_time(Timestamp::from_millis(0));
        engine.create_draft(instrument("BTC-USD")).unwrap();
        engine.publish("listing", &[]).unwrap();
        engine.create_draft(instrument("ETH-USD")).unwrap();
        engine
    }

    #[test]
    fn save_and_load_round_trip() {
        let source = populated();
        let bytes = source.save_state().unwrap();

        let target: ConfigEngine<Instruments> = ConfigEngine::default();
        target.load_state(&bytes).unwrap();
        assert_eq!(target.snapshot(), source.snapshot());
        assert_eq!(target.pending_count(), 1);

        // the restored ledger keeps counting from where it was
        target.set_time(Timestamp::from_millis(5));
        let record = target.publish("second", &[]).unwrap();
        assert_eq!(record.version_tag, VersionTag::new(1, 1, 0));
    }

    #[test]
    fn wrong_entity_is_rejected() {
        let mut dump = populated().snapshot();
        dump.entity = EntityKind::IconAsset;
        let target: ConfigEngine<Instruments> = ConfigEngine::default();
        assert!(matches!(target.restore(dump), Err(ConfigError::Snapshot(_))));
    }

    #[test]
    fn published_must_match_ledger() {
        let mut dump = populated().snapshot();
        dump.published.clear();
        let target: ConfigEngine<Instruments> = ConfigEngine::default();
        let err = target.restore(dump).unwrap_err();
        assert!(err.to_string().contains("latest version"));
        assert_eq!(target.version_count(), 0);
    }

    #[test]
    fn retired_ids_must_be_published() {
        let mut dump = populated().snapshot();
        dump.retired.insert(ItemId::from("inst-0099"));
        let target: ConfigEngine<Instruments> = ConfigEngine::default();
        assert!(target.restore(dump).is_err());
    }
}
