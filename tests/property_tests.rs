//! Property-based tests for the versioning core.
//!
//! These tests verify diff, ledger and import/export invariants hold under random inputs.

use perps_config::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

// Strategies for generating test data
fn rate_strategy() -> impl Strategy<Value = (Decimal, Decimal)> {
    (0i64..=50i64, 0i64..=50i64).prop_map(|(maker, extra)| {
        let maker = Decimal::new(maker, 4);
        (maker, maker + Decimal::new(extra, 4)) // maker <= taker, both under 1%
    })
}

fn fee_strategy() -> impl Strategy<Value = FeeTemplate> {
    (0u8..=10u8, rate_strategy(), any::<bool>()).prop_map(|(level, (maker, taker), enabled)| {
        let mut fee = FeeTemplate::new(level, maker, taker);
        fee.enabled = enabled;
        fee
    })
}

/// A snapshot of up to `max` items over a small id space so two snapshots overlap.
fn snapshot_strategy(max: usize) -> impl Strategy<Value = Snapshot<u32>> {
    prop::collection::btree_map(0u8..20u8, 0u32..5u32, 0..max).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(key, value)| {
                let id = ItemId::new(format!("item-{key:02}"));
                (id.clone(), ConfigItem::draft(id, value, "prop", Timestamp::from_millis(0)))
            })
            .collect()
    })
}

fn engine() -> ConfigEngine<TradingFees> {
    let engine = ConfigEngine::default();
    engine.set_time(Timestamp::from_millis(0));
    engine
}

proptest! {
    /// A snapshot compared with itself has no changes
    #[test]
    fn diff_reflexive(snapshot in snapshot_strategy(15)) {
        prop_assert!(diff::compute(&snapshot, &snapshot).is_empty());
    }

    /// diff(a, b) is diff(b, a) with sides swapped
    #[test]
    fn diff_symmetric(a in snapshot_strategy(15), b in snapshot_strategy(15)) {
        prop_assert_eq!(diff::compute(&a, &b).reversed(), diff::compute(&b, &a));
    }

    /// added + common - deleted accounts for every id in `to`
    #[test]
    fn diff_counts_partition_ids(a in snapshot_strategy(15), b in snapshot_strategy(15)) {
        let d = diff::compute(&a, &b);
        let common = a.keys().filter(|id| b.contains_key(*id)).count();
        prop_assert_eq!(d.added.len() + common, b.len());
        prop_assert_eq!(d.deleted.len() + common, a.len());
        prop_assert!(d.modified.len() <= common);
        prop_assert!(d.added.windows(2).all(|w| w[0].id < w[1].id));
    }

    /// Applying a diff's added/modified/deleted to `from` reproduces `to`'s payloads
    #[test]
    fn diff_replays(a in snapshot_strategy(15), b in snapshot_strategy(15)) {
        let d = diff::compute(&a, &b);
        let mut replay: BTreeMap<ItemId, u32> = a.iter().map(|(id, i)| (id.clone(), i.payload)).collect();
        for item in &d.deleted {
            replay.remove(&item.id);
        }
        for change in &d.modified {
            replay.insert(change.id.clone(), change.after.payload);
        }
        for item in &d.added {
            replay.insert(item.id.clone(), item.payload);
        }
        let expected: BTreeMap<ItemId, u32> = b.iter().map(|(id, i)| (id.clone(), i.payload)).collect();
        prop_assert_eq!(replay, expected);
    }

    /// Every commit, publish or rollback, receives a strictly greater tag
    #[test]
    fn tags_strictly_increase(steps in prop::collection::vec((fee_strategy(), any::<bool>()), 1..12)) {
        let engine = engine();
        for (fee, roll_back) in steps {
            let mut fee = fee;
            // keep the set rule satisfied: only the freshest template stays live
            fee.enabled = false;
            engine.create_draft(fee).unwrap();
            engine.publish("step", &[]).unwrap();
            if roll_back {
                engine.rollback(&VersionRef::Id(VersionId(1)), None).unwrap();
            }
        }

        let versions = engine.versions(1, 200);
        let mut tags: Vec<VersionTag> = versions.data.into_iter().map(|r| r.version_tag).collect();
        tags.reverse();
        prop_assert!(tags.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(tags[0].clone(), VersionTag::new(1, 0, 0));
    }

    /// Validation is a pure function of the payload
    #[test]
    fn validation_idempotent(fee in fee_strategy()) {
        prop_assert_eq!(TradingFees::validate(&fee), TradingFees::validate(&fee));
        prop_assert!(TradingFees::validate(&fee).is_valid());
    }

    /// Importing a JSON export in replace mode reproduces the exported payloads
    #[test]
    fn json_export_replace_round_trip(fees in prop::collection::vec(fee_strategy(), 0..20)) {
        let source = engine();
        for fee in fees {
            source.create_draft(fee).unwrap();
        }
        let bytes = source.export_partition(Partition::Draft, ExportFormat::Json).unwrap();

        let target = engine();
        let batch = target.import_json(&bytes, ImportMode::Replace).unwrap();
        prop_assert_eq!(batch.failed_count, 0);

        let payloads = |snapshot: &Snapshot<FeeTemplate>| {
            snapshot.iter().map(|(id, i)| (id.clone(), i.payload.clone())).collect::<Vec<_>>()
        };
        prop_assert_eq!(payloads(&target.drafts()), payloads(&source.drafts()));
    }

    /// CSV export survives an import into an empty engine
    #[test]
    fn csv_export_replace_round_trip(fees in prop::collection::vec(fee_strategy(), 1..20)) {
        let source = engine();
        for fee in fees {
            source.create_draft(fee).unwrap();
        }
        let bytes = source.export_partition(Partition::Draft, ExportFormat::Csv).unwrap();

        let target = engine();
        let batch = target.import_csv(&bytes, ImportMode::Replace).unwrap();
        prop_assert_eq!(batch.success_count, source.pending_count());
        prop_assert!(target.pending_diff().summary() == source.pending_diff().summary());
        prop_assert!(diff::compute(&source.drafts(), &target.drafts()).is_empty());
    }

    /// Pages never overlap and together cover the filtered set
    #[test]
    fn pages_cover_everything(count in 0usize..40, page_size in 1u32..10) {
        let engine = engine();
        for i in 0..count {
            let mut fee = FeeTemplate::new((i % 11) as u8, Decimal::ZERO, Decimal::ZERO);
            fee.name = format!("tier {i:02}");
            engine.create_draft(fee).unwrap();
        }
        let mut seen = Vec::new();
        let mut page = 1;
        loop {
            let result = engine.list_drafts(&ListQuery::new().sort_by("name", SortOrder::Desc).page(page, page_size));
            prop_assert_eq!(result.total, count);
            if result.data.is_empty() {
                break;
            }
            seen.extend(result.data.into_iter().map(|i| i.id));
            page += 1;
        }
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), count);
        prop_assert_eq!(seen.len(), count);
    }
}

#[cfg(test)]
mod edge_cases {
    use super::*;

    #[test]
    fn empty_snapshots_diff_empty() {
        let empty: Snapshot<u32> = Snapshot::new();
        assert!(diff::compute(&empty, &empty).is_empty());
    }

    #[test]
    fn page_past_the_end_keeps_total() {
        let engine = engine();
        engine.create_draft(FeeTemplate::new(1, Decimal::ZERO, Decimal::ZERO)).unwrap();
        let page = engine.list_drafts(&ListQuery::new().page(9, 5));
        assert!(page.data.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn unknown_version_reference() {
        assert!("latest".parse::<VersionRef>().is_err());
        assert_eq!("#3".parse::<VersionRef>().unwrap(), VersionRef::Id(VersionId(3)));
    }
}
