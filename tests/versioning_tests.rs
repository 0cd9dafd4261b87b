//! Versioning invariant tests.
//!
//! End-to-end lifecycles through the public engine API: drafts, publish,
//! rollback, diff and bulk import, one domain at a time.

use perps_config::*;
use rust_decimal_macros::dec;
use serde_json::json;

fn fee_engine() -> ConfigEngine<TradingFees> {
    let engine = ConfigEngine::new(EngineConfig::default());
    engine.set_time(Timestamp::from_millis(1_700_000_000_000));
    engine
}

fn tier_engine() -> ConfigEngine<MarginTiers> {
    let engine = ConfigEngine::new(EngineConfig::default());
    engine.set_time(Timestamp::from_millis(1_700_000_000_000));
    engine
}

fn tier(threshold: &str) -> MarginTier {
    MarginTier {
        symbol: "BTC-PERP".to_string(),
        tier: 1,
        threshold: threshold.to_string(),
        max_leverage: 20,
        initial_margin_rate: dec!(0.05),
        maintenance_margin_rate: dec!(0.025),
    }
}

fn risk_rule(name: &str, priority: u32) -> RiskRule {
    RiskRule {
        name: name.to_string(),
        priority,
        conditions: vec![RuleCondition::LeverageAbove { leverage: 25 }],
        actions: vec![RuleAction::CapLeverage { max_leverage: 25 }],
        enabled: true,
    }
}

/// Worked lifecycles for individual domains.
mod scenario_tests {
    use super::*;

    #[test]
    fn first_publish_moves_drafts_into_v1() {
        let engine = fee_engine();
        engine
            .create_draft(FeeTemplate::new(1, dec!(0.001), dec!(0.002)))
            .unwrap();
        assert_eq!(engine.drafts().len(), 1);

        let record = engine.publish("initial", &[]).unwrap();
        assert_eq!(record.version_tag.to_string(), "v1.0.0");
        assert_eq!(engine.published().len(), 1);
        assert!(engine.drafts().is_empty());
    }

    #[test]
    fn rollback_restores_threshold_as_third_version() {
        let engine = tier_engine();
        let item = engine.create_draft(tier("100")).unwrap();
        engine.publish("v1", &[]).unwrap();

        engine.advance_time(1_000);
        engine.checkout(&item.id).unwrap();
        engine.update_draft(&item.id, &json!({"threshold": "200"})).unwrap();
        engine.publish("v2", &[]).unwrap();

        engine.advance_time(1_000);
        let tag: VersionRef = "v1.0.0".parse().unwrap();
        engine.rollback(&tag, None).unwrap();

        let current = engine.get_by_id(&item.id, Partition::Published).unwrap();
        assert_eq!(current.payload.threshold, "100");

        let versions = engine.versions(1, 10);
        let tags: Vec<String> = versions.data.iter().map(|r| r.version_tag.to_string()).collect();
        assert_eq!(tags, vec!["v1.2.0", "v1.1.0", "v1.0.0"]);
        assert_eq!(versions.total, 3);
        assert_eq!(engine.latest_version().unwrap().version_tag.to_string(), "v1.2.0");
    }

    #[test]
    fn merge_import_keeps_valid_rows_only() {
        let engine: ConfigEngine<RiskRules> = ConfigEngine::default();
        let mut broken = risk_rule("no actions", 2);
        broken.actions.clear();

        let batch = engine.import_batch(
            vec![
                ImportRow::with_id("r1", risk_rule("cap leverage", 1)),
                ImportRow::with_id("r2", broken),
            ],
            ImportMode::Merge,
        );

        assert_eq!(batch.success_count, 1);
        assert_eq!(batch.failed_count, 1);
        assert_eq!(batch.errors[0].id, "r2");
        let drafts = engine.drafts();
        assert!(drafts.contains_key(&ItemId::from("r1")));
        assert!(!drafts.contains_key(&ItemId::from("r2")));
    }
}

/// Publish coordinator guarantees.
mod publish_tests {
    use super::*;

    #[test]
    fn published_is_union_with_draft_override() {
        let engine = fee_engine();
        let a = engine.create_draft(FeeTemplate::new(1, dec!(0.001), dec!(0.002))).unwrap();
        let b = engine.create_draft(FeeTemplate::new(2, dec!(0.0008), dec!(0.0018))).unwrap();
        engine.publish("v1", &[]).unwrap();

        engine.checkout(&a.id).unwrap();
        engine.update_draft(&a.id, &json!({"maker_rate": "0.0009"})).unwrap();
        let c = engine.create_draft(FeeTemplate::new(3, dec!(0.0006), dec!(0.0016))).unwrap();
        let record = engine.publish("v2", &[]).unwrap();

        let published = engine.published();
        assert_eq!(published.len(), 3);
        assert_eq!(published[&a.id].payload.maker_rate, dec!(0.0009));
        assert_eq!(published[&b.id].payload.maker_rate, dec!(0.0008));
        assert!(published.contains_key(&c.id));
        assert!(published.values().all(|i| i.status == Partition::Published && i.version == "v1.1.0"));
        assert_eq!(*record.snapshot, *published);
    }

    #[test]
    fn one_invalid_draft_blocks_the_whole_publish() {
        let engine = fee_engine();
        engine.create_draft(FeeTemplate::new(1, dec!(0.001), dec!(0.002))).unwrap();
        engine.publish("v1", &[]).unwrap();
        let before = engine.published();

        engine.create_draft(FeeTemplate::new(4, dec!(0.001), dec!(0.002))).unwrap();
        // a second live template for VIP 1
        engine.create_draft(FeeTemplate::new(1, dec!(0.0005), dec!(0.001))).unwrap();

        let err = engine.publish("v2", &[]).unwrap_err();
        let ConfigError::PublishRejected(batch) = err else {
            panic!("expected a rejected publish");
        };
        assert_eq!(batch.failed_count, 1);
        assert!(batch.errors[0].reason.contains("duplicate vip level"));

        assert_eq!(*engine.published(), *before);
        assert_eq!(engine.version_count(), 1);
        assert_eq!(engine.pending_count(), 2);
    }

    #[test]
    fn tags_increase_with_every_commit() {
        let engine = tier_engine();
        let item = engine.create_draft(tier("100")).unwrap();
        let mut tags = vec![engine.publish("v1", &[]).unwrap().version_tag];

        for threshold in ["150", "175"] {
            engine.checkout(&item.id).unwrap();
            engine.update_draft(&item.id, &json!({ "threshold": threshold })).unwrap();
            tags.push(engine.publish("edit", &[]).unwrap().version_tag);
        }
        tags.push(engine.rollback(&VersionRef::Id(VersionId(1)), None).unwrap().version_tag);

        assert!(tags.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(tags.last().unwrap().to_string(), "v1.3.0");
    }

    #[test]
    fn events_trace_the_lifecycle() {
        let engine = fee_engine();
        engine.create_draft(FeeTemplate::new(1, dec!(0.001), dec!(0.002))).unwrap();
        engine.publish("v1", &[]).unwrap();
        engine.rollback(&VersionRef::Id(VersionId(1)), Some("replay")).unwrap();

        let events = engine.events();
        assert!(events.windows(2).all(|w| w[0].id < w[1].id));
        assert!(matches!(events[1].payload, EventPayload::Published(_)));
        let EventPayload::RolledBack(ref rolled) = events[2].payload else {
            panic!("expected a rollback event");
        };
        assert_eq!(rolled.target_id, VersionId(1));
    }
}

/// Rollback engine guarantees.
mod rollback_tests {
    use super::*;

    #[test]
    fn rollback_snapshot_equals_target() {
        let engine = tier_engine();
        let item = engine.create_draft(tier("100")).unwrap();
        let v1 = engine.publish("v1", &[]).unwrap();
        engine.checkout(&item.id).unwrap();
        engine.update_draft(&item.id, &json!({"threshold": "300"})).unwrap();
        engine.publish("v2", &[]).unwrap();

        let rolled = engine.rollback(&VersionRef::Tag(v1.version_tag.clone()), None).unwrap();
        assert_eq!(*rolled.snapshot, *v1.snapshot);
        assert!(engine
            .diff(&DiffTarget::Version(VersionRef::Id(v1.version_id)), &DiffTarget::Published)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn rollback_of_the_latest_version_is_still_a_commit() {
        let engine = tier_engine();
        engine.create_draft(tier("100")).unwrap();
        engine.publish("v1", &[]).unwrap();

        let record = engine.rollback(&VersionRef::Id(VersionId(1)), None).unwrap();
        assert_eq!(record.version_id, VersionId(2));
        assert_eq!(engine.version_count(), 2);
    }

    #[test]
    fn history_is_never_rewritten() {
        let engine = tier_engine();
        let item = engine.create_draft(tier("100")).unwrap();
        let v1 = engine.publish("v1", &[]).unwrap();
        engine.checkout(&item.id).unwrap();
        engine.update_draft(&item.id, &json!({"threshold": "400"})).unwrap();
        engine.publish("v2", &[]).unwrap();
        engine.rollback(&VersionRef::Id(VersionId(1)), None).unwrap();

        let stored = engine.get_version(VersionId(1)).unwrap();
        assert_eq!(stored, v1);
    }
}

/// Diff engine as exposed through the engine.
mod diff_tests {
    use super::*;

    #[test]
    fn draft_side_previews_next_publish() {
        let engine = fee_engine();
        let keep = engine.create_draft(FeeTemplate::new(1, dec!(0.001), dec!(0.002))).unwrap();
        let gone = engine.create_draft(FeeTemplate::new(2, dec!(0.001), dec!(0.002))).unwrap();
        engine.publish("v1", &[]).unwrap();

        engine.retire(&gone.id).unwrap();
        engine.checkout(&keep.id).unwrap();
        engine.update_draft(&keep.id, &json!({"name": "VIP one"})).unwrap();
        let preview = engine.diff(&DiffTarget::Published, &DiffTarget::Draft).unwrap();

        let v2 = engine.publish("v2", &[]).unwrap();
        let actual = engine
            .diff(&DiffTarget::Version(VersionRef::Id(VersionId(1))), &DiffTarget::Version(VersionRef::Id(v2.version_id)))
            .unwrap();
        assert_eq!(preview.summary(), actual.summary());
        assert_eq!(actual.summary(), DiffSummary { added: 0, modified: 1, deleted: 1 });
    }

    #[test]
    fn results_are_sorted_by_id() {
        let engine = fee_engine();
        for level in [5, 3, 8, 1] {
            engine.create_draft(FeeTemplate::new(level, dec!(0.001), dec!(0.002))).unwrap();
        }
        let diff = engine.pending_diff();
        let ids: Vec<&str> = diff.added.iter().map(|i| i.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn parsed_targets() {
        let engine = fee_engine();
        engine.create_draft(FeeTemplate::new(1, dec!(0.001), dec!(0.002))).unwrap();
        engine.publish("v1", &[]).unwrap();

        let from: DiffTarget = "v1.0.0".parse().unwrap();
        let to: DiffTarget = "current".parse().unwrap();
        assert!(engine.diff(&from, &to).unwrap().is_empty());
    }
}

/// Listing behaviour on the published partition.
mod listing_tests {
    use super::*;

    #[test]
    fn search_and_enabled_filters() {
        let engine: ConfigEngine<RiskRules> = ConfigEngine::default();
        engine.create_draft(risk_rule("Leverage cap", 1)).unwrap();
        let mut off = risk_rule("Whale notify", 2);
        off.enabled = false;
        off.actions = vec![RuleAction::Notify { channel: "#risk".to_string() }];
        engine.create_draft(off).unwrap();
        engine.publish("rules", &[]).unwrap();

        let found = engine.list_published(&ListQuery::new().search("whale"));
        assert_eq!(found.total, 1);
        assert_eq!(found.data[0].payload.name, "Whale notify");

        let enabled = engine.list_published(&ListQuery::new().enabled(true));
        assert_eq!(enabled.total, 1);
        assert_eq!(enabled.data[0].payload.name, "Leverage cap");
    }

    #[test]
    fn descending_sort_ties_break_by_id() {
        let engine: ConfigEngine<RiskRules> = ConfigEngine::default();
        for name in ["a", "b", "c"] {
            let mut rule = risk_rule(name, 7);
            rule.enabled = false;
            engine.create_draft(rule).unwrap();
        }
        let page = engine.list_drafts(&ListQuery::new().sort_by("priority", SortOrder::Desc));
        let ids: Vec<&str> = page.data.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["risk-0001", "risk-0002", "risk-0003"]);
    }
}
