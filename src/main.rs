//! Perps Admin Config Simulation.
//!
//! Walks the configuration lifecycle: drafts, publish, rollback, diff,
//! bulk import and export, and concurrent publishers on one engine.

use perps_config::*;
use rust_decimal_macros::dec;
use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let env = std::env::var("PERPS_ENV").unwrap_or_else(|_| "development".to_string());
    let settings = match env.as_str() {
        "production" => Environment::Production.config(),
        "staging" => Environment::Staging.config(),
        _ => Environment::Development.config(),
    };
    settings
        .validate()
        .map_err(|e| format!("invalid settings: {e:?}"))?;

    println!("Perps Admin Config Engine Simulation");
    println!("Environment: {:?}\n", settings.environment);

    let registry = AdminRegistry::from_config(&settings);

    scenario_1_first_publish(&registry)?;
    scenario_2_margin_rollback(&registry)?;
    scenario_3_risk_import(&registry)?;
    scenario_4_concurrent_publishers(&settings.engine)?;
    scenario_5_nav_round_trip(&registry)?;

    println!("\nPending changes left: {:?}", registry.pending_changes());
    println!("All simulations completed successfully.");
    Ok(())
}

/// Draft a fee template and publish the first version.
fn scenario_1_first_publish(registry: &AdminRegistry) -> Result<(), Box<dyn Error>> {
    println!("Scenario 1: First Publish\n");

    let fees = registry.fees();
    let vip1 = fees.create_draft_as(FeeTemplate::new(1, dec!(0.001), dec!(0.002)), "alice")?;
    println!("  Alice drafts {} (maker {}, taker {})", vip1.id, vip1.payload.maker_rate, vip1.payload.taker_rate);
    println!("  Drafts pending: {}", fees.pending_count());

    let record = fees.publish_as("alice", "initial", &["launch"])?;
    println!("  Published {} with {} item(s)", record.version_tag, record.item_count());
    println!("  Drafts pending: {}\n", fees.pending_count());
    Ok(())
}

/// Tighten a margin tier, then roll back to the original.
fn scenario_2_margin_rollback(registry: &AdminRegistry) -> Result<(), Box<dyn Error>> {
    println!("Scenario 2: Margin Tier Rollback\n");

    let tiers = registry.margin_tiers();
    let tier = tiers.create_draft(MarginTier {
        symbol: "BTC-PERP".to_string(),
        tier: 1,
        threshold: "100".to_string(),
        max_leverage: 50,
        initial_margin_rate: dec!(0.02),
        maintenance_margin_rate: dec!(0.01),
    })?;
    let v1 = tiers.publish("tier 1 at 100", &[])?;
    println!("  {} threshold {}", v1.version_tag, tier.payload.threshold);

    tiers.checkout(&tier.id)?;
    tiers.update_draft(&tier.id, &json!({"threshold": "200"}))?;
    println!("  Pending diff: {:?}", tiers.pending_diff().summary());
    let v2 = tiers.publish("raise threshold", &[])?;
    println!("  {} threshold {}", v2.version_tag, tiers.get_by_id(&tier.id, Partition::Published)?.payload.threshold);

    let v3 = tiers.rollback(&VersionRef::Tag(v1.version_tag.clone()), None)?;
    let current = tiers.get_by_id(&tier.id, Partition::Published)?;
    println!("  {} \"{}\" threshold {}", v3.version_tag, v3.notes, current.payload.threshold);

    let history = tiers.versions(1, 10);
    let tags: Vec<String> = history.data.iter().map(|r| r.version_tag.to_string()).collect();
    println!("  History (newest first): {}\n", tags.join(", "));
    Ok(())
}

/// Bulk import risk rules where one row breaks validation.
fn scenario_3_risk_import(registry: &AdminRegistry) -> Result<(), Box<dyn Error>> {
    println!("Scenario 3: Risk Rule Import\n");

    let rules = vec![
        json!({
            "id": "r1",
            "name": "block oversized orders",
            "priority": 10,
            "conditions": [{"type": "notional_above", "threshold": "1000000"}],
            "actions": [{"type": "reject_order"}],
        }),
        json!({
            "id": "r2",
            "name": "no actions",
            "priority": 20,
            "conditions": [{"type": "leverage_above", "leverage": 20}],
            "actions": [],
        }),
    ];
    let batch = registry.risk_rules().import_values(rules, ImportMode::Merge);
    println!("  Import: {}", batch.summary());
    for error in &batch.errors {
        println!("    {}: {}", error.id, error.reason);
    }

    let drafts = registry.risk_rules().drafts();
    println!("  Drafts: {:?}\n", drafts.keys().map(ItemId::as_str).collect::<Vec<_>>());
    Ok(())
}

/// Two admins publish against the same base; one must see a conflict.
fn scenario_4_concurrent_publishers(config: &EngineConfig) -> Result<(), Box<dyn Error>> {
    println!("Scenario 4: Concurrent Publishers\n");

    let instruments: Arc<ConfigEngine<Instruments>> = Arc::new(ConfigEngine::new(config.clone()));
    let base = instruments.latest_version_id();

    let handles: Vec<_> = ["BTC-PERP", "ETH-PERP"]
        .into_iter()
        .map(|symbol| {
            let engine = Arc::clone(&instruments);
            thread::spawn(move || {
                let base_asset = symbol.split('-').next().unwrap_or_default().to_string();
                engine.create_draft(Instrument {
                    symbol: symbol.to_string(),
                    base_asset,
                    quote_asset: "USD".to_string(),
                    tick_size: dec!(0.1),
                    lot_size: dec!(0.001),
                    min_order_size: dec!(0.001),
                    max_leverage: 20,
                    status: ListingStatus::Listed,
                })?;
                engine.publish_expecting(base, &format!("list {symbol}"), &[])
            })
        })
        .collect();

    for handle in handles {
        match handle.join() {
            Ok(Ok(record)) => println!("  Published {} ({} items)", record.version_tag, record.item_count()),
            Ok(Err(ConfigError::Conflict { expected, actual, .. })) => {
                println!("  Conflict: expected {expected:?}, found {actual:?}")
            }
            Ok(Err(other)) => println!("  Failed: {other}"),
            Err(_) => println!("  Publisher thread panicked"),
        }
    }
    println!("  Versions recorded: {}\n", instruments.version_count());
    Ok(())
}

/// Export navigation routes and import them into a fresh engine.
fn scenario_5_nav_round_trip(registry: &AdminRegistry) -> Result<(), Box<dyn Error>> {
    println!("Scenario 5: Export and Re-import\n");

    let nav = registry.nav();
    for (path, title, order) in [("/config", "Config", 1), ("/config/fees", "Fees", 2)] {
        nav.create_draft(NavRoute {
            path: path.to_string(),
            title: title.to_string(),
            component: format!("{title}Page"),
            parent: (path != "/config").then(|| "/config".to_string()),
            order,
            hidden: false,
            icon: None,
        })?;
    }
    nav.publish("navigation", &[])?;

    let csv = nav.export_partition(Partition::Published, ExportFormat::Csv)?;
    println!("{}", String::from_utf8_lossy(&csv));

    let copy: ConfigEngine<NavRoutes> = ConfigEngine::new(nav.config().clone());
    let batch = copy.import_csv(&csv, ImportMode::Replace)?;
    println!("  Re-import: {}", batch.summary());
    let drift = diff::compute(&nav.published(), &copy.drafts());
    println!("  Drift from source: {:?}", drift.summary());
    Ok(())
}
