//! Margin tiers.
//!
//! Leverage tiers reduce max leverage as position notional grows. Each tier covers
//! notional up to `threshold`; higher tiers must carry higher thresholds and
//! stricter margin rates.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::{duplicate_keys, Column, ConfigDomain};
use crate::engine::RowError;
use crate::item::Snapshot;
use crate::types::EntityKind;
use crate::validation::{ValidationResult, Validator};

pub const MAX_LEVERAGE: u64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginTier {
    pub symbol: String,
    pub tier: u32,
    /// Upper notional bound for this tier, as a decimal string ("100000").
    pub threshold: String,
    pub max_leverage: u32,
    pub initial_margin_rate: Decimal,
    pub maintenance_margin_rate: Decimal,
}

impl MarginTier {
    pub fn threshold_value(&self) -> Option<Decimal> {
        Decimal::from_str(self.threshold.trim()).ok()
    }
}

pub struct MarginTiers;

impl ConfigDomain for MarginTiers {
    type Payload = MarginTier;

    const KIND: EntityKind = EntityKind::MarginTier;
    const ID_PREFIX: &'static str = "tier";
    const COLUMNS: &'static [Column] = &[
        Column::text("symbol"),
        Column::integer("tier"),
        Column::text("threshold"),
        Column::integer("max_leverage"),
        Column::text("initial_margin_rate"),
        Column::text("maintenance_margin_rate"),
    ];

    fn validate(tier: &MarginTier) -> ValidationResult {
        let mut v = Validator::new();
        v.required("symbol", &tier.symbol)
            .check(tier.tier >= 1, "tier", "must be at least 1")
            .int_in_range("max_leverage", tier.max_leverage.into(), 1, MAX_LEVERAGE);
        v.positive_decimal_str("threshold", &tier.threshold);

        let im = tier.initial_margin_rate;
        let mm = tier.maintenance_margin_rate;
        let im_in_range = im > Decimal::ZERO && im <= Decimal::ONE;
        v.check(im_in_range, "initial_margin_rate", "must be in (0, 1]")
            .check(mm > Decimal::ZERO && mm < im, "maintenance_margin_rate", "must be positive and below initial_margin_rate");

        // 10x leverage needs at least 10% initial margin
        if im_in_range && tier.max_leverage > 0 {
            match im.checked_mul(Decimal::from(tier.max_leverage)) {
                Some(cover) if cover >= dec!(1) => {}
                _ => {
                    v.push("initial_margin_rate", "too low for max_leverage");
                }
            }
        }
        v.finish()
    }

    fn display_name(tier: &MarginTier) -> &str {
        &tier.symbol
    }

    fn validate_set(items: &Snapshot<MarginTier>) -> Vec<RowError> {
        let mut errors = duplicate_keys(items, "symbol/tier", |t| Some(format!("{}/{}", t.symbol, t.tier)));

        let mut by_symbol: BTreeMap<&str, Vec<(&str, &MarginTier)>> = BTreeMap::new();
        for (id, item) in items {
            by_symbol
                .entry(item.payload.symbol.as_str())
                .or_default()
                .push((id.as_str(), &item.payload));
        }
        for tiers in by_symbol.values_mut() {
            tiers.sort_by_key(|(_, t)| t.tier);
            for pair in tiers.windows(2) {
                let (_, lower) = pair[0];
                let (id, upper) = pair[1];
                if lower.tier == upper.tier {
                    continue;
                }
                if let (Some(lo), Some(hi)) = (lower.threshold_value(), upper.threshold_value()) {
                    if hi <= lo {
                        errors.push(RowError::new(
                            id,
                            format!("threshold {hi} must exceed tier {} threshold {lo}", lower.tier),
                        ));
                    }
                }
                if upper.max_leverage > lower.max_leverage {
                    errors.push(RowError::new(
                        id,
                        format!("max_leverage must not increase above tier {}", lower.tier),
                    ));
                }
            }
        }
        errors
    }
}
