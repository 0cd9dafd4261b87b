// 9.5 instruments.rs: instrument listings. symbol, assets, tick and lot sizes, listing status.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{duplicate_keys, Column, ConfigDomain};
use crate::engine::RowError;
use crate::item::Snapshot;
use crate::types::EntityKind;
use crate::validation::{ValidationResult, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    PreListing,
    Listed,
    Delisted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// e.g. "BTC-PERP"
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub tick_size: Decimal,
    pub lot_size: Decimal,
    pub min_order_size: Decimal,
    pub max_leverage: u32,
    pub status: ListingStatus,
}

fn is_symbol(s: &str) -> bool {
    !s.is_empty()
        && s.split('-').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        })
}

pub struct Instruments;

impl ConfigDomain for Instruments {
    type Payload = Instrument;

    const KIND: EntityKind = EntityKind::Instrument;
    const ID_PREFIX: &'static str = "inst";
    const COLUMNS: &'static [Column] = &[
        Column::text("symbol"),
        Column::text("base_asset"),
        Column::text("quote_asset"),
        Column::text("tick_size"),
        Column::text("lot_size"),
        Column::text("min_order_size"),
        Column::integer("max_leverage"),
        Column::text("status"),
    ];

    fn validate(inst: &Instrument) -> ValidationResult {
        let mut v = Validator::new();
        v.check(is_symbol(&inst.symbol), "symbol", "must be upper-case segments joined by '-'")
            .required("base_asset", &inst.base_asset)
            .required("quote_asset", &inst.quote_asset)
            .check(
                inst.symbol.starts_with(inst.base_asset.as_str()),
                "symbol",
                "must start with base_asset",
            )
            .check(inst.tick_size > Decimal::ZERO, "tick_size", "must be greater than zero")
            .check(inst.lot_size > Decimal::ZERO, "lot_size", "must be greater than zero")
            .int_in_range("max_leverage", inst.max_leverage.into(), 1, 200);

        if inst.lot_size > Decimal::ZERO {
            v.check(inst.min_order_size >= inst.lot_size, "min_order_size", "must be at least lot_size");
            // order sizes move in lot steps, so the minimum must sit on one
            let on_lot = inst
                .min_order_size
                .checked_rem(inst.lot_size)
                .is_some_and(|remainder| remainder.is_zero());
            v.check(on_lot, "min_order_size", "must be a multiple of lot_size");
        }
        v.finish()
    }

    fn display_name(inst: &Instrument) -> &str {
        &inst.symbol
    }

    fn is_enabled(inst: &Instrument) -> Option<bool> {
        Some(inst.status == ListingStatus::Listed)
    }

    fn validate_set(items: &Snapshot<Instrument>) -> Vec<RowError> {
        duplicate_keys(items, "symbol", |inst| Some(inst.symbol.clone()))
    }
}
