// 9.1 fees.rs: trading fee templates per VIP level. rates are fractions, 0.001 = 10 bps.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{duplicate_keys, Column, ConfigDomain};
use crate::engine::RowError;
use crate::item::Snapshot;
use crate::types::EntityKind;
use crate::validation::{ValidationResult, Validator};

pub const MAX_VIP_LEVEL: u8 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeTemplate {
    #[serde(default)]
    pub name: String,
    pub vip_level: u8,
    pub maker_rate: Decimal,
    pub taker_rate: Decimal,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl FeeTemplate {
    pub fn new(vip_level: u8, maker_rate: Decimal, taker_rate: Decimal) -> Self {
        Self {
            name: format!("VIP {vip_level}"),
            vip_level,
            maker_rate,
            taker_rate,
            enabled: true,
        }
    }
}

pub struct TradingFees;

impl ConfigDomain for TradingFees {
    type Payload = FeeTemplate;

    const KIND: EntityKind = EntityKind::TradingFee;
    const ID_PREFIX: &'static str = "fee";
    const COLUMNS: &'static [Column] = &[
        Column::text("name"),
        Column::integer("vip_level"),
        Column::text("maker_rate"),
        Column::text("taker_rate"),
        Column::boolean("enabled"),
    ];

    fn validate(fee: &FeeTemplate) -> ValidationResult {
        let mut v = Validator::new();
        v.max_len("name", &fee.name, 64)
            .int_in_range("vip_level", fee.vip_level.into(), 0, MAX_VIP_LEVEL.into())
            .decimal_in_range("maker_rate", fee.maker_rate, dec!(0), dec!(1))
            .decimal_in_range("taker_rate", fee.taker_rate, dec!(0), dec!(1))
            .check(
                fee.maker_rate <= fee.taker_rate,
                "maker_rate",
                "must not exceed taker_rate",
            );
        v.finish()
    }

    fn display_name(fee: &FeeTemplate) -> &str {
        &fee.name
    }

    fn is_enabled(fee: &FeeTemplate) -> Option<bool> {
        Some(fee.enabled)
    }

    // one live template per VIP level
    fn validate_set(items: &Snapshot<FeeTemplate>) -> Vec<RowError> {
        duplicate_keys(items, "vip level", |fee| fee.enabled.then_some(fee.vip_level))
    }
}
