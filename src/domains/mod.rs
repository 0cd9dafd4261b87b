//! Configuration domains.
//!
//! Each domain is a zero-sized marker implementing [`ConfigDomain`]: it names the
//! payload type, the rules the validation gate applies, and the column schema used by
//! CSV import and export. The engine is instantiated once per domain.

mod calendar;
mod fees;
mod icons;
mod instruments;
mod margin;
mod nav;
mod risk;

pub use calendar::{CalendarRule, CalendarRuleKind, CalendarRules};
pub use fees::{FeeTemplate, TradingFees};
pub use icons::{IconAsset, IconAssets, IconFormat};
pub use instruments::{Instrument, Instruments, ListingStatus};
pub use margin::{MarginTier, MarginTiers};
pub use nav::{NavRoute, NavRoutes};
pub use risk::{RiskRule, RiskRules, RuleAction, RuleCondition};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::engine::RowError;
use crate::item::Snapshot;
use crate::types::EntityKind;
use crate::validation::ValidationResult;

/// How a payload field is written to, and read back from, a CSV cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// strings, enums, dates and decimals (decimals serialize as strings)
    Text,
    Integer,
    Bool,
    /// nested structures, encoded as compact JSON inside the cell
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Text }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Integer }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Bool }
    }

    pub const fn json(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Json }
    }
}

pub trait ConfigDomain: Send + Sync + 'static {
    type Payload: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    const KIND: EntityKind;
    /// Prefix for generated item ids ("fee" -> "fee-0001").
    const ID_PREFIX: &'static str;
    /// Documented export column order. `id` is always written first and is not listed.
    const COLUMNS: &'static [Column];

    fn validate(payload: &Self::Payload) -> ValidationResult;

    /// Primary display field, searched alongside the id.
    fn display_name(payload: &Self::Payload) -> &str;

    /// Domains without an enabled notion ignore the `enabled` list filter.
    fn is_enabled(_payload: &Self::Payload) -> Option<bool> {
        None
    }

    /// Rules over the whole set a publish would produce (uniqueness, references).
    fn validate_set(_items: &Snapshot<Self::Payload>) -> Vec<RowError> {
        Vec::new()
    }
}

/// Reports every id after the first that maps to an already-seen key.
pub(crate) fn duplicate_keys<P, K, F>(items: &Snapshot<P>, label: &str, key: F) -> Vec<RowError>
where
    K: Ord + std::fmt::Display,
    F: Fn(&P) -> Option<K>,
{
    let mut seen = std::collections::BTreeMap::new();
    let mut errors = Vec::new();
    for (id, item) in items {
        let Some(k) = key(&item.payload) else {
            continue;
        };
        if let Some(first) = seen.get(&k) {
            errors.push(RowError::new(
                id.as_str(),
                format!("duplicate {label} {k} (already used by {first})"),
            ));
        } else {
            seen.insert(k, id.clone());
        }
    }
    errors
}
