//! Risk rules.
//!
//! A rule fires when every condition matches and then applies its actions in order.
//! Conditions and actions are closed sets of tagged variants so validation and
//! diffing can look inside them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{duplicate_keys, Column, ConfigDomain};
use crate::engine::RowError;
use crate::item::Snapshot;
use crate::types::EntityKind;
use crate::validation::{ValidationResult, Validator};

const MAX_PRIORITY: u64 = 1000;
const MAX_RULE_LEVERAGE: u32 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCondition {
    /// Position notional in quote currency.
    NotionalAbove { threshold: Decimal },
    LeverageAbove { leverage: u32 },
    /// Mark vs index deviation as a fraction (0.05 = 5%).
    PriceDeviationAbove { fraction: Decimal },
    AccountAgeBelow { days: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    RejectOrder,
    CapLeverage { max_leverage: u32 },
    Notify { channel: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRule {
    pub name: String,
    pub priority: u32,
    pub conditions: Vec<RuleCondition>,
    pub actions: Vec<RuleAction>,
    #[serde(default)]
    pub enabled: bool,
}

fn validate_condition(v: &mut Validator, index: usize, condition: &RuleCondition) {
    match condition {
        RuleCondition::NotionalAbove { threshold } => {
            v.check(
                *threshold > Decimal::ZERO,
                &format!("conditions[{index}].threshold"),
                "must be greater than zero",
            );
        }
        RuleCondition::LeverageAbove { leverage } => {
            v.check(
                (1..=MAX_RULE_LEVERAGE).contains(leverage),
                &format!("conditions[{index}].leverage"),
                "must be between 1 and 200",
            );
        }
        RuleCondition::PriceDeviationAbove { fraction } => {
            v.check(
                *fraction > Decimal::ZERO && *fraction <= Decimal::ONE,
                &format!("conditions[{index}].fraction"),
                "must be in (0, 1]",
            );
        }
        RuleCondition::AccountAgeBelow { days } => {
            v.check(*days > 0, &format!("conditions[{index}].days"), "must be at least 1");
        }
    }
}

fn validate_action(v: &mut Validator, index: usize, action: &RuleAction) {
    match action {
        RuleAction::RejectOrder => {}
        RuleAction::CapLeverage { max_leverage } => {
            v.check(
                (1..=MAX_RULE_LEVERAGE).contains(max_leverage),
                &format!("actions[{index}].max_leverage"),
                "must be between 1 and 200",
            );
        }
        RuleAction::Notify { channel } => {
            v.required(&format!("actions[{index}].channel"), channel);
        }
    }
}

pub struct RiskRules;

impl ConfigDomain for RiskRules {
    type Payload = RiskRule;

    const KIND: EntityKind = EntityKind::RiskRule;
    const ID_PREFIX: &'static str = "risk";
    const COLUMNS: &'static [Column] = &[
        Column::text("name"),
        Column::integer("priority"),
        Column::json("conditions"),
        Column::json("actions"),
        Column::boolean("enabled"),
    ];

    fn validate(rule: &RiskRule) -> ValidationResult {
        let mut v = Validator::new();
        v.required("name", &rule.name)
            .int_in_range("priority", rule.priority.into(), 0, MAX_PRIORITY)
            .check(!rule.conditions.is_empty(), "conditions", "needs at least one condition")
            .check(!rule.actions.is_empty(), "actions", "needs at least one action");

        for (i, condition) in rule.conditions.iter().enumerate() {
            validate_condition(&mut v, i, condition);
        }
        for (i, action) in rule.actions.iter().enumerate() {
            validate_action(&mut v, i, action);
        }

        // rejecting and then capping the same order is contradictory
        let rejects = rule.actions.iter().any(|a| matches!(a, RuleAction::RejectOrder));
        let caps = rule.actions.iter().any(|a| matches!(a, RuleAction::CapLeverage { .. }));
        v.check(!(rejects && caps), "actions", "reject_order cannot be combined with cap_leverage");
        v.finish()
    }

    fn display_name(rule: &RiskRule) -> &str {
        &rule.name
    }

    fn is_enabled(rule: &RiskRule) -> Option<bool> {
        Some(rule.enabled)
    }

    // evaluation order is by priority, so two enabled rules cannot share one
    fn validate_set(items: &Snapshot<RiskRule>) -> Vec<RowError> {
        duplicate_keys(items, "priority", |rule| rule.enabled.then_some(rule.priority))
    }
}
