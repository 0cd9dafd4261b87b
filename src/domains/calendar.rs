// 9.3 calendar.rs: trading calendar and funding schedule rules.
// halts and maintenance windows close a market for a date range; funding overrides
// change the funding interval for that range.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Column, ConfigDomain};
use crate::types::EntityKind;
use crate::validation::{ValidationResult, Validator};

pub const FUNDING_INTERVALS_HOURS: [u32; 4] = [1, 2, 4, 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarRuleKind {
    TradingHalt,
    Maintenance,
    FundingOverride,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarRule {
    pub name: String,
    /// Market symbol, or "*" for every market.
    pub market: String,
    pub kind: CalendarRuleKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub funding_interval_hours: Option<u32>,
    #[serde(default)]
    pub enabled: bool,
}

impl CalendarRule {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

pub struct CalendarRules;

impl ConfigDomain for CalendarRules {
    type Payload = CalendarRule;

    const KIND: EntityKind = EntityKind::CalendarRule;
    const ID_PREFIX: &'static str = "cal";
    const COLUMNS: &'static [Column] = &[
        Column::text("name"),
        Column::text("market"),
        Column::text("kind"),
        Column::text("start_date"),
        Column::text("end_date"),
        Column::integer("funding_interval_hours"),
        Column::boolean("enabled"),
    ];

    fn validate(rule: &CalendarRule) -> ValidationResult {
        let mut v = Validator::new();
        v.required("name", &rule.name)
            .required("market", &rule.market)
            .check(rule.start_date <= rule.end_date, "end_date", "must not be before start_date");

        match (rule.kind, rule.funding_interval_hours) {
            (CalendarRuleKind::FundingOverride, Some(hours)) => {
                v.check(
                    FUNDING_INTERVALS_HOURS.contains(&hours),
                    "funding_interval_hours",
                    "must be one of 1, 2, 4, 8",
                );
            }
            (CalendarRuleKind::FundingOverride, None) => {
                v.push("funding_interval_hours", "is required for funding overrides");
            }
            (_, Some(_)) => {
                v.push("funding_interval_hours", "only applies to funding overrides");
            }
            (_, None) => {}
        }
        v.finish()
    }

    fn display_name(rule: &CalendarRule) -> &str {
        &rule.name
    }

    fn is_enabled(rule: &CalendarRule) -> Option<bool> {
        Some(rule.enabled)
    }
}
