//! List queries: filtering, stable sorting, 1-based pagination.
//!
//! `total` is always the filtered count before pagination. Sorting is stable and
//! falls back to id ascending when sort keys tie.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domains::ConfigDomain;
use crate::item::ConfigItem;
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort_field: Option<String>,
    pub sort_order: SortOrder,
    /// Case-insensitive substring over id and the domain's display field.
    pub search: Option<String>,
    pub enabled: Option<bool>,
    pub created_from: Option<Timestamp>,
    pub created_to: Option<Timestamp>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort_field = Some(field.to_string());
        self.sort_order = order;
        self
    }

    pub fn search(mut self, needle: &str) -> Self {
        self.search = Some(needle.to_string());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn created_between(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.created_from = Some(from);
        self.created_to = Some(to);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as usize)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Slice an already ordered list into a 1-based page.
pub(crate) fn paginate<T>(items: Vec<T>, page: u32, page_size: u32) -> Page<T> {
    let page = page.max(1);
    let total = items.len();
    let start = (page as usize - 1).saturating_mul(page_size as usize);
    let data = items
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();
    Page {
        data,
        total,
        page,
        page_size,
    }
}

/// Normalize page size: 0 means default, anything above the cap is capped.
pub(crate) fn effective_page_size(requested: u32, default: u32, max: u32) -> u32 {
    match requested {
        0 => default,
        n => n.min(max),
    }
}

// missing < bool < number < text, so items lacking the field sort first ascending
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Missing,
    Bool(bool),
    Number(Decimal),
    Text(String),
}

impl SortKey {
    fn from_json(value: Option<&serde_json::Value>) -> Self {
        use serde_json::Value;
        match value {
            None | Some(Value::Null) => SortKey::Missing,
            Some(Value::Bool(b)) => SortKey::Bool(*b),
            Some(Value::Number(n)) => parse_decimal(&n.to_string())
                .map(SortKey::Number)
                .unwrap_or(SortKey::Missing),
            // decimals travel as strings; compare them numerically
            Some(Value::String(s)) => parse_decimal(s)
                .map(SortKey::Number)
                .unwrap_or_else(|| SortKey::Text(s.to_lowercase())),
            Some(other) => SortKey::Text(other.to_string()),
        }
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn to_snake_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for ch in field.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn sort_key<P: Serialize>(item: &ConfigItem<P>, field: &str) -> SortKey {
    let field = to_snake_case(field);
    match field.as_str() {
        "id" => SortKey::Text(item.id.as_str().to_string()),
        "created_at" => SortKey::Number(Decimal::from(item.created_at.as_millis())),
        "updated_at" => SortKey::Number(Decimal::from(item.updated_at.as_millis())),
        "created_by" => SortKey::Text(item.created_by.clone()),
        "version" => SortKey::Text(item.version.clone()),
        name => {
            let payload = serde_json::to_value(&item.payload).ok();
            SortKey::from_json(payload.as_ref().and_then(|p| p.get(name)))
        }
    }
}

fn matches<D: ConfigDomain>(item: &ConfigItem<D::Payload>, query: &ListQuery) -> bool {
    if let Some(needle) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = needle.to_lowercase();
        let hit = item.id.as_str().to_lowercase().contains(&needle)
            || D::display_name(&item.payload).to_lowercase().contains(&needle);
        if !hit {
            return false;
        }
    }
    if let Some(wanted) = query.enabled {
        if let Some(actual) = D::is_enabled(&item.payload) {
            if actual != wanted {
                return false;
            }
        }
    }
    if query.created_from.is_some_and(|from| item.created_at < from) {
        return false;
    }
    if query.created_to.is_some_and(|to| item.created_at > to) {
        return false;
    }
    true
}

/// Filter, sort and page one partition. `items` must arrive in id order.
pub(crate) fn select<'a, D: ConfigDomain>(
    items: impl Iterator<Item = &'a ConfigItem<D::Payload>>,
    query: &ListQuery,
    page_size: u32,
) -> Page<ConfigItem<D::Payload>> {
    let filtered: Vec<&ConfigItem<D::Payload>> = items.filter(|item| matches::<D>(item, query)).collect();

    let ordered: Vec<ConfigItem<D::Payload>> = match query.sort_field.as_deref() {
        Some(field) if !field.trim().is_empty() => {
            let mut keyed: Vec<(SortKey, &ConfigItem<D::Payload>)> =
                filtered.into_iter().map(|item| (sort_key(item, field), item)).collect();
            keyed.sort_by(|(ka, a), (kb, b)| {
                let by_key = match query.sort_order {
                    SortOrder::Asc => ka.cmp(kb),
                    SortOrder::Desc => kb.cmp(ka),
                };
                by_key.then_with(|| a.id.cmp(&b.id))
            });
            keyed.into_iter().map(|(_, item)| item.clone()).collect()
        }
        _ => filtered.into_iter().cloned().collect(),
    };

    paginate(ordered, query.page, page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_one_based() {
        let page = paginate((1..=45).collect(), 3, 20);
        assert_eq!(page.data, (41..=45).collect::<Vec<_>>());
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages(), 3);

        let zero = paginate(vec![1, 2, 3], 0, 2);
        assert_eq!(zero.page, 1);
        assert_eq!(zero.data, vec![1, 2]);
    }

    #[test]
    fn page_past_end_is_empty_but_keeps_total() {
        let page = paginate(vec!['a', 'b'], 5, 10);
        assert!(page.data.is_empty());
        assert_eq!(page.total, 2);
    }

    #[test]
    fn page_size_normalization() {
        assert_eq!(effective_page_size(0, 20, 200), 20);
        assert_eq!(effective_page_size(500, 20, 200), 200);
        assert_eq!(effective_page_size(7, 20, 200), 7);
    }

    #[test]
    fn decimal_strings_sort_numerically() {
        let small = SortKey::from_json(Some(&serde_json::json!("0.002")));
        let large = SortKey::from_json(Some(&serde_json::json!("0.01")));
        assert!(small < large);
        assert!(SortKey::Missing < small);
    }

    #[test]
    fn camel_case_fields_resolve() {
        assert_eq!(to_snake_case("makerRate"), "maker_rate");
        assert_eq!(to_snake_case("vip_level"), "vip_level");
    }
}
