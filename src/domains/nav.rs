// 9.7 nav.rs: dashboard navigation entries mapped to route paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{duplicate_keys, Column, ConfigDomain};
use crate::engine::RowError;
use crate::item::Snapshot;
use crate::types::EntityKind;
use crate::validation::{ValidationResult, Validator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavRoute {
    pub path: String,
    pub title: String,
    pub component: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub icon: Option<String>,
}

fn is_route_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.chars().any(char::is_whitespace)
        && (path == "/" || !path.ends_with('/'))
        && !path.contains("//")
}

pub struct NavRoutes;

impl ConfigDomain for NavRoutes {
    type Payload = NavRoute;

    const KIND: EntityKind = EntityKind::NavRoute;
    const ID_PREFIX: &'static str = "nav";
    const COLUMNS: &'static [Column] = &[
        Column::text("path"),
        Column::text("title"),
        Column::text("component"),
        Column::text("parent"),
        Column::integer("order"),
        Column::boolean("hidden"),
        Column::text("icon"),
    ];

    fn validate(route: &NavRoute) -> ValidationResult {
        let mut v = Validator::new();
        v.check(is_route_path(&route.path), "path", "must be an absolute route path")
            .required("title", &route.title)
            .max_len("title", &route.title, 48)
            .required("component", &route.component);

        if let Some(parent) = &route.parent {
            v.check(is_route_path(parent), "parent", "must be an absolute route path")
                .check(parent != &route.path, "parent", "must differ from path");
        }
        v.finish()
    }

    fn display_name(route: &NavRoute) -> &str {
        &route.title
    }

    fn is_enabled(route: &NavRoute) -> Option<bool> {
        Some(!route.hidden)
    }

    fn validate_set(items: &Snapshot<NavRoute>) -> Vec<RowError> {
        let mut errors = duplicate_keys(items, "path", |route| Some(route.path.clone()));
        let paths: BTreeSet<&str> = items.values().map(|i| i.payload.path.as_str()).collect();
        for (id, item) in items {
            if let Some(parent) = &item.payload.parent {
                if !paths.contains(parent.as_str()) {
                    errors.push(RowError::new(id.as_str(), format!("parent {parent} does not exist")));
                }
            }
        }
        errors
    }
}
