// 9.6 icons.rs: icon assets referenced by instruments and nav entries.

use serde::{Deserialize, Serialize};

use super::{duplicate_keys, Column, ConfigDomain};
use crate::engine::RowError;
use crate::item::Snapshot;
use crate::types::EntityKind;
use crate::validation::{ValidationResult, Validator};

pub const MAX_ICON_EDGE: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconFormat {
    Svg,
    Png,
    Webp,
}

impl IconFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            IconFormat::Svg => "svg",
            IconFormat::Png => "png",
            IconFormat::Webp => "webp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconAsset {
    pub name: String,
    pub url: String,
    pub format: IconFormat,
    pub width: u32,
    pub height: u32,
}

pub struct IconAssets;

impl ConfigDomain for IconAssets {
    type Payload = IconAsset;

    const KIND: EntityKind = EntityKind::IconAsset;
    const ID_PREFIX: &'static str = "icon";
    const COLUMNS: &'static [Column] = &[
        Column::text("name"),
        Column::text("url"),
        Column::text("format"),
        Column::integer("width"),
        Column::integer("height"),
    ];

    fn validate(icon: &IconAsset) -> ValidationResult {
        let mut v = Validator::new();
        v.required("name", &icon.name).check(
            icon.url.starts_with("https://") || icon.url.starts_with("http://"),
            "url",
            "must be an http(s) url",
        );

        let path = icon.url.split(['?', '#']).next().unwrap_or_default();
        let ext = format!(".{}", icon.format.extension());
        v.check(path.to_ascii_lowercase().ends_with(&ext), "url", "extension must match format")
            .int_in_range("width", icon.width.into(), 1, MAX_ICON_EDGE)
            .int_in_range("height", icon.height.into(), 1, MAX_ICON_EDGE);
        v.finish()
    }

    fn display_name(icon: &IconAsset) -> &str {
        &icon.name
    }

    fn validate_set(items: &Snapshot<IconAsset>) -> Vec<RowError> {
        duplicate_keys(items, "icon name", |icon| Some(icon.name.clone()))
    }
}
