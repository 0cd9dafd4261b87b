// 1.0: all the primitives live here. nothing in the engine works without these types.
// item ids, version ids and tags, partitions, entity kinds, timestamps.
// each is a newtype so the compiler catches an item id passed where a version id belongs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::engine::ConfigError;

/// Stable identity of a configuration item within one entity type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Ledger position of a version record. sequential per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub u64);

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// 1.1: semantic version tag ("v1.2.0"). publish bumps the minor component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTag(semver::Version);

impl VersionTag {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    pub fn parse(tag: &str) -> Result<Self, semver::Error> {
        let raw = tag
            .strip_prefix('v')
            .or_else(|| tag.strip_prefix('V'))
            .unwrap_or(tag);
        semver::Version::parse(raw).map(Self)
    }

    /// No pre-release or build metadata.
    pub fn is_release(&self) -> bool {
        self.0.pre.is_empty() && self.0.build.is_empty()
    }

    pub fn next_minor(&self) -> Self {
        Self::new(self.0.major, self.0.minor + 1, 0)
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }
}

impl Default for VersionTag {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for VersionTag {
    type Err = semver::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// 1.2: how callers name a version: by ledger id ("#3" or "3") or by tag ("v1.2.0").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    Id(VersionId),
    Tag(VersionTag),
}

impl fmt::Display for VersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRef::Id(id) => write!(f, "{id}"),
            VersionRef::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

impl FromStr for VersionRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return digits
                .parse()
                .map(|n| VersionRef::Id(VersionId(n)))
                .map_err(|_| ConfigError::InvalidReference(s.to_string()));
        }
        VersionTag::parse(trimmed)
            .map(VersionRef::Tag)
            .map_err(|_| ConfigError::InvalidReference(s.to_string()))
    }
}

impl From<VersionId> for VersionRef {
    fn from(id: VersionId) -> Self {
        VersionRef::Id(id)
    }
}

impl From<VersionTag> for VersionRef {
    fn from(tag: VersionTag) -> Self {
        VersionRef::Tag(tag)
    }
}

// 1.3: an item lives in the draft or the published partition. also used as the item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Draft,
    Published,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Draft => "draft",
            Partition::Published => "published",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" | "drafts" => Ok(Partition::Draft),
            "published" => Ok(Partition::Published),
            other => Err(ConfigError::InvalidReference(other.to_string())),
        }
    }
}

// 1.4: the seven configuration domains the admin platform versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    TradingFee,
    MarginTier,
    CalendarRule,
    RiskRule,
    Instrument,
    IconAsset,
    NavRoute,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::TradingFee,
        EntityKind::MarginTier,
        EntityKind::CalendarRule,
        EntityKind::RiskRule,
        EntityKind::Instrument,
        EntityKind::IconAsset,
        EntityKind::NavRoute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::TradingFee => "trading_fee",
            EntityKind::MarginTier => "margin_tier",
            EntityKind::CalendarRule => "calendar_rule",
            EntityKind::RiskRule => "risk_rule",
            EntityKind::Instrument => "instrument",
            EntityKind::IconAsset => "icon_asset",
            EntityKind::NavRoute => "nav_route",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownEntity(s.to_string()))
    }
}

// 1.5: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_tag_bumps_minor_and_resets_patch() {
        let tag = VersionTag::parse("v1.4.2").unwrap();
        assert_eq!(tag.next_minor().to_string(), "v1.5.0");
        assert_eq!(VersionTag::default().next_minor().to_string(), "v1.1.0");
    }

    #[test]
    fn version_tag_orders_numerically() {
        let a = VersionTag::parse("v1.9.0").unwrap();
        let b = VersionTag::parse("v1.10.0").unwrap();
        assert!(a < b);
    }

    #[test]
    fn version_tag_serializes_with_prefix() {
        let tag = VersionTag::new(2, 3, 0);
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"v2.3.0\"");
        let back: VersionTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }

    #[test]
    fn version_ref_parsing() {
        assert_eq!("#3".parse::<VersionRef>().unwrap(), VersionRef::Id(VersionId(3)));
        assert_eq!("7".parse::<VersionRef>().unwrap(), VersionRef::Id(VersionId(7)));
        assert_eq!(
            "v1.1.0".parse::<VersionRef>().unwrap(),
            VersionRef::Tag(VersionTag::new(1, 1, 0))
        );
        assert!("latest-ish".parse::<VersionRef>().is_err());
    }

    #[test]
    fn entity_kind_round_trips_through_str() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert_eq!("margin-tier".parse::<EntityKind>().unwrap(), EntityKind::MarginTier);
        assert!("swap_curve".parse::<EntityKind>().is_err());
    }
}
