//! Admin registry.
//!
//! Holds one engine per domain. Typed callers use the accessors; callers that only know
//! an entity name (an HTTP layer, a CLI) go through [`AdminService`], which carries the
//! same contract with JSON payloads.

use serde_json::Value;
use tracing::info;

use crate::config::AdminConfig;
use crate::diff::DiffTarget;
use crate::domains::{
    CalendarRules, ConfigDomain, IconAssets, Instruments, MarginTiers, NavRoutes, RiskRules, TradingFees,
};
use crate::engine::{BatchResult, ConfigEngine, ConfigError, EngineConfig, ExportFormat, ImportMode};
use crate::history::VersionSummary;
use crate::query::{ListQuery, Page};
use crate::types::{EntityKind, ItemId, Partition, VersionRef};

/// Object-safe view of one engine.
pub trait AdminService: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn list(&self, partition: Partition, query: &ListQuery) -> Result<Page<Value>, ConfigError>;

    fn get(&self, id: &ItemId, partition: Partition) -> Result<Value, ConfigError>;

    fn create(&self, payload: Value, actor: &str) -> Result<Value, ConfigError>;

    fn update(&self, id: &ItemId, patch: &Value, actor: &str) -> Result<Value, ConfigError>;

    fn delete(&self, id: &ItemId, actor: &str) -> bool;

    fn checkout(&self, id: &ItemId, actor: &str) -> Result<Value, ConfigError>;

    fn retire(&self, id: &ItemId, actor: &str) -> Result<(), ConfigError>;

    fn publish(&self, actor: &str, notes: &str, tags: &[&str]) -> Result<VersionSummary, ConfigError>;

    fn rollback(&self, actor: &str, target: &VersionRef, notes: Option<&str>) -> Result<VersionSummary, ConfigError>;

    fn versions(&self, page: u32, page_size: u32) -> Page<VersionSummary>;

    fn diff(&self, from: &DiffTarget, to: &DiffTarget) -> Result<Value, ConfigError>;

    fn import(&self, bytes: &[u8], format: ExportFormat, mode: ImportMode, actor: &str) -> Result<BatchResult, ConfigError>;

    fn export(&self, partition: Partition, format: ExportFormat) -> Result<Vec<u8>, ConfigError>;

    fn pending_count(&self) -> usize;
}

impl<D: ConfigDomain> AdminService for ConfigEngine<D> {
    fn kind(&self) -> EntityKind {
        D::KIND
    }

    fn list(&self, partition: Partition, query: &ListQuery) -> Result<Page<Value>, ConfigError> {
        let page = ConfigEngine::list(self, partition, query);
        let data = page
            .data
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            data,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    fn get(&self, id: &ItemId, partition: Partition) -> Result<Value, ConfigError> {
        Ok(serde_json::to_value(self.get_by_id(id, partition)?)?)
    }

    fn create(&self, payload: Value, actor: &str) -> Result<Value, ConfigError> {
        let payload: D::Payload =
            serde_json::from_value(payload).map_err(|e| ConfigError::InvalidPayload(e.to_string()))?;
        Ok(serde_json::to_value(self.create_draft_as(payload, actor)?)?)
    }

    fn update(&self, id: &ItemId, patch: &Value, actor: &str) -> Result<Value, ConfigError> {
        Ok(serde_json::to_value(self.update_draft_as(id, patch, actor)?)?)
    }

    fn delete(&self, id: &ItemId, actor: &str) -> bool {
        self.delete_draft_as(id, actor)
    }

    fn checkout(&self, id: &ItemId, actor: &str) -> Result<Value, ConfigError> {
        Ok(serde_json::to_value(self.checkout_as(id, actor)?)?)
    }

    fn retire(&self, id: &ItemId, actor: &str) -> Result<(), ConfigError> {
        self.retire_as(id, actor)
    }

    fn publish(&self, actor: &str, notes: &str, tags: &[&str]) -> Result<VersionSummary, ConfigError> {
        self.publish_as(actor, notes, tags).map(|r| r.summary())
    }

    fn rollback(&self, actor: &str, target: &VersionRef, notes: Option<&str>) -> Result<VersionSummary, ConfigError> {
        self.rollback_as(actor, target, notes).map(|r| r.summary())
    }

    fn versions(&self, page: u32, page_size: u32) -> Page<VersionSummary> {
        ConfigEngine::versions(self, page, page_size).map(|r| r.summary())
    }

    fn diff(&self, from: &DiffTarget, to: &DiffTarget) -> Result<Value, ConfigError> {
        Ok(serde_json::to_value(ConfigEngine::diff(self, from, to)?)?)
    }

    fn import(&self, bytes: &[u8], format: ExportFormat, mode: ImportMode, actor: &str) -> Result<BatchResult, ConfigError> {
        self.import_as(bytes, format, mode, actor)
    }

    fn export(&self, partition: Partition, format: ExportFormat) -> Result<Vec<u8>, ConfigError> {
        self.export_partition(partition, format)
    }

    fn pending_count(&self) -> usize {
        ConfigEngine::pending_count(self)
    }
}

pub struct AdminRegistry {
    fees: ConfigEngine<TradingFees>,
    margin_tiers: ConfigEngine<MarginTiers>,
    calendar: ConfigEngine<CalendarRules>,
    risk_rules: ConfigEngine<RiskRules>,
    instruments: ConfigEngine<Instruments>,
    icons: ConfigEngine<IconAssets>,
    nav: ConfigEngine<NavRoutes>,
}

impl Default for AdminRegistry {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl AdminRegistry {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            fees: ConfigEngine::new(config.clone()),
            margin_tiers: ConfigEngine::new(config.clone()),
            calendar: ConfigEngine::new(config.clone()),
            risk_rules: ConfigEngine::new(config.clone()),
            instruments: ConfigEngine::new(config.clone()),
            icons: ConfigEngine::new(config.clone()),
            nav: ConfigEngine::new(config.clone()),
        }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        info!(environment = ?config.environment, "admin registry starting");
        Self::new(&config.engine)
    }

    pub fn fees(&self) -> &ConfigEngine<TradingFees> {
        &self.fees
    }

    pub fn margin_tiers(&self) -> &ConfigEngine<MarginTiers> {
        &self.margin_tiers
    }

    pub fn calendar(&self) -> &ConfigEngine<CalendarRules> {
        &self.calendar
    }

    pub fn risk_rules(&self) -> &ConfigEngine<RiskRules> {
        &self.risk_rules
    }

    pub fn instruments(&self) -> &ConfigEngine<Instruments> {
        &self.instruments
    }

    pub fn icons(&self) -> &ConfigEngine<IconAssets> {
        &self.icons
    }

    pub fn nav(&self) -> &ConfigEngine<NavRoutes> {
        &self.nav
    }

    pub fn service(&self, kind: EntityKind) -> &dyn AdminService {
        match kind {
            EntityKind::TradingFee => &self.fees,
            EntityKind::MarginTier => &self.margin_tiers,
            EntityKind::CalendarRule => &self.calendar,
            EntityKind::RiskRule => &self.risk_rules,
            EntityKind::Instrument => &self.instruments,
            EntityKind::IconAsset => &self.icons,
            EntityKind::NavRoute => &self.nav,
        }
    }

    /// Look a service up by entity name ("trading_fee", "nav-route", ...).
    pub fn service_named(&self, name: &str) -> Result<&dyn AdminService, ConfigError> {
        Ok(self.service(name.parse()?))
    }

    pub fn services(&self) -> impl Iterator<Item = &dyn AdminService> {
        EntityKind::ALL.into_iter().map(|kind| self.service(kind))
    }

    /// Domains with unpublished changes, and how many.
    pub fn pending_changes(&self) -> Vec<(EntityKind, usize)> {
        self.services()
            .map(|s| (s.kind(), s.pending_count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}
