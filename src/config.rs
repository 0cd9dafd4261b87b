// 7.0 config.rs: deployment settings in one place. engine limits plus environment presets.
// 7.1 presets only differ in limits and audit retention; semantics are identical.

use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;

// Complete configuration for one admin deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub environment: Environment,
    pub engine: EngineConfig,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            engine: EngineConfig::default(),
        }
    }
}

impl AdminConfig {
    // Local development: small pages, pretty output, everything else default
    pub fn development() -> Self {
        let mut config = Self::default();
        config.engine.default_actor = "dev".to_string();
        config.engine.pretty_json = true;
        config
    }

    // Staging mirrors production limits with a shorter audit window
    pub fn staging() -> Self {
        let mut config = Self::production();
        config.environment = Environment::Staging;
        config.engine.max_events = 50_000;
        config
    }

    // Production: bounded imports and page sizes, long audit retention
    pub fn production() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Production;
        config.engine.max_events = 1_000_000;
        config.engine.max_page_size = 100;
        config.engine.max_import_rows = 5_000;
        config.engine.default_actor = "admin-api".to_string();
        config
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let config: Self = serde_json::from_str(json).map_err(|e| SettingsError::Malformed {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), SettingsError> {
        let engine = &self.engine;

        if engine.max_events == 0 {
            return Err(SettingsError::InvalidAudit {
                reason: "max_events must be positive".to_string(),
            });
        }

        // paging checks
        if engine.max_page_size == 0 {
            return Err(SettingsError::InvalidPaging {
                reason: "max_page_size must be positive".to_string(),
            });
        }
        if engine.default_page_size == 0 || engine.default_page_size > engine.max_page_size {
            return Err(SettingsError::InvalidPaging {
                reason: "default_page_size must be between 1 and max_page_size".to_string(),
            });
        }

        // import checks
        if engine.max_import_rows == 0 {
            return Err(SettingsError::InvalidImport {
                reason: "max_import_rows must be positive".to_string(),
            });
        }
        if !engine.csv_delimiter.is_ascii_punctuation() && engine.csv_delimiter != b'\t' {
            return Err(SettingsError::InvalidImport {
                reason: "csv_delimiter must be punctuation or tab".to_string(),
            });
        }

        if engine.default_actor.trim().is_empty() {
            return Err(SettingsError::InvalidActor {
                reason: "default_actor must not be blank".to_string(),
            });
        }

        // pre-releases would sort below their release and break tag ordering
        if !engine.initial_tag.is_release() {
            return Err(SettingsError::InvalidVersioning {
                reason: "initial_tag must be a plain release version".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    Malformed { reason: String },
    InvalidAudit { reason: String },
    InvalidPaging { reason: String },
    InvalidImport { reason: String },
    InvalidActor { reason: String },
    InvalidVersioning { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn config(&self) -> AdminConfig {
        match self {
            Environment::Development => AdminConfig::development(),
            Environment::Staging => AdminConfig::staging(),
            Environment::Production => AdminConfig::production(),
        }
    }
}
