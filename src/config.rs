use std::env;

use anyhow::{anyhow, Result};
use toml::Value;

use crate::common::dialect::Dialect;
use crate::ledger::DEFAULT_VERSION_TABLE;

const DATABASE_URL_VARIABLE: &str = "DATABASE_URL";

#[derive(Debug)]
pub(crate) struct Config {
    database: DatabaseConfig,
    settings: SettingsConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub dialect: Dialect,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SettingsConfig {
    pub version_table: String,
    pub transaction_per_migration: bool,
}

impl Config {
    pub(crate) fn from_toml(config: Value) -> Result<Self> {
        let database = parse_database_config(
            config
                .get("database")
                .ok_or(anyhow!("Missing or invalid database settings"))?
                .clone(),
            env::var(DATABASE_URL_VARIABLE).ok(),
        )?;

        // The whole section is optional
        let settings = parse_settings_config(
            config
                .get("settings")
                .cloned()
                .unwrap_or_else(|| Value::Table(Default::default())),
        )?;

        Ok(Config { database, settings })
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }

    pub fn settings(&self) -> &SettingsConfig {
        &self.settings
    }
}

fn parse_database_config(config: Value, url_override: Option<String>) -> Result<DatabaseConfig> {
    let url = match url_override {
        Some(url) => url,
        None => config
            .get("url")
            .and_then(|value| value.as_str())
            .ok_or_else(|| anyhow!("Missing or invalid database url"))?
            .to_string(),
    };

    let dialect = Dialect::from_url(&url)?;

    let max_connections: u32 = match config.get("max_connections") {
        Some(value) => value
            .as_integer()
            .ok_or_else(|| anyhow!("Invalid max connections value"))?
            .try_into()?,
        None => 1,
    };

    if max_connections == 0 {
        return Err(anyhow!("Max connections must be at least 1"));
    }

    Ok(DatabaseConfig {
        url,
        dialect,
        max_connections,
    })
}

fn parse_settings_config(config: Value) -> Result<SettingsConfig> {
    let version_table = match config.get("version_table") {
        Some(value) => value
            .as_str()
            .filter(|table| !table.is_empty())
            .ok_or_else(|| anyhow!("Invalid version table"))?
            .to_string(),
        None => DEFAULT_VERSION_TABLE.to_string(),
    };

    let transaction_per_migration = match config.get("transaction_per_migration") {
        Some(value) => value
            .as_bool()
            .ok_or_else(|| anyhow!("Invalid transaction per migration value"))?,
        None => true,
    };

    Ok(SettingsConfig {
        version_table,
        transaction_per_migration,
    })
}
