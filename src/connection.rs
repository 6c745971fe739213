use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::{AnyPool, ConnectOptions};

use crate::config::DatabaseConfig;

pub struct SqlxAnyConnection {
    pub pool: AnyPool,
}

#[async_trait]
pub trait DatabaseConnection: Sized {
    async fn new(config: &DatabaseConfig) -> Result<Self>;
}

#[async_trait]
impl DatabaseConnection for SqlxAnyConnection {
    async fn new(config: &DatabaseConfig) -> Result<Self> {
        let options = AnyConnectOptions::from_str(&config.url)
            .context("Invalid database url")?
            .disable_statement_logging()
            .clone();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to {} database", config.dialect))?;

        Ok(SqlxAnyConnection { pool })
    }
}

pub struct DatabaseConnectionFactory<C: DatabaseConnection> {
    config: DatabaseConfig,
    connection_type: std::marker::PhantomData<C>,
}

impl<C: DatabaseConnection> DatabaseConnectionFactory<C> {
    pub fn new(config: DatabaseConfig) -> Self {
        DatabaseConnectionFactory {
            config,
            connection_type: std::marker::PhantomData,
        }
    }

    pub async fn create_connection(&self) -> Result<C> {
        C::new(&self.config).await
    }
}
