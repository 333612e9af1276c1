//! Narrow command contract between the session and the query backend.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use query_engine::{QueryEngine, RemoteFetcher, TableFormat};
use shared::error::GatewayError;

use crate::config::Settings;

#[async_trait]
pub trait CommandGateway: Send + Sync {
    /// Never fails; the text describes the engine's state.
    async fn connectivity_check(&self) -> String;
    async fn load_table(&self, path: &Path) -> Result<String, GatewayError>;
    async fn query_table(&self, path: &Path, query: &str) -> Result<String, GatewayError>;
    async fn fetch_remote(&self, url: &str) -> Result<PathBuf, GatewayError>;
}

#[async_trait]
impl<T> CommandGateway for Arc<T>
where
    T: CommandGateway + ?Sized,
{
    async fn connectivity_check(&self) -> String {
        (**self).connectivity_check().await
    }

    async fn load_table(&self, path: &Path) -> Result<String, GatewayError> {
        (**self).load_table(path).await
    }

    async fn query_table(&self, path: &Path, query: &str) -> Result<String, GatewayError> {
        (**self).query_table(path, query).await
    }

    async fn fetch_remote(&self, url: &str) -> Result<PathBuf, GatewayError> {
        (**self).fetch_remote(url).await
    }
}

/// Gateway backed by the in-process SQLite query engine.
pub struct EngineGateway {
    engine: QueryEngine,
    fetcher: RemoteFetcher,
}

impl EngineGateway {
    pub fn new(engine: QueryEngine, fetcher: RemoteFetcher) -> Self {
        Self { engine, fetcher }
    }

    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let engine = QueryEngine::new(&settings.database_url)
            .await?
            .with_table_format(TableFormat {
                max_rows: settings.max_display_rows,
                max_cell_width: settings.max_cell_width,
            });
        let fetcher = RemoteFetcher::new(
            settings.download_dir.clone(),
            Duration::from_secs(settings.fetch_timeout_secs),
        )
        .context("failed to prepare remote fetcher")?;
        Ok(Self::new(engine, fetcher))
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }
}

#[async_trait]
impl CommandGateway for EngineGateway {
    async fn connectivity_check(&self) -> String {
        match self.engine.health_check().await {
            Ok(text) => text,
            Err(err) => format!("Query engine is not responding: {err}"),
        }
    }

    async fn load_table(&self, path: &Path) -> Result<String, GatewayError> {
        let summary = self.engine.register_file(path).await?;
        Ok(format!(
            "Loaded {} rows ({} columns) from {}",
            summary.rows,
            summary.columns,
            path.display()
        ))
    }

    async fn query_table(&self, path: &Path, query: &str) -> Result<String, GatewayError> {
        Ok(self.engine.query(path, query).await?)
    }

    async fn fetch_remote(&self, url: &str) -> Result<PathBuf, GatewayError> {
        let path = self.fetcher.fetch(url).await?;
        // A same-named download overwrites the file the engine may have loaded.
        self.engine.invalidate(&path).await;
        Ok(path)
    }
}
