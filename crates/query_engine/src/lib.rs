use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use anyhow::{Context, Result};
use shared::domain::TABLE_NAME;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Column, Pool, Row, Sqlite, TypeInfo, ValueRef,
};
use tokio::sync::Mutex;

pub mod error;
pub mod fetch;
pub mod loader;
pub mod tabular;

pub use error::EngineError;
pub use fetch::RemoteFetcher;
pub use tabular::TableFormat;

use loader::{infer_affinities, Affinity, ParsedTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: usize,
}

/// SQLite-backed engine holding at most one registered table named `data`.
#[derive(Clone)]
pub struct QueryEngine {
    pool: Pool<Sqlite>,
    registered: Arc<Mutex<Option<PathBuf>>>,
    format: TableFormat,
}

impl QueryEngine {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);
        // One long-lived connection: an in-memory database exists per connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open query engine database '{database_url}'"))?;
        Ok(Self {
            pool,
            registered: Arc::new(Mutex::new(None)),
            format: TableFormat::default(),
        })
    }

    pub fn with_table_format(mut self, format: TableFormat) -> Self {
        self.format = format;
        self
    }

    pub fn table_format(&self) -> TableFormat {
        self.format
    }

    pub async fn health_check(&self) -> Result<String, EngineError> {
        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&self.pool)
            .await?;
        Ok(format!("Query engine is running! (SQLite {version})"))
    }

    pub async fn registered_path(&self) -> Option<PathBuf> {
        self.registered.lock().await.clone()
    }

    /// Loads `path` and replaces the `data` table with its contents.
    pub async fn register_file(&self, path: &Path) -> Result<TableSummary, EngineError> {
        let mut registered = self.registered.lock().await;
        self.register_locked(&mut registered, path).await
    }

    /// Marks the registration for `path` as outdated so the next query reloads
    /// it from disk. Needed when a file is rewritten in place.
    pub async fn invalidate(&self, path: &Path) {
        let mut registered = self.registered.lock().await;
        if registered.as_deref() == Some(path) {
            tracing::debug!(path = %path.display(), "registered table invalidated");
            *registered = None;
        }
    }

    /// Runs `sql` against the table backed by `path`, loading it first if a
    /// different file is currently registered.
    pub async fn query(&self, path: &Path, sql: &str) -> Result<String, EngineError> {
        let mut registered = self.registered.lock().await;
        if registered.as_deref() != Some(path) {
            self.register_locked(&mut registered, path).await?;
        }

        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        tracing::debug!(rows = rows.len(), "query executed");

        let Some(first) = rows.first() else {
            return Ok(tabular::EMPTY_RESULT_TEXT.to_string());
        };
        let columns: Vec<String> = first
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        let cells = rows
            .iter()
            .map(|row| {
                (0..columns.len())
                    .map(|index| render_value(row, index))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tabular::render_table(&columns, &cells, &self.format))
    }

    async fn register_locked(
        &self,
        registered: &mut Option<PathBuf>,
        path: &Path,
    ) -> Result<TableSummary, EngineError> {
        let table = loader::read_table(path).await?;
        let summary = self.replace_table(&table).await?;
        *registered = Some(path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            rows = summary.rows,
            columns = summary.columns,
            "registered table '{TABLE_NAME}'"
        );
        Ok(summary)
    }

    async fn replace_table(&self, table: &ParsedTable) -> Result<TableSummary, EngineError> {
        let affinities = infer_affinities(table);
        let column_defs = table
            .columns
            .iter()
            .zip(&affinities)
            .map(|(name, affinity)| format!("{} {}", quote_ident(name), affinity.sql_type()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; table.columns.len()].join(", ");
        let insert_sql = format!("INSERT INTO {TABLE_NAME} VALUES ({placeholders})");

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {TABLE_NAME}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("CREATE TABLE {TABLE_NAME} ({column_defs})"))
            .execute(&mut *tx)
            .await?;

        for row in &table.rows {
            let mut insert = sqlx::query(&insert_sql);
            for (index, affinity) in affinities.iter().enumerate() {
                let cell = row.get(index).cloned().flatten();
                insert = match affinity {
                    Affinity::Integer => insert.bind(cell.and_then(|v| v.parse::<i64>().ok())),
                    Affinity::Real => insert.bind(cell.and_then(|v| v.parse::<f64>().ok())),
                    Affinity::Text => insert.bind(cell),
                };
            }
            insert.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(TableSummary {
            rows: table.rows.len(),
            columns: table.columns.len(),
        })
    }
}

fn render_value(row: &SqliteRow, index: usize) -> Result<Option<String>, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(None);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();
    let text = match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            row.try_get_unchecked::<i64, _>(index)?.to_string()
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            row.try_get_unchecked::<f64, _>(index)?.to_string()
        }
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get_unchecked(index)?;
            format!("<blob {} bytes>", bytes.len())
        }
        _ => row.try_get_unchecked::<String, _>(index)?,
    };
    Ok(Some(text))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return Ok(());
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create parent directory '{}' for database url '{database_url}'",
                    parent.display()
                )
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
