use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Name every loaded dataset is registered under for SQL queries.
pub const TABLE_NAME: &str = "data";

/// Extensions offered by the file picker.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["csv", "json", "parquet", "xlsx", "xls", "tsv"];

pub const DEFAULT_QUERY: &str = "SELECT * FROM data LIMIT 10";

/// Locator of the dataset currently active in a session.
///
/// Remote resources are never referenced here directly; they are fetched to a
/// local path first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    locator: PathBuf,
}

impl DatasetRef {
    pub fn new(locator: impl Into<PathBuf>) -> Self {
        Self {
            locator: locator.into(),
        }
    }

    pub fn locator(&self) -> &Path {
        &self.locator
    }

    pub fn format(&self) -> Option<DataFormat> {
        DataFormat::from_path(&self.locator)
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.locator.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    Csv,
    Tsv,
    Json,
    Parquet,
    Excel,
}

impl DataFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "json" => Some(Self::Json),
            "parquet" => Some(Self::Parquet),
            "xlsx" | "xls" => Some(Self::Excel),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Tsv => "TSV",
            Self::Json => "JSON",
            Self::Parquet => "Parquet",
            Self::Excel => "Excel",
        }
    }
}
