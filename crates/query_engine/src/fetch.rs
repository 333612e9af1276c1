//! Fetch-and-persist of remote datasets.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::Client;
use tokio::sync::Mutex;
use url::Url;

use crate::error::EngineError;

const FALLBACK_FILE_NAME: &str = "download.csv";

/// Downloads remote resources into one directory, keeping only the newest.
pub struct RemoteFetcher {
    client: Client,
    download_dir: PathBuf,
    last_download: Mutex<Option<PathBuf>>,
}

impl RemoteFetcher {
    pub fn new(download_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EngineError::Internal(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            download_dir: download_dir.into(),
            last_download: Mutex::new(None),
        })
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub async fn fetch(&self, raw_url: &str) -> Result<PathBuf, EngineError> {
        let url = parse_remote_url(raw_url)?;
        tracing::info!(url = %url, "fetching remote dataset");

        let bytes = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| EngineError::Network(err.to_string()))?
            .error_for_status()
            .map_err(|err| EngineError::Network(err.to_string()))?
            .bytes()
            .await
            .map_err(|err| EngineError::Network(err.to_string()))?;

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|source| EngineError::Io {
                context: format!(
                    "could not create download directory '{}'",
                    self.download_dir.display()
                ),
                source,
            })?;

        let destination = self.download_dir.join(destination_file_name(&url));
        tokio::fs::write(&destination, &bytes)
            .await
            .map_err(|source| EngineError::Io {
                context: format!("could not write '{}'", destination.display()),
                source,
            })?;
        tracing::info!(
            path = %destination.display(),
            bytes = bytes.len(),
            "remote dataset persisted"
        );

        let mut last = self.last_download.lock().await;
        if let Some(previous) = last.replace(destination.clone()) {
            if previous != destination {
                if let Err(err) = tokio::fs::remove_file(&previous).await {
                    tracing::warn!(
                        path = %previous.display(),
                        "could not remove previous download: {err}"
                    );
                }
            }
        }

        Ok(destination)
    }
}

fn parse_remote_url(raw_url: &str) -> Result<Url, EngineError> {
    let raw_url = raw_url.trim();
    let url = Url::parse(raw_url).map_err(|err| EngineError::InvalidUrl {
        url: raw_url.to_string(),
        detail: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(EngineError::InvalidUrl {
            url: raw_url.to_string(),
            detail: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

fn destination_file_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default();
    let sanitized: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.trim_matches('.').is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        sanitized
    }
}
