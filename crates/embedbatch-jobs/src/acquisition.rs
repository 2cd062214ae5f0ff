//! Obtains the raw bytes of a job file from the local disk or over HTTP.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{AcquireError, JobsError};

/// File name used when a URL has no usable last path segment.
pub const DEFAULT_FILE_NAME: &str = "downloaded_file";

/// The bytes of a job file and the name extraction dispatches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait FileAcquirer: Send + Sync {
    async fn acquire(&self, reference: &str) -> Result<AcquiredFile, AcquireError>;
}

/// Reads an existing local path, otherwise downloads an `http(s)` URL.
#[derive(Debug, Clone)]
pub struct DefaultFileAcquirer {
    client: Client,
}

impl DefaultFileAcquirer {
    pub fn new(timeout_secs: u64) -> Result<Self, JobsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| JobsError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn read_local(&self, path: &Path, reference: &str) -> Result<AcquiredFile, AcquireError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| AcquireError::Io {
            path: reference.to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        Ok(AcquiredFile { file_name, bytes })
    }

    async fn download(&self, url: Url) -> Result<AcquiredFile, AcquireError> {
        let network = |source| AcquireError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(network)?.to_vec();
        debug!(url = %url, bytes = bytes.len(), "Downloaded file");
        Ok(AcquiredFile {
            file_name: url_file_name(&url),
            bytes,
        })
    }
}

/// Last non-empty path segment of the URL.
pub fn url_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

#[async_trait]
impl FileAcquirer for DefaultFileAcquirer {
    #[instrument(skip(self))]
    async fn acquire(&self, reference: &str) -> Result<AcquiredFile, AcquireError> {
        let path = Path::new(reference);
        if tokio::fs::metadata(path).await.map(|meta| meta.is_file()).unwrap_or(false) {
            return self.read_local(path, reference).await;
        }

        match Url::parse(reference) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => self.download(url).await,
            _ => Err(AcquireError::NotFound(reference.to_string())),
        }
    }
}
