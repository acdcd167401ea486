use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::{header, Client, Response, Url};

use crate::arxiv::archive::extract_archive;
use crate::config::SourceConfig;
use crate::error::{Error, Result};

#[async_trait]
pub trait SourceClient: Send + Sync {
    /// GET `url` as text. Non-2xx responses are errors.
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// Downloads `url` into the download directory and returns the local path.
    async fn download(&self, url: &str) -> Result<PathBuf>;

    /// Unpacks an archive and returns the extracted files. Not an archive -> empty.
    async fn extract(&self, archive: &Path) -> Result<Vec<PathBuf>>;
}

/// HTTP access to arxiv.org. Construct one per category run; the connection
/// pool is released when it drops.
pub struct ArxivClient {
    client: Client,
    config: SourceConfig,
}

impl ArxivClient {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36",
            ),
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()?;

        Ok(Self { client, config })
    }

    async fn get(&self, url: &str, timeout: std::time::Duration) -> Result<Response> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SourceClient for ArxivClient {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        tracing::debug!("Fetching {}", url);
        let response = self.get(url, self.config.listing_timeout).await?;
        Ok(response.text().await?)
    }

    async fn download(&self, url: &str) -> Result<PathBuf> {
        tracing::debug!("Downloading {}", url);
        let response = self.get(url, self.config.download_timeout).await?;

        let filename = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| filename_from_url(url));

        let bytes = response.bytes().await?;
        tokio::fs::create_dir_all(&self.config.download_dir).await?;
        let path = self.config.download_dir.join(filename);
        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    async fn extract(&self, archive: &Path) -> Result<Vec<PathBuf>> {
        let archive = archive.to_path_buf();
        let dest_root = self.config.download_dir.join("extracted");
        tokio::task::spawn_blocking(move || extract_archive(&archive, &dest_root))
            .await
            .map_err(|e| Error::Archive(format!("extraction task failed: {}", e)))?
    }
}

/// Reads `filename*=UTF-8''name` or `filename="name"` from a
/// `Content-Disposition` value, keeping only the final path component.
fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';').map(str::trim) {
        if let Some(rest) = part.strip_prefix("filename*=") {
            let name = rest.rsplit("''").next().unwrap_or(rest);
            return sanitize_filename(name.trim_matches('"'));
        }
        if let Some(rest) = part.strip_prefix("filename=") {
            plain = sanitize_filename(rest.trim_matches('"'));
        }
    }
    plain
}

fn filename_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "download".to_string();
    };
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .and_then(sanitize_filename)
        .or_else(|| parsed.host_str().and_then(sanitize_filename))
        .unwrap_or_else(|| "download".to_string())
}

fn sanitize_filename(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}
