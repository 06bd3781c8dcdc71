//! Retrieval of pages and reference documents.
//!
//! The reference document lives at `<root_path>index.html` relative to the
//! live page, so it is fetched over whatever scheme the live page came from:
//! `http`/`https` through `reqwest`, `file` straight from disk.

use std::path::Path;
use std::time::Duration;

use pagestitch_shared::{FetchConfig, Result, StitchError};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("pagestitch/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Fetches HTML text from `http`, `https` and `file` URLs.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Build a fetcher with the configured timeout and redirect limit.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StitchError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch the document at `url` and return its body as text.
    ///
    /// Any transport error, non-success status, or unreadable body is a
    /// [`StitchError::Fetch`]. There is no retry.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<String> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url).await,
            "file" => fetch_file(url).await,
            other => Err(StitchError::validation(format!(
                "unsupported URL scheme '{other}' in {url}"
            ))),
        }
    }

    async fn fetch_http(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| StitchError::fetch(url.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StitchError::fetch(url.as_str(), format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| StitchError::fetch(url.as_str(), format!("failed to read body: {e}")))?;

        info!(bytes = body.len(), "fetched document");
        Ok(body)
    }
}

async fn fetch_file(url: &Url) -> Result<String> {
    let path = url
        .to_file_path()
        .map_err(|_| StitchError::validation(format!("not a local file URL: {url}")))?;

    let body = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| StitchError::fetch(url.as_str(), e.to_string()))?;

    info!(bytes = body.len(), "read document from disk");
    Ok(body)
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// Resolve `relative` (e.g. `../index.html`) against the live page URL.
pub fn resolve(page: &Url, relative: &str) -> Result<Url> {
    page.join(relative).map_err(|e| {
        StitchError::validation(format!("cannot resolve '{relative}' against {page}: {e}"))
    })
}

/// Interpret a CLI argument as a page location: an `http(s)`/`file` URL, or a
/// filesystem path (made absolute against the working directory).
pub fn location_from_arg(arg: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(arg) {
        if matches!(url.scheme(), "http" | "https" | "file") {
            return Ok(url);
        }
    }

    let path = Path::new(arg);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| StitchError::io(".", e))?
            .join(path)
    };
    debug!(path = %absolute.display(), "treating page argument as a file path");

    Url::from_file_path(&absolute).map_err(|_| {
        StitchError::validation(format!("cannot build a file URL from {}", absolute.display()))
    })
}
