//! Remote thumbnail catalog access.
//!
//! The catalog is addressed as `{base}/{platform}/{category}/{name}.{ext}` for
//! images and `{base}/{platform}/{category}/` for the category index page.
//! Every request is blocking, bounded by fixed timeouts, and reports a typed
//! outcome instead of an error: callers skip to their next candidate on any
//! `FetchOutcome::Unavailable`.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use log::debug;

use crate::config::CatalogConfig;

const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;
const MAX_LISTING_BYTES: u64 = 32 * 1024 * 1024;

/// Image classifications offered by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageCategory {
    Logos,
    Boxarts,
    Titles,
    Snapshots,
}

impl ImageCategory {
    pub fn folder_name(self) -> &'static str {
        match self {
            Self::Logos => "Named_Logos",
            Self::Boxarts => "Named_Boxarts",
            Self::Titles => "Named_Titles",
            Self::Snapshots => "Named_Snaps",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Logos => "logos",
            Self::Boxarts => "boxarts",
            Self::Titles => "titles",
            Self::Snapshots => "snapshots",
        }
    }
}

impl fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which category family the caller prefers to see first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryOrder {
    #[default]
    Logos,
    Boxarts,
}

impl CategoryOrder {
    pub fn categories(self) -> [ImageCategory; 4] {
        match self {
            Self::Logos => [
                ImageCategory::Logos,
                ImageCategory::Titles,
                ImageCategory::Boxarts,
                ImageCategory::Snapshots,
            ],
            Self::Boxarts => [
                ImageCategory::Boxarts,
                ImageCategory::Titles,
                ImageCategory::Logos,
                ImageCategory::Snapshots,
            ],
        }
    }
}

/// Why a request produced no usable data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Transport(String),
    Status(u16),
    EmptyBody,
    Body(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Status(code) => write!(f, "status {code}"),
            Self::EmptyBody => f.write_str("empty body"),
            Self::Body(message) => write!(f, "unreadable body: {message}"),
        }
    }
}

/// Result of one catalog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Fetched(T),
    Unavailable(FetchFailure),
}

impl<T> FetchOutcome<T> {
    #[cfg(test)]
    pub(crate) fn into_option(self) -> Option<T> {
        match self {
            Self::Fetched(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }
}

/// Blocking transport used to reach the catalog.
pub trait CatalogTransport {
    fn fetch_bytes(&self, url: &str) -> FetchOutcome<Vec<u8>>;
    fn fetch_text(&self, url: &str) -> FetchOutcome<String>;
}

/// `ureq`-backed transport with fixed connect/read timeouts.
pub struct HttpTransport {
    http_client: ureq::Agent,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &CatalogConfig) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(config.connect_timeout_ms))
            .timeout_read(Duration::from_millis(config.read_timeout_ms))
            .timeout_write(Duration::from_millis(config.read_timeout_ms))
            .build();
        Self {
            http_client,
            user_agent: config.user_agent.clone(),
        }
    }

    fn call(&self, url: &str) -> Result<ureq::Response, FetchFailure> {
        match self
            .http_client
            .get(url)
            .set("User-Agent", &self.user_agent)
            .call()
        {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(code, _)) => Err(FetchFailure::Status(code)),
            Err(ureq::Error::Transport(transport)) => {
                Err(FetchFailure::Transport(transport.to_string()))
            }
        }
    }
}

impl CatalogTransport for HttpTransport {
    fn fetch_bytes(&self, url: &str) -> FetchOutcome<Vec<u8>> {
        let response = match self.call(url) {
            Ok(response) => response,
            Err(failure) => {
                debug!("Catalog: GET {url} failed: {failure}");
                return FetchOutcome::Unavailable(failure);
            }
        };
        let mut bytes = Vec::new();
        if let Err(error) = response
            .into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut bytes)
        {
            debug!("Catalog: reading {url} failed: {error}");
            return FetchOutcome::Unavailable(FetchFailure::Body(error.to_string()));
        }
        if bytes.is_empty() {
            return FetchOutcome::Unavailable(FetchFailure::EmptyBody);
        }
        FetchOutcome::Fetched(bytes)
    }

    fn fetch_text(&self, url: &str) -> FetchOutcome<String> {
        let response = match self.call(url) {
            Ok(response) => response,
            Err(failure) => {
                debug!("Catalog: GET {url} failed: {failure}");
                return FetchOutcome::Unavailable(failure);
            }
        };
        let mut bytes = Vec::new();
        if let Err(error) = response
            .into_reader()
            .take(MAX_LISTING_BYTES)
            .read_to_end(&mut bytes)
        {
            debug!("Catalog: reading {url} failed: {error}");
            return FetchOutcome::Unavailable(FetchFailure::Body(error.to_string()));
        }
        if bytes.is_empty() {
            return FetchOutcome::Unavailable(FetchFailure::EmptyBody);
        }
        FetchOutcome::Fetched(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Builds catalog URLs for one base address and image extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogAddress {
    base_url: String,
    image_extension: String,
}

impl CatalogAddress {
    pub fn new(base_url: &str, image_extension: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            image_extension: image_extension.trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    pub fn image_extension(&self) -> &str {
        &self.image_extension
    }

    pub fn category_url(&self, platform: &str, category: ImageCategory) -> String {
        format!(
            "{}/{}/{}/",
            self.base_url,
            urlencoding::encode(platform),
            category.folder_name()
        )
    }

    pub fn image_url(&self, platform: &str, category: ImageCategory, name: &str) -> String {
        format!(
            "{}{}.{}",
            self.category_url(platform, category),
            urlencoding::encode(name),
            self.image_extension
        )
    }
}
