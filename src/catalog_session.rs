//! Cache-first retrieval of named catalog images for one ROM.

use std::collections::HashSet;
use std::path::PathBuf;

use log::debug;

use crate::catalog_client::{CatalogAddress, CatalogTransport, FetchOutcome, ImageCategory};
use crate::icon_cache::IconCache;
use crate::image_pipeline::{normalize_image_bytes, ImageSettings};

/// Where a named image came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedImage {
    Cached(PathBuf),
    Downloaded(PathBuf),
}

impl NamedImage {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Cached(path) | Self::Downloaded(path) => path,
        }
    }

    pub fn from_cache(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// Borrowed view of everything needed to turn a catalog name into a cached icon.
///
/// URLs that already failed during this session are not requested again.
pub struct CatalogSession<'a, T: CatalogTransport + ?Sized> {
    pub transport: &'a T,
    pub address: &'a CatalogAddress,
    pub cache: &'a IconCache,
    pub image: &'a ImageSettings,
    pub platform: &'a str,
    failed_urls: HashSet<String>,
}

impl<'a, T: CatalogTransport + ?Sized> CatalogSession<'a, T> {
    pub fn new(
        transport: &'a T,
        address: &'a CatalogAddress,
        cache: &'a IconCache,
        image: &'a ImageSettings,
        platform: &'a str,
    ) -> Self {
        Self {
            transport,
            address,
            cache,
            image,
            platform,
            failed_urls: HashSet::new(),
        }
    }

    /// Checks the cache for `name`, then downloads, normalizes and stores it.
    ///
    /// Returns `None` for any transient failure, including undecodable bytes.
    pub fn fetch_named(&mut self, category: ImageCategory, name: &str) -> Option<NamedImage> {
        if name.trim().is_empty() {
            return None;
        }
        if let Some(path) = self.cache.get(self.platform, name) {
            return Some(NamedImage::Cached(path));
        }

        let url = self.address.image_url(self.platform, category, name);
        if self.failed_urls.contains(&url) {
            return None;
        }
        let bytes = match self.transport.fetch_bytes(&url) {
            FetchOutcome::Fetched(bytes) => bytes,
            FetchOutcome::Unavailable(failure) => {
                debug!("Fetch: '{name}' [{category}] unavailable: {failure}");
                self.failed_urls.insert(url);
                return None;
            }
        };
        let Some(normalized) = normalize_image_bytes(&bytes, self.image) else {
            debug!("Fetch: '{name}' [{category}] is not a decodable image");
            self.failed_urls.insert(url);
            return None;
        };
        match self.cache.put(self.platform, name, &normalized) {
            Some(path) => Some(NamedImage::Downloaded(path)),
            None => {
                self.failed_urls.insert(url);
                None
            }
        }
    }
}
