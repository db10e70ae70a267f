//! Filename + platform to icon path.
//!
//! Runs the canonicalizer and region extraction once per ROM, then walks
//! `(title, threshold)` attempts in order. Each attempt probes exact names
//! first and falls back to scoring the category listings. Exhaustion writes a
//! placeholder, so [`IconResolver::resolve`] always hands back a usable file.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use log::{debug, error, info, warn};

use crate::candidate_prober;
use crate::catalog_client::{CatalogAddress, CatalogTransport, CategoryOrder, ImageCategory};
use crate::catalog_listing::fetch_listing;
use crate::catalog_session::{CatalogSession, NamedImage};
use crate::fuzzy_scorer::{pick_winner, ScoringParams};
use crate::icon_cache::IconCache;
use crate::image_pipeline::{placeholder_png, ImageSettings};
use crate::region_hints::{region_preferences, RegionPreferences};
use crate::title_canonicalizer::parse_rom_title;

pub const DEFAULT_THRESHOLDS: [f64; 3] = [0.87, 0.83, 0.80];

/// Everything the resolver needs besides transport and cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    pub thresholds: Vec<f64>,
    pub scoring: ScoringParams,
    pub category_order: CategoryOrder,
    pub image: ImageSettings,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            scoring: ScoringParams::default(),
            category_order: CategoryOrder::default(),
            image: ImageSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRequest {
    pub platform: String,
    pub rom_filename: String,
    /// Extra text searched for region tags. Defaults to `rom_filename`.
    pub hint: Option<String>,
}

impl IconRequest {
    pub fn new(platform: impl Into<String>, rom_filename: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            rom_filename: rom_filename.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IconSource {
    Cache,
    Probe,
    Fuzzy { score: f64 },
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIcon {
    pub path: PathBuf,
    pub source: IconSource,
    pub canonical_title: String,
    /// Catalog name the icon came from. `None` for placeholders.
    pub matched_name: Option<String>,
    pub category: Option<ImageCategory>,
}

pub struct IconResolver<T: CatalogTransport> {
    transport: T,
    address: CatalogAddress,
    cache: IconCache,
    settings: ResolverSettings,
    listings: HashMap<(String, ImageCategory), Vec<String>>,
}

impl<T: CatalogTransport> IconResolver<T> {
    pub fn new(
        transport: T,
        address: CatalogAddress,
        cache: IconCache,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            transport,
            address,
            cache,
            settings,
            listings: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &IconCache {
        &self.cache
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolves one ROM to an icon file. Never fails.
    pub fn resolve(&mut self, request: &IconRequest) -> ResolvedIcon {
        let titles = parse_rom_title(&request.rom_filename);
        let hint = request.hint.as_deref().unwrap_or(&request.rom_filename);
        let preferences = region_preferences(&titles.canonical, Some(hint));
        let categories = self.settings.category_order.categories();
        debug!(
            "Resolve: '{}' -> '{}' (alts: {:?}, regions: {:?})",
            request.rom_filename,
            titles.canonical,
            titles.alt_titles,
            preferences.labels()
        );

        let mut session = CatalogSession::new(
            &self.transport,
            &self.address,
            &self.cache,
            &self.settings.image,
            &request.platform,
        );

        for title in titles.attempt_order() {
            for &threshold in &self.settings.thresholds {
                if let Some(hit) =
                    candidate_prober::probe(&mut session, &title, &categories, &preferences)
                {
                    info!(
                        "Resolve: '{}' matched '{}' by exact probe [{}]",
                        title, hit.name, hit.category
                    );
                    let source = if hit.image.from_cache() {
                        IconSource::Cache
                    } else {
                        IconSource::Probe
                    };
                    return ResolvedIcon {
                        path: hit.image.path().clone(),
                        source,
                        canonical_title: titles.canonical.clone(),
                        matched_name: Some(hit.name),
                        category: Some(hit.category),
                    };
                }

                for &category in &categories {
                    if let Some((name, score, image)) = scored_match(
                        &mut session,
                        &mut self.listings,
                        &title,
                        category,
                        threshold,
                        &preferences,
                        &self.settings.scoring,
                    ) {
                        info!(
                            "Resolve: '{}' matched '{}' at {:.3} (threshold {:.2}) [{}]",
                            title, name, score, threshold, category
                        );
                        let source = if image.from_cache() {
                            IconSource::Cache
                        } else {
                            IconSource::Fuzzy { score }
                        };
                        return ResolvedIcon {
                            path: image.path().clone(),
                            source,
                            canonical_title: titles.canonical.clone(),
                            matched_name: Some(name),
                            category: Some(category),
                        };
                    }
                }
            }
        }

        info!(
            "Resolve: no match for '{}', using placeholder",
            titles.canonical
        );
        let path = write_placeholder(
            &self.cache,
            &request.platform,
            &titles.canonical,
            &self.settings.image,
        );
        ResolvedIcon {
            path,
            source: IconSource::Placeholder,
            canonical_title: titles.canonical,
            matched_name: None,
            category: None,
        }
    }
}

/// Scores the (memoized) listing for `category` and fetches the winner if it clears `threshold`.
fn scored_match<T: CatalogTransport + ?Sized>(
    session: &mut CatalogSession<'_, T>,
    listings: &mut HashMap<(String, ImageCategory), Vec<String>>,
    title: &str,
    category: ImageCategory,
    threshold: f64,
    preferences: &RegionPreferences,
    scoring: &ScoringParams,
) -> Option<(String, f64, NamedImage)> {
    let key = (session.platform.to_string(), category);
    if !listings.contains_key(&key) {
        let names = fetch_listing(session.transport, session.address, session.platform, category)?;
        listings.insert(key.clone(), names);
    }
    let names = listings.get(&key)?;
    let decision = pick_winner(title, names, preferences, scoring)?;
    if !decision.accepted(threshold) {
        debug!(
            "Resolve: best for '{}' in [{}] is '{}' at {:.3}, below {:.2}",
            title, category, decision.winner.name, decision.winner.score, threshold
        );
        return None;
    }
    if let Some(label) = decision.region_label {
        debug!(
            "Resolve: preferred '{}' over top score {:.3} for region {}",
            decision.winner.name, decision.top_score, label
        );
    }
    let image = session.fetch_named(category, &decision.winner.name)?;
    Some((decision.winner.name, decision.winner.score, image))
}

fn write_placeholder(
    cache: &IconCache,
    platform: &str,
    title: &str,
    image: &ImageSettings,
) -> PathBuf {
    let fallback = IconCache::new(std::env::temp_dir().join("romcover").join("placeholders"));
    write_placeholder_to(&[cache, &fallback], platform, title, image)
}

/// Writes the placeholder into the first cache that accepts it, then into a
/// unique temp file when none does.
fn write_placeholder_to(
    caches: &[&IconCache],
    platform: &str,
    title: &str,
    image: &ImageSettings,
) -> PathBuf {
    let Some(bytes) = placeholder_png(title, image) else {
        error!("Resolve: failed to render placeholder for '{title}'");
        return caches
            .first()
            .map(|cache| cache.placeholder_path(platform, title))
            .unwrap_or_default();
    };

    for (attempt, cache) in caches.iter().enumerate() {
        if let Some(path) = cache.put_placeholder(platform, title, &bytes) {
            if attempt > 0 {
                warn!(
                    "Resolve: placeholder for '{}' written to {}",
                    title,
                    cache.root().display()
                );
            }
            return path;
        }
    }

    match write_temp_placeholder(&bytes) {
        Ok(path) => {
            warn!(
                "Resolve: no cache accepted the placeholder for '{}', using {}",
                title,
                path.display()
            );
            path
        }
        Err(err) => {
            error!("Resolve: could not write a placeholder for '{title}' anywhere: {err}");
            caches
                .first()
                .map(|cache| cache.placeholder_path(platform, title))
                .unwrap_or_default()
        }
    }
}

fn write_temp_placeholder(bytes: &[u8]) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("romcover-placeholder-")
        .suffix(".png")
        .tempfile()?;
    file.write_all(bytes)?;
    let (_, path) = file.keep().map_err(|err| err.error)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use tempfile::TempDir;

    use super::{write_placeholder_to, IconRequest, IconResolver, IconSource, ResolverSettings};
    use crate::catalog_client::tests::FakeTransport;
    use crate::catalog_client::{CatalogAddress, ImageCategory};
    use crate::icon_cache::IconCache;
    use crate::image_pipeline::{image_dimensions, ImageSettings};

    const SNES: &str = "Nintendo - Super Nintendo Entertainment System";
    const BASE: &str = "https://thumbs.example";

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
            width,
            height,
            Rgba([200, 10, 10, 255]),
        ))
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("png encoding should succeed");
        cursor.into_inner()
    }

    fn listing_page(names: &[&str]) -> String {
        names
            .iter()
            .map(|name| {
                format!(
                    "<a href=\"{}.png\">{}.png</a>\n",
                    urlencoding::encode(name),
                    name
                )
            })
            .collect()
    }

    fn resolver(transport: FakeTransport, temp: &TempDir) -> IconResolver<FakeTransport> {
        IconResolver::new(
            transport,
            CatalogAddress::new(BASE, "png"),
            IconCache::new(temp.path().join("icons")),
            ResolverSettings::default(),
        )
    }

    #[test]
    fn test_end_to_end_probe_prefers_region_name() {
        let temp = TempDir::new().expect("temp dir should be created");
        let address = CatalogAddress::new(BASE, "png");
        let usa = address.image_url(SNES, ImageCategory::Logos, "Super Mario World (USA)");
        let generic = address.image_url(SNES, ImageCategory::Logos, "Super Mario World");
        let mut transport = FakeTransport::default();
        transport.bytes.insert(generic.clone(), png_bytes(64, 32));

        let mut resolver = resolver(transport, &temp);
        let resolved = resolver.resolve(&IconRequest::new(SNES, "Super Mario World (U) [!].sfc"));

        assert_eq!(resolved.canonical_title, "Super Mario World");
        assert_eq!(resolved.source, IconSource::Probe);
        assert_eq!(resolved.matched_name.as_deref(), Some("Super Mario World"));
        let requests = resolver.transport().requests.borrow().clone();
        let usa_at = requests
            .iter()
            .position(|url| url == &usa)
            .expect("region-biased name should be probed");
        let generic_at = requests
            .iter()
            .position(|url| url == &generic)
            .expect("generic name should be probed");
        assert!(usa_at < generic_at);
        assert_eq!(image_dimensions(&resolved.path), Some((256, 256)));
    }

    #[test]
    fn test_second_resolve_is_served_from_cache() {
        let temp = TempDir::new().expect("temp dir should be created");
        let address = CatalogAddress::new(BASE, "png");
        let mut transport = FakeTransport::default();
        transport.bytes.insert(
            address.image_url(SNES, ImageCategory::Logos, "Super Mario World (USA)"),
            png_bytes(40, 40),
        );
        let mut resolver = resolver(transport, &temp);
        let request = IconRequest::new(SNES, "Super Mario World (U) [!].sfc");

        let first = resolver.resolve(&request);
        assert_eq!(first.source, IconSource::Probe);
        assert_eq!(resolver.transport().request_count(), 1);

        let second = resolver.resolve(&request);
        assert_eq!(second.source, IconSource::Cache);
        assert_eq!(second.path, first.path);
        assert_eq!(resolver.transport().request_count(), 1);
    }

    #[test]
    fn test_fuzzy_match_from_listing() {
        let temp = TempDir::new().expect("temp dir should be created");
        let address = CatalogAddress::new(BASE, "png");
        let mut transport = FakeTransport::default();
        transport.pages.insert(
            address.category_url(SNES, ImageCategory::Logos),
            listing_page(&[
                "Chrono Trigger (Japan)",
                "Chrono Trigger (USA) (Rev 1)",
                "Secret of Mana (Europe)",
            ]),
        );
        transport.bytes.insert(
            address.image_url(SNES, ImageCategory::Logos, "Chrono Trigger (USA) (Rev 1)"),
            png_bytes(100, 20),
        );
        let mut resolver = resolver(transport, &temp);

        let resolved = resolver.resolve(&IconRequest::new(SNES, "Chrono Trigger (U).smc"));
        assert!(matches!(resolved.source, IconSource::Fuzzy { score } if score >= 0.87));
        assert_eq!(
            resolved.matched_name.as_deref(),
            Some("Chrono Trigger (USA) (Rev 1)")
        );
        assert_eq!(resolved.category, Some(ImageCategory::Logos));
        assert_eq!(image_dimensions(&resolved.path), Some((256, 256)));
    }

    #[test]
    fn test_listing_is_fetched_once_per_category() {
        let temp = TempDir::new().expect("temp dir should be created");
        let address = CatalogAddress::new(BASE, "png");
        let listing_url = address.category_url(SNES, ImageCategory::Logos);
        let mut transport = FakeTransport::default();
        transport
            .pages
            .insert(listing_url.clone(), listing_page(&["Zzz Unrelated (USA)"]));
        let mut resolver = resolver(transport, &temp);

        let resolved = resolver.resolve(&IconRequest::new(SNES, "Tetris Attack (U).smc"));
        assert_eq!(resolved.source, IconSource::Placeholder);
        assert_eq!(resolver.transport().requested(&listing_url), 1);
    }

    #[test]
    fn test_exhaustion_writes_placeholder_of_target_size() {
        let temp = TempDir::new().expect("temp dir should be created");
        let mut resolver = resolver(FakeTransport::default(), &temp);

        let resolved = resolver.resolve(&IconRequest::new(SNES, "Nothing Here (E).sfc"));
        assert_eq!(resolved.source, IconSource::Placeholder);
        assert!(resolved.matched_name.is_none());
        assert!(resolved.path.exists());
        assert_eq!(image_dimensions(&resolved.path), Some((256, 256)));
        assert!(resolver
            .cache()
            .get(SNES, &resolved.canonical_title)
            .is_none());
    }

    #[test]
    fn test_placeholder_written_even_when_no_cache_is_writable() {
        let temp = TempDir::new().expect("temp dir should be created");
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, b"x").expect("blocker written");
        let primary = IconCache::new(blocker.join("icons"));
        let secondary = IconCache::new(blocker.join("placeholders"));

        let path = write_placeholder_to(
            &[&primary, &secondary],
            SNES,
            "Nothing Here",
            &ImageSettings::default(),
        );
        assert!(path.exists());
        assert!(!path.starts_with(&blocker));
        assert_eq!(image_dimensions(&path), Some((256, 256)));
        std::fs::remove_file(&path).expect("temp placeholder should be removable");
    }

    #[test]
    fn test_placeholder_falls_back_to_second_cache() {
        let temp = TempDir::new().expect("temp dir should be created");
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, b"x").expect("blocker written");
        let primary = IconCache::new(blocker.join("icons"));
        let secondary = IconCache::new(temp.path().join("fallback"));

        let path = write_placeholder_to(
            &[&primary, &secondary],
            SNES,
            "Nothing Here",
            &ImageSettings::default(),
        );
        assert_eq!(path, secondary.placeholder_path(SNES, "Nothing Here"));
        assert!(path.exists());
    }

    #[test]
    fn test_hint_overrides_filename_regions() {
        let temp = TempDir::new().expect("temp dir should be created");
        let address = CatalogAddress::new(BASE, "png");
        let europe = address.image_url(SNES, ImageCategory::Logos, "Super Mario World (Europe)");
        let mut transport = FakeTransport::default();
        transport.bytes.insert(europe.clone(), png_bytes(10, 10));
        transport.bytes.insert(
            address.image_url(SNES, ImageCategory::Logos, "Super Mario World (USA)"),
            png_bytes(10, 10),
        );
        let mut resolver = resolver(transport, &temp);

        let resolved = resolver.resolve(
            &IconRequest::new(SNES, "Super Mario World.sfc").with_hint("Super Mario World (E)"),
        );
        assert_eq!(
            resolved.matched_name.as_deref(),
            Some("Super Mario World (Europe)")
        );
        assert_eq!(resolver.transport().requests.borrow()[0], europe);
    }
}
