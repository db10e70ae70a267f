//! Exact, listing-free probing of likely catalog names.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::debug;

use crate::catalog_client::{CatalogTransport, ImageCategory};
use crate::catalog_session::{CatalogSession, NamedImage};
use crate::fuzzy_scorer::normalize_for_match;
use crate::ordered_set::OrderedSet;
use crate::region_hints::RegionPreferences;
use crate::title_canonicalizer::strip_tags;

/// Characters the catalog replaces with `_` in file names.
const CATALOG_UNSAFE: [char; 10] = ['&', '*', '/', ':', '`', '<', '>', '?', '\\', '|'];

/// Known multi-word titles whose catalog names differ from any generated variant.
const PROBE_ALIASES: &[(&str, &[&str])] = &[
    (
        "legend of zelda a link to the past",
        &["Legend of Zelda, The - A Link to the Past"],
    ),
    ("legend of zelda", &["Legend of Zelda, The"]),
    (
        "street fighter ii",
        &["Street Fighter II - The World Warrior"],
    ),
    (
        "street fighter 2",
        &["Street Fighter II - The World Warrior"],
    ),
    ("super mario bros 3", &["Super Mario Bros. 3"]),
    ("dr mario", &["Dr. Mario"]),
    ("pokemon red", &["Pokemon - Red Version"]),
    ("pokemon blue", &["Pokemon - Blue Version"]),
    ("pokemon yellow", &["Pokemon - Yellow Version - Special Pikachu Edition"]),
    ("sonic the hedgehog 2", &["Sonic The Hedgehog 2"]),
];

static PROBE_ALIAS_TABLE: OnceLock<HashMap<&'static str, &'static [&'static str]>> =
    OnceLock::new();

fn probe_alias_table() -> &'static HashMap<&'static str, &'static [&'static str]> {
    PROBE_ALIAS_TABLE.get_or_init(|| PROBE_ALIASES.iter().copied().collect())
}

/// The catalog's own spelling: reserved characters become `_`, double quotes too.
pub fn catalog_safe_name(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if CATALOG_UNSAFE.contains(&ch) || ch == '"' {
                '_'
            } else {
                ch
            }
        })
        .collect()
}

fn dash_variants(value: &str) -> Vec<String> {
    let mut variants = Vec::new();
    if value.contains(':') {
        variants.push(value.replace(" : ", " - ").replace(": ", " - ").replace(':', " - "));
    }
    if value.contains(" - ") {
        variants.push(value.replace(" - ", " "));
    }
    variants
}

/// Ordered probe names: region-biased first, then generic spellings.
pub fn probe_names(title: &str, preferences: &RegionPreferences) -> Vec<String> {
    let raw = title.trim();
    let stripped = strip_tags(raw);
    let mut ordered = OrderedSet::new();

    if !stripped.is_empty() {
        for label in preferences.labels() {
            ordered.insert(format!("{stripped} {label}"));
        }
    }

    ordered.insert(raw.to_string());
    ordered.extend(dash_variants(raw));
    ordered.insert(stripped.clone());
    if let Some(aliases) = probe_alias_table().get(normalize_for_match(&stripped).as_str()) {
        ordered.extend(aliases.iter().map(|alias| alias.to_string()));
    }

    let mut names = OrderedSet::new();
    for name in ordered {
        if name.trim().is_empty() {
            continue;
        }
        let safe = catalog_safe_name(&name);
        names.insert(name);
        names.insert(safe);
    }
    names.into_vec()
}

/// A confirmed exact-probe result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHit {
    pub category: ImageCategory,
    pub name: String,
    pub image: NamedImage,
}

/// Tries every probe name in every category, in order, stopping at the first image.
pub fn probe<T: CatalogTransport + ?Sized>(
    session: &mut CatalogSession<'_, T>,
    title: &str,
    categories: &[ImageCategory],
    preferences: &RegionPreferences,
) -> Option<ProbeHit> {
    let names = probe_names(title, preferences);
    for &category in categories {
        for name in &names {
            if let Some(image) = session.fetch_named(category, name) {
                return Some(ProbeHit {
                    category,
                    name: name.clone(),
                    image,
                });
            }
        }
        debug!(
            "Probe: no exact name for '{}' in [{}] ({} tried)",
            title,
            category,
            names.len()
        );
    }
    None
}
