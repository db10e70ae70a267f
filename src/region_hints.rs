//! Region preference inference from filename tags.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::ordered_set::OrderedSet;

pub const USA: &str = "(USA)";
pub const EUROPE: &str = "(Europe)";
pub const JAPAN: &str = "(Japan)";
pub const WORLD: &str = "(World)";
pub const USA_EUROPE: &str = "(USA, Europe)";
pub const JAPAN_USA: &str = "(Japan, USA)";

/// Normalized tag text (lowercase, no spaces) to the catalog labels it implies.
const REGION_ALIASES: &[(&str, &[&str])] = &[
    ("u", &[USA]),
    ("us", &[USA]),
    ("usa", &[USA]),
    ("america", &[USA]),
    ("e", &[EUROPE]),
    ("eu", &[EUROPE]),
    ("eur", &[EUROPE]),
    ("europe", &[EUROPE]),
    ("j", &[JAPAN]),
    ("jp", &[JAPAN]),
    ("jpn", &[JAPAN]),
    ("japan", &[JAPAN]),
    ("w", &[WORLD]),
    ("world", &[WORLD]),
    ("ue", &[USA_EUROPE, USA, EUROPE]),
    ("usa,europe", &[USA_EUROPE, USA, EUROPE]),
    ("ju", &[JAPAN_USA, JAPAN, USA]),
    ("japan,usa", &[JAPAN_USA, JAPAN, USA]),
    ("f", &["(France)"]),
    ("fr", &["(France)"]),
    ("france", &["(France)"]),
    ("g", &["(Germany)"]),
    ("de", &["(Germany)"]),
    ("germany", &["(Germany)"]),
    ("s", &["(Spain)"]),
    ("es", &["(Spain)"]),
    ("spain", &["(Spain)"]),
    ("i", &["(Italy)"]),
    ("it", &["(Italy)"]),
    ("italy", &["(Italy)"]),
    ("k", &["(Korea)"]),
    ("kr", &["(Korea)"]),
    ("korea", &["(Korea)"]),
    ("b", &["(Brazil)"]),
    ("br", &["(Brazil)"]),
    ("brazil", &["(Brazil)"]),
    ("a", &["(Australia)"]),
    ("au", &["(Australia)"]),
    ("australia", &["(Australia)"]),
];

/// Labels appended after the detected ones, keyed by the highest-priority label.
const FALLBACK_CHAINS: &[(&str, &[&str])] = &[
    (USA, &[WORLD, USA_EUROPE, EUROPE, JAPAN]),
    (EUROPE, &[WORLD, USA_EUROPE, USA, JAPAN]),
    (JAPAN, &[WORLD, JAPAN_USA, USA, EUROPE]),
    (WORLD, &[USA, USA_EUROPE, EUROPE, JAPAN]),
    (USA_EUROPE, &[USA, EUROPE, WORLD, JAPAN]),
    (JAPAN_USA, &[JAPAN, USA, WORLD, EUROPE]),
];

/// Chain used for labels without a dedicated entry (France, Germany, ...).
const DEFAULT_FALLBACK_CHAIN: &[&str] = &[EUROPE, WORLD, USA_EUROPE, USA];

struct RegionTables {
    aliases: HashMap<&'static str, &'static [&'static str]>,
    fallbacks: HashMap<&'static str, &'static [&'static str]>,
    paren_tag: Regex,
}

static REGION_TABLES: OnceLock<RegionTables> = OnceLock::new();

fn region_tables() -> &'static RegionTables {
    REGION_TABLES.get_or_init(|| RegionTables {
        aliases: REGION_ALIASES.iter().copied().collect(),
        fallbacks: FALLBACK_CHAINS.iter().copied().collect(),
        paren_tag: Regex::new(r"\(([^)]*)\)").expect("tag pattern should compile"),
    })
}

/// Ordered region labels to favor while matching. Empty means no bias.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionPreferences {
    labels: Vec<&'static str>,
}

impl RegionPreferences {
    #[cfg(test)]
    pub(crate) fn from_labels(labels: &[&'static str]) -> Self {
        let mut ordered = OrderedSet::new();
        ordered.extend(labels.iter().copied());
        Self {
            labels: ordered.into_vec(),
        }
    }

    pub fn labels(&self) -> &[&'static str] {
        &self.labels
    }

    #[cfg(test)]
    pub(crate) fn primary(&self) -> Option<&'static str> {
        self.labels.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn labels_for_tag(tag: &str) -> Vec<&'static str> {
    let aliases = &region_tables().aliases;
    let normalized = normalize_tag(tag);
    if let Some(labels) = aliases.get(normalized.as_str()) {
        return labels.to_vec();
    }
    // Multi-region tags such as "(USA, Japan)" fall back to their parts.
    if normalized.contains(',') {
        return normalized
            .split(',')
            .filter_map(|part| aliases.get(part))
            .flat_map(|labels| labels.iter().copied())
            .collect();
    }
    Vec::new()
}

fn parenthesized_tags(value: &str) -> Vec<&str> {
    region_tables()
        .paren_tag
        .captures_iter(value)
        .filter_map(|captures| captures.get(1).map(|m| m.as_str()))
        .collect()
}

/// Builds the preference list from tags in `title` and the optional `hint`.
///
/// Labels keep first-seen order. When anything was detected, the fallback
/// chain of the first label is appended for labels not already present.
pub fn region_preferences(title: &str, hint: Option<&str>) -> RegionPreferences {
    let mut ordered = OrderedSet::new();
    let sources = std::iter::once(title).chain(hint);
    for source in sources {
        for tag in parenthesized_tags(source) {
            ordered.extend(labels_for_tag(tag));
        }
    }

    let Some(primary) = ordered.iter().next().copied() else {
        return RegionPreferences::default();
    };
    let chain = region_tables()
        .fallbacks
        .get(primary)
        .copied()
        .unwrap_or(DEFAULT_FALLBACK_CHAIN);
    ordered.extend(chain.iter().copied());

    RegionPreferences {
        labels: ordered.into_vec(),
    }
}
