//! Category index scraping.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::catalog_client::{CatalogAddress, CatalogTransport, FetchOutcome, ImageCategory};
use crate::ordered_set::OrderedSet;

static HREF_PATTERN: OnceLock<Regex> = OnceLock::new();

fn href_pattern() -> &'static Regex {
    HREF_PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)href\s*=\s*"([^"]+)""#).expect("href pattern should compile")
    })
}

fn unescape_html(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn entry_name(href: &str, extension: &str) -> Option<String> {
    let unescaped = unescape_html(href);
    let without_query = unescaped.split(|ch| ch == '?' || ch == '#').next().unwrap_or("");
    let file_name = without_query.rsplit('/').next().unwrap_or("");
    let decoded = urlencoding::decode(file_name)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| file_name.to_string());
    let suffix_len = extension.len() + 1;
    if decoded.len() <= suffix_len || !decoded.is_char_boundary(decoded.len() - suffix_len) {
        return None;
    }
    let (stem, suffix) = decoded.split_at(decoded.len() - suffix_len);
    let matches_extension = suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(extension);
    matches_extension.then(|| stem.to_string())
}

/// Extracts unextended image names from an index page, first-seen order, no duplicates.
pub fn parse_listing(markup: &str, extension: &str) -> Vec<String> {
    let mut names = OrderedSet::new();
    for captures in href_pattern().captures_iter(markup) {
        let Some(href) = captures.get(1) else {
            continue;
        };
        if let Some(name) = entry_name(href.as_str(), extension) {
            names.insert(name);
        }
    }
    names.into_vec()
}

/// Fetches the names available for `(platform, category)`.
///
/// An unreachable or malformed index yields `None`; an index without image
/// links yields an empty list. Both mean "no candidates" to the caller.
pub fn fetch_listing<T: CatalogTransport + ?Sized>(
    transport: &T,
    address: &CatalogAddress,
    platform: &str,
    category: ImageCategory,
) -> Option<Vec<String>> {
    let url = address.category_url(platform, category);
    match transport.fetch_text(&url) {
        FetchOutcome::Fetched(markup) => {
            let names = parse_listing(&markup, address.image_extension());
            debug!(
                "Listing: {} entries for '{}' [{}]",
                names.len(),
                platform,
                category
            );
            Some(names)
        }
        FetchOutcome::Unavailable(failure) => {
            debug!("Listing: unavailable for '{platform}' [{category}]: {failure}");
            None
        }
    }
}
