//! Canonical and alternate title derivation from ROM filenames.
//!
//! Everything here is pure: the same filename always yields the same
//! canonical title and the same ordered alt-title list.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::ordered_set::OrderedSet;

pub const ARTICLES: [&str; 3] = ["The", "A", "An"];

const ORDINAL_WORDS: [(&str, &str); 10] = [
    ("1st", "First"),
    ("2nd", "Second"),
    ("3rd", "Third"),
    ("4th", "Fourth"),
    ("5th", "Fifth"),
    ("6th", "Sixth"),
    ("7th", "Seventh"),
    ("8th", "Eighth"),
    ("9th", "Ninth"),
    ("10th", "Tenth"),
];

const ROMAN_NUMERALS: [(&str, &str); 10] = [
    ("I", "1"),
    ("II", "2"),
    ("III", "3"),
    ("IV", "4"),
    ("V", "5"),
    ("VI", "6"),
    ("VII", "7"),
    ("VIII", "8"),
    ("IX", "9"),
    ("X", "10"),
];

/// Filename-derived strings whose canonical title cannot be produced by the generic rules.
const MANUAL_OVERRIDES: [(&str, &str); 4] = [
    ("7th Saga, The", "The 7th Saga"),
    ("Legend of Zelda, The", "The Legend of Zelda"),
    (
        "Legend of Zelda, The - A Link to the Past",
        "The Legend of Zelda - A Link to the Past",
    ),
    (
        "Legend of Zelda, The - Link's Awakening DX",
        "The Legend of Zelda - Link's Awakening DX",
    ),
];

const ALT_PUNCTUATION: [char; 5] = [',', '!', '_', '-', '.'];

/// Canonical title plus ranked alternates for one ROM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleCandidates {
    pub canonical: String,
    pub alt_titles: Vec<String>,
}

impl TitleCandidates {
    /// Canonical title first, then every alt title, case-insensitively unique.
    pub fn attempt_order(&self) -> Vec<String> {
        let mut order = OrderedSet::case_insensitive();
        order.insert(self.canonical.clone());
        order.extend(self.alt_titles.iter().cloned());
        order
            .into_iter()
            .filter(|title| !title.trim().is_empty())
            .collect()
    }
}

struct TitleTables {
    ordinals: HashMap<&'static str, &'static str>,
    romans: HashMap<&'static str, &'static str>,
    overrides: HashMap<&'static str, &'static str>,
    paren_group: Regex,
    bracket_group: Regex,
    whitespace: Regex,
    trailing_article: Regex,
    punctuation_run: Regex,
    comma_spacing: Regex,
}

static TITLE_TABLES: OnceLock<TitleTables> = OnceLock::new();

fn title_tables() -> &'static TitleTables {
    TITLE_TABLES.get_or_init(build_title_tables)
}

fn build_title_tables() -> TitleTables {
    let articles = ARTICLES.join("|");
    TitleTables {
        ordinals: ORDINAL_WORDS.iter().copied().collect(),
        romans: ROMAN_NUMERALS.iter().copied().collect(),
        overrides: MANUAL_OVERRIDES.iter().copied().collect(),
        paren_group: Regex::new(r"\([^)]*\)").expect("paren pattern should compile"),
        bracket_group: Regex::new(r"\[[^\]]*\]").expect("bracket pattern should compile"),
        whitespace: Regex::new(r"\s+").expect("whitespace pattern should compile"),
        trailing_article: Regex::new(&format!(r"(?i)^(.*?),\s*({articles})$"))
            .expect("article pattern should compile"),
        punctuation_run: Regex::new(r"[!._\-]+").expect("punctuation pattern should compile"),
        comma_spacing: Regex::new(r"\s*,\s*").expect("comma pattern should compile"),
    }
}

/// Drops a trailing file extension such as `.sfc` or `.7z`.
///
/// Only short alphanumeric suffixes count, so titles like `Dr. Mario` keep their text.
pub fn strip_extension(filename: &str) -> &str {
    let Some((stem, extension)) = filename.rsplit_once('.') else {
        return filename;
    };
    let looks_like_extension = !stem.is_empty()
        && (1..=5).contains(&extension.len())
        && extension.chars().all(|ch| ch.is_ascii_alphanumeric())
        && extension.chars().any(|ch| ch.is_ascii_alphabetic());
    if looks_like_extension {
        stem
    } else {
        filename
    }
}

/// Removes `( ... )` and `[ ... ]` tag groups (region, revision, dump flags, translations).
pub fn strip_tags(value: &str) -> String {
    let tables = title_tables();
    let without_parens = tables.paren_group.replace_all(value, "");
    let without_brackets = tables.bracket_group.replace_all(&without_parens, "");
    let collapsed = tables.whitespace.replace_all(&without_brackets, " ");
    collapsed
        .trim_matches(|ch: char| matches!(ch, ' ' | '-' | '_' | '.' | ',' | '!' | '+'))
        .trim()
        .to_string()
}

/// Turns `Game, The` into `The Game`. Other strings come back unchanged.
pub fn move_trailing_article(value: &str) -> String {
    let Some(captures) = title_tables().trailing_article.captures(value) else {
        return value.to_string();
    };
    let core = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
    let article = captures.get(2).map(|m| m.as_str()).unwrap_or("");
    if core.is_empty() {
        return value.to_string();
    }
    format!("{article} {core}")
}

/// Splits a leading article off, returning `(article, rest)`.
pub fn split_leading_article(value: &str) -> Option<(&'static str, &str)> {
    ARTICLES.iter().find_map(|article| {
        let head = value.get(..article.len() + 1)?;
        if head.eq_ignore_ascii_case(&format!("{article} ")) {
            let rest = value[article.len() + 1..].trim_start();
            (!rest.is_empty()).then_some((*article, rest))
        } else {
            None
        }
    })
}

fn roman_to_arabic(value: &str) -> String {
    let romans = &title_tables().romans;
    value
        .split_whitespace()
        .map(|token| romans.get(token).copied().unwrap_or(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn ordinal_to_word(value: &str) -> String {
    let ordinals = &title_tables().ordinals;
    value
        .split_whitespace()
        .map(|token| {
            ordinals
                .get(token.to_ascii_lowercase().as_str())
                .copied()
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn tidy_spaces_commas(value: &str) -> String {
    let tables = title_tables();
    let commas = tables.comma_spacing.replace_all(value, ", ");
    tables
        .whitespace
        .replace_all(&commas, " ")
        .trim()
        .trim_end_matches(',')
        .trim()
        .to_string()
}

fn trailing_article_form(value: &str) -> Option<String> {
    let (article, rest) = split_leading_article(value)?;
    Some(format!("{rest}, {article}"))
}

fn starts_with_article(value: &str) -> bool {
    ARTICLES
        .iter()
        .any(|article| value.starts_with(&format!("{article} ")))
}

fn alt_rank_key(value: &str) -> (u8, u8, usize, usize) {
    let article_rank = if starts_with_article(value) { 0 } else { 1 };
    let digit_rank = if value.chars().any(|ch| ch.is_ascii_digit()) {
        0
    } else {
        1
    };
    let punctuation = value
        .chars()
        .filter(|ch| ALT_PUNCTUATION.contains(ch))
        .count();
    (article_rank, digit_rank, punctuation, value.chars().count())
}

fn canonical_title(raw: &str, article_fixed: &str) -> String {
    let overrides = &title_tables().overrides;
    if let Some(curated) = overrides.get(raw).or_else(|| overrides.get(article_fixed)) {
        return (*curated).to_string();
    }
    if article_fixed.trim().is_empty() {
        raw.to_string()
    } else {
        article_fixed.to_string()
    }
}

/// Derives the canonical title and ranked alt titles for a ROM filename.
///
/// `'7th Saga, The (U) [!].smc'` becomes canonical `The 7th Saga` with alts
/// such as `The Seventh Saga`, `Seventh Saga, The` and `7th Saga, The`.
pub fn parse_rom_title(raw_filename: &str) -> TitleCandidates {
    let stem = strip_extension(raw_filename.trim());
    let raw = strip_tags(stem);
    let tables = title_tables();

    let article_fixed = move_trailing_article(&raw);
    let no_comma = raw.replace(',', "");
    let no_punct = tables.punctuation_run.replace_all(&raw, " ").to_string();

    let mut base = OrderedSet::new();
    base.extend([raw.clone(), article_fixed.clone(), no_comma, no_punct]);

    let mut variants = OrderedSet::new();
    for candidate in base.iter() {
        variants.insert(candidate.clone());
    }
    for candidate in base.iter() {
        variants.insert(roman_to_arabic(candidate));
        variants.insert(ordinal_to_word(candidate));
    }

    let mut generated = OrderedSet::new();
    for candidate in variants.iter() {
        let tidy = tidy_spaces_commas(candidate);
        if tidy.is_empty() {
            continue;
        }
        let trailing = trailing_article_form(&tidy);
        generated.insert(tidy);
        if let Some(trailing) = trailing {
            generated.insert(trailing);
        }
    }

    let canonical = canonical_title(&raw, &article_fixed);
    let canonical_key = canonical.to_lowercase();

    let mut ranked: Vec<String> = generated
        .into_iter()
        .filter(|candidate| candidate.to_lowercase() != canonical_key)
        .collect();
    ranked.sort_by(|left, right| {
        alt_rank_key(left)
            .cmp(&alt_rank_key(right))
            .then_with(|| left.cmp(right))
    });

    let mut front = Vec::new();
    let ordinal_form = ordinal_to_word(&canonical);
    if !ordinal_form.is_empty() && ordinal_form != canonical {
        if let Some(trailing) = trailing_article_form(&ordinal_form) {
            front.push(ordinal_form);
            front.push(trailing);
        } else {
            front.push(ordinal_form);
        }
    }
    let roman_form = roman_to_arabic(&canonical);
    if !roman_form.is_empty() && roman_form != canonical {
        front.push(roman_form);
    }

    let mut alt_titles = OrderedSet::case_insensitive();
    for candidate in front.into_iter().chain(ranked) {
        if candidate.to_lowercase() == canonical_key {
            continue;
        }
        alt_titles.insert(candidate);
    }

    TitleCandidates {
        canonical,
        alt_titles: alt_titles.into_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        alt_rank_key, move_trailing_article, parse_rom_title, split_leading_article,
        strip_extension, strip_tags,
    };

    #[test]
    fn test_strip_tags_removes_region_and_dump_flags() {
        assert_eq!(strip_tags("Super Mario World (U) [!]"), "Super Mario World");
        assert_eq!(
            strip_tags("Chrono Trigger (USA) (Rev 1) [T+Ger]"),
            "Chrono Trigger"
        );
        assert_eq!(strip_tags("(Japan)"), "");
    }

    #[test]
    fn test_strip_extension_keeps_dotted_titles() {
        assert_eq!(strip_extension("Super Mario World (U) [!].sfc"), "Super Mario World (U) [!]");
        assert_eq!(strip_extension("Game.7z"), "Game");
        assert_eq!(strip_extension("Dr. Mario"), "Dr. Mario");
        assert_eq!(strip_extension("Sonic 3.bin"), "Sonic 3");
    }

    #[test]
    fn test_move_trailing_article_handles_every_article() {
        assert_eq!(move_trailing_article("Legend of Zelda, The"), "The Legend of Zelda");
        assert_eq!(move_trailing_article("Boy and His Blob, A"), "A Boy and His Blob");
        assert_eq!(move_trailing_article("American Tail, An"), "An American Tail");
        assert_eq!(move_trailing_article("Theme Park"), "Theme Park");
    }

    #[test]
    fn test_split_leading_article_requires_remaining_text() {
        assert_eq!(split_leading_article("The Game"), Some(("The", "Game")));
        assert_eq!(split_leading_article("Theme Park"), None);
        assert_eq!(split_leading_article("The "), None);
    }

    #[test]
    fn test_parse_rom_title_moves_article_to_front() {
        let titles = parse_rom_title("Lion King, The (E).md");
        assert_eq!(titles.canonical, "The Lion King");
        assert!(titles
            .alt_titles
            .iter()
            .any(|alt| alt == "Lion King, The"));
    }

    #[test]
    fn test_parse_rom_title_expands_ordinals_near_the_front() {
        let titles = parse_rom_title("7th Saga, The (U) [!].smc");
        assert_eq!(titles.canonical, "The 7th Saga");
        assert_eq!(titles.alt_titles[0], "The Seventh Saga");
        assert_eq!(titles.alt_titles[1], "Seventh Saga, The");
        assert!(titles.alt_titles.iter().any(|alt| alt == "7th Saga, The"));
        assert!(titles.alt_titles.iter().any(|alt| alt == "7th Saga The"));
    }

    #[test]
    fn test_parse_rom_title_alt_titles_full_order() {
        let titles = parse_rom_title("7th Saga, The (U) [!].smc");
        assert_eq!(
            titles.alt_titles,
            vec![
                "The Seventh Saga",
                "Seventh Saga, The",
                "7th Saga The",
                "7th Saga, The",
                "Seventh Saga The",
            ]
        );
    }

    #[test]
    fn test_alt_rank_key_tiers_in_order() {
        // Leading article beats digits, punctuation and length.
        assert!(alt_rank_key("The Long Title, Part 2!") < alt_rank_key("Abc"));
        // Then a digit beats fewer punctuation marks and shorter length.
        assert!(alt_rank_key("Game 2, Deluxe!") < alt_rank_key("Game"));
        // Then fewer punctuation marks beat shorter length.
        assert!(alt_rank_key("Game Two 2") < alt_rank_key("G.2"));
        // Then the shorter one.
        assert!(alt_rank_key("Game 2") < alt_rank_key("Game 22"));
        assert_eq!(alt_rank_key("Game 2"), (1, 0, 0, 6));
    }

    #[test]
    fn test_parse_rom_title_maps_roman_numerals_to_digits() {
        let titles = parse_rom_title("Final Fantasy III (U) (V1.1).sfc");
        assert_eq!(titles.canonical, "Final Fantasy III");
        assert!(titles
            .alt_titles
            .iter()
            .any(|alt| alt.contains("Final Fantasy 3")));
    }

    #[test]
    fn test_parse_rom_title_excludes_canonical_and_case_duplicates() {
        let titles = parse_rom_title("Mega Man X (USA).sfc");
        assert!(titles
            .alt_titles
            .iter()
            .all(|alt| !alt.eq_ignore_ascii_case(&titles.canonical)));
        let mut lowered: Vec<String> = titles
            .alt_titles
            .iter()
            .map(|alt| alt.to_lowercase())
            .collect();
        let before = lowered.len();
        lowered.sort();
        lowered.dedup();
        assert_eq!(lowered.len(), before);
    }

    #[test]
    fn test_parse_rom_title_is_idempotent() {
        let first = parse_rom_title("Legend of Zelda, The - A Link to the Past (U) [!].smc");
        let second = parse_rom_title("Legend of Zelda, The - A Link to the Past (U) [!].smc");
        assert_eq!(first, second);
        assert_eq!(first.canonical, "The Legend of Zelda - A Link to the Past");
    }

    #[test]
    fn test_parse_rom_title_plain_filename_has_canonical_only() {
        let titles = parse_rom_title("Super Mario World (U) [!].sfc");
        assert_eq!(titles.canonical, "Super Mario World");
        assert!(titles.alt_titles.is_empty());
        assert_eq!(titles.attempt_order(), vec!["Super Mario World".to_string()]);
    }

    #[test]
    fn test_parse_rom_title_empty_input_is_total() {
        let titles = parse_rom_title("");
        assert_eq!(titles.canonical, "");
        assert!(titles.alt_titles.is_empty());
        assert!(titles.attempt_order().is_empty());
    }
}
