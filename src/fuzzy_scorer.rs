//! Fuzzy matching of catalog listing names against a query title.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::region_hints::RegionPreferences;
use crate::text_fold::fold_to_ascii;
use crate::title_canonicalizer::ARTICLES;

/// Relative weight of each similarity signal in the blended score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub sequence: f64,
    pub token: f64,
    pub substring: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            sequence: 0.60,
            token: 0.35,
            substring: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringParams {
    pub weights: ScoreWeights,
    /// Score window below the top entry inside which region preference decides.
    pub tie_break_epsilon: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            tie_break_epsilon: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub name: String,
    pub score: f64,
}

/// Outcome of ranking one listing against one query.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDecision {
    pub winner: ScoredCandidate,
    pub top_score: f64,
    /// Region label that moved the winner away from the top-ranked entry.
    pub region_label: Option<&'static str>,
}

impl MatchDecision {
    pub fn accepted(&self, threshold: f64) -> bool {
        self.winner.score >= threshold
    }
}

static GROUP_PATTERN: OnceLock<Regex> = OnceLock::new();

fn group_pattern() -> &'static Regex {
    GROUP_PATTERN.get_or_init(|| {
        Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("group pattern should compile")
    })
}

/// Normalization applied identically to queries and listing names.
pub fn normalize_for_match(value: &str) -> String {
    let folded = fold_to_ascii(value);
    let without_groups = group_pattern().replace_all(&folded, " ");
    let mut collapsed = String::with_capacity(without_groups.len());
    for ch in without_groups.chars() {
        if ch.is_alphanumeric() {
            collapsed.extend(ch.to_lowercase());
        } else {
            collapsed.push(' ');
        }
    }
    let mut tokens: Vec<&str> = collapsed.split_whitespace().collect();
    let leading_article = tokens
        .first()
        .is_some_and(|first| ARTICLES.iter().any(|article| article.eq_ignore_ascii_case(first)));
    if leading_article && tokens.len() > 1 {
        tokens.remove(0);
    }
    tokens.join(" ")
}

fn longest_match(
    a: &[char],
    b: &[char],
    (a_lo, a_hi): (usize, usize),
    (b_lo, b_hi): (usize, usize),
) -> (usize, usize, usize) {
    let width = b_hi - b_lo;
    let mut best = (a_lo, b_lo, 0usize);
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];
    for i in a_lo..a_hi {
        for offset in 0..width {
            let j = b_lo + offset;
            current[offset + 1] = if a[i] == b[j] {
                previous[offset] + 1
            } else {
                0
            };
            let length = current[offset + 1];
            if length > best.2 {
                best = (i + 1 - length, j + 1 - length, length);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![((0, a.len()), (0, b.len()))];
    while let Some((a_range, b_range)) = pending.pop() {
        let (i, j, length) = longest_match(a, b, a_range, b_range);
        if length == 0 {
            continue;
        }
        total += length;
        if a_range.0 < i && b_range.0 < j {
            pending.push(((a_range.0, i), (b_range.0, j)));
        }
        if i + length < a_range.1 && j + length < b_range.1 {
            pending.push(((i + length, a_range.1), (j + length, b_range.1)));
        }
    }
    total
}

/// Ratcliff/Obershelp similarity: twice the matched characters over the total length.
pub fn sequence_ratio(left: &str, right: &str) -> f64 {
    let a: Vec<char> = left.chars().collect();
    let b: Vec<char> = right.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Intersection over union of whitespace-separated tokens.
pub fn token_jaccard(left: &str, right: &str) -> f64 {
    let left_tokens: HashSet<&str> = left.split_whitespace().collect();
    let right_tokens: HashSet<&str> = right.split_whitespace().collect();
    let union = left_tokens.union(&right_tokens).count();
    if union == 0 {
        return 0.0;
    }
    left_tokens.intersection(&right_tokens).count() as f64 / union as f64
}

fn score_normalized(query: &str, candidate: &str, weights: &ScoreWeights) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let substring = if query.contains(candidate) || candidate.contains(query) {
        1.0
    } else {
        0.0
    };
    let blended = weights.sequence * sequence_ratio(query, candidate)
        + weights.token * token_jaccard(query, candidate)
        + weights.substring * substring;
    blended.clamp(0.0, 1.0)
}

/// Blended similarity in `[0, 1]` between a query title and a listing name.
#[cfg(test)]
pub(crate) fn score(query: &str, candidate: &str, weights: &ScoreWeights) -> f64 {
    score_normalized(
        &normalize_for_match(query),
        &normalize_for_match(candidate),
        weights,
    )
}

/// Scores every name and sorts by descending score. Exact ties keep listing order.
pub fn rank_candidates(
    query: &str,
    names: &[String],
    weights: &ScoreWeights,
) -> Vec<ScoredCandidate> {
    let normalized_query = normalize_for_match(query);
    let mut ranked: Vec<ScoredCandidate> = names
        .iter()
        .map(|name| ScoredCandidate {
            name: name.clone(),
            score: score_normalized(&normalized_query, &normalize_for_match(name), weights),
        })
        .collect();
    ranked.sort_by(|left, right| right.score.total_cmp(&left.score));
    ranked
}

/// Ranks `names` and applies the region tie-break within the epsilon window.
///
/// Returns `None` only for an empty listing. Threshold acceptance is left to
/// the caller through [`MatchDecision::accepted`].
pub fn pick_winner(
    query: &str,
    names: &[String],
    preferences: &RegionPreferences,
    params: &ScoringParams,
) -> Option<MatchDecision> {
    let ranked = rank_candidates(query, names, &params.weights);
    let top = ranked.first()?.clone();
    let window_floor = top.score - params.tie_break_epsilon;
    let window: Vec<&ScoredCandidate> = ranked
        .iter()
        .take_while(|candidate| candidate.score >= window_floor - f64::EPSILON)
        .collect();

    for label in preferences.labels() {
        if let Some(preferred) = window
            .iter()
            .find(|candidate| candidate.name.contains(label))
        {
            let region_label = (preferred.name != top.name).then_some(*label);
            return Some(MatchDecision {
                winner: (*preferred).clone(),
                top_score: top.score,
                region_label,
            });
        }
    }

    Some(MatchDecision {
        top_score: top.score,
        winner: top,
        region_label: None,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_for_match, pick_winner, rank_candidates, score, sequence_ratio, token_jaccard,
        ScoreWeights, ScoringParams,
    };
    use crate::region_hints::{RegionPreferences, EUROPE, JAPAN, USA};

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn test_normalize_for_match() {
        assert_eq!(
            normalize_for_match("The Legend of Zelda - A Link to the Past (USA) [!]"),
            "legend of zelda a link to the past"
        );
        assert_eq!(normalize_for_match("Pokémon: Red_Version"), "pokemon red version");
        assert_eq!(normalize_for_match("The"), "the");
        assert_eq!(normalize_for_match("  (Japan) "), "");
    }

    #[test]
    fn test_sequence_ratio_matches_reference_values() {
        assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < 1e-9);
        assert!((sequence_ratio("abc", "abc") - 1.0).abs() < 1e-9);
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_token_jaccard() {
        assert!((token_jaccard("super mario world", "super mario kart") - 0.5).abs() < 1e-9);
        assert_eq!(token_jaccard("", ""), 0.0);
    }

    #[test]
    fn test_score_ignores_accents_and_case() {
        let weights = ScoreWeights::default();
        let value = score("Pokémon Stadium", "POKEMON stadium", &weights);
        assert!((value - 1.0).abs() < 1e-9, "score was {value}");
        let other = score("Éxcite Bike", "excite bike (USA)", &weights);
        assert!((other - 1.0).abs() < 1e-9, "score was {other}");
    }

    #[test]
    fn test_score_is_bounded_and_empty_scores_zero() {
        let weights = ScoreWeights::default();
        assert_eq!(score("", "Anything", &weights), 0.0);
        assert_eq!(score("(USA)", "(USA)", &weights), 0.0);
        let value = score("Super Mario World", "Super Mario Kart", &weights);
        assert!(value > 0.0 && value < 1.0);
    }

    #[test]
    fn test_rank_candidates_is_stable_on_exact_ties() {
        let ranked = rank_candidates(
            "Tetris",
            &names(&["Tetris (Japan)", "Tetris (USA)", "Tetris 2 (USA)"]),
            &ScoreWeights::default(),
        );
        assert_eq!(ranked[0].name, "Tetris (Japan)");
        assert_eq!(ranked[1].name, "Tetris (USA)");
        assert_eq!(ranked[2].name, "Tetris 2 (USA)");
    }

    #[test]
    fn test_pick_winner_prefers_region_within_epsilon() {
        let prefs = RegionPreferences::from_labels(&[USA, EUROPE]);
        let listing = names(&["Tetris (Japan)", "Tetris (Europe)", "Tetris (USA)"]);
        let decision = pick_winner("Tetris", &listing, &prefs, &ScoringParams::default())
            .expect("non-empty listing should produce a decision");
        assert_eq!(decision.winner.name, "Tetris (USA)");
        assert_eq!(decision.region_label, Some(USA));

        let reversed = names(&["Tetris (USA)", "Tetris (Europe)", "Tetris (Japan)"]);
        let decision = pick_winner("Tetris", &reversed, &prefs, &ScoringParams::default())
            .expect("non-empty listing should produce a decision");
        assert_eq!(decision.winner.name, "Tetris (USA)");
        assert_eq!(decision.region_label, None);
    }

    #[test]
    fn test_pick_winner_ignores_region_outside_epsilon() {
        let prefs = RegionPreferences::from_labels(&[JAPAN]);
        let listing = names(&["Super Mario World (USA)", "Super Mario World 2 (Japan)"]);
        let decision =
            pick_winner("Super Mario World", &listing, &prefs, &ScoringParams::default())
                .expect("non-empty listing should produce a decision");
        assert_eq!(decision.winner.name, "Super Mario World (USA)");
        assert!(decision.accepted(0.87));
    }

    #[test]
    fn test_pick_winner_without_preferences_keeps_top() {
        let listing = names(&["Mega Man X (USA)", "Mega Man X2 (USA)"]);
        let decision = pick_winner(
            "Mega Man X",
            &listing,
            &RegionPreferences::default(),
            &ScoringParams::default(),
        )
        .expect("non-empty listing should produce a decision");
        assert_eq!(decision.winner.name, "Mega Man X (USA)");
        assert!(pick_winner(
            "Mega Man X",
            &[],
            &RegionPreferences::default(),
            &ScoringParams::default()
        )
        .is_none());
    }

    #[test]
    fn test_match_decision_respects_threshold() {
        let listing = names(&["Street Fighter Alpha 2 (USA)"]);
        let decision = pick_winner(
            "Street Fighter II Turbo",
            &listing,
            &RegionPreferences::default(),
            &ScoringParams::default(),
        )
        .expect("non-empty listing should produce a decision");
        assert!(!decision.accepted(0.80));
    }
}
