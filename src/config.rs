//! Persistent configuration model and defaults.

use std::path::PathBuf;

use crate::catalog_client::CategoryOrder;
use crate::fuzzy_scorer::{ScoreWeights, ScoringParams};
use crate::icon_resolver::{ResolverSettings, DEFAULT_THRESHOLDS};
use crate::image_pipeline::{
    ImageSettings, NormalizeMode, DEFAULT_TARGET_SIZE, MAX_TARGET_SIZE, MIN_TARGET_SIZE,
};

pub const DEFAULT_CATALOG_BASE_URL: &str = "https://thumbnails.libretro.com";

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Remote catalog location and request limits.
    pub catalog: CatalogConfig,
    #[serde(default)]
    /// Acceptance thresholds and scoring weights.
    pub matching: MatchingConfig,
    #[serde(default)]
    /// Output icon shape.
    pub image: ImageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Extension of catalog images, without the dot.
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct MatchingConfig {
    /// Strictly descending acceptance scores tried for each title.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<f64>,
    #[serde(default = "default_tie_break_epsilon")]
    pub tie_break_epsilon: f64,
    #[serde(default = "default_sequence_weight")]
    pub sequence_weight: f64,
    #[serde(default = "default_token_weight")]
    pub token_weight: f64,
    #[serde(default = "default_substring_weight")]
    pub substring_weight: f64,
    #[serde(default)]
    pub category_order: CategoryOrder,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ImageConfig {
    #[serde(default = "default_target_size")]
    pub target_size: u32,
    #[serde(default)]
    pub mode: NormalizeMode,
    /// Letterbox fill color as RGB.
    #[serde(default)]
    pub background: [u8; 3],
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CacheConfig {
    /// Icon cache directory. Empty means the platform cache dir.
    #[serde(default)]
    pub directory: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            user_agent: default_user_agent(),
            image_extension: default_image_extension(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            tie_break_epsilon: default_tie_break_epsilon(),
            sequence_weight: default_sequence_weight(),
            token_weight: default_token_weight(),
            substring_weight: default_substring_weight(),
            category_order: CategoryOrder::default(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            mode: NormalizeMode::default(),
            background: [0, 0, 0],
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_CATALOG_BASE_URL.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("romcover/{}", env!("CARGO_PKG_VERSION"))
}

fn default_image_extension() -> String {
    "png".to_string()
}

fn default_thresholds() -> Vec<f64> {
    DEFAULT_THRESHOLDS.to_vec()
}

fn default_tie_break_epsilon() -> f64 {
    ScoringParams::default().tie_break_epsilon
}

fn default_sequence_weight() -> f64 {
    ScoreWeights::default().sequence
}

fn default_token_weight() -> f64 {
    ScoreWeights::default().token
}

fn default_substring_weight() -> f64 {
    ScoreWeights::default().substring
}

fn default_target_size() -> u32 {
    DEFAULT_TARGET_SIZE
}

fn sanitize_thresholds(thresholds: &[f64]) -> Vec<f64> {
    let mut sanitized: Vec<f64> = Vec::with_capacity(thresholds.len());
    for &threshold in thresholds {
        if !threshold.is_finite() {
            continue;
        }
        let clamped = threshold.clamp(0.0, 1.0);
        if sanitized.last().is_some_and(|previous| clamped >= *previous) {
            continue;
        }
        sanitized.push(clamped);
    }
    if sanitized.is_empty() {
        return default_thresholds();
    }
    sanitized
}

fn sanitize_weight(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

/// Clamps out-of-range values and restores defaults for unusable ones.
pub fn sanitize_config(config: Config) -> Config {
    let defaults = Config::default();
    let base_url = config.catalog.base_url.trim().trim_end_matches('/');
    let image_extension = config
        .catalog
        .image_extension
        .trim()
        .trim_start_matches('.')
        .to_ascii_lowercase();
    let user_agent = config.catalog.user_agent.trim();

    let mut weights = ScoreWeights {
        sequence: sanitize_weight(
            config.matching.sequence_weight,
            defaults.matching.sequence_weight,
        ),
        token: sanitize_weight(config.matching.token_weight, defaults.matching.token_weight),
        substring: sanitize_weight(
            config.matching.substring_weight,
            defaults.matching.substring_weight,
        ),
    };
    if weights.sequence + weights.token + weights.substring <= 0.0 {
        weights = ScoreWeights::default();
    }
    let tie_break_epsilon = if config.matching.tie_break_epsilon.is_finite() {
        config.matching.tie_break_epsilon.clamp(0.0, 1.0)
    } else {
        defaults.matching.tie_break_epsilon
    };

    Config {
        catalog: CatalogConfig {
            base_url: if base_url.is_empty() {
                defaults.catalog.base_url
            } else {
                base_url.to_string()
            },
            connect_timeout_ms: config.catalog.connect_timeout_ms.clamp(100, 120_000),
            read_timeout_ms: config.catalog.read_timeout_ms.clamp(100, 300_000),
            user_agent: if user_agent.is_empty() {
                defaults.catalog.user_agent
            } else {
                user_agent.to_string()
            },
            image_extension: if image_extension.is_empty() {
                defaults.catalog.image_extension
            } else {
                image_extension
            },
        },
        matching: MatchingConfig {
            thresholds: sanitize_thresholds(&config.matching.thresholds),
            tie_break_epsilon,
            sequence_weight: weights.sequence,
            token_weight: weights.token,
            substring_weight: weights.substring,
            category_order: config.matching.category_order,
        },
        image: ImageConfig {
            target_size: config
                .image
                .target_size
                .clamp(MIN_TARGET_SIZE, MAX_TARGET_SIZE),
            mode: config.image.mode,
            background: config.image.background,
        },
        cache: CacheConfig {
            directory: config.cache.directory.trim().to_string(),
        },
    }
}

impl Config {
    pub fn image_settings(&self) -> ImageSettings {
        ImageSettings {
            target_size: self.image.target_size,
            mode: self.image.mode,
            background: self.image.background,
        }
    }

    pub fn scoring_params(&self) -> ScoringParams {
        ScoringParams {
            weights: ScoreWeights {
                sequence: self.matching.sequence_weight,
                token: self.matching.token_weight,
                substring: self.matching.substring_weight,
            },
            tie_break_epsilon: self.matching.tie_break_epsilon,
        }
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            thresholds: self.matching.thresholds.clone(),
            scoring: self.scoring_params(),
            category_order: self.matching.category_order,
            image: self.image_settings(),
        }
    }

    /// Configured cache directory, if one was set.
    pub fn cache_directory(&self) -> Option<PathBuf> {
        let directory = self.cache.directory.trim();
        (!directory.is_empty()).then(|| PathBuf::from(directory))
    }
}
