//! Command-line surface: argument model and command handlers.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

use crate::catalog_client::{CatalogAddress, CategoryOrder, HttpTransport};
use crate::config::Config;
use crate::config_persistence::{default_config_path, load_or_create_config, resolve_cache_dir};
use crate::icon_cache::IconCache;
use crate::icon_resolver::{IconRequest, IconResolver, IconSource, ResolvedIcon};
use crate::image_pipeline::NormalizeMode;
use crate::platforms::resolve_platform;
use crate::region_hints::region_preferences;
use crate::rom_discovery::discover_roms;
use crate::title_canonicalizer::parse_rom_title;

#[derive(Parser)]
#[command(name = "romcover")]
#[command(about = "Find cover icons for ROM files in a remote thumbnail catalog", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Icon cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// How fetched images are fitted into the square
    #[arg(long, global = true, value_enum)]
    pub mode: Option<ModeArg>,

    /// Which image category family to try first
    #[arg(long, global = true, value_enum)]
    pub prefer: Option<PreferArg>,

    /// Log every attempt, not just decisions
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the canonical title, alt titles and region preferences for a filename
    Titles {
        /// ROM file name
        filename: String,
    },

    /// Resolve one icon
    Resolve {
        /// ROM file name
        filename: String,
        /// Catalog platform name or folder alias (e.g. "snes")
        #[arg(short, long)]
        platform: String,
        /// Extra text searched for region tags
        #[arg(long)]
        hint: Option<String>,
    },

    /// Resolve an icon for every ROM under a directory
    Scan {
        /// Directory holding ROMs, directly or in platform folders
        root: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Letterbox,
    Crop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PreferArg {
    Logos,
    Boxarts,
}

impl From<ModeArg> for NormalizeMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Letterbox => Self::Letterbox,
            ModeArg::Crop => Self::Crop,
        }
    }
}

impl From<PreferArg> for CategoryOrder {
    fn from(value: PreferArg) -> Self {
        match value {
            PreferArg::Logos => Self::Logos,
            PreferArg::Boxarts => Self::Boxarts,
        }
    }
}

pub fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Titles { ref filename } => {
            cmd_titles(filename);
            Ok(())
        }
        Commands::Resolve {
            ref filename,
            ref platform,
            ref hint,
        } => {
            let config = load_config(&cli)?;
            cmd_resolve(&cli, &config, filename, platform, hint.as_deref())
        }
        Commands::Scan { ref root } => {
            let config = load_config(&cli)?;
            cmd_scan(&cli, &config, root)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn Error>> {
    let path = match cli.config.clone().or_else(default_config_path) {
        Some(path) => path,
        None => {
            warn!("No config directory available. Using defaults.");
            return Ok(apply_overrides(Config::default(), cli));
        }
    };
    let config = load_or_create_config(&path)?;
    Ok(apply_overrides(config, cli))
}

fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(mode) = cli.mode {
        config.image.mode = mode.into();
    }
    if let Some(prefer) = cli.prefer {
        config.matching.category_order = prefer.into();
    }
    config
}

fn build_resolver(cli: &Cli, config: &Config) -> IconResolver<HttpTransport> {
    let cache_dir = resolve_cache_dir(config, cli.cache_dir.as_deref());
    let cache = IconCache::open_or_fallback(cache_dir);
    info!("Using icon cache {}", cache.root().display());
    IconResolver::new(
        HttpTransport::new(&config.catalog),
        CatalogAddress::new(&config.catalog.base_url, &config.catalog.image_extension),
        cache,
        config.resolver_settings(),
    )
}

fn describe(resolved: &ResolvedIcon) -> String {
    let via = match &resolved.source {
        IconSource::Cache => "cache".to_string(),
        IconSource::Probe => "exact probe".to_string(),
        IconSource::Fuzzy { score } => format!("fuzzy match {score:.3}"),
        IconSource::Placeholder => "placeholder".to_string(),
    };
    match (&resolved.matched_name, resolved.category) {
        (Some(name), Some(category)) => format!("{via}, '{name}' [{category}]"),
        _ => via,
    }
}

fn cmd_titles(filename: &str) {
    let titles = parse_rom_title(filename);
    let preferences = region_preferences(&titles.canonical, Some(filename));
    println!("canonical: {}", titles.canonical);
    for (index, alt) in titles.alt_titles.iter().enumerate() {
        println!("alt {}: {}", index + 1, alt);
    }
    if preferences.is_empty() {
        println!("regions: (none)");
    } else {
        println!("regions: {}", preferences.labels().join(", "));
    }
}

fn cmd_resolve(
    cli: &Cli,
    config: &Config,
    filename: &str,
    platform: &str,
    hint: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let platform_name = resolve_platform(platform).unwrap_or(platform);
    let mut resolver = build_resolver(cli, config);
    let mut request = IconRequest::new(platform_name, filename);
    if let Some(hint) = hint {
        request = request.with_hint(hint);
    }
    let resolved = resolver.resolve(&request);
    println!("{}", resolved.path.display());
    println!("{} ({})", resolved.canonical_title, describe(&resolved));
    Ok(())
}

fn cmd_scan(cli: &Cli, config: &Config, root: &Path) -> Result<(), Box<dyn Error>> {
    if !root.is_dir() {
        return Err(format!("{} is not a directory", root.display()).into());
    }
    let roms = discover_roms(root);
    if roms.is_empty() {
        println!("No ROMs found under {}", root.display());
        return Ok(());
    }

    let mut resolver = build_resolver(cli, config);
    let total = roms.len();
    let mut placeholders = 0usize;
    for (index, rom) in roms.iter().enumerate() {
        let resolved = resolver.resolve(&IconRequest::new(rom.platform, rom.file_name()));
        if resolved.source == IconSource::Placeholder {
            placeholders += 1;
        }
        println!(
            "[{}/{}] {} -> {}",
            index + 1,
            total,
            resolved.canonical_title,
            resolved.path.display()
        );
    }
    info!(
        "Scan finished: {} ROMs, {} placeholders",
        total, placeholders
    );
    Ok(())
}
