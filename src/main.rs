mod candidate_prober;
mod catalog_client;
mod catalog_listing;
mod catalog_session;
mod cli;
mod config;
mod config_persistence;
mod fuzzy_scorer;
mod glyph_font;
mod icon_cache;
mod icon_resolver;
mod image_pipeline;
mod ordered_set;
mod platforms;
mod region_hints;
mod rom_discovery;
mod text_fold;
mod title_canonicalizer;

use clap::Parser;
use cli::Cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut clog = colog::default_builder();
    clog.filter(
        None,
        if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        },
    );
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    cli::run(cli)
}
