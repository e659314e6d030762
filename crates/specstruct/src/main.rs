use crate::prelude::{eprintln, *};
use clap::Parser;

mod chunks;
mod config;
mod error;
mod headers;
mod io;
mod outline;
mod prelude;
mod stats;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Recover the heading hierarchy of engineering specifications and map parsed content onto sections"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Path to a TOML configuration file
    #[clap(long, env = "SPECSTRUCT_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Keep lines on table-of-contents pages as heading candidates
    #[clap(long, env = "SPECSTRUCT_NO_SUPPRESS_TOC", global = true, default_value = "false")]
    no_suppress_toc: bool,

    /// Keep repeated header/footer lines as heading candidates
    #[clap(long, env = "SPECSTRUCT_NO_SUPPRESS_RUNNING", global = true, default_value = "false")]
    no_suppress_running: bool,

    /// Minimum score a line needs to become a heading
    #[clap(long, env = "SPECSTRUCT_THRESHOLD", global = true)]
    threshold: Option<f32>,

    /// Whether to display additional information.
    #[clap(long, env = "SPECSTRUCT_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Per-page font statistics, table-of-contents pages and running lines
    Stats(crate::stats::StatsOptions),

    /// Detect the heading hierarchy of a line file
    Headers(crate::headers::HeadersOptions),

    /// Resolve an anchored section tree into per-section object chunks
    Chunks(crate::chunks::ChunksOptions),

    /// Detect headings, anchor them in parsed objects and resolve chunks
    Outline(crate::outline::OutlineOptions),
}

fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();
    let config = crate::config::load(&app.global)?;

    if app.global.verbose {
        eprintln!("Configuration: {}", serde_json::to_string(&config)?);
        eprintln!();
    }

    match app.command {
        SubCommands::Stats(options) => crate::stats::run(options, &config),
        SubCommands::Headers(options) => crate::headers::run(options, &config),
        SubCommands::Chunks(options) => crate::chunks::run(options, &config),
        SubCommands::Outline(options) => crate::outline::run(options, &config),
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
