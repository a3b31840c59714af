//! stage-map — render the configured deployment locations onto a static
//! SVG map and an interactive Leaflet page.
//!
//! Output (full scope): `map.svg` and `map.html` in the output directory.
//! Narrower scopes only produce the SVG, named after the scope.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stage_map::boundary::Scope;
use stage_map::config::AppConfig;
use stage_map::{fetch, pipeline};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration; built-in defaults are used when omitted
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the maps (the default command)
    Render {
        /// `all`, `only:<CC>` or `except:<CC>`
        #[arg(default_value = "all")]
        scope: Scope,
    },
    /// Download the boundary and populated-place datasets
    Fetch,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Render { scope: Scope::default() }) {
        Commands::Render { scope } => {
            info!("Rendering scope {scope}");
            let artifacts = pipeline::run(&config, &scope)
                .with_context(|| format!("rendering scope {scope} failed"))?;
            info!("Done, wrote {}.", artifacts.iter().map(|a| a.path.display().to_string()).collect::<Vec<_>>().join(", "));
        }
        Commands::Fetch => {
            fetch::fetch_datasets(&config.input)?;
        }
    }
    Ok(())
}
