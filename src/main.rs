pub mod types;
pub mod config;
pub mod data;
pub mod geometry;
pub mod classify;
pub mod projection;
pub mod style;
pub mod map;
pub mod chart;
pub mod controller;
pub mod svg;
pub mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use types::Attribute;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the map and chart for one attribute to a standalone SVG file
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, default_value = "participation_2020")]
        attribute: Attribute,
        #[arg(short, long, value_name = "FILE", default_value = "participation_map.svg")]
        output: PathBuf,
    },
    /// Serve the interactive page
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

async fn load_session(config: &config::AppConfig) -> anyhow::Result<controller::Session> {
    let sources = data::load_sources(&config.input).await?;
    controller::Session::from_sources(sources, &config.input, &config.projection, config.window)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { config, attribute, output } => {
            println!("Rendering {} with config: {:?}", attribute, config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            let mut session = load_session(&app_config).await?;
            session.select_attribute(attribute);

            let document = svg::document_svg(&session);
            tokio::fs::write(&output, document)
                .await
                .with_context(|| format!("Failed to write SVG: {:?}", output))?;

            println!("Wrote {:?}", output);
        }
        Commands::Serve { config } => {
            println!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            let session = load_session(&app_config).await?;
            server::start_server(app_config, session).await?;
        }
    }

    Ok(())
}
