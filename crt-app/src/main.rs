mod app;
pub use app::App;

use anyhow::{Context, Result};
use clap::Parser;
use crt_experiment::SessionConfig;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "crt",
    version,
    about = "Center-out reaching task: reaction and movement times from a pointer"
)]
struct Cli {
    /// TOML file with session parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV file completed trials are appended to
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of trial slots in the session
    #[arg(long)]
    trials: Option<usize>,

    /// Seed for target and delay sampling
    #[arg(long)]
    seed: Option<u64>,

    /// TTF font for text overlays
    #[arg(long)]
    font: Option<PathBuf>,

    /// Write a JSON summary of all outcomes here when the session finishes
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl Cli {
    fn session_config(self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SessionConfig::default(),
        };
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(trials) = self.trials {
            config.n_trials = trials;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(font) = self.font {
            config.font_path = Some(font);
        }
        if let Some(summary) = self.summary {
            config.summary_path = Some(summary);
        }
        config.validate().context("invalid session parameters")?;
        Ok(config)
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let config = Cli::parse().session_config()?;

    let app = App::new(config)?;
    app.run()?;

    Ok(())
}
