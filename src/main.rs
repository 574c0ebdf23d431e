//! AirScope - air-quality maps from outdoor PM2.5 sensors
//!
//! Main entry point for the AirScope CLI.

use airscope::config::{validate_config_result, AirScopeConfig, Credentials, PolicyKind};
use airscope::interpolate::interpolate;
use airscope::location::LocationQuery;
use airscope::search::{SearchOutcome, EMPTY_COVERAGE_MESSAGE};
use airscope::server::{AppState, MapServer};
use airscope::{AirScopeError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;

/// AirScope - interpolated PM2.5 maps for US places and ZIP codes
#[derive(Parser, Debug)]
#[command(name = "airscope")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/airscope/config.yaml)
    #[arg(short, long, global = true, env = "AIRSCOPE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP map service
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Print the interpolated map for a location as JSON
    Map {
        /// Place name or US ZIP code
        location: String,

        /// Interpolation policy (overrides interpolation.policy)
        #[arg(short, long, value_enum)]
        policy: Option<PolicyArg>,
    },

    /// Print the mean 60-minute PM2.5 around a location
    Average {
        /// Place name or US ZIP code
        location: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    Nearest,
    Knn,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Nearest => PolicyKind::Nearest,
            PolicyArg::Knn => PolicyKind::Knn,
        }
    }
}

fn main() {
    // Initialize logging
    if let Err(e) = airscope::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { force } = cli.command {
        return handle_init_command(cli.config, force);
    }

    let mut config = match &cli.config {
        Some(path) => AirScopeConfig::load(path)?,
        None => AirScopeConfig::load_or_default()?,
    };

    match &cli.command {
        Commands::Serve { bind: Some(bind) } => config.server.bind = bind.clone(),
        Commands::Map {
            policy: Some(policy),
            ..
        } => config.interpolation.policy = (*policy).into(),
        _ => {}
    }

    validate_config_result(&config)?;

    // Fail before serving anything if a key is missing
    let credentials = Credentials::from_env(&config)?;
    let state = AppState::from_config(&config, &credentials)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        match cli.command {
            Commands::Serve { .. } => MapServer::new(state).run(&config.server.bind).await,
            Commands::Map { location, .. } => handle_map_command(&state, &location).await,
            Commands::Average { location } => handle_average_command(&state, &location).await,
            Commands::Init { .. } => Ok(()),
        }
    })
}

fn handle_init_command(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(AirScopeConfig::default_path);

    if path.exists() && !force {
        return Err(AirScopeError::Config(format!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }

    AirScopeConfig::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    println!();
    println!("Set the API keys before serving:");
    let config = AirScopeConfig::default();
    println!("  export {}=<geocoder key>", config.geocoder.api_key_env);
    println!("  export {}=<sensor network key>", config.sensors.api_key_env);
    Ok(())
}

async fn handle_map_command(state: &AppState, location: &str) -> Result<()> {
    let query = LocationQuery::parse(location)?;

    let body = match state.search.search(&query).await? {
        SearchOutcome::Found { table, expanded } => {
            let map = interpolate(&table, expanded, state.policy)?;
            eprintln!(
                "{} sensors, {} cells ({}){}",
                table.len(),
                map.grid.len(),
                map.policy,
                if expanded { ", search area expanded" } else { "" }
            );
            serde_json::to_string(&map)?
        }
        SearchOutcome::Empty { bbox, polygon } => {
            eprintln!("{}", EMPTY_COVERAGE_MESSAGE);
            serde_json::to_string(&serde_json::json!({
                "bbox": bbox,
                "polygon": polygon,
                "message": EMPTY_COVERAGE_MESSAGE,
            }))?
        }
        SearchOutcome::Invalid(payload) => {
            return Err(AirScopeError::InvalidLocation(payload.message));
        }
    };

    println!("{}", body);
    Ok(())
}

async fn handle_average_command(state: &AppState, location: &str) -> Result<()> {
    let query = LocationQuery::parse(location)?;

    let table = state
        .search
        .search_unexpanded(&query)
        .await?
        .ok_or_else(|| AirScopeError::InvalidLocation(location.to_string()))?;
    let mean = table.mean_pm2_5_60minute().ok_or(AirScopeError::EmptyTable)?;

    println!(
        "{}: {:.1} µg/m³ (60-minute mean over {} sensors)",
        query,
        mean,
        table.len()
    );
    Ok(())
}
