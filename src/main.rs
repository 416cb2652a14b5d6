mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use ra_bootstrap::config::{self, BootstrapConfig, ConfigSource};
use ra_bootstrap::download::GithubClient;
use ra_bootstrap::host::TerminalHost;
use ra_bootstrap::project_root::{DEFAULT_MARKERS, find_project_root};
use ra_bootstrap::state::{PersistentState, STATE_FILE};
use ra_bootstrap::{Bootstrap, CommandRegistry, Environment, Session};

fn main() {
    let args = cli::Args::parse();

    env_logger::Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main(args)) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn real_main(args: cli::Args) -> Result<()> {
    match args.sub.unwrap_or(cli::Cmd::Run) {
        cli::Cmd::Root { path, marker } => handle_root(path, marker),
        cli::Cmd::State => {
            let cfg = load_config(args.config)?;
            handle_state(&cfg)
        }
        cli::Cmd::Server => {
            let cfg = load_config(args.config)?;
            handle_server(&cfg, args.yes).await
        }
        cli::Cmd::Run => {
            let cfg = load_config(args.config)?;
            let session = activate(cfg, args.yes).await?;
            println!("{}", session.server().display());
            Ok(())
        }
        cli::Cmd::Exec { command } => {
            let cfg = load_config(args.config)?;
            let session = activate(cfg, args.yes).await?;
            let output = CommandRegistry::new().dispatch(command, &session).await?;
            println!("{output}");
            Ok(())
        }
    }
}

/// Load the config, generating a default file on first run
fn load_config(explicit: Option<PathBuf>) -> Result<BootstrapConfig> {
    let cfg_path = match explicit {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    let loaded = config::load(&cfg_path)?;
    match &loaded.source {
        ConfigSource::File(path) => info!("Using config from: {}", path.display()),
        ConfigSource::Defaults => {
            info!(
                "Config not found at {}, creating default configuration",
                cfg_path.display()
            );
            config::write_default(&cfg_path)?;
        }
    }
    Ok(loaded.config)
}

async fn activate(cfg: BootstrapConfig, assume_yes: bool) -> Result<Session> {
    let env = Environment::detect(&cfg);
    let client = GithubClient::new().context("Failed to create HTTP client")?;
    let host = TerminalHost::new(assume_yes);
    Session::activate(cfg, env, &client, &host, true).await
}

async fn handle_server(cfg: &BootstrapConfig, assume_yes: bool) -> Result<()> {
    let env = Environment::detect(cfg);
    let client = GithubClient::new().context("Failed to create HTTP client")?;
    let host = TerminalHost::new(assume_yes);
    let mut state = PersistentState::load(env.storage_dir.join(STATE_FILE))?;

    let server = Bootstrap::new(cfg, &env, &client, &host)
        .get_server(&mut state)
        .await?;
    println!("{}", server.display());
    Ok(())
}

fn handle_state(cfg: &BootstrapConfig) -> Result<()> {
    let state = PersistentState::load(cfg.storage_dir().join(STATE_FILE))?;
    println!("{}", serde_json::to_string_pretty(state.snapshot())?);
    Ok(())
}

fn handle_root(path: Option<PathBuf>, markers: Vec<String>) -> Result<()> {
    let start = match path {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let root = if markers.is_empty() {
        find_project_root(&start, DEFAULT_MARKERS)
    } else {
        find_project_root(&start, markers.as_slice())
    };

    match root {
        Some(root) => {
            println!("{}", root.display());
            Ok(())
        }
        None => anyhow::bail!("No repository root found above {}", start.display()),
    }
}
