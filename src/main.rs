//! Dashboard player host - drives one virtual player over stdin/stdout.
//!
//! Reads one JSON command per line from stdin and answers each with one JSON
//! line on stdout: the player snapshot after the command, or `{"error": ...}`.
//! Logs go to stderr (and optionally a rolling file).

use std::{error::Error, path::PathBuf, sync::Arc};

use clap::Parser;
use dashboard_player::{
    config::{Config, ConfigPaths},
    services::player::{PassthroughHost, PlayerCommand, PlayerService},
    snapshot_store::JsonSnapshotStore,
    tracing_config,
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Level, info, span, warn};

#[derive(Parser)]
#[command(name = "dashboard-player")]
#[command(about = "Virtual dashboard media player driven by JSON lines on stdin")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write logs to a daily rolling file
    #[arg(long)]
    log_file: bool,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    print_schema: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.print_schema {
        let schema = schemars::schema_for!(Config);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    if cli.log_file {
        tracing_config::init_with_file(config.general.log_level, &ConfigPaths::log_dir()?)?;
    } else {
        tracing_config::init(config.general.log_level)?;
    }

    let _span = span!(Level::INFO, "dashboard_player").entered();
    info!(name = %config.player.name, cache = config.player.enable_cache, "Starting player");

    let store = JsonSnapshotStore::for_player(&config.player.entity_name())?;
    let player = PlayerService::from_config(
        &config.player,
        Arc::new(PassthroughHost),
        reqwest::Client::new(),
        Arc::new(store),
    )
    .await?;

    serve(&player).await?;

    player.shutdown().await;
    Ok(())
}

async fn serve(player: &PlayerService) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<PlayerCommand>(&line) {
            Ok(command) => match player.execute(command).await {
                Ok(snapshot) => serde_json::to_value(snapshot)?,
                Err(e) => json!({ "error": e.to_string() }),
            },
            Err(e) => {
                warn!(error = %e, "Malformed command");
                json!({ "error": format!("malformed command: {e}") })
            }
        };

        let mut out = serde_json::to_vec(&reply)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    info!("Input closed, shutting down");
    Ok(())
}
