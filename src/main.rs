use clap::Parser;
use pokeworld::config::{ServerConfig, WorldConfig};
use pokeworld::persistence::{JsonRecordWriter, PlayerRecordWriter};
use pokeworld::pokedex::Pokedex;
use pokeworld::server::GameServer;
use pokeworld::world::World;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(name = "pokeworld-server", about = "Networked creature world and battle server")]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Roster file produced by the catalog importer.
    #[arg(long, default_value = "data/pokedex.json")]
    roster: PathBuf,

    /// Directory for per-player capture records.
    #[arg(long, default_value = "player_data")]
    records_dir: PathBuf,

    /// World width in cells.
    #[arg(long, default_value_t = 1000)]
    width: u16,

    /// World height in cells.
    #[arg(long, default_value_t = 1000)]
    height: u16,

    /// Seconds between spawn waves.
    #[arg(long, default_value_t = 60)]
    spawn_interval_secs: u64,

    /// Seconds an uncaptured creature stays on the grid.
    #[arg(long, default_value_t = 300)]
    despawn_secs: u64,

    /// Cap on live creatures across the whole grid.
    #[arg(long, default_value_t = 50)]
    max_live: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let pokedex = Arc::new(Pokedex::load_from_json(&cli.roster)?);
    tracing::info!(creatures = pokedex.len(), roster = %cli.roster.display(), "roster loaded");

    let world_config = WorldConfig {
        width: cli.width,
        height: cli.height,
        spawn_interval: Duration::from_secs(cli.spawn_interval_secs),
        despawn_after: Duration::from_secs(cli.despawn_secs),
        max_live: cli.max_live,
        ..WorldConfig::default()
    };
    let world = Arc::new(World::new(world_config, pokedex.clone()));
    let records: Arc<dyn PlayerRecordWriter> = Arc::new(JsonRecordWriter::new(cli.records_dir));

    let server = GameServer::new(pokedex, world, records, ServerConfig::default());
    let listener = TcpListener::bind(&cli.bind).await?;
    server.run(listener).await?;

    Ok(())
}
