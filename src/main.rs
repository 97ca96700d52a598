//! Fleet control plane CLI.
//!
//! Serves the websocket/MQTT control plane for a picking-robot fleet, or
//! validates a trio of map/robots/shelves config files without starting it.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "fleet")]
#[command(author = "Fleet Control Plane Team")]
#[command(version = "0.1.0")]
#[command(about = "Warehouse AGV Picking Fleet Control Plane")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the orchestrator, websocket operator channel, and MQTT bridge
    Serve {
        /// Path to the map config file
        #[arg(long, default_value = "config/map.json")]
        map: PathBuf,

        /// Path to the robots config file
        #[arg(long, default_value = "config/robots.json")]
        robots: PathBuf,

        /// Path to the shelves config file
        #[arg(long, default_value = "config/shelves.json")]
        shelves: PathBuf,

        /// Port for the websocket operator channel
        #[arg(long, default_value = "8080")]
        port: u16,

        /// MQTT broker host
        #[arg(long, default_value = "localhost")]
        mqtt_host: String,

        /// MQTT broker port
        #[arg(long, default_value = "1883")]
        mqtt_port: u16,
    },
    /// Validate map/robots/shelves config files without starting the fleet
    Validate {
        /// Path to the map config file
        #[arg(long, default_value = "config/map.json")]
        map: PathBuf,

        /// Path to the robots config file
        #[arg(long, default_value = "config/robots.json")]
        robots: PathBuf,

        /// Path to the shelves config file
        #[arg(long, default_value = "config/shelves.json")]
        shelves: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { map, robots, shelves, port, mqtt_host, mqtt_port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_serve(map, robots, shelves, port, mqtt_host, mqtt_port))
        }
        Commands::Validate { map, robots, shelves } => run_validate(map, robots, shelves),
    }
}

/// Exit codes: 0 clean shutdown, 1 configuration error, 2 transport
/// failure at startup.
const EXIT_CONFIG_ERROR: i32 = 1;
const EXIT_TRANSPORT_ERROR: i32 = 2;

fn config_paths(map: PathBuf, robots: PathBuf, shelves: PathBuf) -> fleet_transport::AppConfigPaths {
    fleet_transport::AppConfigPaths {
        map_path: map.to_string_lossy().into_owned(),
        robots_path: robots.to_string_lossy().into_owned(),
        shelves_path: shelves.to_string_lossy().into_owned(),
    }
}

async fn run_serve(
    map: PathBuf,
    robots: PathBuf,
    shelves: PathBuf,
    port: u16,
    mqtt_host: String,
    mqtt_port: u16,
) -> anyhow::Result<()> {
    let paths = config_paths(map, robots, shelves);
    let loaded = match fleet_transport::load_and_validate(&paths) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration invalid: {e}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    tracing::info!(port, %mqtt_host, mqtt_port, "starting fleet control plane");

    let (handle, orchestrator_task) = fleet_orchestrator::spawn_orchestrator(loaded.map, loaded.shelves, loaded.robots);

    let server_config = fleet_transport::ServerConfig { port };
    let mqtt_config = fleet_transport::MqttConfig { host: mqtt_host, port: mqtt_port, ..Default::default() };

    let server = tokio::spawn(fleet_transport::run_server(server_config, handle.clone()));
    let mqtt = tokio::spawn(fleet_transport::run_mqtt_bridge(mqtt_config, handle));

    let result = tokio::select! {
        res = server => res.map_err(anyhow::Error::from).and_then(|r| r),
        res = mqtt => res.map_err(anyhow::Error::from).and_then(|r| r),
        _ = orchestrator_task => {
            tracing::warn!("orchestrator loop exited");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Transport failure: {e}");
        std::process::exit(EXIT_TRANSPORT_ERROR);
    }
    Ok(())
}

fn run_validate(map: PathBuf, robots: PathBuf, shelves: PathBuf) -> anyhow::Result<()> {
    let paths = config_paths(map, robots, shelves);
    match fleet_transport::load_and_validate(&paths) {
        Ok(loaded) => {
            println!("Configuration valid.");
            println!("  Nodes: {}", loaded.map.node_count());
            println!("  Robots: {}", loaded.robots.all().count());
            println!("  Shelves: {}", loaded.shelves.all().count());
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {e}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    }
}
