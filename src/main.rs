//! nvidia-smi exporter binary
//!
//! Serves `nvidia-smi` telemetry for Prometheus, or prints a single snapshot.

use clap::{Args, Parser, Subcommand};
use nvidia_smi_exporter::{
    parse, render, start_web_server, SourceConfig, WebConfig, DEFAULT_FIXTURE_FILE,
    DEFAULT_NVIDIA_SMI_PATH, DEFAULT_WEB_PORT,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "nvidia_smi_exporter")]
#[command(about = "Prometheus exporter for nvidia-smi GPU telemetry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Runs nvidia-smi on every scrape and republishes its readings in the Prometheus text format")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Read reports from the fixture file instead of running nvidia-smi
    /// (also enabled by TEST_MODE=1)
    #[arg(long)]
    test_mode: bool,

    /// Fixture file used in test mode, relative to the working directory
    #[arg(long, default_value = DEFAULT_FIXTURE_FILE)]
    fixture: PathBuf,

    /// Path to the nvidia-smi executable
    #[arg(long, default_value = DEFAULT_NVIDIA_SMI_PATH)]
    nvidia_smi: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the exporter (default)
    Serve,

    /// Run one scrape, print it and exit
    Snapshot(SnapshotArgs),

    /// Show driver and device information
    Info,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let test_mode = cli.test_mode || test_mode_from_env(std::env::var(TEST_MODE_ENV).ok().as_deref());
    let source = SourceConfig::from_mode(test_mode, &cli.nvidia_smi, &cli.fixture);

    match &cli.command {
        Some(Commands::Serve) | None => serve_command(&cli, source).await?,
        Some(Commands::Snapshot(args)) => snapshot_command(args, source).await?,
        Some(Commands::Info) => info_command(source).await?,
    }

    Ok(())
}

/// Environment switch for test mode; only the exact value `1` turns it on.
const TEST_MODE_ENV: &str = "TEST_MODE";

fn test_mode_from_env(value: Option<&str>) -> bool {
    value == Some("1")
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

async fn serve_command(cli: &Cli, source: SourceConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting nvidia-smi exporter...");

    let config = WebConfig::new(&cli.host, cli.port).with_source(source);

    info!("Exporter configuration:");
    info!("  - Bind address: {}", config.bind_address());
    info!("  - Report source: {}", config.source.build().describe());

    start_web_server(config).await?;

    Ok(())
}

async fn snapshot_command(
    args: &SnapshotArgs,
    source: SourceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = source.build().fetch_report().await?;
    let report = parse(&raw);

    match args.format.as_str() {
        "text" => print!("{}", render(&report)),
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        other => {
            return Err(format!("Unsupported format: {}. Use 'text' or 'json'", other).into());
        }
    }

    Ok(())
}

async fn info_command(source: SourceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = source.build();
    let report = parse(&source.fetch_report().await?);

    println!("nvidia-smi exporter {}", env!("CARGO_PKG_VERSION"));
    println!("================================");
    println!("Source: {}", source.describe());
    println!(
        "Driver: {}",
        report.driver_version.as_deref().unwrap_or("unknown")
    );
    println!(
        "Attached GPUs: {}",
        report.attached_gpus.as_deref().unwrap_or("unknown")
    );
    println!();

    for gpu in &report.gpus {
        println!("  {}", gpu.display_name());
        println!("    UUID: {}", gpu.uuid_or_empty());
        if let Some(bus) = &gpu.pci.pci_bus {
            println!("    PCI bus: {}", bus);
        }
    }

    Ok(())
}
