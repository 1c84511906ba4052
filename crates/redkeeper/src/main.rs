//! redkeeper entry point

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use redkeeper::KeeperConfig;

/// One-shot discovery/consensus/config pass for a sharded Redis cluster
#[derive(Parser, Debug)]
#[command(name = "redkeeper")]
#[command(about = "Discover shard topology, reconcile sentinels, emit proxy config")]
struct Args {
    /// Configuration file (YAML)
    #[arg(short, long, default_value = "redkeeper.yaml")]
    config: String,

    /// Output path for the proxy configuration document ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = KeeperConfig::from_file(&args.config)?;
    let document = redkeeper::run_pass(&config).await?;

    let rendered = serde_json::to_string_pretty(&document)?;
    if args.output == "-" {
        println!("{}", rendered);
    } else {
        std::fs::write(&args.output, rendered)?;
        info!("proxy configuration written to {}", args.output);
    }

    Ok(())
}
