use clap::Parser;
use forge_worker::compute::{CommandEngine, ComputeEngine, EchoEngine};
use forge_worker::{Worker, WorkerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "forge-worker")]
#[command(about = "Durable compute worker node", long_about = None)]
struct Args {
    /// Coordinator address
    #[arg(short = 'a', long)]
    coordinator: Option<String>,

    /// Worker name (generated from hostname and pid if not provided)
    #[arg(long)]
    name: Option<String>,

    /// Hex-encoded Ed25519 secret key
    #[arg(long)]
    secret_key: Option<String>,

    /// Directory for the durable work queue
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// External computation command and its arguments
    #[arg(long, num_args = 1.., value_name = "CMD")]
    compute: Option<Vec<String>>,

    /// Path to configuration file
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        WorkerConfig::from_file(config_path)?
    } else {
        WorkerConfig::default()
    };

    // Override with CLI args
    if let Some(coordinator) = args.coordinator {
        config.coordinator_addr = coordinator;
    }
    if let Some(name) = args.name {
        config.worker_name = Some(name);
    }
    if let Some(secret_key) = args.secret_key {
        config.secret_key = Some(secret_key);
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(compute) = args.compute {
        config.compute_command = Some(compute);
    }

    let engine: Arc<dyn ComputeEngine> = match &config.compute_command {
        Some(argv) => Arc::new(
            CommandEngine::from_argv(argv)
                .ok_or_else(|| anyhow::anyhow!("compute command is empty"))?,
        ),
        None => {
            tracing::warn!("No compute command configured; echoing inputs back");
            Arc::new(EchoEngine)
        }
    };

    let worker = Worker::connect(config, engine).await?;

    // Handle shutdown signals
    let on_signal = worker.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal");
        on_signal.shutdown();
    });

    worker.run().await?;

    Ok(())
}
