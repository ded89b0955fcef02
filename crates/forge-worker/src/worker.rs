use crate::compute::ComputeEngine;
use crate::config::WorkerConfig;
use crate::connection::ConnectionManager;
use crate::drain::DrainLoop;
use crate::intake::IntakeLoop;
use forge_queue::{DurableQueue, WorkQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Orchestrates startup ordering, the two control loops, and idempotent
/// shutdown.
#[derive(Clone)]
pub struct Worker {
    config: WorkerConfig,
    connection: Arc<ConnectionManager>,
    queue: Arc<dyn WorkQueue>,
    engine: Arc<dyn ComputeEngine>,
    shutdown: CancellationToken,
    closed: Arc<AtomicBool>,
}

impl Worker {
    /// Open the durable queue and dial the coordinator. Every failure here
    /// is fatal; resilience only begins once the worker is up.
    pub async fn connect(
        config: WorkerConfig,
        engine: Arc<dyn ComputeEngine>,
    ) -> anyhow::Result<Self> {
        let queue: Arc<dyn WorkQueue> =
            Arc::new(DurableQueue::open(config.data_dir.join("queue"))?);

        let shutdown = CancellationToken::new();
        let connection = Arc::new(
            ConnectionManager::connect(
                config.coordinator_addr.clone(),
                config.generate_worker_name(),
                config.signing_key()?,
                config.retry_wait(),
                shutdown.clone(),
            )
            .await?,
        );

        Ok(Worker {
            config,
            connection,
            queue,
            engine,
            shutdown,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Register, start the intake loop as a concurrent task, and run the
    /// drain loop on this control path until shutdown.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("Registering with coordinator");
        self.connection.register().await?;
        info!("Registered with coordinator");

        let intake = IntakeLoop::new(
            self.connection.clone(),
            self.queue.clone(),
            self.shutdown.clone(),
        );
        let on_intake_exit = self.clone();
        tokio::spawn(async move {
            intake.run().await;
            on_intake_exit.shutdown();
        });

        DrainLoop::new(
            self.connection.clone(),
            self.queue.clone(),
            self.engine.clone(),
            self.shutdown.clone(),
            self.config.idle_poll(),
            self.config.retry_wait(),
        )
        .run()
        .await;

        self.shutdown();
        Ok(())
    }

    /// Idempotent: the first call cancels the token both loops observe
    /// (which also tears down in-flight transport reads and writes) and
    /// closes the queue; later calls are no-ops.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Shutting down worker");
        self.shutdown.cancel();

        if let Err(err) = self.queue.close() {
            error!("Failed to close work queue: {}", err);
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
