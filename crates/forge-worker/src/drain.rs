use crate::compute::ComputeEngine;
use crate::connection::ConnectionManager;
use forge_core::{WorkItem, WorkResult};
use forge_protocol::Envelope;
use forge_queue::{QueueError, WorkQueue};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Pops spooled work, runs the computation engine on it, and reports one
/// result per item back to the coordinator. Computation is strictly
/// serialized: one slow item holds up everything spooled behind it.
pub struct DrainLoop {
    connection: Arc<ConnectionManager>,
    queue: Arc<dyn WorkQueue>,
    engine: Arc<dyn ComputeEngine>,
    shutdown: CancellationToken,
    idle_poll: Duration,
    retry_wait: Duration,
}

impl DrainLoop {
    pub fn new(
        connection: Arc<ConnectionManager>,
        queue: Arc<dyn WorkQueue>,
        engine: Arc<dyn ComputeEngine>,
        shutdown: CancellationToken,
        idle_poll: Duration,
        retry_wait: Duration,
    ) -> Self {
        DrainLoop {
            connection,
            queue,
            engine,
            shutdown,
            idle_poll,
            retry_wait,
        }
    }

    pub async fn run(self) {
        loop {
            if self.shutdown.is_cancelled() {
                debug!("Drain loop stopping");
                return;
            }

            let item = match self.queue.pop() {
                Ok(item) => item,
                Err(QueueError::Empty) => {
                    // Normal idle state.
                    if self.idle_sleep(self.idle_poll).await.is_err() {
                        return;
                    }
                    continue;
                }
                Err(QueueError::Closed) => {
                    debug!("Work queue closed, drain loop stopping");
                    return;
                }
                Err(err) => {
                    error!("Queue pop failed: {}", err);
                    if self.idle_sleep(self.retry_wait).await.is_err() {
                        return;
                    }
                    continue;
                }
            };

            let WorkItem { id, input } = item;
            info!("Draining work item {}", id);

            let result = match self.engine.compute(input).await {
                Ok(output) => {
                    info!("Computed work item {} successfully", id);
                    WorkResult::ok(id, output)
                }
                Err(error) => {
                    error!("Computation failed for work item {}: {}", id, error);
                    WorkResult::compute_error(id, error)
                }
            };

            let envelope = match Envelope::result(&result) {
                Ok(envelope) => envelope,
                Err(err) => {
                    error!("Failed to encode result for {}: {}", result.id, err);
                    continue;
                }
            };

            match self.connection.send(envelope).await {
                Ok(()) => {}
                Err(err) if err.is_normal_close() => {
                    debug!("Drain loop observed normal close");
                    return;
                }
                Err(err) => {
                    // No requeue; the coordinator redelivers unacknowledged
                    // work on its own schedule.
                    error!("Failed to report result for {}: {}", result.id, err);
                }
            }
        }
    }

    async fn idle_sleep(&self, wait: Duration) -> Result<(), ()> {
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(()),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }
}
