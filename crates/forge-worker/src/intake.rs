use crate::connection::ConnectionManager;
use forge_protocol::FrameKind;
use forge_queue::WorkQueue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Reads inbound frames and spools recognized work deliveries into the
/// durable queue. Never exits on a transient failure; only shutdown or a
/// normal close stops it.
pub struct IntakeLoop {
    connection: Arc<ConnectionManager>,
    queue: Arc<dyn WorkQueue>,
    shutdown: CancellationToken,
}

impl IntakeLoop {
    pub fn new(
        connection: Arc<ConnectionManager>,
        queue: Arc<dyn WorkQueue>,
        shutdown: CancellationToken,
    ) -> Self {
        IntakeLoop {
            connection,
            queue,
            shutdown,
        }
    }

    pub async fn run(self) {
        loop {
            if self.shutdown.is_cancelled() {
                debug!("Intake loop stopping");
                return;
            }

            let envelope = match self.connection.read().await {
                Ok(envelope) => envelope,
                Err(err) if err.is_normal_close() => {
                    debug!("Intake loop observed normal close");
                    return;
                }
                Err(err) => {
                    error!("Transport read failed: {}", err);
                    if self.connection.reconnect_and_reregister().await.is_err() {
                        // Only a normal close escapes the retry loops.
                        return;
                    }
                    continue;
                }
            };

            match envelope.kind() {
                Some(FrameKind::WorkDelivery) => match envelope.decode_work_item() {
                    Ok(item) => {
                        info!("Accepted work item {}", item.id);
                        if let Err(err) = self.queue.push(&item) {
                            // The coordinator redelivers on its own timeout.
                            error!("Failed to spool work item {}: {}", item.id, err);
                        }
                    }
                    Err(err) => {
                        warn!("Dropping undecodable work delivery: {}", err);
                    }
                },
                Some(kind) => {
                    warn!("Discarding unexpected {:?} frame from coordinator", kind);
                }
                None => {
                    warn!(
                        "Discarding frame with unrecognized kind {}",
                        envelope.kind_byte()
                    );
                }
            }
        }
    }
}
