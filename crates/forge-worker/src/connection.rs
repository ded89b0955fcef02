use ed25519_dalek::SigningKey;
use forge_protocol::{AuthMessage, Envelope, EnvelopeCodec, Identity, ProtocolError};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Window the read deadline grants before the connection is considered
/// dead. Must stay above the transport keep-alive interval.
pub const READ_WAIT: Duration = Duration::from_secs(30 * 60);
/// Write deadline window.
pub const WRITE_WAIT: Duration = Duration::from_secs(30 * 60 + 1);

type FrameSink = SplitSink<Framed<TcpStream, EnvelopeCodec>, Envelope>;
type FrameStream = SplitStream<Framed<TcpStream, EnvelopeCodec>>;

/// One live framed connection to the coordinator. The halves sit behind
/// separate locks so the intake loop can block on a read while the drain
/// loop sends results.
struct Session {
    reader: Mutex<FrameStream>,
    writer: Mutex<FrameSink>,
}

impl Session {
    fn new(stream: TcpStream) -> Arc<Self> {
        let framed = Framed::new(stream, EnvelopeCodec);
        let (writer, reader) = framed.split();
        Arc::new(Session {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        })
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    /// Intentional, locally-initiated shutdown observed during a transport
    /// operation. Terminates loops; never a failure.
    #[error("transport closed by local shutdown")]
    ClosedByUs,

    #[error("connection closed by peer")]
    PeerClosed,

    #[error("read deadline elapsed")]
    ReadTimeout,

    #[error("write deadline elapsed")]
    WriteTimeout,

    #[error("dial failed: {0}")]
    Dial(std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    pub fn is_normal_close(&self) -> bool {
        matches!(self, TransportError::ClosedByUs)
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Owns the single bidirectional session to the coordinator: signed
/// registration, deadline-guarded reads and writes, and the unbounded
/// reconnect-and-re-register policy.
///
/// The active session is swapped atomically behind the `RwLock`; only the
/// intake loop's error path performs a swap, so at most one replacement is
/// ever in flight. The drain loop picks up the new session on its next send.
pub struct ConnectionManager {
    addr: String,
    worker_name: String,
    signing_key: SigningKey,
    retry_wait: Duration,
    shutdown: CancellationToken,
    session: RwLock<Arc<Session>>,
}

impl ConnectionManager {
    /// Dial the coordinator. Failure here is fatal to startup; steady-state
    /// failures go through [`Self::reconnect_and_reregister`] instead.
    pub async fn connect(
        addr: String,
        worker_name: String,
        signing_key: SigningKey,
        retry_wait: Duration,
        shutdown: CancellationToken,
    ) -> TransportResult<Self> {
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(TransportError::Dial)?;
        info!("Connected to coordinator at {}", addr);

        Ok(ConnectionManager {
            addr,
            worker_name,
            signing_key,
            retry_wait,
            shutdown,
            session: RwLock::new(Session::new(stream)),
        })
    }

    fn current(&self) -> Arc<Session> {
        self.session.read().clone()
    }

    /// Reclassify transport failures that race with our own shutdown. Once
    /// the token is cancelled, errors on the torn-down session are the
    /// expected consequence of closing, not coordinator trouble.
    fn classify(&self, err: TransportError) -> TransportError {
        if self.shutdown.is_cancelled() {
            TransportError::ClosedByUs
        } else {
            err
        }
    }

    /// Send a fresh signed identity. The identity is rebuilt per attempt so
    /// its timestamp reflects this registration, not process start.
    pub async fn register(&self) -> TransportResult<()> {
        let identity = Identity::new(&self.worker_name, &self.signing_key.verifying_key());
        let auth = AuthMessage::sign(identity, &self.signing_key)?;
        self.send(Envelope::register(&auth)?).await
    }

    /// Send one envelope under the write deadline.
    pub async fn send(&self, envelope: Envelope) -> TransportResult<()> {
        let session = self.current();
        let mut writer = session.writer.lock().await;

        tokio::select! {
            _ = self.shutdown.cancelled() => Err(TransportError::ClosedByUs),
            sent = timeout(WRITE_WAIT, writer.send(envelope)) => match sent {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(self.classify(err.into())),
                Err(_) => Err(self.classify(TransportError::WriteTimeout)),
            },
        }
    }

    /// Block on one inbound frame under the read deadline.
    pub async fn read(&self) -> TransportResult<Envelope> {
        let session = self.current();
        let mut reader = session.reader.lock().await;

        tokio::select! {
            _ = self.shutdown.cancelled() => Err(TransportError::ClosedByUs),
            read = timeout(READ_WAIT, reader.next()) => match read {
                Ok(Some(Ok(envelope))) => Ok(envelope),
                Ok(Some(Err(err))) => Err(self.classify(err.into())),
                Ok(None) => Err(self.classify(TransportError::PeerClosed)),
                Err(_) => Err(self.classify(TransportError::ReadTimeout)),
            },
        }
    }

    /// Unbounded-retry recovery: dial until a connection holds, swap it in,
    /// then register under the same policy. Only shutdown breaks the loops,
    /// surfacing as a normal close.
    pub async fn reconnect_and_reregister(&self) -> TransportResult<()> {
        loop {
            if self.shutdown.is_cancelled() {
                return Err(TransportError::ClosedByUs);
            }

            info!("Retrying connection to coordinator at {}", self.addr);
            match TcpStream::connect(&self.addr).await {
                Ok(stream) => {
                    *self.session.write() = Session::new(stream);
                    info!("Reconnected to coordinator");
                    break;
                }
                Err(err) => {
                    error!("Failed to reach coordinator: {}", err);
                    self.sleep_retry().await?;
                }
            }
        }

        loop {
            if self.shutdown.is_cancelled() {
                return Err(TransportError::ClosedByUs);
            }

            info!("Retrying registration");
            match self.register().await {
                Ok(()) => {
                    info!("Re-registered with coordinator");
                    return Ok(());
                }
                Err(err) if err.is_normal_close() => return Err(err),
                Err(err) => {
                    error!("Registration failed: {}", err);
                    self.sleep_retry().await?;
                }
            }
        }
    }

    async fn sleep_retry(&self) -> TransportResult<()> {
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(TransportError::ClosedByUs),
            _ = tokio::time::sleep(self.retry_wait) => Ok(()),
        }
    }
}
