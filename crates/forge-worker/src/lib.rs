pub mod compute;
pub mod config;
pub mod connection;
pub mod drain;
pub mod intake;
pub mod worker;

pub use compute::{CommandEngine, ComputeEngine, EchoEngine};
pub use config::WorkerConfig;
pub use connection::{ConnectionManager, TransportError};
pub use worker::Worker;
