use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Address of the coordination service.
    pub coordinator_addr: String,
    /// Registration name; generated from hostname and pid when absent.
    pub worker_name: Option<String>,
    /// Hex-encoded Ed25519 secret key (32 bytes). An ephemeral key is
    /// generated when absent, which makes the identity change on restart.
    pub secret_key: Option<String>,
    /// Directory holding the durable work queue.
    pub data_dir: PathBuf,
    /// Fixed delay between reconnect/re-register attempts.
    pub retry_wait_secs: u64,
    /// Sleep between pops when the queue is empty.
    pub idle_poll_secs: u64,
    /// External computation command (argv). Echo engine when absent.
    pub compute_command: Option<Vec<String>>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            coordinator_addr: "127.0.0.1:7200".to_string(),
            worker_name: None,
            secret_key: None,
            data_dir: PathBuf::from("./data"),
            retry_wait_secs: 10,
            idle_poll_secs: 3,
            compute_command: None,
        }
    }
}

impl WorkerConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: WorkerConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_secs)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_secs(self.idle_poll_secs)
    }

    /// The configured name, or `hostname-pid-random` like the rest of the
    /// fleet tooling generates.
    pub fn generate_worker_name(&self) -> String {
        use std::process;
        use uuid::Uuid;

        if let Some(name) = &self.worker_name {
            return name.clone();
        }

        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        let pid = process::id();
        let random = Uuid::new_v4()
            .to_string()
            .split('-')
            .next()
            .unwrap()
            .to_string();

        format!("{}-{}-{}", hostname, pid, random)
    }

    /// Decode the configured signing key, or generate an ephemeral one.
    pub fn signing_key(&self) -> anyhow::Result<SigningKey> {
        match &self.secret_key {
            Some(hex_key) => {
                let bytes: [u8; 32] = hex::decode(hex_key)?
                    .try_into()
                    .map_err(|_| anyhow::anyhow!("secret key must be 32 bytes"))?;
                Ok(SigningKey::from_bytes(&bytes))
            }
            None => {
                warn!("No secret key configured; generating an ephemeral identity");
                Ok(SigningKey::generate(&mut rand::rngs::OsRng))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: WorkerConfig =
            serde_yaml::from_str("coordinator_addr: \"10.0.0.5:9000\"").unwrap();

        assert_eq!(config.coordinator_addr, "10.0.0.5:9000");
        assert_eq!(config.retry_wait_secs, 10);
        assert_eq!(config.idle_poll_secs, 3);
        assert!(config.secret_key.is_none());
    }

    #[test]
    fn test_signing_key_from_hex_is_stable() {
        let config = WorkerConfig {
            secret_key: Some(hex::encode([7u8; 32])),
            ..Default::default()
        };

        let a = config.signing_key().unwrap();
        let b = config.signing_key().unwrap();
        assert_eq!(a.verifying_key(), b.verifying_key());
    }

    #[test]
    fn test_signing_key_rejects_short_hex() {
        let config = WorkerConfig {
            secret_key: Some("abcd".to_string()),
            ..Default::default()
        };

        assert!(config.signing_key().is_err());
    }

    #[test]
    fn test_generated_name_prefers_configured() {
        let config = WorkerConfig {
            worker_name: Some("forge-7".to_string()),
            ..Default::default()
        };

        assert_eq!(config.generate_worker_name(), "forge-7");
    }

    #[test]
    fn test_generated_name_shape() {
        let config = WorkerConfig::default();
        let name = config.generate_worker_name();

        // hostname-pid-random
        assert!(name.split('-').count() >= 3);
    }
}
