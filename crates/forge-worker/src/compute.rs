use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Result type for computation engines
pub type ComputeOutcome = Result<Vec<u8>, String>;

/// The backend computation engine, seen from the drain loop: bytes in,
/// result or error out, arbitrary latency, no partial progress.
#[async_trait]
pub trait ComputeEngine: Send + Sync {
    async fn compute(&self, input: Vec<u8>) -> ComputeOutcome;
}

/// Engine that returns its input unchanged. Useful for smoke-testing a
/// deployment before wiring up a real backend.
pub struct EchoEngine;

#[async_trait]
impl ComputeEngine for EchoEngine {
    async fn compute(&self, input: Vec<u8>) -> ComputeOutcome {
        Ok(input)
    }
}

/// Engine that pipes the work input to an external command's stdin and
/// returns its stdout. A spawn failure or non-zero exit is a compute error,
/// reported to the coordinator like any other.
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        CommandEngine {
            program: program.into(),
            args,
        }
    }

    /// Build from an argv-style vector, `None` if it is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(CommandEngine::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl ComputeEngine for CommandEngine {
    async fn compute(&self, input: Vec<u8>) -> ComputeOutcome {
        debug!("Spawning compute command {}", self.program);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {}", self.program, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .await
                .map_err(|e| format!("failed to write input: {}", e))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format!("failed to wait for {}: {}", self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }

        Ok(output.stdout)
    }
}
