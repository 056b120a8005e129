use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{error, info};

use crate::domain::receipts::phone::Destination;

/// Caption sent along with a receipt image ("delivery note no. N").
pub fn receipt_caption(receipt_number: i64) -> String {
    format!("תעודת משלוח מס' {receipt_number}")
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to launch {binary}: {reason}")]
    Launch { binary: String, reason: String },
    #[error("sender exited with {code:?}: {stderr}")]
    Exited { code: Option<i32>, stderr: String },
    #[error("sender did not finish within {0:?}")]
    TimedOut(Duration),
}

impl DispatchError {
    /// Diagnostic suitable for showing to an operator.
    pub fn detail(&self) -> String {
        match self {
            DispatchError::Exited { stderr, .. } if !stderr.is_empty() => stderr.clone(),
            other => other.to_string(),
        }
    }
}

/// Sends a file to a destination over the messaging channel.
///
/// One call is one attempt; implementations never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(
        &self,
        destination: &Destination,
        file: &Path,
        caption: &str,
    ) -> Result<(), DispatchError>;
}

#[derive(Debug, Clone)]
pub struct CommandDispatcherConfig {
    /// Messaging CLI accepting `send-image <dest> <file> --caption <text>`.
    pub binary: String,
    pub timeout: Duration,
}

impl Default for CommandDispatcherConfig {
    fn default() -> Self {
        Self {
            binary: "/usr/bin/mudslide-linuxstatic-x64".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Runs the messaging CLI as a child process and waits for it.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    config: CommandDispatcherConfig,
}

impl CommandDispatcher {
    pub fn new(config: CommandDispatcherConfig) -> Self {
        Self { config }
    }

    pub fn binary(&self) -> &str {
        &self.config.binary
    }
}

#[async_trait]
impl Dispatcher for CommandDispatcher {
    async fn send(
        &self,
        destination: &Destination,
        file: &Path,
        caption: &str,
    ) -> Result<(), DispatchError> {
        info!(
            binary = %self.config.binary,
            destination = %destination,
            file = %file.display(),
            "sending receipt"
        );

        let child = Command::new(&self.config.binary)
            .arg("send-image")
            .arg(destination.as_str())
            .arg(file)
            .arg("--caption")
            .arg(caption)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DispatchError::Launch {
                binary: self.config.binary.clone(),
                reason: e.to_string(),
            })?;

        let output = match timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(DispatchError::Launch {
                    binary: self.config.binary.clone(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                error!(destination = %destination, "sender timed out");
                return Err(DispatchError::TimedOut(self.config.timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                destination = %destination,
                code = ?output.status.code(),
                %stderr,
                "sender reported failure"
            );
            return Err(DispatchError::Exited {
                code: output.status.code(),
                stderr,
            });
        }

        info!(destination = %destination, "receipt sent");
        Ok(())
    }
}
