//! AI Provider trait for TinyRelay.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

use super::{ProviderKind, ResetSignal};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("CLI exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed output: {0}")]
    MalformedOutput(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// One conversational turn handed to a backend.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    pub agent_id: &'a str,
    /// Model as configured; each backend resolves its own aliases.
    pub model: Option<&'a str>,
    pub working_dir: Option<&'a Path>,
    pub message: &'a str,
}

/// AI Provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Run one turn and return the reply text.
    ///
    /// Implementations consume `reset` exactly once, before spawning anything,
    /// to decide whether the backend continues its previous session.
    async fn invoke(&self, turn: &Turn<'_>, reset: &ResetSignal) -> Result<String>;
}

/// Spawn a CLI, wait for it and return its stdout.
///
/// The child is killed if the returned future is dropped, which is how the
/// caller's timeout stops a hung backend.
pub(crate) async fn run_cli(mut cmd: Command, working_dir: Option<&Path>) -> Result<String> {
    if let Some(dir) = working_dir {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let output = cmd.output().await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(ProviderError::NonZeroExit {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
