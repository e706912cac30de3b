//! Claude CLI provider.
//!
//! One-shot `claude -p` call; `-c` resumes the previous session and trimmed
//! stdout is the reply.

use async_trait::async_trait;
use tokio::process::Command;

use super::models::ModelAliases;
use super::provider::{run_cli, Provider, Result, Turn};
use super::{ProviderKind, ResetSignal};

pub struct ClaudeProvider {
    cli_path: String,
    aliases: ModelAliases,
}

impl ClaudeProvider {
    pub fn new() -> Self {
        Self {
            cli_path: "claude".to_string(),
            aliases: ModelAliases::builtin(ProviderKind::Anthropic),
        }
    }

    pub fn with_cli_path(cli_path: impl Into<String>) -> Self {
        Self {
            cli_path: cli_path.into(),
            ..Self::new()
        }
    }

    pub fn with_aliases(mut self, aliases: ModelAliases) -> Self {
        self.aliases = aliases;
        self
    }

    fn build_args(&self, turn: &Turn<'_>, continue_session: bool) -> Vec<String> {
        let mut args = vec!["--dangerously-skip-permissions".to_string()];

        if let Some(model) = self.aliases.resolve(turn.model) {
            args.push("--model".to_string());
            args.push(model);
        }
        if continue_session {
            args.push("-c".to_string());
        }

        args.push("-p".to_string());
        args.push(turn.message.to_string());
        args
    }
}

impl Default for ClaudeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn invoke(&self, turn: &Turn<'_>, reset: &ResetSignal) -> Result<String> {
        let continue_session = !reset.consume();
        let args = self.build_args(turn, continue_session);

        tracing::debug!(
            agent = turn.agent_id,
            continue_session,
            "Invoking {} CLI",
            self.cli_path
        );

        let mut cmd = Command::new(&self.cli_path);
        cmd.args(&args);

        let stdout = run_cli(cmd, turn.working_dir).await?;
        Ok(stdout.trim().to_string())
    }
}
