//! Codex CLI provider.
//!
//! `codex exec --json` prints one JSON event per line; the reply is the last
//! completed `agent_message` item.

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use super::models::ModelAliases;
use super::provider::{run_cli, Provider, ProviderError, Result, Turn};
use super::{ProviderKind, ResetSignal};

/// Substituted when the event stream holds no assistant message.
pub const CODEX_FALLBACK_REPLY: &str = "Sorry, I could not generate a response from Codex.";

pub struct CodexProvider {
    cli_path: String,
    aliases: ModelAliases,
}

impl CodexProvider {
    pub fn new() -> Self {
        Self {
            cli_path: "codex".to_string(),
            aliases: ModelAliases::builtin(ProviderKind::OpenAi),
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
        let mut args = vec!["exec".to_string()];

        if continue_session {
            args.push("resume".to_string());
            args.push("--last".to_string());
        }
        if let Some(model) = self.aliases.resolve(turn.model) {
            args.push("--model".to_string());
            args.push(model);
        }

        args.extend(
            [
                "--skip-git-repo-check",
                "--dangerously-bypass-approvals-and-sandbox",
                "--json",
            ]
            .map(String::from),
        );
        args.push(turn.message.to_string());
        args
    }
}

impl Default for CodexProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Text of an event if it is a completed assistant message.
fn agent_message_text(event: &Value) -> Option<&str> {
    let typ = event.get("type").and_then(Value::as_str);

    if typ == Some("item.completed") {
        let item = event.get("item")?;
        let item_type = item
            .get("type")
            .or_else(|| item.get("item_type"))
            .and_then(Value::as_str);
        if item_type == Some("agent_message") {
            return item.get("text").and_then(Value::as_str);
        }
        return None;
    }

    // Older CLIs wrap events as {"msg": {"type": "agent_message", "message": ...}}.
    let msg = event.get("msg")?;
    if msg.get("type").and_then(Value::as_str) == Some("agent_message") {
        return msg.get("message").and_then(Value::as_str);
    }
    None
}

/// Pick the reply out of a `--json` event stream.
pub fn extract_codex_reply(stdout: &str) -> Result<String> {
    let mut parsed = 0usize;
    let mut non_empty = 0usize;
    let mut reply: Option<String> = None;

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        non_empty += 1;
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        parsed += 1;

        if let Some(text) = agent_message_text(&event) {
            reply = Some(text.to_string());
        }
    }

    if non_empty > 0 && parsed == 0 {
        return Err(ProviderError::MalformedOutput(format!(
            "none of {} output line(s) is a JSON event",
            non_empty
        )));
    }

    match reply.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(text) => Ok(text.to_string()),
        None => {
            tracing::warn!(events = parsed, "Codex produced no agent_message, using fallback reply");
            Ok(CODEX_FALLBACK_REPLY.to_string())
        }
    }
}

#[async_trait]
impl Provider for CodexProvider {
    fn name(&self) -> &str {
        "codex"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
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
        extract_codex_reply(&stdout)
    }
}
