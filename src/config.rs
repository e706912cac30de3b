//! Configuration loading for TinyRelay.
//!
//! Settings live in `<home>/settings.json` and are owned by the setup tooling;
//! the queue processor only ever reads them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::providers::ProviderKind;

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "TINYRELAY_HOME";

/// Get the TinyRelay home directory (~/.tinyrelay).
pub fn get_home_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }

    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".tinyrelay"))
}

/// Well-known locations below the home directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub home: PathBuf,
    pub settings_file: PathBuf,
    pub queue_dir: PathBuf,
    pub log_dir: PathBuf,
    pub reset_marker: PathBuf,
    pub workspace: PathBuf,
}

impl Paths {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            settings_file: home.join("settings.json"),
            queue_dir: home.join("queue"),
            log_dir: home.join("logs"),
            reset_marker: home.join("reset_flag"),
            workspace: home.join("workspace"),
            home,
        }
    }

    /// Resolve paths from an explicit home or the default one.
    pub fn resolve(home: Option<PathBuf>) -> Result<Self> {
        match home {
            Some(home) => Ok(Self::new(home)),
            None => Ok(Self::new(get_home_dir()?)),
        }
    }
}

/// Load and validate settings from a file.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;
    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if let Some(default_agent) = settings.routing.default_agent.as_deref() {
        if !settings.agents.contains_key(default_agent) {
            return Err(Error::Config(format!(
                "routing.default_agent '{}' not found in settings.agents",
                default_agent
            )));
        }
    }

    for (team_id, team) in &settings.teams {
        if let Some(leader) = team.leader_agent.as_deref() {
            if !settings.agents.contains_key(leader) {
                return Err(Error::Config(format!(
                    "teams.{}.leader_agent '{}' not found in settings.agents",
                    team_id, leader
                )));
            }
            if !team.agents.iter().any(|a| a == leader) {
                tracing::warn!(team = %team_id, leader, "Team leader is not listed as a team member");
            }
        }
    }

    if settings.conversation.max_messages == 0 {
        return Err(Error::Config(
            "conversation.max_messages must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Workspace configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Workspace {
    pub path: Option<PathBuf>,
}

/// Agent configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AgentConfig {
    pub name: Option<String>,
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub working_directory: Option<PathBuf>,
}

/// Team configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TeamConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub agents: Vec<String>,
    pub leader_agent: Option<String>,
}

/// Provider model configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProviderModel {
    pub model: Option<String>,
}

/// Operator-supplied model aliases, merged over the built-in tables.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ModelAliasTables {
    #[serde(default)]
    pub anthropic: HashMap<String, String>,
    #[serde(default)]
    pub openai: HashMap<String, String>,
}

impl ModelAliasTables {
    pub fn for_provider(&self, kind: ProviderKind) -> &HashMap<String, String> {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
        }
    }
}

/// Models configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Models {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub anthropic: ProviderModel,
    #[serde(default)]
    pub openai: ProviderModel,
    #[serde(default)]
    pub aliases: ModelAliasTables,
}

/// Routing configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Routing {
    pub default_agent: Option<String>,
}

/// Queue processor tuning.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QueueSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_invocation_timeout_secs")]
    pub invocation_timeout_secs: u64,
    #[serde(default)]
    pub invocation_retries: u32,
    #[serde(default = "default_max_response_chars")]
    pub max_response_chars: usize,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_invocation_timeout_secs() -> u64 {
    240
}

fn default_max_response_chars() -> usize {
    4000
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            invocation_timeout_secs: default_invocation_timeout_secs(),
            invocation_retries: 0,
            max_response_chars: default_max_response_chars(),
        }
    }
}

/// Multi-agent conversation limits.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConversationSettings {
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
    #[serde(default = "default_conversation_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_messages() -> u32 {
    50
}

fn default_conversation_timeout_secs() -> u64 {
    30 * 60
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            timeout_secs: default_conversation_timeout_secs(),
        }
    }
}

/// TinyRelay settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub workspace: Workspace,

    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,

    #[serde(default)]
    pub teams: HashMap<String, TeamConfig>,

    #[serde(default)]
    pub models: Models,

    #[serde(default)]
    pub routing: Routing,

    #[serde(default)]
    pub queue: QueueSettings,

    #[serde(default)]
    pub conversation: ConversationSettings,
}

impl Settings {
    /// Provider used by an agent, falling back to the global provider.
    pub fn provider_for(&self, agent: &AgentConfig) -> ProviderKind {
        agent.provider.unwrap_or(self.models.provider)
    }

    /// Model requested by an agent, falling back to the provider default.
    pub fn model_for(&self, agent: &AgentConfig) -> Option<String> {
        agent.model.clone().or_else(|| match self.provider_for(agent) {
            ProviderKind::Anthropic => self.models.anthropic.model.clone(),
            ProviderKind::OpenAi => self.models.openai.model.clone(),
        })
    }

    /// Working directory of an agent: explicit, else `<workspace>/<agent_id>`.
    pub fn working_dir_for(&self, agent_id: &str, agent: &AgentConfig, default_workspace: &Path) -> PathBuf {
        if let Some(dir) = &agent.working_directory {
            return dir.clone();
        }
        self.workspace
            .path
            .as_deref()
            .unwrap_or(default_workspace)
            .join(agent_id)
    }
}

/// Read-only view over `settings.json` that picks up edits between polls.
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
    modified: Option<SystemTime>,
}

impl SettingsStore {
    /// Load the settings file; fails if it is missing or invalid.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = load_settings(&path)?;
        let modified = modified_time(&path);
        Ok(Self {
            path,
            settings,
            modified,
        })
    }

    /// A store that never reloads, for callers that build settings in memory.
    pub fn fixed(settings: Settings) -> Self {
        Self {
            path: PathBuf::new(),
            settings,
            modified: None,
        }
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Reload when the file changed. A broken edit keeps the last good settings.
    pub fn refresh(&mut self) -> bool {
        if self.path.as_os_str().is_empty() {
            return false;
        }

        let modified = modified_time(&self.path);
        if modified.is_none() || modified == self.modified {
            return false;
        }

        match load_settings(&self.path) {
            Ok(settings) => {
                self.settings = settings;
                self.modified = modified;
                tracing::info!(path = %self.path.display(), "Settings reloaded");
                true
            }
            Err(e) => {
                self.modified = modified;
                tracing::warn!(path = %self.path.display(), "Keeping previous settings: {}", e);
                false
            }
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "agents": {
            "coder": { "name": "Coder", "provider": "anthropic", "model": "sonnet" },
            "reviewer": { "provider": "codex", "working_directory": "/srv/reviewer" }
        },
        "teams": {
            "dev": { "name": "Dev", "agents": ["coder", "reviewer"], "leader_agent": "coder" }
        },
        "models": { "provider": "openai", "openai": { "model": "gpt-5.2" } },
        "routing": { "default_agent": "coder" }
    }"#;

    #[test]
    fn test_load_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.agents.len(), 2);
        assert_eq!(settings.teams["dev"].leader_agent.as_deref(), Some("coder"));
        assert_eq!(settings.conversation.max_messages, 50);
        assert_eq!(settings.queue.poll_interval_ms, 1000);

        let reviewer = &settings.agents["reviewer"];
        assert_eq!(settings.provider_for(reviewer), ProviderKind::OpenAi);
        assert_eq!(settings.model_for(reviewer).as_deref(), Some("gpt-5.2"));
        assert_eq!(
            settings.working_dir_for("reviewer", reviewer, Path::new("/ws")),
            PathBuf::from("/srv/reviewer")
        );

        let coder = &settings.agents["coder"];
        assert_eq!(settings.provider_for(coder), ProviderKind::Anthropic);
        assert_eq!(
            settings.working_dir_for("coder", coder, Path::new("/ws")),
            PathBuf::from("/ws/coder")
        );
    }

    #[test]
    fn unknown_default_agent_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"routing": {"default_agent": "ghost"}}"#).unwrap();

        assert!(matches!(load_settings(&path), Err(Error::Config(_))));
    }

    #[test]
    fn unknown_team_leader_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"agents": {"a": {}}, "teams": {"t": {"agents": ["a"], "leader_agent": "b"}}}"#,
        )
        .unwrap();

        assert!(load_settings(&path).is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let err = load_settings(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("Settings file not found"));
    }

    #[test]
    fn store_keeps_last_good_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut store = SettingsStore::open(&path).unwrap();
        assert!(!store.refresh());

        std::fs::write(&path, "{ not json").unwrap();
        // Force a distinct mtime regardless of filesystem granularity.
        store.modified = Some(SystemTime::UNIX_EPOCH);
        assert!(!store.refresh());
        assert_eq!(store.get().agents.len(), 2);
    }

    #[test]
    fn paths_layout() {
        let paths = Paths::new("/tmp/relay");
        assert_eq!(paths.settings_file, PathBuf::from("/tmp/relay/settings.json"));
        assert_eq!(paths.queue_dir, PathBuf::from("/tmp/relay/queue"));
        assert_eq!(paths.reset_marker, PathBuf::from("/tmp/relay/reset_flag"));
    }
}
