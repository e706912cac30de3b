//! AI Providers module.
//!
//! Every backend is a CLI subprocess behind the [`Provider`] trait. The set of
//! backends is closed ([`ProviderKind`]); each one owns its own argument
//! layout and output parsing so callers never branch on the provider.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub mod claude;
pub mod codex;
pub mod models;
pub mod provider;
pub mod reply;
pub mod reset;

pub use models::ModelAliases;
pub use provider::{Provider, ProviderError, Result, Turn};
pub use reply::normalize_reply;
pub use reset::ResetSignal;

use crate::config::Settings;

/// Backend families understood by the processor.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Claude CLI, plain-text output.
    #[default]
    #[serde(rename = "anthropic", alias = "claude")]
    Anthropic,
    /// Codex CLI, JSON event stream output.
    #[serde(rename = "openai", alias = "codex")]
    OpenAi,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Anthropic, ProviderKind::OpenAi];

    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "Claude",
            ProviderKind::OpenAi => "Codex",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

/// Provider factory.
pub fn create_provider(kind: ProviderKind, settings: &Settings) -> Arc<dyn Provider> {
    let aliases = ModelAliases::builtin(kind).with_overrides(settings.models.aliases.for_provider(kind));
    match kind {
        ProviderKind::Anthropic => Arc::new(claude::ClaudeProvider::new().with_aliases(aliases)),
        ProviderKind::OpenAi => Arc::new(codex::CodexProvider::new().with_aliases(aliases)),
    }
}

/// One provider per backend family.
pub fn create_providers(settings: &Settings) -> HashMap<ProviderKind, Arc<dyn Provider>> {
    ProviderKind::ALL
        .into_iter()
        .map(|kind| (kind, create_provider(kind, settings)))
        .collect()
}
