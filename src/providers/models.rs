//! Model alias tables per provider.

use std::collections::HashMap;

use super::ProviderKind;

const ANTHROPIC_ALIASES: &[(&str, &str)] = &[
    ("sonnet", "claude-sonnet-4-5"),
    ("opus", "claude-opus-4-6"),
    ("haiku", "claude-haiku-4-5"),
];

const OPENAI_ALIASES: &[(&str, &str)] = &[
    ("gpt-5.2", "gpt-5.2"),
    ("gpt-5.3-codex", "gpt-5.3-codex"),
    ("codex", "gpt-5.3-codex"),
];

#[derive(Debug, Clone, Default)]
pub struct ModelAliases {
    table: HashMap<String, String>,
}

impl ModelAliases {
    /// Built-in aliases for a provider.
    pub fn builtin(kind: ProviderKind) -> Self {
        let pairs = match kind {
            ProviderKind::Anthropic => ANTHROPIC_ALIASES,
            ProviderKind::OpenAi => OPENAI_ALIASES,
        };
        Self {
            table: pairs
                .iter()
                .map(|(alias, id)| (alias.to_string(), id.to_string()))
                .collect(),
        }
    }

    /// Layer operator-supplied aliases over the current table.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        for (alias, id) in overrides {
            self.table.insert(alias.to_lowercase(), id.clone());
        }
        self
    }

    /// Map a configured model name to the id passed to the CLI.
    ///
    /// `None`, empty and `default` leave the choice to the CLI. Unknown names
    /// pass through untouched so raw provider model strings keep working.
    pub fn resolve(&self, model: Option<&str>) -> Option<String> {
        let model = model.map(str::trim).filter(|m| !m.is_empty() && *m != "default")?;
        Some(
            self.table
                .get(&model.to_lowercase())
                .cloned()
                .unwrap_or_else(|| model.to_string()),
        )
    }
}
