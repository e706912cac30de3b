//! Message routing for TinyRelay.
//!
//! Handles:
//! - Root routing (pre-resolved `agent` field, `@agent_id` / `@team_id` prefix, default agent)
//! - Mention extraction from agent replies (`@agent_id` anywhere, `[@agent: message]` tags)
//! - Team resolution (a team mention addresses its leader)

use regex::Regex;
use std::sync::LazyLock;

use crate::config::{Settings, TeamConfig};
use crate::core::queue::InboundMessage;
use crate::error::{Error, Result};

/// Agent picked when nothing else selects one, if configured.
pub const FALLBACK_AGENT_ID: &str = "default";

/// `@id` at the start of the text or after a non-word character.
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^A-Za-z0-9_])@([A-Za-z0-9_-]+)").expect("valid mention regex"));

/// `[@a: text]` or `[@a,b: text]`.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[@([A-Za-z0-9_-]+(?:\s*,\s*@?[A-Za-z0-9_-]+)*):\s*([\s\S]*?)\]").expect("valid tag regex")
});

/// `@id rest of message`
static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@([A-Za-z0-9_-]+)\s+([\s\S]+)$").expect("valid prefix regex"));

/// What an identifier resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Agent(String),
    Team {
        team_id: String,
        team: TeamConfig,
        leader: String,
    },
}

impl Target {
    /// The agent that actually receives the message.
    pub fn agent_id(&self) -> &str {
        match self {
            Target::Agent(id) => id,
            Target::Team { leader, .. } => leader,
        }
    }
}

/// One resolved mention in a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    /// Identifier as written, without the `@`.
    pub identifier: String,
    pub target: Target,
    /// Body of the `[@id: ...]` tag carrying this mention, with shared context.
    pub directed: Option<String>,
}

impl Mention {
    pub fn agent_id(&self) -> &str {
        self.target.agent_id()
    }
}

/// Where a top-level message goes.
#[derive(Debug, Clone, PartialEq)]
pub struct RootRoute {
    pub target: Target,
    /// Message text with a leading routing prefix removed.
    pub message: String,
}

impl RootRoute {
    pub fn agent_id(&self) -> &str {
        self.target.agent_id()
    }
}

/// Resolves `@identifier` tokens against the configured agents and teams.
pub struct MentionRouter<'a> {
    settings: &'a Settings,
}

impl<'a> MentionRouter<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Resolve an identifier: agents first (exact, then case-insensitive), then teams.
    pub fn resolve(&self, identifier: &str) -> Option<Target> {
        if let Some(agent_id) = self.find_agent(identifier) {
            return Some(Target::Agent(agent_id));
        }

        let (team_id, team) = self.find_team(identifier)?;
        let leader = team.leader_agent.as_deref()?;
        if !self.settings.agents.contains_key(leader) {
            tracing::warn!(team = %team_id, leader, "Team leader is not a configured agent");
            return None;
        }

        Some(Target::Team {
            leader: leader.to_string(),
            team_id,
            team,
        })
    }

    /// Every resolvable mention in a reply, in text order.
    ///
    /// Mentions inside a tag body are part of the directed message, not of the
    /// reply, and are left for the delegate to act on.
    pub fn route(&self, text: &str) -> Vec<Mention> {
        let mut found: Vec<(usize, Mention)> = Vec::new();

        let tags: Vec<_> = TAG_RE.captures_iter(text).collect();
        let shared = shared_context(text);

        let mut cursor = 0;
        for caps in &tags {
            let (Some(whole), Some(targets), Some(body)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };

            self.free_mentions(text, cursor, whole.start(), &mut found);
            cursor = whole.end();

            let body = body.as_str().trim();
            let directed = if shared.is_empty() {
                body.to_string()
            } else {
                format!("{}\n\n------\n\nDirected to you:\n{}", shared, body)
            };

            for identifier in targets.as_str().split(',') {
                let identifier = identifier.trim().trim_start_matches('@');
                match self.resolve(identifier) {
                    Some(target) => found.push((
                        whole.start(),
                        Mention {
                            identifier: identifier.to_string(),
                            target,
                            directed: Some(directed.clone()),
                        },
                    )),
                    None => tracing::debug!(identifier, "Ignoring unresolved mention tag"),
                }
            }
        }
        self.free_mentions(text, cursor, text.len(), &mut found);

        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, m)| m).collect()
    }

    fn free_mentions(&self, text: &str, start: usize, end: usize, out: &mut Vec<(usize, Mention)>) {
        if start >= end {
            return;
        }
        let segment = &text[start..end];
        for caps in MENTION_RE.captures_iter(segment) {
            let Some(id) = caps.get(1) else { continue };
            if let Some(target) = self.resolve(id.as_str()) {
                out.push((
                    start + id.start(),
                    Mention {
                        identifier: id.as_str().to_string(),
                        target,
                        directed: None,
                    },
                ));
            }
        }
    }

    /// Pick the agent for a top-level message.
    pub fn route_root(&self, message: &InboundMessage) -> Result<RootRoute> {
        if let Some(pre) = message.agent.as_deref() {
            match self.resolve(pre) {
                Some(target) => {
                    return Ok(RootRoute {
                        target,
                        message: message.message.clone(),
                    })
                }
                None => tracing::warn!(agent = pre, "Pre-routed target is not configured, routing by text"),
            }
        }

        if let Some(caps) = PREFIX_RE.captures(&message.message) {
            if let (Some(id), Some(rest)) = (caps.get(1), caps.get(2)) {
                if let Some(target) = self.resolve(id.as_str()) {
                    return Ok(RootRoute {
                        target,
                        message: rest.as_str().trim().to_string(),
                    });
                }
            }
        }

        let agent_id = self.default_agent().ok_or(Error::NoAgents)?;
        Ok(RootRoute {
            target: Target::Agent(agent_id),
            message: message.message.clone(),
        })
    }

    /// `routing.default_agent`, else an agent named `default`, else the first agent by id.
    pub fn default_agent(&self) -> Option<String> {
        if let Some(id) = self.settings.routing.default_agent.as_deref() {
            if self.settings.agents.contains_key(id) {
                return Some(id.to_string());
            }
        }

        if self.settings.agents.contains_key(FALLBACK_AGENT_ID) {
            return Some(FALLBACK_AGENT_ID.to_string());
        }

        // Stable fallback.
        self.settings.agents.keys().min().cloned()
    }

    fn find_agent(&self, identifier: &str) -> Option<String> {
        if self.settings.agents.contains_key(identifier) {
            return Some(identifier.to_string());
        }
        self.settings
            .agents
            .keys()
            .filter(|id| id.eq_ignore_ascii_case(identifier))
            .min()
            .cloned()
    }

    fn find_team(&self, identifier: &str) -> Option<(String, TeamConfig)> {
        if let Some(team) = self.settings.teams.get(identifier) {
            return Some((identifier.to_string(), team.clone()));
        }
        self.settings
            .teams
            .iter()
            .filter(|(id, _)| id.eq_ignore_ascii_case(identifier))
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(id, team)| (id.clone(), team.clone()))
    }
}

/// Text outside all `[@id: ...]` tags.
pub fn shared_context(text: &str) -> String {
    TAG_RE.replace_all(text, "").trim().to_string()
}

/// Message body handed to a delegated agent.
pub fn delegation_message(from_agent: &str, text: &str, in_team: bool) -> String {
    if in_team {
        format!("[Message from teammate @{}]:\n{}", from_agent, text)
    } else {
        format!("[Message from @{}]:\n{}", from_agent, text)
    }
}
