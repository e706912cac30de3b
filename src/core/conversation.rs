//! Multi-agent conversations.
//!
//! A conversation is opened for every top-level message. The root agent's
//! reply may mention other agents; each mention becomes a delegated inbound
//! message carrying `conversationId`/`fromAgent`, and the conversation stays
//! open until every delegation has been answered. The outbound reply is the
//! root agent's own text.
//!
//! Conversations live in memory only. After a restart, delegated files still
//! in the queue find no conversation and are dropped as orphans.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;
use std::time::Duration;

use crate::config::{ConversationSettings, TeamConfig};
use crate::core::queue::{now_millis, ClaimedFile, InboundMessage, OutboundMessage};
use crate::core::routing::{delegation_message, MentionRouter, RootRoute, Target};
use crate::error::{Error, Result};

/// Reply sent when a conversation expires before the root agent answered.
pub const TIMEOUT_NOTICE: &str = "Sorry, this conversation timed out before a reply was ready.";

static SEND_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[send_file:\s*([^\]]+)\]").expect("valid send_file regex"));

/// Pull `[send_file: path]` tags out of a reply.
pub fn extract_send_files(text: &str) -> (String, Vec<String>) {
    let files = SEND_FILE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    let stripped = SEND_FILE_RE.replace_all(text, "").trim().to_string();
    (stripped, files)
}

/// Note appended to a delegate's prompt while teammates are still working.
pub fn pending_note(others: usize) -> String {
    format!(
        "[{} other teammate response(s) are still being processed. Do not re-mention teammates who haven't responded yet.]",
        others
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Root message handed to its agent.
    Dispatched,
    /// Delegations are open.
    AwaitingReplies,
    /// Root reply present and nothing pending; outbound being written.
    Finalizing,
    Done,
    /// Forced to finish by the timeout, or the outbound could not be written.
    Aborted,
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConversationState::Dispatched => "dispatched",
            ConversationState::AwaitingReplies => "awaiting_replies",
            ConversationState::Finalizing => "finalizing",
            ConversationState::Done => "done",
            ConversationState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// One agent turn, in completion order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainStep {
    pub agent_id: String,
    pub response: String,
    /// Delegated message id this step answered; `None` for the root turn.
    pub in_reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamContext {
    pub team_id: String,
    pub team: TeamConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenDelegation {
    pub from_agent: String,
    pub to_agent: String,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub channel: String,
    pub sender: String,
    pub sender_id: Option<String>,
    pub original_message: String,
    pub message_id: String,
    pub root_agent: String,
    pub root_reply: Option<String>,
    /// Processing copy of the root message, deleted once the outbound is written.
    pub root_file: Option<ClaimedFile>,
    pub state: ConversationState,
    pub pending: u32,
    pub responses: Vec<ChainStep>,
    pub total_messages: u32,
    pub max_messages: u32,
    pub team_context: Option<TeamContext>,
    pub outgoing_mentions: HashMap<String, u32>,
    pub open_delegations: BTreeMap<String, OpenDelegation>,
    pub files: BTreeSet<String>,
    pub started_at: DateTime<Utc>,
}

/// Conversation id for a top-level message.
pub fn conversation_id(message_id: &str) -> String {
    format!("conv_{}", message_id)
}

impl Conversation {
    fn new(message: &InboundMessage, route: &RootRoute, root_file: Option<ClaimedFile>, max_messages: u32) -> Self {
        let team_context = match &route.target {
            Target::Team { team_id, team, .. } => Some(TeamContext {
                team_id: team_id.clone(),
                team: team.clone(),
            }),
            Target::Agent(_) => None,
        };

        Self {
            id: conversation_id(&message.message_id),
            channel: message.channel.clone(),
            sender: message.sender.clone(),
            sender_id: message.sender_id.clone(),
            original_message: message.message.clone(),
            message_id: message.message_id.clone(),
            root_agent: route.agent_id().to_string(),
            root_reply: None,
            root_file,
            state: ConversationState::Dispatched,
            pending: 0,
            responses: Vec::new(),
            total_messages: 1,
            max_messages,
            team_context,
            outgoing_mentions: HashMap::new(),
            open_delegations: BTreeMap::new(),
            files: message.files.iter().flatten().cloned().collect(),
            started_at: Utc::now(),
        }
    }

    pub fn is_finalizable(&self) -> bool {
        self.pending == 0 && self.root_reply.is_some()
    }

    fn open(&mut self, message_id: String, from_agent: &str, to_agent: &str) {
        self.open_delegations.insert(
            message_id,
            OpenDelegation {
                from_agent: from_agent.to_string(),
                to_agent: to_agent.to_string(),
            },
        );
        self.pending += 1;
        *self.outgoing_mentions.entry(from_agent.to_string()).or_insert(0) += 1;
    }

    /// Close one delegation. Returns false if it was not open.
    fn close(&mut self, message_id: &str) -> bool {
        let Some(delegation) = self.open_delegations.remove(message_id) else {
            return false;
        };
        self.pending = self.pending.saturating_sub(1);

        if let Some(count) = self.outgoing_mentions.get_mut(&delegation.from_agent) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.outgoing_mentions.remove(&delegation.from_agent);
                tracing::debug!(
                    conversation = %self.id,
                    agent = %delegation.from_agent,
                    "All mentions from agent answered"
                );
            }
        }
        true
    }

    fn outbound(&self, message: String) -> OutboundMessage {
        OutboundMessage {
            channel: self.channel.clone(),
            sender: self.sender.clone(),
            sender_id: self.sender_id.clone(),
            message,
            original_message: self.original_message.clone(),
            timestamp: now_millis(),
            message_id: self.message_id.clone(),
            agent: Some(self.root_agent.clone()),
            files: if self.files.is_empty() {
                None
            } else {
                Some(self.files.iter().cloned().collect())
            },
        }
    }
}

/// An agent's reply, fed back into its conversation.
#[derive(Debug, Clone)]
pub struct AgentReply<'a> {
    pub conversation_id: &'a str,
    pub agent_id: &'a str,
    pub text: &'a str,
    /// Delegated message this answers; `None` for the root reply.
    pub delegation: Option<&'a str>,
}

/// A conversation that is ready to be written out.
#[derive(Debug)]
pub struct Finalized {
    pub conversation: Conversation,
    pub outbound: OutboundMessage,
}

#[derive(Debug)]
pub enum ReplyOutcome {
    /// Delegations are still open; `delegations` must be enqueued.
    Awaiting {
        delegations: Vec<InboundMessage>,
        pending: u32,
    },
    Finalized(Box<Finalized>),
    /// Second reply to a delegation that is already closed.
    Duplicate,
}

/// In-memory registry of open conversations.
pub struct ConversationTracker {
    conversations: HashMap<String, Conversation>,
    max_messages: u32,
    timeout: Duration,
}

impl ConversationTracker {
    pub fn new(settings: &ConversationSettings) -> Self {
        Self {
            conversations: HashMap::new(),
            max_messages: settings.max_messages.max(1),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    /// Apply new limits; open conversations keep the cap they started with.
    pub fn configure(&mut self, settings: &ConversationSettings) {
        self.max_messages = settings.max_messages.max(1);
        self.timeout = Duration::from_secs(settings.timeout_secs);
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    /// Open a conversation for a top-level message.
    ///
    /// Returns `None` when a conversation for the same message id is still
    /// open; the open one keeps its root file and the new message is refused.
    pub fn start(
        &mut self,
        message: &InboundMessage,
        route: &RootRoute,
        root_file: Option<ClaimedFile>,
    ) -> Option<String> {
        let id = conversation_id(&message.message_id);
        if self.conversations.contains_key(&id) {
            tracing::warn!(conversation = %id, "Conversation already open for this message id");
            return None;
        }

        let conversation = Conversation::new(message, route, root_file, self.max_messages);
        tracing::info!(
            conversation = %id,
            agent = %conversation.root_agent,
            team = conversation.team_context.as_ref().map(|t| t.team_id.as_str()),
            "Conversation started"
        );
        self.conversations.insert(id.clone(), conversation);
        Some(id)
    }

    /// Open delegations in a conversation other than `message_id`.
    pub fn other_open_delegations(&self, conversation_id: &str, message_id: &str) -> usize {
        self.conversations
            .get(conversation_id)
            .map(|c| {
                c.open_delegations
                    .keys()
                    .filter(|id| id.as_str() != message_id)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Whether `message_id` is an open delegation of the conversation.
    pub fn is_open(&self, conversation_id: &str, message_id: &str) -> bool {
        self.conversations
            .get(conversation_id)
            .is_some_and(|c| c.open_delegations.contains_key(message_id))
    }

    /// Record an agent's reply and decide what happens next.
    pub fn record_reply(&mut self, reply: AgentReply<'_>, router: &MentionRouter<'_>) -> Result<ReplyOutcome> {
        let conversation = self
            .conversations
            .get_mut(reply.conversation_id)
            .ok_or_else(|| Error::OrphanedDelegation {
                conversation_id: reply.conversation_id.to_string(),
                agent_id: reply.agent_id.to_string(),
            })?;

        match reply.delegation {
            Some(message_id) => {
                if !conversation.close(message_id) {
                    tracing::warn!(
                        conversation = %conversation.id,
                        agent = reply.agent_id,
                        message_id,
                        "Ignoring reply to a delegation that is not open"
                    );
                    return Ok(ReplyOutcome::Duplicate);
                }
            }
            None if conversation.root_reply.is_some() => {
                tracing::warn!(conversation = %conversation.id, "Ignoring second root reply");
                return Ok(ReplyOutcome::Duplicate);
            }
            None => {}
        }

        let (mut text, files) = extract_send_files(reply.text);
        conversation.files.extend(files);

        let mentions = router.route(&text);
        let room = conversation.max_messages.saturating_sub(conversation.total_messages) as usize;
        let admitted = mentions.len().min(room);

        if admitted < mentions.len() {
            let cap = Error::DelegationCapExceeded {
                conversation_id: conversation.id.clone(),
                max_messages: conversation.max_messages,
            };
            tracing::warn!(
                conversation = %conversation.id,
                agent = reply.agent_id,
                dropped = mentions.len() - admitted,
                "{}",
                cap
            );
            text = format!("{}\n\n[{}]", text, cap);
        }

        let in_team = conversation.team_context.is_some();
        let mut delegations = Vec::with_capacity(admitted);
        for mention in mentions.into_iter().take(admitted) {
            let body = mention.directed.as_deref().unwrap_or(&text);
            let mut message = InboundMessage::new(
                &conversation.channel,
                &conversation.sender,
                &delegation_message(reply.agent_id, body, in_team),
            );
            message.sender_id = conversation.sender_id.clone();
            message.agent = Some(mention.agent_id().to_string());
            message.conversation_id = Some(conversation.id.clone());
            message.from_agent = Some(reply.agent_id.to_string());

            conversation.open(message.message_id.clone(), reply.agent_id, mention.agent_id());
            conversation.total_messages += 1;

            tracing::info!(
                conversation = %conversation.id,
                from = reply.agent_id,
                to = mention.agent_id(),
                mention = %mention.identifier,
                "Delegating"
            );
            delegations.push(message);
        }

        conversation.responses.push(ChainStep {
            agent_id: reply.agent_id.to_string(),
            response: text.clone(),
            in_reply_to: reply.delegation.map(str::to_string),
        });
        if reply.delegation.is_none() {
            conversation.root_reply = Some(text);
        }

        if conversation.is_finalizable() {
            return Ok(self
                .finalize(reply.conversation_id, ConversationState::Finalizing)
                .map(|f| ReplyOutcome::Finalized(Box::new(f)))
                .unwrap_or(ReplyOutcome::Duplicate));
        }

        conversation.state = ConversationState::AwaitingReplies;
        Ok(ReplyOutcome::Awaiting {
            pending: conversation.pending,
            delegations,
        })
    }

    /// Close a delegation that never made it into the queue.
    pub fn cancel_delegation(&mut self, conversation_id: &str, message_id: &str) -> Option<Finalized> {
        let conversation = self.conversations.get_mut(conversation_id)?;
        if !conversation.close(message_id) {
            return None;
        }
        tracing::warn!(conversation = %conversation_id, message_id, "Delegation cancelled");

        if conversation.is_finalizable() {
            self.finalize(conversation_id, ConversationState::Finalizing)
        } else {
            None
        }
    }

    /// Force-finish conversations older than the timeout.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<Finalized> {
        let expired: Vec<String> = self
            .conversations
            .values()
            .filter(|c| {
                now.signed_duration_since(c.started_at)
                    .to_std()
                    .is_ok_and(|elapsed| elapsed > self.timeout)
            })
            .map(|c| c.id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| {
                let conversation = self.conversations.get(&id)?;
                tracing::warn!(
                    conversation = %id,
                    elapsed_secs = now.signed_duration_since(conversation.started_at).num_seconds(),
                    pending = conversation.pending,
                    "Conversation timed out"
                );
                for (message_id, delegation) in &conversation.open_delegations {
                    tracing::warn!(
                        conversation = %id,
                        message_id = %message_id,
                        from = %delegation.from_agent,
                        to = %delegation.to_agent,
                        "Delegation abandoned"
                    );
                }
                self.finalize(&id, ConversationState::Aborted)
            })
            .collect()
    }

    fn finalize(&mut self, id: &str, state: ConversationState) -> Option<Finalized> {
        let mut conversation = self.conversations.remove(id)?;
        conversation.state = state;

        let text = conversation
            .root_reply
            .clone()
            .unwrap_or_else(|| TIMEOUT_NOTICE.to_string());
        let outbound = conversation.outbound(text);

        tracing::info!(
            conversation = %conversation.id,
            state = %conversation.state,
            turns = conversation.responses.len(),
            total_messages = conversation.total_messages,
            "Conversation finalized"
        );
        Some(Finalized { conversation, outbound })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, Settings};

    fn settings() -> Settings {
        let mut settings = Settings::default();
        for id in ["lead", "coder", "researcher", "reviewer"] {
            settings.agents.insert(id.to_string(), AgentConfig::default());
        }
        settings.teams.insert(
            "dev".to_string(),
            TeamConfig {
                name: "Dev".to_string(),
                agents: vec![
                    "lead".to_string(),
                    "researcher".to_string(),
                    "reviewer".to_string(),
                ],
                leader_agent: Some("lead".to_string()),
            },
        );
        settings
    }

    fn tracker(max_messages: u32) -> ConversationTracker {
        ConversationTracker::new(&ConversationSettings {
            max_messages,
            timeout_secs: 60,
        })
    }

    fn start(tracker: &mut ConversationTracker, settings: &Settings, text: &str) -> String {
        let mut message = InboundMessage::new("telegram", "Alice", text);
        message.message_id = "m1".to_string();
        let route = MentionRouter::new(settings).route_root(&message).unwrap();
        tracker.start(&message, &route, None).unwrap()
    }

    fn root<'a>(id: &'a str, agent: &'a str, text: &'a str) -> AgentReply<'a> {
        AgentReply {
            conversation_id: id,
            agent_id: agent,
            text,
            delegation: None,
        }
    }

    #[test]
    fn plain_root_reply_finalizes() {
        let settings = settings();
        let router = MentionRouter::new(&settings);
        let mut tracker = tracker(50);
        let id = start(&mut tracker, &settings, "@coder fix bug");
        assert_eq!(id, "conv_m1");

        let outcome = tracker.record_reply(root(&id, "coder", "Fixed."), &router).unwrap();
        let ReplyOutcome::Finalized(done) = outcome else {
            panic!("expected finalized");
        };
        assert_eq!(done.conversation.state, ConversationState::Finalizing);
        assert_eq!(done.outbound.message, "Fixed.");
        assert_eq!(done.outbound.message_id, "m1");
        assert_eq!(done.outbound.agent.as_deref(), Some("coder"));
        assert!(tracker.is_empty());
    }

    #[test]
    fn team_leader_fan_out_and_drain() {
        let settings = settings();
        let router = MentionRouter::new(&settings);
        let mut tracker = tracker(50);
        let id = start(&mut tracker, &settings, "@dev plan the release");
        assert!(tracker.get(&id).unwrap().team_context.is_some());

        let outcome = tracker
            .record_reply(root(&id, "lead", "@researcher find data and @reviewer check it"), &router)
            .unwrap();
        let ReplyOutcome::Awaiting { delegations, pending } = outcome else {
            panic!("expected awaiting");
        };
        assert_eq!(pending, 2);
        assert_eq!(delegations.len(), 2);
        assert_eq!(delegations[0].agent.as_deref(), Some("researcher"));
        assert!(delegations[0].message.starts_with("[Message from teammate @lead]:\n"));

        let conversation = tracker.get(&id).unwrap();
        assert_eq!(conversation.state, ConversationState::AwaitingReplies);
        assert_eq!(conversation.outgoing_mentions["lead"], 2);
        assert_eq!(conversation.total_messages, 3);
        assert_eq!(tracker.other_open_delegations(&id, &delegations[0].message_id), 1);

        let first = AgentReply {
            conversation_id: &id,
            agent_id: "researcher",
            text: "data found",
            delegation: Some(delegations[0].message_id.as_str()),
        };
        assert!(matches!(
            tracker.record_reply(first.clone(), &router).unwrap(),
            ReplyOutcome::Awaiting { pending: 1, .. }
        ));
        // Delivered twice: ignored.
        assert!(matches!(
            tracker.record_reply(first, &router).unwrap(),
            ReplyOutcome::Duplicate
        ));

        let second = AgentReply {
            conversation_id: &id,
            agent_id: "reviewer",
            text: "looks fine",
            delegation: Some(delegations[1].message_id.as_str()),
        };
        let ReplyOutcome::Finalized(done) = tracker.record_reply(second, &router).unwrap() else {
            panic!("expected finalized");
        };
        assert_eq!(done.outbound.message, "@researcher find data and @reviewer check it");
        assert_eq!(done.conversation.responses.len(), 3);
        assert!(done.conversation.outgoing_mentions.is_empty());
        assert_eq!(done.conversation.pending, 0);
    }

    #[test]
    fn cap_discards_excess_mentions() {
        let settings = settings();
        let router = MentionRouter::new(&settings);
        let mut tracker = tracker(2);
        let id = start(&mut tracker, &settings, "@lead go");

        let outcome = tracker
            .record_reply(root(&id, "lead", "@researcher and @reviewer"), &router)
            .unwrap();
        let ReplyOutcome::Awaiting { delegations, .. } = outcome else {
            panic!("expected awaiting");
        };
        assert_eq!(delegations.len(), 1);

        let conversation = tracker.get(&id).unwrap();
        assert_eq!(conversation.total_messages, 2);
        assert!(conversation
            .root_reply
            .as_deref()
            .unwrap()
            .ends_with("[Delegation limit reached: 2 message(s) per conversation. Further mentions were not forwarded.]"));

        // The delegate is at the cap too: its mention is dropped and the conversation closes.
        let reply = AgentReply {
            conversation_id: &id,
            agent_id: "researcher",
            text: "ask @reviewer",
            delegation: Some(delegations[0].message_id.as_str()),
        };
        let ReplyOutcome::Finalized(done) = tracker.record_reply(reply, &router).unwrap() else {
            panic!("expected finalized");
        };
        assert!(done.conversation.total_messages <= done.conversation.max_messages);
        assert!(done.conversation.responses[1].response.contains("Delegation limit reached"));
    }

    #[test]
    fn cap_of_one_never_delegates() {
        let settings = settings();
        let router = MentionRouter::new(&settings);
        let mut tracker = tracker(1);
        let id = start(&mut tracker, &settings, "@lead go");

        let outcome = tracker.record_reply(root(&id, "lead", "@coder do it"), &router).unwrap();
        assert!(matches!(outcome, ReplyOutcome::Finalized(_)));
    }

    #[test]
    fn unknown_conversation_is_orphaned() {
        let settings = settings();
        let router = MentionRouter::new(&settings);
        let mut tracker = tracker(50);

        let reply = AgentReply {
            conversation_id: "conv_gone",
            agent_id: "coder",
            text: "late",
            delegation: Some("x"),
        };
        assert!(matches!(
            tracker.record_reply(reply, &router),
            Err(Error::OrphanedDelegation { .. })
        ));
    }

    #[test]
    fn timeout_finalizes_with_root_reply() {
        let settings = settings();
        let router = MentionRouter::new(&settings);
        let mut tracker = tracker(50);
        let id = start(&mut tracker, &settings, "@lead go");
        tracker
            .record_reply(root(&id, "lead", "asking @coder"), &router)
            .unwrap();

        assert!(tracker.sweep_expired(Utc::now()).is_empty());

        let later = Utc::now() + chrono::Duration::seconds(120);
        let expired = tracker.sweep_expired(later);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].conversation.state, ConversationState::Aborted);
        assert_eq!(expired[0].outbound.message, "asking @coder");
        assert!(tracker.is_empty());
    }

    #[test]
    fn timeout_without_root_reply_uses_notice() {
        let settings = settings();
        let mut tracker = tracker(50);
        start(&mut tracker, &settings, "@lead go");

        let expired = tracker.sweep_expired(Utc::now() + chrono::Duration::seconds(120));
        assert_eq!(expired[0].outbound.message, TIMEOUT_NOTICE);
    }

    #[test]
    fn cancelled_delegation_can_finalize() {
        let settings = settings();
        let router = MentionRouter::new(&settings);
        let mut tracker = tracker(50);
        let id = start(&mut tracker, &settings, "@lead go");

        let ReplyOutcome::Awaiting { delegations, .. } = tracker
            .record_reply(root(&id, "lead", "ping @coder"), &router)
            .unwrap()
        else {
            panic!("expected awaiting");
        };
        let done = tracker.cancel_delegation(&id, &delegations[0].message_id).unwrap();
        assert_eq!(done.outbound.message, "ping @coder");
    }

    #[test]
    fn send_file_tags_become_attachments() {
        let settings = settings();
        let router = MentionRouter::new(&settings);
        let mut tracker = tracker(50);
        let id = start(&mut tracker, &settings, "@coder chart please");

        let ReplyOutcome::Finalized(done) = tracker
            .record_reply(root(&id, "coder", "Here it is [send_file: /tmp/chart.png]"), &router)
            .unwrap()
        else {
            panic!("expected finalized");
        };
        assert_eq!(done.outbound.message, "Here it is");
        assert_eq!(done.outbound.files, Some(vec!["/tmp/chart.png".to_string()]));
    }

    #[test]
    fn same_message_id_does_not_replace_an_open_conversation() {
        let settings = settings();
        let mut tracker = tracker(50);
        let id = start(&mut tracker, &settings, "@lead go");

        let mut again = InboundMessage::new("telegram", "Alice", "@coder other");
        again.message_id = "m1".to_string();
        let route = MentionRouter::new(&settings).route_root(&again).unwrap();

        assert_eq!(tracker.start(&again, &route, None), None);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get(&id).unwrap().root_agent, "lead");
    }

    #[test]
    fn test_pending_note() {
        assert_eq!(
            pending_note(2),
            "[2 other teammate response(s) are still being processed. Do not re-mention teammates who haven't responded yet.]"
        );
    }
}
