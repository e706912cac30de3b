//! Queue processor.
//!
//! A single sequential consumer: files in `incoming` are claimed one at a
//! time, oldest first, and each conversation is driven to completion
//! (delegations included) before the next top-level file is started. At most
//! one backend subprocess runs at any moment.

use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{execute_with_contract, ExecutionContract};
use crate::config::{Paths, Settings, SettingsStore};
use crate::core::conversation::{pending_note, AgentReply, ConversationState, ConversationTracker, Finalized, ReplyOutcome};
use crate::core::queue::{now_millis, preview, ClaimedFile, InboundMessage, OutboundMessage, Queue};
use crate::core::routing::MentionRouter;
use crate::error::{Error, Result};
use crate::providers::{create_provider, create_providers, Provider, ProviderKind, ResetSignal, Turn};

/// Reply substituted when a backend invocation fails.
pub const ERROR_REPLY: &str =
    "Sorry, I encountered an error processing your request. Please check the queue logs.";

/// Reply sent when settings contain no agent at all.
pub const NO_AGENTS_REPLY: &str =
    "No agents are configured yet. Add one to settings.json and send your message again.";

pub struct QueueProcessor {
    queue: Queue,
    settings: SettingsStore,
    tracker: ConversationTracker,
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
    /// Providers installed by the caller; kept across settings reloads.
    pinned: HashSet<ProviderKind>,
    reset: ResetSignal,
    default_workspace: PathBuf,
}

impl QueueProcessor {
    /// Processor over the standard home layout.
    pub fn new(paths: &Paths) -> Result<Self> {
        let settings = SettingsStore::open(&paths.settings_file)?;
        let queue = Queue::new(&paths.queue_dir);
        queue.ensure_dirs()?;

        Ok(Self::with_parts(
            queue,
            settings,
            ResetSignal::with_marker(&paths.reset_marker),
            paths.workspace.clone(),
        ))
    }

    pub fn with_parts(
        queue: Queue,
        settings: SettingsStore,
        reset: ResetSignal,
        default_workspace: impl Into<PathBuf>,
    ) -> Self {
        let tracker = ConversationTracker::new(&settings.get().conversation);
        let providers = create_providers(settings.get());

        Self {
            queue,
            settings,
            tracker,
            providers,
            pinned: HashSet::new(),
            reset,
            default_workspace: default_workspace.into(),
        }
    }

    /// Replace the backend used for one provider family.
    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(kind, provider);
        self.pinned.insert(kind);
        self
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn tracker(&self) -> &ConversationTracker {
        &self.tracker
    }

    pub fn reset_signal(&self) -> &ResetSignal {
        &self.reset
    }

    /// Recover orphans, then poll until Ctrl-C.
    pub async fn run(&mut self) -> Result<()> {
        let recovered = self.queue.recover_orphaned()?;
        if recovered > 0 {
            tracing::info!("Recovered {} orphaned message(s)", recovered);
        }

        let poll_interval = Duration::from_millis(self.settings.get().queue.poll_interval_ms.max(1));
        tracing::info!(
            incoming = %self.queue.incoming_dir().display(),
            agents = self.settings.get().agents.len(),
            teams = self.settings.get().teams.len(),
            poll_ms = poll_interval.as_millis() as u64,
            "Queue processor started"
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll().await?;
                }
                _ = &mut shutdown => {
                    tracing::info!(
                        open_conversations = self.tracker.len(),
                        "Shutdown signal received, stopping queue processor"
                    );
                    break;
                }
            }
        }

        Ok(())
    }

    /// Process everything currently in `incoming`. Returns the number of files handled.
    ///
    /// Errors are returned only when the queue itself is unusable.
    pub async fn poll(&mut self) -> Result<usize> {
        if self.settings.refresh() {
            self.apply_settings();
        }

        self.sweep_expired();

        let entries = self.queue.list_incoming()?;
        let mut handled = 0;

        for entry in entries {
            // Delegations spawned by a file run before the next file of the batch.
            let mut work = VecDeque::from([entry.name]);
            while let Some(name) = work.pop_front() {
                // Files of a conversation swept here take the orphan path.
                self.sweep_expired();
                handled += 1;
                work.extend(self.process_file(&name).await);
            }
        }

        Ok(handled)
    }

    fn sweep_expired(&mut self) {
        for finalized in self.tracker.sweep_expired(Utc::now()) {
            self.deliver(finalized);
        }
    }

    fn apply_settings(&mut self) {
        let settings = self.settings.get();
        self.tracker.configure(&settings.conversation);
        for kind in ProviderKind::ALL {
            if !self.pinned.contains(&kind) {
                self.providers.insert(kind, create_provider(kind, settings));
            }
        }
    }

    /// Claim, handle and finish one file. Returns the delegated files it spawned.
    async fn process_file(&mut self, name: &str) -> Vec<String> {
        let claimed = match self.queue.claim(name) {
            Ok(claimed) => claimed,
            Err(e) if e.is_benign() => {
                tracing::debug!("Skipping {}: {}", name, e);
                return vec![];
            }
            Err(e) => {
                tracing::error!("Failed to claim {}: {}", name, e);
                return vec![];
            }
        };

        let message = match self.queue.read(&claimed) {
            Ok(message) => message,
            Err(Error::Json(e)) => {
                match self.queue.reject(&claimed) {
                    Ok(path) => tracing::error!("Invalid message file {} ({}), moved to {}", name, e, path.display()),
                    Err(io) => tracing::error!("Invalid message file {} ({}), could not set it aside: {}", name, e, io),
                }
                return vec![];
            }
            Err(e) => {
                tracing::error!("Failed to read {}: {}", name, e);
                self.requeue(&claimed);
                return vec![];
            }
        };

        let result = match message.conversation_id.clone() {
            Some(conversation_id) => self.handle_delegated(&claimed, &message, &conversation_id).await,
            None => self.handle_root(&claimed, &message).await,
        };

        match result {
            Ok(spawned) => spawned,
            Err(e) => {
                tracing::error!(
                    channel = %message.channel,
                    message = %preview(&message.message, 50),
                    "Failed to process {}: {}",
                    name,
                    e
                );
                self.requeue(&claimed);
                vec![]
            }
        }
    }

    fn requeue(&self, claimed: &ClaimedFile) {
        if let Err(e) = self.queue.release(claimed) {
            tracing::error!("Failed to return {} to incoming: {}", claimed.name, e);
        }
    }

    async fn handle_root(&mut self, claimed: &ClaimedFile, message: &InboundMessage) -> Result<Vec<String>> {
        let settings = self.settings.get().clone();
        let router = MentionRouter::new(&settings);

        let route = match router.route_root(message) {
            Ok(route) => route,
            Err(Error::NoAgents) => {
                tracing::warn!(channel = %message.channel, "{}, answering without an agent", Error::NoAgents);
                self.queue.write_outgoing(&direct_reply(message, NO_AGENTS_REPLY))?;
                self.queue.complete(claimed)?;
                return Ok(vec![]);
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            channel = %message.channel,
            sender = %message.sender,
            agent = route.agent_id(),
            "Message: {}",
            preview(&route.message, 50)
        );

        let Some(conversation_id) = self.tracker.start(message, &route, Some(claimed.clone())) else {
            let path = self.queue.reject(claimed)?;
            tracing::warn!(
                message_id = %message.message_id,
                "Duplicate message id, moved to {}",
                path.display()
            );
            return Ok(vec![]);
        };
        let reply = self.invoke(&settings, route.agent_id(), &route.message).await;

        let outcome = self.tracker.record_reply(
            AgentReply {
                conversation_id: &conversation_id,
                agent_id: route.agent_id(),
                text: &reply,
                delegation: None,
            },
            &router,
        )?;
        Ok(self.apply_outcome(outcome))
    }

    async fn handle_delegated(
        &mut self,
        claimed: &ClaimedFile,
        message: &InboundMessage,
        conversation_id: &str,
    ) -> Result<Vec<String>> {
        let from_agent = message.from_agent.as_deref().unwrap_or("unknown");
        let agent_id = message.agent.as_deref().unwrap_or_default();

        if !self.tracker.is_open(conversation_id, &message.message_id) {
            if self.tracker.get(conversation_id).is_none() {
                let orphan = Error::OrphanedDelegation {
                    conversation_id: conversation_id.to_string(),
                    agent_id: agent_id.to_string(),
                };
                tracing::warn!(from = from_agent, "{}", orphan);
            } else {
                tracing::warn!(
                    conversation = conversation_id,
                    message_id = %message.message_id,
                    "Delegation already answered, dropping duplicate"
                );
            }
            self.queue.complete(claimed)?;
            return Ok(vec![]);
        }

        tracing::info!(
            conversation = conversation_id,
            from = from_agent,
            agent = agent_id,
            "Delegated message: {}",
            preview(&message.message, 50)
        );

        let mut prompt = message.message.clone();
        let others = self.tracker.other_open_delegations(conversation_id, &message.message_id);
        if others > 0 {
            prompt = format!("{}\n\n{}", prompt, pending_note(others));
        }

        let settings = self.settings.get().clone();
        let router = MentionRouter::new(&settings);
        let reply = self.invoke(&settings, agent_id, &prompt).await;

        let outcome = self.tracker.record_reply(
            AgentReply {
                conversation_id,
                agent_id,
                text: &reply,
                delegation: Some(message.message_id.as_str()),
            },
            &router,
        )?;
        let spawned = self.apply_outcome(outcome);

        self.queue.complete(claimed)?;
        Ok(spawned)
    }

    /// One backend turn. Failures degrade to a fixed reply.
    async fn invoke(&self, settings: &Settings, agent_id: &str, message: &str) -> String {
        let Some(agent) = settings.agents.get(agent_id) else {
            tracing::warn!(agent = agent_id, "Agent is not configured");
            return format!("Agent @{} is not configured.", agent_id);
        };

        let kind = settings.provider_for(agent);
        let Some(provider) = self.providers.get(&kind) else {
            tracing::error!(agent = agent_id, provider = %kind, "No backend registered for provider");
            return ERROR_REPLY.to_string();
        };

        let model = settings.model_for(agent);
        let working_dir = settings.working_dir_for(agent_id, agent, &self.default_workspace);
        let turn = Turn {
            agent_id,
            model: model.as_deref(),
            working_dir: Some(working_dir.as_path()),
            message,
        };
        let contract = ExecutionContract::from_settings(&settings.queue);

        tracing::debug!(
            agent = agent_id,
            provider = %kind,
            model = model.as_deref().unwrap_or("default"),
            "Invoking {}",
            kind.label()
        );

        match execute_with_contract(provider.as_ref(), &turn, &self.reset, &contract).await {
            Ok(reply) => {
                tracing::info!(agent = agent_id, chars = reply.chars().count(), "Agent replied");
                reply
            }
            Err(e) => {
                tracing::error!(agent = agent_id, provider = %kind, code = %e.code, "Backend error: {}", e.message);
                ERROR_REPLY.to_string()
            }
        }
    }

    fn apply_outcome(&mut self, outcome: ReplyOutcome) -> Vec<String> {
        match outcome {
            ReplyOutcome::Awaiting { delegations, pending } => {
                tracing::debug!(pending, spawned = delegations.len(), "Conversation awaiting replies");

                let mut spawned = Vec::with_capacity(delegations.len());
                for delegation in delegations {
                    match self.queue.enqueue(&delegation) {
                        Ok(path) => {
                            if let Some(name) = path.file_name() {
                                spawned.push(name.to_string_lossy().to_string());
                            }
                        }
                        Err(e) => {
                            tracing::error!(
                                agent = delegation.agent.as_deref().unwrap_or_default(),
                                "Failed to enqueue delegation: {}",
                                e
                            );
                            let conversation_id = delegation.conversation_id.as_deref().unwrap_or_default();
                            if let Some(finalized) = self.tracker.cancel_delegation(conversation_id, &delegation.message_id) {
                                self.deliver(finalized);
                            }
                        }
                    }
                }
                spawned
            }
            ReplyOutcome::Finalized(finalized) => {
                self.deliver(*finalized);
                vec![]
            }
            ReplyOutcome::Duplicate => vec![],
        }
    }

    /// Write the outbound reply, then drop the root file.
    fn deliver(&self, finalized: Finalized) {
        let Finalized {
            mut conversation,
            outbound,
        } = finalized;

        match self.queue.write_outgoing(&outbound) {
            Ok(path) => {
                if let Some(root) = &conversation.root_file {
                    if let Err(e) = self.queue.complete(root) {
                        tracing::warn!("Failed to remove {}: {}", root.name, e);
                    }
                }
                if conversation.state == ConversationState::Finalizing {
                    conversation.state = ConversationState::Done;
                }
                tracing::info!(
                    conversation = %conversation.id,
                    channel = %outbound.channel,
                    state = %conversation.state,
                    "Reply written to {}",
                    path.display()
                );
            }
            Err(e) => {
                conversation.state = ConversationState::Aborted;
                tracing::error!(
                    conversation = %conversation.id,
                    channel = %conversation.channel,
                    message = %preview(&conversation.original_message, 50),
                    "Failed to write reply: {}",
                    e
                );
                if let Some(root) = &conversation.root_file {
                    self.requeue(root);
                }
            }
        }
    }
}

/// Reply addressed straight back to the sender, outside any conversation.
fn direct_reply(message: &InboundMessage, text: &str) -> OutboundMessage {
    OutboundMessage {
        channel: message.channel.clone(),
        sender: message.sender.clone(),
        sender_id: message.sender_id.clone(),
        message: text.to_string(),
        original_message: message.message.clone(),
        timestamp: now_millis(),
        message_id: message.message_id.clone(),
        agent: None,
        files: None,
    }
}
