//! Core module - Queue, routing, and conversation management.
//!
//! This module contains the heart of TinyRelay's message processing:
//! - File-based message queue
//! - Agent and team routing
//! - Conversation tracking
//! - The sequential queue processor

pub mod conversation;
pub mod processor;
pub mod queue;
pub mod routing;

pub use conversation::{Conversation, ConversationState, ConversationTracker};
pub use processor::QueueProcessor;
pub use queue::{InboundMessage, OutboundMessage, Queue, QueueStats};
pub use routing::MentionRouter;
