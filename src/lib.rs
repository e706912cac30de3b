//! TinyRelay library root.

pub mod agent;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod providers;

pub use cli::Commands;
pub use config::{load_settings, Paths, Settings, SettingsStore};
pub use crate::core::{InboundMessage, MentionRouter, OutboundMessage, Queue, QueueProcessor};
pub use error::{Error, Result};
pub use providers::{Provider, ProviderKind};
