//! CLI commands for TinyRelay using clap.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{load_settings, Paths, HOME_ENV};
use crate::core::queue::{preview, QUEUE_INCOMING, QUEUE_OUTGOING, QUEUE_PROCESSING};
use crate::core::{InboundMessage, Queue, QueueProcessor};
use crate::providers::ResetSignal;

/// TinyRelay - file-queue processor for multi-agent AI conversations.
#[derive(Parser)]
#[command(name = "tinyrelay")]
#[command(version)]
#[command(about = "TinyRelay - route channel messages to CLI AI agents", long_about = None)]
pub struct Commands {
    /// Home directory (settings.json, queue/, logs/)
    #[arg(long, global = true, env = HOME_ENV)]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the queue processor until Ctrl-C
    Start,

    /// Send a message
    Send {
        /// Message to send
        message: String,

        /// Channel (default: cli)
        #[arg(long, default_value = "cli")]
        channel: String,

        /// Sender name (default: cli)
        #[arg(long, default_value = "cli")]
        sender: String,

        /// Target agent or team, skipping text routing
        #[arg(long)]
        agent: Option<String>,
    },

    /// Queue operations
    Queue {
        /// Queue action
        #[command(subcommand)]
        action: QueueCommand,
    },

    /// Start the next backend session fresh
    Reset,

    /// List configured agents
    #[command(alias = "a")]
    Agents,

    /// List configured teams
    #[command(alias = "t")]
    Teams,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Show queue statistics
    Stats,

    /// List messages in a queue directory
    List {
        #[arg(value_enum, default_value_t = QueueDir::Incoming)]
        dir: QueueDir,
    },

    /// Move files left in processing back to incoming
    Recover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueDir {
    Incoming,
    Processing,
    Outgoing,
}

impl QueueDir {
    fn subdir(self) -> &'static str {
        match self {
            QueueDir::Incoming => QUEUE_INCOMING,
            QueueDir::Processing => QUEUE_PROCESSING,
            QueueDir::Outgoing => QUEUE_OUTGOING,
        }
    }
}

impl Commands {
    pub fn paths(&self) -> Result<Paths> {
        Ok(Paths::resolve(self.home.clone())?)
    }

    /// Whether the command runs long enough to need the log file.
    pub fn logs_to_file(&self) -> bool {
        matches!(self.command, Command::Start)
    }

    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        let paths = self.paths()?;
        match &self.command {
            Command::Start => cmd_start(&paths).await,
            Command::Send {
                message,
                channel,
                sender,
                agent,
            } => cmd_send(&paths, message, channel, sender, agent.as_deref()),
            Command::Queue { action } => cmd_queue(&paths, action),
            Command::Reset => cmd_reset(&paths),
            Command::Agents => cmd_agents(&paths),
            Command::Teams => cmd_teams(&paths),
        }
    }
}

async fn cmd_start(paths: &Paths) -> Result<()> {
    let mut processor = QueueProcessor::new(paths)
        .with_context(|| format!("Failed to start queue processor in {}", paths.home.display()))?;
    processor.run().await?;
    Ok(())
}

fn cmd_send(paths: &Paths, message: &str, channel: &str, sender: &str, agent: Option<&str>) -> Result<()> {
    let queue = Queue::new(&paths.queue_dir);
    queue.ensure_dirs()?;

    let mut msg = InboundMessage::new(channel, sender, message);
    msg.agent = agent.map(str::to_string);
    let path = queue.enqueue(&msg)?;

    println!("Enqueued message {} ({})", msg.message_id, path.display());
    Ok(())
}

fn cmd_queue(paths: &Paths, action: &QueueCommand) -> Result<()> {
    let queue = Queue::new(&paths.queue_dir);

    match action {
        QueueCommand::Stats => {
            println!("{}", queue.stats()?);
        }
        QueueCommand::List { dir } => {
            let entries = queue.list(dir.subdir())?;
            println!("{} messages ({}):", dir.subdir(), entries.len());
            for entry in entries {
                let content = std::fs::read_to_string(&entry.path)?;
                match serde_json::from_str::<serde_json::Value>(&content) {
                    Ok(value) => {
                        let field = |key: &str| value.get(key).and_then(|v| v.as_str()).unwrap_or("?").to_string();
                        println!(
                            "  {}: [{}] {} -> {}",
                            entry.name,
                            field("channel"),
                            field("sender"),
                            preview(&field("message"), 50)
                        );
                    }
                    Err(_) => println!("  {}: <unreadable>", entry.name),
                }
            }
        }
        QueueCommand::Recover => {
            let recovered = queue.recover_orphaned()?;
            println!("Recovered {} orphaned messages", recovered);
        }
    }

    Ok(())
}

fn cmd_reset(paths: &Paths) -> Result<()> {
    ResetSignal::with_marker(&paths.reset_marker)
        .request_via_marker()
        .with_context(|| format!("Failed to write {}", paths.reset_marker.display()))?;
    println!("Reset requested: the next invocation starts a fresh session");
    Ok(())
}

fn cmd_agents(paths: &Paths) -> Result<()> {
    let settings = load_settings(&paths.settings_file)?;

    let mut ids: Vec<&String> = settings.agents.keys().collect();
    ids.sort();

    println!("Agents:");
    for id in ids {
        let agent = &settings.agents[id];
        let provider = settings.provider_for(agent);
        let model = settings.model_for(agent).unwrap_or_else(|| "default".to_string());
        println!(
            "  @{}: {} ({}/{}) in {}",
            id,
            agent.name.as_deref().unwrap_or(id),
            provider,
            model,
            settings.working_dir_for(id, agent, &paths.workspace).display()
        );
    }
    Ok(())
}

fn cmd_teams(paths: &Paths) -> Result<()> {
    let settings = load_settings(&paths.settings_file)?;

    let mut ids: Vec<&String> = settings.teams.keys().collect();
    ids.sort();

    println!("Teams:");
    for id in ids {
        let team = &settings.teams[id];
        println!(
            "  @{}: {} - leader @{} - {:?}",
            id,
            team.name,
            team.leader_agent.as_deref().unwrap_or("-"),
            team.agents
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_with_options() {
        let args = Commands::try_parse_from([
            "tinyrelay",
            "--home",
            "/tmp/relay",
            "send",
            "hello",
            "--channel",
            "discord",
            "--agent",
            "coder",
        ])
        .unwrap();

        assert_eq!(args.home, Some(PathBuf::from("/tmp/relay")));
        match args.command {
            Command::Send {
                message,
                channel,
                sender,
                agent,
            } => {
                assert_eq!(message, "hello");
                assert_eq!(channel, "discord");
                assert_eq!(sender, "cli");
                assert_eq!(agent.as_deref(), Some("coder"));
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn queue_list_defaults_to_incoming() {
        let args = Commands::try_parse_from(["tinyrelay", "queue", "list"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Queue {
                action: QueueCommand::List { dir: QueueDir::Incoming }
            }
        ));
        assert!(!args.logs_to_file());
    }

    #[test]
    fn send_then_list() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = Paths::new(dir.path());

        cmd_send(&paths, "@coder hi", "cli", "me", None).unwrap();
        let queue = Queue::new(&paths.queue_dir);
        assert_eq!(queue.stats().unwrap().incoming, 1);
        cmd_queue(&paths, &QueueCommand::List { dir: QueueDir::Incoming }).unwrap();
    }

    #[test]
    fn reset_writes_the_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = Paths::new(dir.path());

        cmd_reset(&paths).unwrap();
        assert!(paths.reset_marker.exists());
        assert!(ResetSignal::with_marker(&paths.reset_marker).consume());
    }
}
