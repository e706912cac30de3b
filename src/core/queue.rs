//! File-based message queue for TinyRelay.
//!
//! Queue structure:
//! - incoming/  : channel adapters (and delegations) drop messages here
//! - processing/: a message claimed by the processor
//! - outgoing/  : replies ready for channel adapters
//!
//! Moving a file from `incoming` to `processing` is the claim. The rename is
//! atomic, so a file can be claimed once; a crash leaves it in `processing`
//! where startup recovery finds it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Queue directory names
pub const QUEUE_INCOMING: &str = "incoming";
pub const QUEUE_PROCESSING: &str = "processing";
pub const QUEUE_OUTGOING: &str = "outgoing";

/// Suffix given to processing files that could not be parsed.
pub const REJECTED_SUFFIX: &str = "rejected";

/// Current unix time in milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// First `max` characters of a text, for log lines.
pub fn preview(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().nth(max).is_some() {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

fn sanitize_file_part(part: &str) -> String {
    let cleaned: String = part
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// One unit of work, as written by a channel adapter or by a delegation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Channel (e.g., "telegram", "discord", "cli")
    pub channel: String,

    /// Sender display name
    pub sender: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,

    pub message: String,

    /// Unix timestamp (ms)
    pub timestamp: i64,

    pub message_id: String,

    /// Pre-resolved target (agent or team id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,

    /// Set only on agent-to-agent hops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_agent: Option<String>,
}

impl InboundMessage {
    /// Create a new message with current timestamp and a fresh id.
    pub fn new(channel: &str, sender: &str, message: &str) -> Self {
        Self {
            channel: channel.to_string(),
            sender: sender.to_string(),
            sender_id: None,
            message: message.to_string(),
            timestamp: now_millis(),
            message_id: ulid::Ulid::new().to_string(),
            agent: None,
            files: None,
            conversation_id: None,
            from_agent: None,
        }
    }

    /// Whether this message is an agent-to-agent hop.
    pub fn is_delegated(&self) -> bool {
        self.conversation_id.is_some()
    }

    fn file_name(&self) -> String {
        match &self.conversation_id {
            Some(conversation_id) => format!(
                "internal_{}_{}_{}.json",
                sanitize_file_part(conversation_id),
                sanitize_file_part(self.agent.as_deref().unwrap_or("unknown")),
                ulid::Ulid::new()
            ),
            None => format!(
                "{}_{}_{}.json",
                sanitize_file_part(&self.channel),
                sanitize_file_part(&self.message_id),
                now_millis()
            ),
        }
    }
}

/// Reply record read by channel adapters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub channel: String,
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub message: String,
    pub original_message: String,
    pub timestamp: i64,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

impl OutboundMessage {
    fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            sanitize_file_part(&self.channel),
            sanitize_file_part(&self.message_id),
            self.timestamp
        )
    }
}

/// A pending file in `incoming`.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// A file this process moved into `processing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedFile {
    pub name: String,
    pub path: PathBuf,
}

/// Queue operations over one queue root.
#[derive(Debug, Clone)]
pub struct Queue {
    incoming: PathBuf,
    processing: PathBuf,
    outgoing: PathBuf,
}

impl Queue {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            incoming: root.join(QUEUE_INCOMING),
            processing: root.join(QUEUE_PROCESSING),
            outgoing: root.join(QUEUE_OUTGOING),
        }
    }

    pub fn incoming_dir(&self) -> &Path {
        &self.incoming
    }

    pub fn processing_dir(&self) -> &Path {
        &self.processing
    }

    pub fn outgoing_dir(&self) -> &Path {
        &self.outgoing
    }

    /// Ensure all queue directories exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.incoming, &self.processing, &self.outgoing] {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
                tracing::debug!("Created queue directory: {}", dir.display());
            }
        }
        Ok(())
    }

    /// Files in one queue directory, oldest modification time first.
    pub fn list(&self, subdir: &str) -> Result<Vec<QueueEntry>> {
        let dir = match subdir {
            QUEUE_INCOMING => &self.incoming,
            QUEUE_PROCESSING => &self.processing,
            QUEUE_OUTGOING => &self.outgoing,
            other => return Err(Error::Queue(format!("Unknown queue directory: {}", other))),
        };
        let mut entries = list_json(dir)?;
        entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    /// Pending files, oldest modification time first.
    pub fn list_incoming(&self) -> Result<Vec<QueueEntry>> {
        self.list(QUEUE_INCOMING)
    }

    /// Move a file from `incoming` into `processing`.
    pub fn claim(&self, name: &str) -> Result<ClaimedFile> {
        let src = self.incoming.join(name);
        let dst = self.processing.join(name);

        match fs::rename(&src, &dst) {
            Ok(()) => {
                tracing::debug!("Claimed {}", name);
                Ok(ClaimedFile {
                    name: name.to_string(),
                    path: dst,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound && !src.exists() => {
                Err(Error::ClaimConflict(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse a claimed file.
    pub fn read(&self, claimed: &ClaimedFile) -> Result<InboundMessage> {
        let content = fs::read_to_string(&claimed.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Drop a processing file once its work is durably done.
    pub fn complete(&self, claimed: &ClaimedFile) -> Result<()> {
        remove_if_exists(&claimed.path)
    }

    /// Put a claimed file back into `incoming` for the next poll.
    pub fn release(&self, claimed: &ClaimedFile) -> Result<()> {
        fs::rename(&claimed.path, self.incoming.join(&claimed.name))?;
        tracing::debug!("Returned {} to incoming", claimed.name);
        Ok(())
    }

    /// Park an unreadable file in `processing` under a name nothing picks up.
    pub fn reject(&self, claimed: &ClaimedFile) -> Result<PathBuf> {
        let dst = self
            .processing
            .join(format!("{}.{}", claimed.name, REJECTED_SUFFIX));
        fs::rename(&claimed.path, &dst)?;
        Ok(dst)
    }

    /// Enqueue a message to the incoming queue.
    pub fn enqueue(&self, message: &InboundMessage) -> Result<PathBuf> {
        let path = self.incoming.join(message.file_name());
        write_atomic(&path, &serde_json::to_vec_pretty(message)?)?;
        tracing::debug!("Enqueued message {} to incoming", message.message_id);
        Ok(path)
    }

    /// Write a reply for channel adapters.
    pub fn write_outgoing(&self, message: &OutboundMessage) -> Result<PathBuf> {
        let path = self.outgoing.join(message.file_name());
        write_atomic(&path, &serde_json::to_vec_pretty(message)?)?;
        Ok(path)
    }

    /// Parse every reply waiting in `outgoing`.
    pub fn outgoing(&self) -> Result<Vec<OutboundMessage>> {
        let mut replies = Vec::new();
        for entry in list_json(&self.outgoing)? {
            let content = fs::read_to_string(&entry.path)?;
            match serde_json::from_str::<OutboundMessage>(&content) {
                Ok(reply) => replies.push(reply),
                Err(e) => tracing::warn!("Skipping unreadable outgoing file {}: {}", entry.name, e),
            }
        }
        replies.sort_by_key(|r| r.timestamp);
        Ok(replies)
    }

    /// Get queue statistics.
    pub fn stats(&self) -> Result<QueueStats> {
        let incoming = list_json(&self.incoming)?.len();
        let processing = list_json(&self.processing)?.len();
        let outgoing = list_json(&self.outgoing)?.len();

        Ok(QueueStats {
            incoming,
            processing,
            outgoing,
            total: incoming + processing + outgoing,
        })
    }

    /// Move files left in `processing` by a previous run back to `incoming`.
    pub fn recover_orphaned(&self) -> Result<usize> {
        self.ensure_dirs()?;

        let mut recovered = 0;
        for entry in list_json(&self.processing)? {
            match fs::rename(&entry.path, self.incoming.join(&entry.name)) {
                Ok(()) => {
                    tracing::info!("Recovered orphaned message: {}", entry.name);
                    recovered += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to recover orphaned message {}: {}", entry.name, e);
                }
            }
        }

        Ok(recovered)
    }
}

fn list_json(dir: &Path) -> Result<Vec<QueueEntry>> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        // A file can vanish between read_dir and metadata.
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        entries.push(QueueEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            path,
            modified,
        });
    }
    Ok(entries)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Write to a hidden temp file, fsync, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Queue(format!("{} has no parent directory", path.display())))?;
    fs::create_dir_all(dir)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{}.tmp", name));

    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    Ok(())
}

/// Queue statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub incoming: usize,
    pub processing: usize,
    pub outgoing: usize,
    pub total: usize,
}

impl std::fmt::Display for QueueStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Queue Stats:")?;
        writeln!(f, "  Incoming:   {}", self.incoming)?;
        writeln!(f, "  Processing: {}", self.processing)?;
        writeln!(f, "  Outgoing:   {}", self.outgoing)?;
        write!(f, "  Total:      {}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn queue() -> (TempDir, Queue) {
        let dir = TempDir::new().unwrap();
        let queue = Queue::new(dir.path().join("queue"));
        queue.ensure_dirs().unwrap();
        (dir, queue)
    }

    #[test]
    fn test_message_json_shape() {
        let raw = r#"{
            "channel": "telegram",
            "sender": "Alice",
            "senderId": "42",
            "message": "@coder fix bug",
            "timestamp": 1700000000000,
            "messageId": "m1"
        }"#;
        let msg: InboundMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.sender_id.as_deref(), Some("42"));
        assert_eq!(msg.message_id, "m1");
        assert!(!msg.is_delegated());

        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("conversationId").is_none());
        assert_eq!(value["senderId"], "42");
    }

    #[test]
    fn test_new_message() {
        let msg = InboundMessage::new("cli", "Alice", "Hello world");
        assert_eq!(msg.channel, "cli");
        assert!(msg.timestamp > 0);
        assert!(!msg.message_id.is_empty());
    }

    #[test]
    fn incoming_is_ordered_by_mtime() {
        let (_dir, queue) = queue();
        let base = SystemTime::now() - Duration::from_secs(60);

        let mut paths = Vec::new();
        for (i, text) in ["first", "second", "third"].iter().enumerate() {
            let path = queue.enqueue(&InboundMessage::new("cli", "a", text)).unwrap();
            paths.push((path, base + Duration::from_secs(10 * (3 - i as u64))));
        }
        // Reverse the natural order: "third" becomes the oldest.
        for (path, time) in &paths {
            fs::File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(*time)
                .unwrap();
        }

        let listed = queue.list_incoming().unwrap();
        let texts: Vec<String> = listed
            .iter()
            .map(|e| {
                let content = fs::read_to_string(&e.path).unwrap();
                serde_json::from_str::<InboundMessage>(&content).unwrap().message
            })
            .collect();
        assert_eq!(texts, vec!["third", "second", "first"]);
    }

    #[test]
    fn claim_is_exclusive() {
        let (_dir, queue) = queue();
        let path = queue.enqueue(&InboundMessage::new("cli", "a", "hi")).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();

        let claimed = queue.claim(&name).unwrap();
        assert!(claimed.path.exists());
        assert!(!path.exists());

        assert!(matches!(queue.claim(&name), Err(Error::ClaimConflict(_))));
    }

    #[test]
    fn release_and_complete() {
        let (_dir, queue) = queue();
        let path = queue.enqueue(&InboundMessage::new("cli", "a", "hi")).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();

        let claimed = queue.claim(&name).unwrap();
        queue.release(&claimed).unwrap();
        assert!(path.exists());

        let claimed = queue.claim(&name).unwrap();
        assert_eq!(queue.read(&claimed).unwrap().message, "hi");
        queue.complete(&claimed).unwrap();
        // Completing twice is harmless.
        queue.complete(&claimed).unwrap();
        assert_eq!(queue.stats().unwrap().total, 0);
    }

    #[test]
    fn rejected_files_are_not_listed_or_recovered() {
        let (_dir, queue) = queue();
        fs::write(queue.incoming_dir().join("bad.json"), "{ nope").unwrap();

        let claimed = queue.claim("bad.json").unwrap();
        assert!(queue.read(&claimed).is_err());
        let parked = queue.reject(&claimed).unwrap();
        assert!(parked.exists());

        assert_eq!(queue.recover_orphaned().unwrap(), 0);
        assert!(queue.list_incoming().unwrap().is_empty());
    }

    #[test]
    fn recover_orphaned_moves_processing_back() {
        let (_dir, queue) = queue();
        let path = queue.enqueue(&InboundMessage::new("cli", "a", "hi")).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        queue.claim(&name).unwrap();

        assert_eq!(queue.recover_orphaned().unwrap(), 1);
        assert!(path.exists());
    }

    #[test]
    fn outgoing_round_trip() {
        let (_dir, queue) = queue();
        let reply = OutboundMessage {
            channel: "telegram".to_string(),
            sender: "Alice".to_string(),
            sender_id: None,
            message: "done".to_string(),
            original_message: "@coder fix bug".to_string(),
            timestamp: 1700000000001,
            message_id: "m1".to_string(),
            agent: Some("coder".to_string()),
            files: None,
        };

        let path = queue.write_outgoing(&reply).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "telegram_m1_1700000000001.json"
        );

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["originalMessage"], "@coder fix bug");
        assert_eq!(queue.outgoing().unwrap(), vec![reply]);

        // No temp files are left behind.
        let leftovers = fs::read_dir(queue.outgoing_dir()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn delegated_file_names_are_unique() {
        let mut msg = InboundMessage::new("telegram", "Alice", "review");
        msg.conversation_id = Some("conv_m1".to_string());
        msg.agent = Some("reviewer".to_string());

        let a = msg.file_name();
        let b = msg.file_name();
        assert!(a.starts_with("internal_conv_m1_reviewer_"));
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_subdir_is_an_error() {
        let (_dir, queue) = queue();
        assert!(queue.list(QUEUE_OUTGOING).unwrap().is_empty());
        assert!(matches!(queue.list("archive"), Err(Error::Queue(_))));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("line one\nline two", 8), "line one...");
    }
}
