//! Conversation reset signal.
//!
//! A single slot that any caller can fill and that the next backend invocation
//! empties. The slot is an in-process flag plus an optional sentinel file, so
//! both `tinyrelay reset` (another process) and in-process callers can request
//! a fresh backend session.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct ResetSignal {
    requested: AtomicBool,
    marker: Option<PathBuf>,
}

impl ResetSignal {
    /// In-process signal only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that also honours a sentinel file at `marker`.
    pub fn with_marker(marker: impl Into<PathBuf>) -> Self {
        Self {
            requested: AtomicBool::new(false),
            marker: Some(marker.into()),
        }
    }

    /// Request a reset for the next invocation.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Write the sentinel file so a running processor picks the reset up.
    pub fn request_via_marker(&self) -> std::io::Result<()> {
        match &self.marker {
            Some(marker) => {
                if let Some(parent) = marker.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(marker, "reset\n")
            }
            None => {
                self.request();
                Ok(())
            }
        }
    }

    /// Whether a reset is waiting, without consuming it.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst) || self.marker.as_deref().is_some_and(Path::exists)
    }

    /// Take the pending reset, if any.
    ///
    /// Both halves are cleared atomically: the flag with a swap, the marker
    /// with a single `remove_file`, so a request racing with this call is
    /// either consumed here or left for the next invocation, never both.
    pub fn consume(&self) -> bool {
        let flagged = self.requested.swap(false, Ordering::SeqCst);

        let marked = match &self.marker {
            Some(marker) => match std::fs::remove_file(marker) {
                Ok(()) => true,
                Err(e) if e.kind() == ErrorKind::NotFound => false,
                Err(e) => {
                    tracing::warn!(marker = %marker.display(), "Failed to clear reset marker: {}", e);
                    false
                }
            },
            None => false,
        };

        if flagged || marked {
            tracing::info!("Reset requested, starting a fresh backend session");
        }
        flagged || marked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn flag_is_consumed_once() {
        let signal = ResetSignal::new();
        assert!(!signal.consume());

        signal.request();
        assert!(signal.is_requested());
        assert!(signal.consume());
        assert!(!signal.consume());
        assert!(!signal.is_requested());
    }

    #[test]
    fn marker_file_is_deleted_on_consumption() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("reset_flag");
        let signal = ResetSignal::with_marker(&marker);

        signal.request_via_marker().unwrap();
        assert!(marker.exists());
        assert!(signal.is_requested());

        assert!(signal.consume());
        assert!(!marker.exists());
        assert!(!signal.consume());
    }

    #[test]
    fn flag_and_marker_count_as_one_reset() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("reset_flag");
        let signal = ResetSignal::with_marker(&marker);

        signal.request();
        std::fs::write(&marker, "reset\n").unwrap();

        assert!(signal.consume());
        assert!(!signal.is_requested());
        assert!(!signal.consume());
    }
}
