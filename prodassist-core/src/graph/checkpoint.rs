//! Per-thread checkpoints held in process memory.

use super::Transcript;
use std::collections::HashMap;
use std::sync::RwLock;

/// Storage for finished transcripts, keyed by conversation thread.
pub trait Checkpointer: Send + Sync {
    fn save(&self, thread_id: &str, transcript: Transcript);

    /// All transcripts of a thread, oldest first.
    fn history(&self, thread_id: &str) -> Vec<Transcript>;

    fn latest(&self, thread_id: &str) -> Option<Transcript> {
        self.history(thread_id).pop()
    }
}

/// Transcripts kept per thread unless configured otherwise.
pub const DEFAULT_THREAD_LIMIT: usize = 50;

/// In-memory checkpointer. Lost when the process exits.
///
/// Each thread keeps at most `limit` transcripts; older ones are dropped.
#[derive(Debug)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, Vec<Transcript>>>,
    limit: usize,
}

impl Default for MemoryCheckpointer {
    fn default() -> Self {
        Self::with_limit(DEFAULT_THREAD_LIMIT)
    }
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn thread_count(&self) -> usize {
        self.threads
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn clear(&self, thread_id: &str) {
        self.threads
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(thread_id);
    }
}

impl Checkpointer for MemoryCheckpointer {
    fn save(&self, thread_id: &str, transcript: Transcript) {
        let mut threads = self
            .threads
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let history = threads.entry(thread_id.to_string()).or_default();
        history.push(transcript);
        if history.len() > self.limit {
            let excess = history.len() - self.limit;
            history.drain(..excess);
        }
    }

    fn history(&self, thread_id: &str) -> Vec<Transcript> {
        self.threads
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }
}
