//! Linear undo/redo over full canvas snapshots.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of snapshots retained.
pub const DEFAULT_CAPACITY: usize = 50;

/// Opaque serialized copy of the canvas tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistorySnapshot(String);

impl HistorySnapshot {
    /// Wrap serialized canvas content.
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    /// The serialized content.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the serialized content.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Bounded history with a cursor pointing at the current entry.
///
/// ```text
/// [s0, s1, s2, s3]      push(s4) after two undos
///          ^ cursor  -> [s0, s1, s4]
///                                ^
/// ```
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: VecDeque<HistorySnapshot>,
    cursor: usize,
    capacity: usize,
}

impl HistoryManager {
    /// Create an empty history with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty history retaining at most `capacity` snapshots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    /// Append a snapshot after the cursor, discarding redo entries and
    /// evicting the oldest entries beyond capacity.
    pub fn push(&mut self, snapshot: HistorySnapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        tracing::trace!("History at {}/{}", self.cursor + 1, self.entries.len());
    }

    /// Step back one entry. `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&HistorySnapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward one entry. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&HistorySnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    /// The entry under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&HistorySnapshot> {
        self.entries.get(self.cursor)
    }

    /// Whether an older entry exists.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a newer entry exists.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Drop all entries and start over from `snapshot`.
    pub fn reset(&mut self, snapshot: HistorySnapshot) {
        self.clear();
        self.push(snapshot);
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}
