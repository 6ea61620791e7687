use std::collections::VecDeque;

use log::debug;

use crate::surface::Snapshot;

/// Number of snapshots kept before the oldest is evicted.
pub const HISTORY_CAPACITY: usize = 20;

/// Where the cursor sits relative to the stored snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    /// No snapshots captured yet.
    Empty,
    /// Cursor at the newest snapshot; redo unavailable.
    AtHead,
    /// Cursor behind the newest snapshot; redo available.
    Mid,
}

/// Bounded linear undo/redo stack of surface snapshots.
///
/// Capturing after an undo discards everything past the cursor, so there is
/// never a redo branch to return to.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    entries: VecDeque<Snapshot>,
    /// `None` until the first capture.
    cursor: Option<usize>,
    capacity: usize,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            cursor: None,
            capacity,
        }
    }

    pub fn capture(&mut self, snapshot: Snapshot) {
        match self.cursor {
            Some(cursor) => self.entries.truncate(cursor + 1),
            None => self.entries.clear(),
        }

        self.entries.push_back(snapshot);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = Some(self.entries.len() - 1);
        debug!("History capture: {}/{}", self.entries.len(), self.capacity);
    }

    /// Steps back one snapshot and returns it for restoring.
    /// Returns `None` (and changes nothing) when there is nothing to undo.
    pub fn undo(&mut self) -> Option<Snapshot> {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                self.entries.get(cursor - 1).cloned()
            }
            _ => {
                debug!("Undo ignored: nothing before cursor");
                None
            }
        }
    }

    /// Steps forward one snapshot. Returns `None` when already at the newest.
    pub fn redo(&mut self) -> Option<Snapshot> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.entries.len() => {
                self.cursor = Some(cursor + 1);
                self.entries.get(cursor + 1).cloned()
            }
            _ => {
                debug!("Redo ignored: cursor at newest snapshot");
                None
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.entries.len())
    }

    pub fn state(&self) -> HistoryState {
        match self.cursor {
            None => HistoryState::Empty,
            Some(_) if self.can_redo() => HistoryState::Mid,
            Some(_) => HistoryState::AtHead,
        }
    }

    /// Snapshot currently displayed.
    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor.and_then(|cursor| self.entries.get(cursor))
    }

    pub fn index(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
