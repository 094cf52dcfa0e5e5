//! The poll cursor.

use crate::foundation::Update;

/// Tracks the next update id to request.
///
/// The offset never decreases. After a batch it points one past the highest
/// id seen, so no update is requested twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCursor {
    next_offset: i64,
}

impl PollCursor {
    /// Creates a cursor starting at `initial`.
    pub fn new(initial: i64) -> Self {
        Self {
            next_offset: initial,
        }
    }

    /// The offset for the next fetch.
    pub fn offset(&self) -> i64 {
        self.next_offset
    }

    /// Accounts for a single update id.
    pub fn observe(&mut self, update_id: i64) -> i64 {
        self.next_offset = self.next_offset.max(update_id.saturating_add(1));
        self.next_offset
    }

    /// Accounts for a whole batch. An empty batch leaves the offset unchanged.
    pub fn advance(&mut self, batch: &[Update]) -> i64 {
        if let Some(max_id) = batch.iter().map(Update::id).max() {
            self.observe(max_id);
        }
        self.next_offset
    }
}

impl Default for PollCursor {
    fn default() -> Self {
        Self::new(0)
    }
}
