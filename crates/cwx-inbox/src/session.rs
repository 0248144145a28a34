//! Transient state of one queue drain.

use cwx_model::NotificationItem;
use serde::{Deserialize, Serialize};

use crate::processor::ItemAction;

/// Session-wide choice that suppresses further per-item prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkAction {
    SkipAll,
    DeleteAll,
}

/// Counters reported to the host when a session ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total: usize,
    pub dispatched: usize,
    pub skipped: usize,
    pub viewed: usize,
    pub deleted: usize,
    pub delete_failures: usize,
    pub canceled: bool,
}

/// One in-progress drain. `index` is 1-based over presented/dispatched
/// items and never exceeds `total`.
pub(crate) struct Session {
    remaining: std::vec::IntoIter<NotificationItem>,
    pub(crate) current: Option<NotificationItem>,
    pub(crate) offered: Vec<ItemAction>,
    pub(crate) paused: bool,
    pub(crate) bulk: Option<BulkAction>,
    pub(crate) index: usize,
    pub(crate) total: usize,
    pub(crate) summary: SessionSummary,
}

impl Session {
    pub(crate) fn new(items: Vec<NotificationItem>) -> Self {
        let total = items.len();
        Self {
            remaining: items.into_iter(),
            current: None,
            offered: Vec::new(),
            paused: false,
            bulk: None,
            index: 0,
            total,
            summary: SessionSummary {
                total,
                ..SessionSummary::default()
            },
        }
    }

    /// Takes the next item, advancing the cursor.
    pub(crate) fn take_next(&mut self) -> Option<NotificationItem> {
        let item = self.remaining.next()?;
        self.index += 1;
        debug_assert!(self.index <= self.total);
        Some(item)
    }

    /// Parks an item for interactive resolution.
    pub(crate) fn present(&mut self, item: NotificationItem, offered: Vec<ItemAction>) {
        self.current = Some(item);
        self.offered = offered;
        self.paused = false;
    }

    pub(crate) fn awaiting_user(&self) -> bool {
        self.current.is_some() && !self.paused
    }

    pub(crate) fn into_summary(mut self, canceled: bool) -> SessionSummary {
        self.summary.canceled = canceled;
        self.summary
    }
}
