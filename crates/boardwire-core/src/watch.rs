//! Change notification for UI consumers.
//!
//! A [`ChangeTracker`] is handed to [`BoardDocument::subscribe`] and records
//! one notice per committed batch. Consumers poll it and re-run their
//! queries when something changed.
//!
//! [`BoardDocument::subscribe`]: crate::BoardDocument::subscribe

use loro::EventTriggerKind;
use loro::event::DiffEvent;
use std::sync::{Arc, Mutex, PoisonError};

/// What produced a batch of changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A local commit, undo or redo.
    Local,
    /// Updates imported from a peer.
    Import,
    /// The document was checked out to another version.
    Checkout,
}

impl From<EventTriggerKind> for ChangeOrigin {
    fn from(kind: EventTriggerKind) -> Self {
        match kind {
            EventTriggerKind::Local => ChangeOrigin::Local,
            EventTriggerKind::Import => ChangeOrigin::Import,
            EventTriggerKind::Checkout => ChangeOrigin::Checkout,
        }
    }
}

/// One committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub origin: ChangeOrigin,
    /// Number of CRDT containers (maps, lists) the batch touched.
    pub containers_touched: usize,
}

/// Collects change notices. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    notices: Arc<Mutex<Vec<ChangeNotice>>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_event(&self, event: &DiffEvent<'_>) {
        self.record(ChangeNotice {
            origin: event.triggered_by.into(),
            containers_touched: event.events.len(),
        });
    }

    fn record(&self, notice: ChangeNotice) {
        log::debug!("change recorded: {:?}", notice);
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }

    /// Drain every notice recorded since the last call.
    pub fn take(&self) -> Vec<ChangeNotice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Whether anything changed since the last [`ChangeTracker::take`].
    pub fn is_dirty(&self) -> bool {
        !self.notices.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}
