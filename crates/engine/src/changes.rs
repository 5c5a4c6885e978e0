//! Per-collection change streams
//!
//! Committed writes surface as change events on the collection they touched,
//! in commit order. Insert and update events carry the full resulting
//! document (update-lookup semantics); removal-shaped updates (unset, pull)
//! carry none, because the backing protocol cannot report which array
//! elements were removed.

use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;
use treestore_core::{Document, StoreType};

/// Kind of a raw change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOperation {
    /// The logical document was created
    Insert,
    /// The logical document was modified with a post-image available
    Update,
    /// Data was removed; no post-image is available
    Remove,
}

/// One raw change event from a collection's stream
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// What happened
    pub operation: ChangeOperation,
    /// Store the collection belongs to
    pub store: StoreType,
    /// Collection name (module namespace, optionally `@revision`)
    pub collection: String,
    /// Full resulting document, when the event kind provides one
    pub full_document: Option<Document>,
}

/// Receiving side of one change-stream subscription
#[derive(Debug)]
pub struct ChangeStream {
    id: u64,
    receiver: Receiver<ChangeEvent>,
}

impl ChangeStream {
    pub(crate) fn new(id: u64, receiver: Receiver<ChangeEvent>) -> Self {
        ChangeStream { id, receiver }
    }

    /// Identifier used to tear the subscription down
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the next event; `None` when the stream has ended
    pub fn recv(&self) -> Option<ChangeEvent> {
        self.receiver.recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// Sender half kept by the engine per subscription
#[derive(Debug)]
pub(crate) struct Subscriber {
    pub id: u64,
    pub sender: Sender<ChangeEvent>,
}

/// Deliver events to subscribers, pruning those whose stream was dropped
pub(crate) fn dispatch(subscribers: &mut Vec<Subscriber>, events: &[ChangeEvent]) {
    subscribers.retain(|subscriber| {
        events
            .iter()
            .all(|event| subscriber.sender.send(event.clone()).is_ok())
    });
}
