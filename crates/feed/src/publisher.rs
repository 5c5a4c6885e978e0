//! Tree change publication
//!
//! Listeners register for a subtree; a published change is delivered to
//! every listener whose registered path is related to the change path by
//! ancestry in either direction. Listeners run on the publisher's calling
//! thread and must not block.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use treestore_core::{Node, Path, StoreType};

/// What a change did to the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Data was written (created or replaced)
    Write,
    /// Data was deleted
    ///
    /// Never produced by the change feed bridge: the backing engine emits
    /// removal events without a document, and those are dropped.
    Delete,
}

/// One published tree change
#[derive(Debug, Clone)]
pub struct TreeChange {
    /// Store the change happened in
    pub store: StoreType,
    /// Path of the changed subtree
    pub path: Path,
    /// What happened
    pub kind: ChangeKind,
    /// The subtree after the change, when one is available
    pub node: Option<Node>,
}

/// Receives published tree changes
pub trait TreeChangeListener: Send + Sync {
    /// Called once per matching change, in publication order
    fn on_change(&self, change: &TreeChange);
}

struct Subscription {
    id: u64,
    store: StoreType,
    path: Path,
    listener: Arc<dyn TreeChangeListener>,
}

/// Fan-out point for tree changes
#[derive(Clone, Default)]
pub struct TreeChangePublisher {
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
    ids: Arc<AtomicU64>,
}

impl TreeChangePublisher {
    /// Create a publisher with no listeners
    pub fn new() -> Self {
        TreeChangePublisher::default()
    }

    /// Register a listener for the subtree at `path` in one store
    pub fn register(
        &self,
        store: StoreType,
        path: Path,
        listener: Arc<dyn TreeChangeListener>,
    ) -> ListenerRegistration {
        let id = self.ids.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.lock().push(Subscription {
            id,
            store,
            path,
            listener,
        });
        ListenerRegistration {
            publisher: self.clone(),
            id: Some(id),
        }
    }

    /// Deliver a change to every listener of its store related to its path
    ///
    /// A listener registered below the change path still hears about it:
    /// the change carries the whole top-level subtree, which contains the
    /// listener's narrower interest.
    ///
    /// The registry lock is released before any listener runs, so a
    /// listener may register or unregister from inside `on_change`.
    pub fn publish(&self, change: &TreeChange) {
        let matched: Vec<Arc<dyn TreeChangeListener>> = {
            let subscriptions = self.subscriptions.lock();
            subscriptions
                .iter()
                .filter(|subscription| {
                    subscription.store == change.store
                        && (subscription.path.is_ancestor_of(&change.path)
                            || change.path.is_ancestor_of(&subscription.path))
                })
                .map(|subscription| subscription.listener.clone())
                .collect()
        };
        for listener in matched {
            listener.on_change(change);
        }
    }

    /// Number of live registrations
    pub fn listener_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    fn unregister(&self, id: u64) {
        self.subscriptions.lock().retain(|s| s.id != id);
    }
}

impl std::fmt::Debug for TreeChangePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeChangePublisher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle keeping one listener registered; dropping it unregisters
#[derive(Debug)]
pub struct ListenerRegistration {
    publisher: TreeChangePublisher,
    id: Option<u64>,
}

impl ListenerRegistration {
    /// Unregister the listener now
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.publisher.unregister(id);
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.release();
    }
}
