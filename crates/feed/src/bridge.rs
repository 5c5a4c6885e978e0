//! Bridge from engine change streams to tree change listeners
//!
//! One engine subscription is held per (store, collection) for as long as
//! at least one listener needs it; a delivery thread drains the stream,
//! decodes each event's document against the schema, and publishes the
//! resulting top-level subtree.
//!
//! Events carrying no document are dropped. Removal events never carry one,
//! so deletions are not observable through the feed; they surface only as
//! the next write of the affected top-level document.

use crate::publisher::{
    ChangeKind, ListenerRegistration, TreeChange, TreeChangeListener, TreeChangePublisher,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};
use treestore_core::{Path, Result, SchemaContext, StoreType};
use treestore_datastore::codec::decode_document;
use treestore_engine::DocumentEngine;

type SubscriptionKey = (StoreType, String);

struct Subscription {
    stream_id: u64,
    listeners: usize,
}

struct BridgeInner {
    engine: DocumentEngine,
    schema: Arc<SchemaContext>,
    publisher: TreeChangePublisher,
    subscriptions: Mutex<HashMap<SubscriptionKey, Subscription>>,
}

/// Connects engine change streams to registered tree change listeners
#[derive(Clone)]
pub struct ChangeFeedBridge {
    inner: Arc<BridgeInner>,
}

impl ChangeFeedBridge {
    /// Create a bridge over an engine and the schema its data follows
    pub fn new(engine: DocumentEngine, schema: Arc<SchemaContext>) -> Self {
        ChangeFeedBridge {
            inner: Arc::new(BridgeInner {
                engine,
                schema,
                publisher: TreeChangePublisher::new(),
                subscriptions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a listener for the subtree at `path` in one store
    ///
    /// The first listener on a module's collection opens the engine stream;
    /// later listeners share it. The returned registration keeps both the
    /// listener and its share of the stream alive.
    pub fn register_listener(
        &self,
        store: StoreType,
        path: Path,
        listener: Arc<dyn TreeChangeListener>,
    ) -> Result<FeedRegistration> {
        let collection = self.inner.schema.module_for(&path)?.collection_name();
        let key = (store, collection.clone());

        {
            let mut subscriptions = self.inner.subscriptions.lock();
            match subscriptions.get_mut(&key) {
                Some(subscription) => subscription.listeners += 1,
                None => {
                    let stream = self.inner.engine.watch(store, &collection);
                    let stream_id = stream.id();
                    subscriptions.insert(
                        key.clone(),
                        Subscription {
                            stream_id,
                            listeners: 1,
                        },
                    );
                    let inner = self.inner.clone();
                    thread::spawn(move || {
                        while let Some(event) = stream.recv() {
                            let Some(doc) = event.full_document else {
                                debug!(
                                    collection = %event.collection,
                                    "change event without document dropped"
                                );
                                continue;
                            };
                            match decode_document(&inner.schema, &event.collection, &doc) {
                                Ok((path, node)) => inner.publisher.publish(&TreeChange {
                                    store: event.store,
                                    path,
                                    kind: ChangeKind::Write,
                                    node: Some(node),
                                }),
                                Err(err) => {
                                    warn!(
                                        collection = %event.collection,
                                        %err,
                                        "undecodable change event dropped"
                                    );
                                }
                            }
                        }
                        debug!("change stream delivery ended");
                    });
                }
            }
        }

        let listener_registration = self.inner.publisher.register(store, path, listener);
        Ok(FeedRegistration {
            bridge: self.clone(),
            key: Some(key),
            listener: Some(listener_registration),
        })
    }

    fn release(&self, key: SubscriptionKey) {
        let mut subscriptions = self.inner.subscriptions.lock();
        let Some(subscription) = subscriptions.get_mut(&key) else {
            return;
        };
        subscription.listeners -= 1;
        if subscription.listeners == 0 {
            let stream_id = subscription.stream_id;
            subscriptions.remove(&key);
            // Dropping the engine-side sender ends the delivery thread.
            self.inner.engine.unwatch(key.0, &key.1, stream_id);
        }
    }

    /// Number of live engine subscriptions
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }
}

impl std::fmt::Debug for ChangeFeedBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeedBridge")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

/// Handle keeping one feed listener and its stream share alive
#[derive(Debug)]
pub struct FeedRegistration {
    bridge: ChangeFeedBridge,
    key: Option<SubscriptionKey>,
    listener: Option<ListenerRegistration>,
}

impl FeedRegistration {
    /// Unregister the listener and release its stream share now
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.close();
        }
        if let Some(key) = self.key.take() {
            self.bridge.release(key);
        }
    }
}

impl Drop for FeedRegistration {
    fn drop(&mut self) {
        self.release();
    }
}
