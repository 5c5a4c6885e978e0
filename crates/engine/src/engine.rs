//! The document engine facade
//!
//! Owns the databases (one per store type), their collections, and the
//! change-stream subscriber registry. All committed state is behind one
//! write lock so a transaction's writes become visible atomically.

use crate::changes::{dispatch, ChangeEvent, ChangeOperation, ChangeStream, Subscriber};
use crate::collection::Collection;
use crate::session::{BufferedWrite, ClientSession};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use tracing::debug;
use treestore_core::{Document, Result, StoreError, StoreType};

type Collections = HashMap<String, Collection>;
type SubscriptionKey = (StoreType, String);

#[derive(Debug)]
pub(crate) struct EngineInner {
    data: RwLock<HashMap<StoreType, Collections>>,
    subscribers: DashMap<SubscriptionKey, Vec<Subscriber>>,
    stream_ids: AtomicU64,
}

/// An embedded document database with sessions and change streams
#[derive(Debug, Clone)]
pub struct DocumentEngine {
    inner: Arc<EngineInner>,
}

impl Default for DocumentEngine {
    fn default() -> Self {
        DocumentEngine::new()
    }
}

impl DocumentEngine {
    /// Create an engine with both store databases, initially empty
    pub fn new() -> Self {
        let mut data = HashMap::new();
        for store in StoreType::all() {
            data.insert(store, Collections::new());
        }
        DocumentEngine {
            inner: Arc::new(EngineInner {
                data: RwLock::new(data),
                subscribers: DashMap::new(),
                stream_ids: AtomicU64::new(0),
            }),
        }
    }

    /// Allocate a session handle bound to this engine
    pub fn start_session(&self) -> ClientSession {
        ClientSession::new(self.clone())
    }

    /// Create a collection if it does not exist
    ///
    /// Collections must exist before a transaction writes to them; the
    /// engine refuses to create collections inside a transaction.
    pub fn create_collection(&self, store: StoreType, name: &str) {
        let mut data = self.inner.data.write();
        data.entry(store)
            .or_default()
            .entry(name.to_string())
            .or_insert_with(Collection::new);
    }

    /// Names of the collections in one store's database
    pub fn list_collection_names(&self, store: StoreType) -> Vec<String> {
        let data = self.inner.data.read();
        data.get(&store)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop all collections of one store's database
    pub fn drop_database(&self, store: StoreType) {
        let mut data = self.inner.data.write();
        if let Some(collections) = data.get_mut(&store) {
            collections.clear();
        }
        debug!(store = %store, "dropped database");
    }

    /// True when the collection exists in the store's database
    pub fn collection_exists(&self, store: StoreType, name: &str) -> bool {
        let data = self.inner.data.read();
        data.get(&store)
            .map(|collections| collections.contains_key(name))
            .unwrap_or(false)
    }

    /// Clone the committed documents of a collection (empty when missing)
    pub(crate) fn snapshot(&self, store: StoreType, collection: &str) -> Vec<Document> {
        let data = self.inner.data.read();
        data.get(&store)
            .and_then(|collections| collections.get(collection))
            .map(Collection::snapshot)
            .unwrap_or_default()
    }

    /// Apply a transaction's buffered writes atomically
    ///
    /// Every write is applied to a staged clone of its collection first;
    /// only when all succeed is the staged state swapped in. Change events
    /// are dispatched while the write lock is still held, so streams see
    /// commits in commit order per collection.
    pub(crate) fn commit(&self, writes: &[BufferedWrite]) -> Result<()> {
        let mut events: Vec<ChangeEvent> = Vec::new();
        {
            let mut data = self.inner.data.write();
            let mut staged: HashMap<SubscriptionKey, Collection> = HashMap::new();

            for write in writes {
                let key = (write.store, write.collection.clone());
                if !staged.contains_key(&key) {
                    let live = data
                        .get(&write.store)
                        .and_then(|collections| collections.get(&write.collection))
                        .ok_or_else(|| {
                            StoreError::Storage(format!(
                                "collection {} does not exist in {} store",
                                write.collection, write.store
                            ))
                        })?;
                    staged.insert(key.clone(), live.clone());
                }
                let collection = staged.get_mut(&key).expect("staged above");
                let outcome = collection.update_one(&write.update, &write.options)?;
                if !outcome.matched && !outcome.created {
                    continue;
                }
                let operation = if outcome.removal {
                    ChangeOperation::Remove
                } else if outcome.created {
                    ChangeOperation::Insert
                } else {
                    ChangeOperation::Update
                };
                events.push(ChangeEvent {
                    operation,
                    store: write.store,
                    collection: write.collection.clone(),
                    full_document: outcome.post_image,
                });
            }

            for ((store, name), collection) in staged {
                if let Some(collections) = data.get_mut(&store) {
                    collections.insert(name, collection);
                }
            }

            // Dispatch is a non-blocking channel send; holding the lock keeps
            // a concurrent commit from slipping its events in between.
            for event in events {
                let key = (event.store, event.collection.clone());
                if let Some(mut subscribers) = self.inner.subscribers.get_mut(&key) {
                    dispatch(&mut subscribers, std::slice::from_ref(&event));
                }
            }
        }
        Ok(())
    }

    /// Open a change stream on one collection of one store
    pub fn watch(&self, store: StoreType, collection: &str) -> ChangeStream {
        let id = self.inner.stream_ids.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = channel();
        self.inner
            .subscribers
            .entry((store, collection.to_string()))
            .or_default()
            .push(Subscriber { id, sender });
        debug!(store = %store, collection, id, "change stream opened");
        ChangeStream::new(id, receiver)
    }

    /// Close a change stream; its receiver sees end-of-stream
    pub fn unwatch(&self, store: StoreType, collection: &str, id: u64) {
        if let Some(mut subscribers) = self
            .inner
            .subscribers
            .get_mut(&(store, collection.to_string()))
        {
            subscribers.retain(|s| s.id != id);
        }
        debug!(store = %store, collection, id, "change stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::{UpdateOp, UpdateOptions};
    use treestore_core::Value;

    fn put_top(session: &mut ClientSession, value: i64) {
        session
            .update_one(
                StoreType::Configuration,
                "coll",
                UpdateOp::Set {
                    field: "m:top".to_string(),
                    value: Value::Int(value),
                },
                UpdateOptions::upsert_with(vec![]),
            )
            .unwrap();
    }

    #[test]
    fn test_collection_lifecycle() {
        let engine = DocumentEngine::new();
        engine.create_collection(StoreType::Configuration, "coll");
        engine.create_collection(StoreType::Configuration, "coll");
        assert_eq!(
            engine.list_collection_names(StoreType::Configuration),
            vec!["coll".to_string()]
        );
        assert!(engine.collection_exists(StoreType::Configuration, "coll"));
        assert!(!engine.collection_exists(StoreType::Operational, "coll"));

        engine.drop_database(StoreType::Configuration);
        assert!(engine
            .list_collection_names(StoreType::Configuration)
            .is_empty());
    }

    #[test]
    fn test_commit_makes_writes_visible() {
        let engine = DocumentEngine::new();
        engine.create_collection(StoreType::Configuration, "coll");

        let mut session = engine.start_session();
        session.start_transaction().unwrap();
        put_top(&mut session, 7);
        session.commit_transaction().unwrap();

        let docs = engine.snapshot(StoreType::Configuration, "coll");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("m:top"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_commit_to_missing_collection_fails() {
        let engine = DocumentEngine::new();
        let mut session = engine.start_session();
        session.start_transaction().unwrap();
        let err = session.update_one(
            StoreType::Configuration,
            "missing",
            UpdateOp::Set {
                field: "f".to_string(),
                value: Value::Int(1),
            },
            UpdateOptions::upsert_with(vec![]),
        );
        assert!(matches!(err, Err(StoreError::Storage(_))));
    }

    #[test]
    fn test_watch_receives_commit_events() {
        let engine = DocumentEngine::new();
        engine.create_collection(StoreType::Configuration, "coll");
        let stream = engine.watch(StoreType::Configuration, "coll");

        let mut session = engine.start_session();
        session.start_transaction().unwrap();
        put_top(&mut session, 1);
        session.commit_transaction().unwrap();

        let event = stream
            .recv_timeout(std::time::Duration::from_secs(1))
            .unwrap();
        assert_eq!(event.operation, ChangeOperation::Insert);
        assert_eq!(event.collection, "coll");
        assert!(event.full_document.is_some());
    }

    #[test]
    fn test_unwatch_ends_stream() {
        let engine = DocumentEngine::new();
        engine.create_collection(StoreType::Configuration, "coll");
        let stream = engine.watch(StoreType::Configuration, "coll");
        engine.unwatch(StoreType::Configuration, "coll", stream.id());
        assert!(stream.recv().is_none());
    }

    #[test]
    fn test_concurrent_commits_dispatch_in_commit_order() {
        let engine = DocumentEngine::new();
        engine.create_collection(StoreType::Configuration, "coll");
        let stream = engine.watch(StoreType::Configuration, "coll");

        let mut handles = Vec::new();
        for _ in 0..4 {
            let engine = engine.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    let mut session = engine.start_session();
                    session.start_transaction().unwrap();
                    session
                        .update_one(
                            StoreType::Configuration,
                            "coll",
                            UpdateOp::Push {
                                field: "items".to_string(),
                                document: Document::from_json_str(r#"{"n": 1}"#).unwrap(),
                            },
                            UpdateOptions::upsert_with(vec![]),
                        )
                        .unwrap();
                    session.commit_transaction().unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Each commit appends one element; post-images must arrive in the
        // order the commits applied, never swapped between threads.
        let mut last = 0;
        for _ in 0..100 {
            let event = stream
                .recv_timeout(std::time::Duration::from_secs(1))
                .unwrap();
            let items = event.full_document.unwrap();
            let len = items.get("items").unwrap().as_array().unwrap().len();
            assert_eq!(len, last + 1);
            last = len;
        }
    }

    #[test]
    fn test_removal_event_has_no_post_image() {
        let engine = DocumentEngine::new();
        engine.create_collection(StoreType::Configuration, "coll");

        let mut session = engine.start_session();
        session.start_transaction().unwrap();
        put_top(&mut session, 1);
        session.commit_transaction().unwrap();

        let stream = engine.watch(StoreType::Configuration, "coll");
        let mut session = engine.start_session();
        session.start_transaction().unwrap();
        session
            .update_one(
                StoreType::Configuration,
                "coll",
                UpdateOp::Unset {
                    field: "m:top".to_string(),
                },
                UpdateOptions::upsert_with(vec![]),
            )
            .unwrap();
        session.commit_transaction().unwrap();

        let event = stream
            .recv_timeout(std::time::Duration::from_secs(1))
            .unwrap();
        assert_eq!(event.operation, ChangeOperation::Remove);
        assert!(event.full_document.is_none());
    }
}
