//! The datastore facade
//!
//! Binds a schema context to a document engine: one collection per module
//! in each store's database, named after the module namespace (and revision
//! when declared). Construction drops the operational database and creates
//! every collection up front, because the engine cannot create collections
//! inside a transaction.

use crate::codec;
use crate::compile::{compile_delete, compile_entry_replace, compile_put, compile_read};
use crate::merge::{merge_entry, merge_values};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use treestore_core::{Node, Path, Result, SchemaContext, StoreType};
use treestore_engine::pipeline::is_empty_result;
use treestore_engine::{ClientSession, DocumentEngine};

/// A schema-described tree datastore over a document engine
#[derive(Debug, Clone)]
pub struct TreeStore {
    engine: DocumentEngine,
    schema: Arc<SchemaContext>,
    tx_ids: Arc<AtomicU64>,
}

impl TreeStore {
    /// Initialize the datastore over an engine
    ///
    /// Operational state does not survive a restart: its database is dropped
    /// before the collections of both stores are created.
    pub fn new(engine: DocumentEngine, schema: SchemaContext) -> Self {
        engine.drop_database(StoreType::Operational);
        for store in StoreType::all() {
            for module in schema.modules() {
                engine.create_collection(store, &module.collection_name());
            }
        }
        info!(modules = schema.modules().len(), "datastore initialized");
        TreeStore {
            engine,
            schema: Arc::new(schema),
            tx_ids: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The schema this datastore serves
    pub fn schema(&self) -> &SchemaContext {
        &self.schema
    }

    /// The backing document engine
    pub fn engine(&self) -> &DocumentEngine {
        &self.engine
    }

    pub(crate) fn next_tx_id(&self) -> String {
        format!("tx-{}", self.tx_ids.fetch_add(1, Ordering::Relaxed))
    }

    fn collection_for(&self, path: &Path) -> Result<String> {
        Ok(self.schema.module_for(path)?.collection_name())
    }

    /// Read the node at `path` as the session's transaction sees it
    pub(crate) fn read_in(
        &self,
        session: &ClientSession,
        store: StoreType,
        path: &Path,
    ) -> Result<Option<Node>> {
        let collection = self.collection_for(path)?;
        let query = compile_read(&self.schema, path)?;
        let results = session.aggregate(store, &collection, &query.stages)?;
        let Some(doc) = results.first() else {
            return Ok(None);
        };
        if is_empty_result(doc) {
            return Ok(None);
        }
        Ok(Some(codec::decode_read(&self.schema, path, doc)?))
    }

    /// Buffer a put of `node` at `path`
    pub(crate) fn put_in(
        &self,
        session: &mut ClientSession,
        store: StoreType,
        path: &Path,
        node: &Node,
    ) -> Result<()> {
        let collection = self.collection_for(path)?;
        let (update, options) = compile_put(&self.schema, path, node)?;
        debug!(%path, store = %store, "put");
        session.update_one(store, &collection, update, options)
    }

    /// Buffer a delete of `path`
    pub(crate) fn delete_in(
        &self,
        session: &mut ClientSession,
        store: StoreType,
        path: &Path,
    ) -> Result<()> {
        let collection = self.collection_for(path)?;
        let (update, options) = compile_delete(&self.schema, path)?;
        debug!(%path, store = %store, "delete");
        session.update_one(store, &collection, update, options)
    }

    /// Buffer a merge of `node` into the stored value at `path`
    ///
    /// A payload the codec rejects is logged and dropped, and a merge into
    /// an absent target is a no-op: merge never creates the target.
    pub(crate) fn merge_in(
        &self,
        session: &mut ClientSession,
        store: StoreType,
        path: &Path,
        node: &Node,
    ) -> Result<()> {
        let incoming = match codec::encode(&self.schema, path, node) {
            Ok(value) => value,
            Err(err) => {
                warn!(%path, %err, "merge payload rejected, nothing merged");
                return Ok(());
            }
        };

        let collection = self.collection_for(path)?;
        let query = compile_read(&self.schema, path)?;
        let results = session.aggregate(store, &collection, &query.stages)?;
        let existing = results
            .first()
            .filter(|doc| !is_empty_result(doc))
            .and_then(|doc| doc.single_user_field().ok())
            .map(|(_, value)| value.clone());
        let Some(mut merged) = existing else {
            debug!(%path, store = %store, "merge target absent, nothing merged");
            return Ok(());
        };

        let node_schema = self.schema.resolve(path)?;
        debug!(%path, store = %store, "merge");

        if path.is_list_entry() {
            // Both sides are single entry objects here, not lists; merge
            // their fields under the list's schema.
            let incoming_fields = incoming.as_object().ok_or_else(|| {
                treestore_core::StoreError::Codec("encoded entry is not an object".to_string())
            })?;
            let existing_fields = merged.as_object_mut().ok_or_else(|| {
                treestore_core::StoreError::Codec("stored entry is not an object".to_string())
            })?;
            merge_entry(node_schema, existing_fields, incoming_fields)?;

            // Replace the stored entry with the merged one atomically with
            // respect to the surrounding transaction.
            for (update, options) in compile_entry_replace(&self.schema, path, merged)? {
                session.update_one(store, &collection, update, options)?;
            }
            Ok(())
        } else {
            merge_values(node_schema, &mut merged, &incoming)?;
            let plan = crate::mapper::map_update(&self.schema, path)?;
            session.update_one(
                store,
                &collection,
                treestore_engine::UpdateOp::Set {
                    field: plan.field_path,
                    value: merged,
                },
                treestore_engine::UpdateOptions::upsert_with(plan.array_filters),
            )
        }
    }
}
