//! Client sessions and transactions
//!
//! A session buffers the writes of one transaction and replays them over
//! collection snapshots for reads, so a transaction observes its own
//! uncommitted writes. Nothing touches committed state until commit, which
//! hands the whole buffer to the engine atomically.

use crate::apply::apply_update;
use crate::engine::DocumentEngine;
use crate::pipeline::{run_pipeline, Stage};
use crate::update::{UpdateOp, UpdateOptions};
use tracing::debug;
use treestore_core::{Document, Result, StoreError, StoreType};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session allocated, no transaction started
    Created,
    /// A transaction is in progress
    Active,
    /// The transaction committed
    Committed,
    /// The transaction was aborted
    Aborted,
    /// The session was closed and cannot be reused
    Closed,
}

/// One write buffered inside an active transaction
#[derive(Debug, Clone)]
pub(crate) struct BufferedWrite {
    pub store: StoreType,
    pub collection: String,
    pub update: UpdateOp,
    pub options: UpdateOptions,
}

/// A session holding at most one transaction at a time
#[derive(Debug)]
pub struct ClientSession {
    engine: DocumentEngine,
    state: SessionState,
    buffer: Vec<BufferedWrite>,
}

impl ClientSession {
    pub(crate) fn new(engine: DocumentEngine) -> Self {
        ClientSession {
            engine,
            state: SessionState::Created,
            buffer: Vec::new(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Begin a transaction on a freshly created session
    pub fn start_transaction(&mut self) -> Result<()> {
        match self.state {
            SessionState::Created => {
                self.state = SessionState::Active;
                Ok(())
            }
            other => Err(StoreError::Transaction(format!(
                "cannot start transaction in state {other:?}"
            ))),
        }
    }

    /// Run a pipeline over the collection as this transaction sees it
    ///
    /// The snapshot taken at call time is patched with the transaction's
    /// buffered writes for that collection before the pipeline runs, so the
    /// transaction reads its own writes.
    pub fn aggregate(
        &self,
        store: StoreType,
        collection: &str,
        stages: &[Stage],
    ) -> Result<Vec<Document>> {
        self.require_active()?;
        let mut documents = self.engine.snapshot(store, collection);
        for write in &self.buffer {
            if write.store == store && write.collection == collection {
                apply_update(&mut documents, &write.update, &write.options)?;
            }
        }
        Ok(run_pipeline(&documents, stages))
    }

    /// Buffer one update against an existing collection
    pub fn update_one(
        &mut self,
        store: StoreType,
        collection: &str,
        update: UpdateOp,
        options: UpdateOptions,
    ) -> Result<()> {
        self.require_active()?;
        // Upserting into a missing collection would create it, which is not
        // allowed inside a transaction.
        if !self.engine.collection_exists(store, collection) {
            return Err(StoreError::Storage(format!(
                "collection {collection} does not exist in {store} store"
            )));
        }
        self.buffer.push(BufferedWrite {
            store,
            collection: collection.to_string(),
            update,
            options,
        });
        Ok(())
    }

    /// Commit the buffered writes; all become visible or none do
    pub fn commit_transaction(&mut self) -> Result<()> {
        self.require_active()?;
        self.engine.commit(&self.buffer)?;
        self.buffer.clear();
        self.state = SessionState::Committed;
        debug!("transaction committed");
        Ok(())
    }

    /// Discard the buffered writes; aborting twice is a no-op
    pub fn abort_transaction(&mut self) -> Result<()> {
        match self.state {
            SessionState::Active => {
                self.buffer.clear();
                self.state = SessionState::Aborted;
                debug!("transaction aborted");
                Ok(())
            }
            SessionState::Aborted => Ok(()),
            other => Err(StoreError::Transaction(format!(
                "cannot abort transaction in state {other:?}"
            ))),
        }
    }

    /// Close the session, aborting any active transaction
    pub fn close(&mut self) {
        if self.state == SessionState::Active {
            self.buffer.clear();
        }
        self.state = SessionState::Closed;
    }

    fn require_active(&self) -> Result<()> {
        if self.state == SessionState::Active {
            Ok(())
        } else {
            Err(StoreError::Transaction(format!(
                "no active transaction (state {:?})",
                self.state
            )))
        }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.close();
    }
}
