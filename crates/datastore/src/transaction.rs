//! Transaction handles
//!
//! Every datastore operation runs inside a transaction backed by one engine
//! session. Reads see a snapshot plus the transaction's own writes; writes
//! buffer until commit and become visible atomically. Dropping a handle
//! without committing aborts it.

use crate::store::TreeStore;
use tracing::debug;
use treestore_core::{Node, Path, Result, StoreType};
use treestore_engine::ClientSession;

/// A read-only transaction over a snapshot
#[derive(Debug)]
pub struct ReadTransaction {
    id: String,
    store: TreeStore,
    session: ClientSession,
}

impl ReadTransaction {
    /// Transaction identifier, for diagnostics
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read the node at `path`, or `None` when nothing is stored there
    pub fn read(&self, store: StoreType, path: &Path) -> Result<Option<Node>> {
        self.store.read_in(&self.session, store, path)
    }

    /// Release the transaction's session
    pub fn close(mut self) {
        let _ = self.session.abort_transaction();
    }
}

/// A write-only transaction buffering puts, merges, and deletes
#[derive(Debug)]
pub struct WriteTransaction {
    id: String,
    store: TreeStore,
    session: ClientSession,
}

impl WriteTransaction {
    /// Transaction identifier, for diagnostics
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the value at `path` with `node`
    pub fn put(&mut self, store: StoreType, path: &Path, node: &Node) -> Result<()> {
        self.store.put_in(&mut self.session, store, path, node)
    }

    /// Merge `node` into the value stored at `path`
    pub fn merge(&mut self, store: StoreType, path: &Path, node: &Node) -> Result<()> {
        self.store.merge_in(&mut self.session, store, path, node)
    }

    /// Delete the value at `path`
    pub fn delete(&mut self, store: StoreType, path: &Path) -> Result<()> {
        self.store.delete_in(&mut self.session, store, path)
    }

    /// Commit all buffered writes atomically
    pub fn commit(mut self) -> Result<()> {
        debug!(tx = %self.id, "commit");
        self.session.commit_transaction()
    }

    /// Discard all buffered writes
    pub fn cancel(mut self) -> Result<()> {
        debug!(tx = %self.id, "cancel");
        self.session.abort_transaction()
    }
}

/// A transaction that both reads and writes
///
/// Reads observe the transaction's own uncommitted writes.
#[derive(Debug)]
pub struct ReadWriteTransaction {
    id: String,
    store: TreeStore,
    session: ClientSession,
}

impl ReadWriteTransaction {
    /// Transaction identifier, for diagnostics
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read the node at `path` as this transaction sees it
    pub fn read(&self, store: StoreType, path: &Path) -> Result<Option<Node>> {
        self.store.read_in(&self.session, store, path)
    }

    /// Replace the value at `path` with `node`
    pub fn put(&mut self, store: StoreType, path: &Path, node: &Node) -> Result<()> {
        self.store.put_in(&mut self.session, store, path, node)
    }

    /// Merge `node` into the value stored at `path`
    pub fn merge(&mut self, store: StoreType, path: &Path, node: &Node) -> Result<()> {
        self.store.merge_in(&mut self.session, store, path, node)
    }

    /// Delete the value at `path`
    pub fn delete(&mut self, store: StoreType, path: &Path) -> Result<()> {
        self.store.delete_in(&mut self.session, store, path)
    }

    /// Commit all buffered writes atomically
    pub fn commit(mut self) -> Result<()> {
        debug!(tx = %self.id, "commit");
        self.session.commit_transaction()
    }

    /// Discard all buffered writes
    pub fn cancel(mut self) -> Result<()> {
        debug!(tx = %self.id, "cancel");
        self.session.abort_transaction()
    }
}

impl TreeStore {
    /// Open a read-only transaction
    pub fn new_read_transaction(&self) -> Result<ReadTransaction> {
        let (id, session) = self.open_session()?;
        Ok(ReadTransaction {
            id,
            store: self.clone(),
            session,
        })
    }

    /// Open a write-only transaction
    pub fn new_write_transaction(&self) -> Result<WriteTransaction> {
        let (id, session) = self.open_session()?;
        Ok(WriteTransaction {
            id,
            store: self.clone(),
            session,
        })
    }

    /// Open a transaction for both reading and writing
    pub fn new_read_write_transaction(&self) -> Result<ReadWriteTransaction> {
        let (id, session) = self.open_session()?;
        Ok(ReadWriteTransaction {
            id,
            store: self.clone(),
            session,
        })
    }

    fn open_session(&self) -> Result<(String, ClientSession)> {
        let mut session = self.engine().start_session();
        session.start_transaction()?;
        let id = self.next_tx_id();
        debug!(tx = %id, "transaction opened");
        Ok((id, session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_write_then_read_across_transactions() {
        let store = testing::store();
        let node = testing::top_with_lists(1, 1);

        let mut tx = store.new_write_transaction().unwrap();
        tx.put(StoreType::Configuration, &testing::top_path(), &node)
            .unwrap();
        tx.commit().unwrap();

        let read = store.new_read_transaction().unwrap();
        let stored = read
            .read(StoreType::Configuration, &testing::top_path())
            .unwrap();
        assert_eq!(stored, Some(node));
    }

    #[test]
    fn test_cancelled_writes_are_invisible() {
        let store = testing::store();
        let mut tx = store.new_write_transaction().unwrap();
        tx.put(
            StoreType::Configuration,
            &testing::top_path(),
            &testing::top_with_lists(1, 0),
        )
        .unwrap();
        tx.cancel().unwrap();

        let read = store.new_read_transaction().unwrap();
        assert_eq!(
            read.read(StoreType::Configuration, &testing::top_path())
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_read_write_sees_own_writes() {
        let store = testing::store();
        let mut tx = store.new_read_write_transaction().unwrap();
        tx.put(
            StoreType::Configuration,
            &testing::top_path(),
            &testing::top_with_lists(1, 0),
        )
        .unwrap();
        assert!(tx
            .read(StoreType::Configuration, &testing::top_path())
            .unwrap()
            .is_some());

        // Nothing committed yet: a concurrent reader sees nothing.
        let other = store.new_read_transaction().unwrap();
        assert_eq!(
            other
                .read(StoreType::Configuration, &testing::top_path())
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        let store = testing::store();
        let a = store.new_read_transaction().unwrap();
        let b = store.new_read_transaction().unwrap();
        assert_ne!(a.id(), b.id());
        a.close();
    }

    #[test]
    fn test_stores_are_isolated() {
        let store = testing::store();
        let mut tx = store.new_write_transaction().unwrap();
        tx.put(
            StoreType::Operational,
            &testing::top_path(),
            &testing::top_with_lists(1, 0),
        )
        .unwrap();
        tx.commit().unwrap();

        let read = store.new_read_transaction().unwrap();
        assert!(read
            .read(StoreType::Operational, &testing::top_path())
            .unwrap()
            .is_some());
        assert!(read
            .read(StoreType::Configuration, &testing::top_path())
            .unwrap()
            .is_none());
    }
}
