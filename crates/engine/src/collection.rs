//! A named collection of documents
//!
//! Each collection holds the documents for one schema module in one store.
//! In practice a collection carries a single logical document per top-level
//! entity; updates therefore match with an always-true filter.

use crate::apply::{apply_update, UpdateOutcome};
use crate::pipeline::{run_pipeline, Stage};
use crate::update::{UpdateOp, UpdateOptions};
use treestore_core::{Document, Result};

/// Documents of one collection
#[derive(Debug, Clone, Default)]
pub struct Collection {
    documents: Vec<Document>,
}

impl Collection {
    /// Create an empty collection
    pub fn new() -> Self {
        Collection::default()
    }

    /// Clone the current documents
    pub fn snapshot(&self) -> Vec<Document> {
        self.documents.clone()
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check whether the collection holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Run an aggregation pipeline over the documents
    pub fn aggregate(&self, stages: &[Stage]) -> Vec<Document> {
        run_pipeline(&self.documents, stages)
    }

    /// Apply one update with an always-true match filter
    pub fn update_one(
        &mut self,
        update: &UpdateOp,
        options: &UpdateOptions,
    ) -> Result<UpdateOutcome> {
        apply_update(&mut self.documents, update, options)
    }
}
