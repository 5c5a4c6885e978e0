//! Update operations and positional array filters
//!
//! These mirror the update operator surface the compilers target: `$set`,
//! `$unset`, `$push`, `$pull`, plus `arrayFilters` and the upsert flag.
//! A field path may contain `$[placeholder]` segments; each placeholder is
//! bound positionally to one [`ArrayFilter`].

use treestore_core::{Document, Value};

/// A single-document update operation
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Set the field to a value, creating missing intermediate objects
    Set {
        /// Dotted field path, possibly with `$[placeholder]` segments
        field: String,
        /// Value to store
        value: Value,
    },
    /// Remove the field
    Unset {
        /// Dotted field path, possibly with `$[placeholder]` segments
        field: String,
    },
    /// Append a document to the array at the field
    Push {
        /// Dotted field path, possibly with `$[placeholder]` segments
        field: String,
        /// Document to append
        document: Document,
    },
    /// Remove every array element matching the criteria document
    Pull {
        /// Dotted field path, possibly with `$[placeholder]` segments
        field: String,
        /// Field/value pairs an element must all equal to be removed
        criteria: Document,
    },
}

impl UpdateOp {
    /// The field path this operation targets
    pub fn field(&self) -> &str {
        match self {
            UpdateOp::Set { field, .. }
            | UpdateOp::Unset { field }
            | UpdateOp::Push { field, .. }
            | UpdateOp::Pull { field, .. } => field,
        }
    }

    /// True for operations that remove data (unset, pull)
    ///
    /// Removal updates carry no post-image in their change events; this is
    /// the documented reason deletions are not observable via the feed.
    pub fn is_removal(&self) -> bool {
        matches!(self, UpdateOp::Unset { .. } | UpdateOp::Pull { .. })
    }
}

/// Binds one `$[placeholder]` to a key-match condition
///
/// Condition fields are placeholder-qualified (`item0.name`), matching the
/// wire form of the backing protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayFilter {
    /// Placeholder token, e.g. `item0`
    pub placeholder: String,
    /// Conjunction of (placeholder-qualified field, expected value)
    pub conditions: Vec<(String, Value)>,
}

impl ArrayFilter {
    /// Build a filter from a placeholder and its key/value conditions
    pub fn new(
        placeholder: impl Into<String>,
        conditions: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        ArrayFilter {
            placeholder: placeholder.into(),
            conditions: conditions.into_iter().collect(),
        }
    }

    /// Check whether an array element satisfies every condition
    pub fn matches(&self, element: &Value) -> bool {
        let Some(fields) = element.as_object() else {
            return false;
        };
        self.conditions.iter().all(|(qualified, expected)| {
            let key = qualified
                .strip_prefix(self.placeholder.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(qualified.as_str());
            fields.get(key) == Some(expected)
        })
    }
}

/// Options applied to one update operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    /// Create the document when no document matches
    pub upsert: bool,
    /// Positional bindings for `$[placeholder]` segments in the field path
    pub array_filters: Vec<ArrayFilter>,
}

impl UpdateOptions {
    /// Upsert enabled with the given array filters
    pub fn upsert_with(array_filters: Vec<ArrayFilter>) -> Self {
        UpdateOptions {
            upsert: true,
            array_filters,
        }
    }

    /// Find the filter bound to a placeholder
    pub fn filter_for(&self, placeholder: &str) -> Option<&ArrayFilter> {
        self.array_filters
            .iter()
            .find(|f| f.placeholder == placeholder)
    }
}
