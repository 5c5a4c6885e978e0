//! Aggregation pipeline stages and execution
//!
//! The read compiler emits a pipeline of unwind/match/project stages; this
//! module executes them over a collection snapshot. Execution is strictly
//! in stage order over cloned documents.

use treestore_core::value::{Fields, ID_FIELD};
use treestore_core::{Document, Value};

/// One aggregation stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Replace the array at `field` with one output document per element
    ///
    /// Documents missing the field are dropped; a non-array value passes
    /// through as a single document.
    Unwind {
        /// Dotted field path of the array to unwind
        field: String,
    },
    /// Keep only documents where every (field, value) condition holds
    Match {
        /// Conjunction of dotted field path and expected value
        conditions: Vec<(String, Value)>,
    },
    /// Project to exactly one computed field, excluding `_id`
    ///
    /// When the source field does not exist in a document the projection
    /// yields an empty document, not a missing result.
    Project {
        /// Local name the computed field is renamed to
        computed_name: String,
        /// Dotted field path the value is taken from
        source_field: String,
    },
}

/// Run a pipeline over a snapshot of documents
pub fn run_pipeline(documents: &[Document], stages: &[Stage]) -> Vec<Document> {
    let mut current: Vec<Document> = documents.to_vec();
    for stage in stages {
        current = match stage {
            Stage::Unwind { field } => current
                .into_iter()
                .flat_map(|doc| unwind_document(doc, field))
                .collect(),
            Stage::Match { conditions } => current
                .into_iter()
                .filter(|doc| {
                    conditions
                        .iter()
                        .all(|(field, expected)| doc.get_path(field) == Some(expected))
                })
                .collect(),
            Stage::Project {
                computed_name,
                source_field,
            } => current
                .into_iter()
                .map(|doc| {
                    let mut projected = Document::new();
                    if let Some(value) = doc.get_path(source_field) {
                        projected.insert(computed_name.clone(), value.clone());
                    }
                    projected
                })
                .collect(),
        };
    }
    current
}

fn unwind_document(doc: Document, field: &str) -> Vec<Document> {
    match doc.get_path(field) {
        None => Vec::new(),
        Some(Value::Array(items)) => {
            let items = items.clone();
            items
                .into_iter()
                .map(|element| {
                    let mut clone = doc.clone();
                    replace_path(clone.fields_mut(), field, element);
                    clone
                })
                .collect()
        }
        Some(_) => vec![doc],
    }
}

/// Replace the value at an existing dotted path of plain field names
fn replace_path(fields: &mut Fields, field_path: &str, value: Value) {
    let mut segments = field_path.split('.').peekable();
    let mut current = fields;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        match current.get_mut(segment).and_then(Value::as_object_mut) {
            Some(child) => current = child,
            // get_path already resolved this path; nothing to replace.
            None => return,
        }
    }
}

/// True when a projected result carries no user fields
///
/// Projection of a missing field yields `{}`; callers treat that as
/// "not found", the same as an empty pipeline result.
pub fn is_empty_result(doc: &Document) -> bool {
    doc.iter().all(|(name, _)| name == ID_FIELD)
}
