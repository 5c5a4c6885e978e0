//! Operation compilers
//!
//! Turn a path (and for writes, an encoded payload) into the pipeline or
//! update operation the engine executes. A write always upserts so the
//! first write to a module's collection creates its document; a delete
//! never upserts and is therefore idempotent.

use crate::codec;
use crate::mapper::{map_read, map_update};
use treestore_core::{Document, Node, Path, Result, SchemaContext, Value};
use treestore_engine::{Stage, UpdateOp, UpdateOptions};

/// A compiled read: the pipeline to run over the module's collection
#[derive(Debug, Clone)]
pub struct ReadQuery {
    /// Unwind/match stages followed by a single projection
    pub stages: Vec<Stage>,
}

/// Compile a read of `path`
pub fn compile_read(schema: &SchemaContext, path: &Path) -> Result<ReadQuery> {
    let plan = map_read(schema, path)?;
    let mut stages = plan.stages;
    stages.push(Stage::Project {
        computed_name: plan.simple_name,
        source_field: plan.field_path,
    });
    Ok(ReadQuery { stages })
}

/// Compile a put of `node` at `path`
///
/// A list-entry path appends the encoded entry to its list; any other path
/// replaces the value at its field. Appending does not check for an entry
/// with the same keys, so putting an existing entry stores a duplicate.
pub fn compile_put(
    schema: &SchemaContext,
    path: &Path,
    node: &Node,
) -> Result<(UpdateOp, UpdateOptions)> {
    let payload = codec::encode(schema, path, node)?;
    let plan = map_update(schema, path)?;
    let options = UpdateOptions::upsert_with(plan.array_filters);
    let update = if plan.entry_keys.is_some() {
        UpdateOp::Push {
            field: plan.field_path,
            document: Document::from_value(payload)?,
        }
    } else {
        UpdateOp::Set {
            field: plan.field_path,
            value: payload,
        }
    };
    Ok((update, options))
}

/// Compile a delete of `path`
///
/// A list-entry path pulls entries matching the path's keys; any other path
/// unsets its field. Both are no-ops when the target is absent.
pub fn compile_delete(schema: &SchemaContext, path: &Path) -> Result<(UpdateOp, UpdateOptions)> {
    let plan = map_update(schema, path)?;
    let options = UpdateOptions {
        upsert: false,
        array_filters: plan.array_filters,
    };
    let update = match plan.entry_keys {
        Some(criteria) => UpdateOp::Pull {
            field: plan.field_path,
            criteria,
        },
        None => UpdateOp::Unset {
            field: plan.field_path,
        },
    };
    Ok((update, options))
}

/// Compile the write-back of a merged list entry
///
/// The stored entry is replaced wholesale: the old entry is pulled by its
/// keys and the merged entry pushed, both inside the caller's transaction.
pub fn compile_entry_replace(
    schema: &SchemaContext,
    path: &Path,
    merged: Value,
) -> Result<[(UpdateOp, UpdateOptions); 2]> {
    let plan = map_update(schema, path)?;
    let criteria = plan.entry_keys.ok_or_else(|| {
        treestore_core::StoreError::Unsupported(
            "entry replacement requires a list-entry path".to_string(),
        )
    })?;
    let pull = (
        UpdateOp::Pull {
            field: plan.field_path.clone(),
            criteria,
        },
        UpdateOptions {
            upsert: false,
            array_filters: plan.array_filters.clone(),
        },
    );
    let push = (
        UpdateOp::Push {
            field: plan.field_path,
            document: Document::from_value(merged)?,
        },
        UpdateOptions::upsert_with(plan.array_filters),
    );
    Ok([pull, push])
}
