//! Recursive merge of stored values
//!
//! Merging combines an incoming value into the stored one under schema
//! guidance: objects merge field by field, keyed lists merge entry by entry
//! on declared key equality, and scalars and leaf-lists are overwritten.
//! Shape disagreements between stored and incoming values resolve in favor
//! of the incoming value.

use treestore_core::value::{Fields, ID_FIELD};
use treestore_core::{Result, SchemaNode, StoreError, Value};

/// Merge `incoming` into `existing` at the given schema node
pub fn merge_values(schema: &SchemaNode, existing: &mut Value, incoming: &Value) -> Result<()> {
    match schema {
        SchemaNode::Container { .. } => match (existing.as_object_mut(), incoming.as_object()) {
            (Some(existing_fields), Some(incoming_fields)) => {
                merge_fields(schema, existing_fields, incoming_fields)
            }
            _ => {
                *existing = incoming.clone();
                Ok(())
            }
        },
        SchemaNode::List { keys, .. } => match (existing.as_array_mut(), incoming.as_array()) {
            (Some(existing_items), Some(incoming_items)) => {
                for item in incoming_items {
                    merge_list_item(schema, keys, existing_items, item)?;
                }
                Ok(())
            }
            _ => {
                *existing = incoming.clone();
                Ok(())
            }
        },
        SchemaNode::Leaf | SchemaNode::LeafList => {
            *existing = incoming.clone();
            Ok(())
        }
        SchemaNode::Choice { .. } => Err(StoreError::SchemaMismatch(
            "a choice node is not directly addressable".to_string(),
        )),
    }
}

/// Merge two list entries' fields under their list's schema
pub fn merge_entry(list_schema: &SchemaNode, existing: &mut Fields, incoming: &Fields) -> Result<()> {
    merge_fields(list_schema, existing, incoming)
}

fn merge_fields(schema: &SchemaNode, existing: &mut Fields, incoming: &Fields) -> Result<()> {
    for (name, incoming_value) in incoming {
        if name == ID_FIELD {
            continue;
        }
        match existing.get_mut(name) {
            Some(existing_value) => {
                let child_schema = schema.find_child(name)?;
                merge_values(child_schema, existing_value, incoming_value)?;
            }
            None => {
                existing.insert(name.clone(), incoming_value.clone());
            }
        }
    }
    Ok(())
}

fn merge_list_item(
    list_schema: &SchemaNode,
    keys: &[String],
    existing_items: &mut Vec<Value>,
    incoming: &Value,
) -> Result<()> {
    let incoming_fields = incoming.as_object().ok_or_else(|| {
        StoreError::SchemaMismatch(format!(
            "list entry must be an object, got {}",
            incoming.type_name()
        ))
    })?;
    let matched = existing_items.iter_mut().find_map(|item| {
        item.as_object_mut()
            .filter(|fields| keys_equal(fields, incoming_fields, keys))
    });
    match matched {
        Some(existing_fields) => merge_fields(list_schema, existing_fields, incoming_fields),
        None => {
            existing_items.push(incoming.clone());
            Ok(())
        }
    }
}

/// True when both entries agree on every declared key field
fn keys_equal(existing: &Fields, incoming: &Fields, keys: &[String]) -> bool {
    keys.iter().all(|key| {
        matches!((existing.get(key), incoming.get(key)), (Some(a), Some(b)) if a == b)
    })
}
