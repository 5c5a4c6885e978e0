//! Schema-driven conversion between tree nodes and document values
//!
//! Encoding walks the node and the schema together, failing closed on any
//! child name the schema does not declare (directly or through a choice
//! case). List entries are validated to carry every declared key field.
//!
//! Anchoring differs by path shape: a top-level path stores its value under
//! the module-qualified field name, a list-entry path stores the bare entry
//! object, and any other path stores the value under its local name.

use treestore_core::value::{Fields, ID_FIELD};
use treestore_core::{
    Document, Module, Node, Path, Result, SchemaContext, SchemaNode, StoreError, Value,
};

/// Encode the payload of a write at `path`
///
/// For a list-entry path the result is the entry object itself; otherwise it
/// is the value to store at the path's field.
pub fn encode(schema: &SchemaContext, path: &Path, node: &Node) -> Result<Value> {
    let node_schema = schema.resolve(path)?;
    if path.is_list_entry() {
        encode_entry(node_schema, node)
    } else {
        encode_node(node_schema, node)
    }
}

/// Encode a node against its schema
pub fn encode_node(schema: &SchemaNode, node: &Node) -> Result<Value> {
    match (schema, node) {
        (SchemaNode::Leaf, Node::Leaf(value)) => Ok(value.clone()),
        (SchemaNode::LeafList, Node::LeafList(values)) => Ok(Value::Array(values.clone())),
        (SchemaNode::Container { .. }, Node::Container(children)) => {
            let mut fields = Fields::new();
            for (name, child) in children {
                let child_schema = schema.find_child(name)?;
                fields.insert(name.clone(), encode_node(child_schema, child)?);
            }
            Ok(Value::Object(fields))
        }
        (SchemaNode::List { .. }, Node::List(entries)) => {
            let mut items = Vec::with_capacity(entries.len());
            for entry in entries {
                items.push(encode_entry(schema, entry)?);
            }
            Ok(Value::Array(items))
        }
        (SchemaNode::Choice { .. }, _) => Err(StoreError::SchemaMismatch(
            "a choice node is not directly addressable".to_string(),
        )),
        (expected, actual) => Err(StoreError::SchemaMismatch(format!(
            "expected {} payload, got {}",
            expected.kind(),
            actual.kind()
        ))),
    }
}

/// Encode one list entry, validating declared key presence
fn encode_entry(list_schema: &SchemaNode, entry: &Node) -> Result<Value> {
    let keys = list_schema.list_keys().ok_or_else(|| {
        StoreError::SchemaMismatch(format!(
            "{} node does not hold list entries",
            list_schema.kind()
        ))
    })?;
    let children = entry.as_container().ok_or_else(|| {
        StoreError::SchemaMismatch(format!("list entry must be a container, got {}", entry.kind()))
    })?;

    let mut fields = Fields::new();
    for (name, child) in children {
        let child_schema = list_schema.find_child(name)?;
        fields.insert(name.clone(), encode_node(child_schema, child)?);
    }
    for key in keys {
        if !fields.contains_key(key) {
            return Err(StoreError::SchemaMismatch(format!(
                "list entry is missing key {}",
                key
            )));
        }
    }
    Ok(Value::Object(fields))
}

/// Decode the projected result of a read at `path`
///
/// The projection yields a single user field holding the value at the path's
/// field. For a list-entry path the unwind already replaced the list with
/// the selected element; a singleton array is unwrapped for uniformity.
pub fn decode_read(schema: &SchemaContext, path: &Path, doc: &Document) -> Result<Node> {
    let (_, value) = doc.single_user_field()?;
    let node_schema = schema.resolve(path)?;
    if path.is_list_entry() {
        let value = match value {
            Value::Array(items) if items.len() == 1 => &items[0],
            other => other,
        };
        decode_entry(node_schema, value)
    } else {
        decode_node(node_schema, value)
    }
}

/// Decode a full stored document into the top-level path and node it holds
///
/// Used by the change feed: the collection name identifies the module, and
/// the document's single user field identifies the top-level entity.
pub fn decode_document(
    schema: &SchemaContext,
    collection: &str,
    doc: &Document,
) -> Result<(Path, Node)> {
    let module = schema.module_by_collection(collection)?;
    let (field, value) = doc.single_user_field()?;
    let local_name = top_local_name(module, field)?;
    let node_schema = module.children.get(local_name).ok_or_else(|| {
        StoreError::SchemaMismatch(format!(
            "module {} declares no top-level node {}",
            module.name, local_name
        ))
    })?;
    let node = decode_node(node_schema, value)?;
    Ok((Path::top(module.name.clone(), local_name), node))
}

fn top_local_name<'a>(module: &Module, field: &'a str) -> Result<&'a str> {
    field
        .strip_prefix(module.name.as_str())
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or_else(|| {
            StoreError::Codec(format!(
                "field {} is not qualified by module {}",
                field, module.name
            ))
        })
}

/// Decode a stored value against its schema
pub fn decode_node(schema: &SchemaNode, value: &Value) -> Result<Node> {
    match (schema, value) {
        (SchemaNode::Leaf, Value::Array(_)) | (SchemaNode::Leaf, Value::Object(_)) => {
            Err(StoreError::Codec("leaf value must be a scalar".to_string()))
        }
        (SchemaNode::Leaf, scalar) => Ok(Node::Leaf(scalar.clone())),
        (SchemaNode::LeafList, Value::Array(items)) => Ok(Node::LeafList(items.clone())),
        (SchemaNode::Container { .. }, Value::Object(fields)) => {
            let mut children = std::collections::BTreeMap::new();
            for (name, child_value) in fields {
                if name == ID_FIELD {
                    continue;
                }
                let child_schema = schema.find_child(name)?;
                children.insert(name.clone(), decode_node(child_schema, child_value)?);
            }
            Ok(Node::Container(children))
        }
        (SchemaNode::List { .. }, Value::Array(items)) => {
            let mut entries = Vec::with_capacity(items.len());
            for item in items {
                entries.push(decode_entry(schema, item)?);
            }
            Ok(Node::List(entries))
        }
        (SchemaNode::Choice { .. }, _) => Err(StoreError::SchemaMismatch(
            "a choice node is not directly addressable".to_string(),
        )),
        (expected, actual) => Err(StoreError::Codec(format!(
            "expected {} value, got {}",
            expected.kind(),
            actual.type_name()
        ))),
    }
}

/// Decode one stored list element as an entry container
fn decode_entry(list_schema: &SchemaNode, value: &Value) -> Result<Node> {
    let fields = value.as_object().ok_or_else(|| {
        StoreError::Codec(format!(
            "list element must be an object, got {}",
            value.type_name()
        ))
    })?;
    let mut children = std::collections::BTreeMap::new();
    for (name, child_value) in fields {
        if name == ID_FIELD {
            continue;
        }
        let child_schema = list_schema.find_child(name)?;
        children.insert(name.clone(), decode_node(child_schema, child_value)?);
    }
    Ok(Node::Container(children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_encode_top_level_container() {
        let node = testing::top_with_lists(2, 1);
        let value = encode(&testing::schema(), &testing::top_path(), &node).unwrap();
        let fields = value.as_object().unwrap();
        let list = fields["top-level-list"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(
            list[0].as_object().unwrap()["name"],
            Value::String("test-0".to_string())
        );
    }

    #[test]
    fn test_encode_entry_is_bare_object() {
        let entry = testing::list_entry("test-0");
        let value = encode(&testing::schema(), &testing::entry_path("test-0"), &entry).unwrap();
        assert_eq!(
            value.as_object().unwrap()["name"],
            Value::String("test-0".to_string())
        );
    }

    #[test]
    fn test_encode_rejects_missing_key() {
        let entry = Node::container([("type", Node::leaf("test-type"))]);
        let path = testing::entry_path("test-0")
            .node("nested-list")
            .entry([("name", "nest-test-0")]);
        let err = encode(&testing::schema(), &path, &entry);
        assert!(matches!(err, Err(StoreError::SchemaMismatch(_))));
    }

    #[test]
    fn test_encode_resolves_choice_case_children() {
        // "simple" is declared under a case of choice-in-list.
        let entry = Node::container([
            ("name", Node::leaf("test-0")),
            ("simple", Node::leaf("simple-value")),
        ]);
        let value = encode(&testing::schema(), &testing::entry_path("test-0"), &entry).unwrap();
        assert_eq!(
            value.as_object().unwrap()["simple"],
            Value::String("simple-value".to_string())
        );
    }

    #[test]
    fn test_encode_fails_closed_on_unknown_child() {
        let entry = Node::container([
            ("name", Node::leaf("test-0")),
            ("no-such-leaf", Node::leaf(1)),
        ]);
        let err = encode(&testing::schema(), &testing::entry_path("test-0"), &entry);
        assert!(matches!(err, Err(StoreError::SchemaMismatch(_))));
    }

    #[test]
    fn test_decode_read_entry() {
        let mut doc = Document::new();
        doc.insert(
            "top-level-list",
            Value::Object(
                [
                    ("name".to_string(), Value::String("test-0".to_string())),
                    ("simple".to_string(), Value::String("s".to_string())),
                ]
                .into_iter()
                .collect(),
            ),
        );
        let node = decode_read(&testing::schema(), &testing::entry_path("test-0"), &doc).unwrap();
        assert_eq!(
            node.child("name").unwrap().as_leaf(),
            Some(&Value::String("test-0".to_string()))
        );
        assert_eq!(
            node.child("simple").unwrap().as_leaf(),
            Some(&Value::String("s".to_string()))
        );
    }

    #[test]
    fn test_roundtrip_top_level() {
        let node = testing::top_with_lists(2, 2);
        let schema = testing::schema();
        let value = encode(&schema, &testing::top_path(), &node).unwrap();

        let mut doc = Document::new();
        doc.insert("test-model:top", value);
        let decoded = decode_read(&schema, &testing::top_path(), &doc).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_decode_document_for_feed() {
        let schema = testing::schema();
        let value = encode(
            &schema,
            &testing::top_path(),
            &testing::top_with_lists(1, 0),
        )
        .unwrap();
        let mut doc = Document::new();
        doc.insert(ID_FIELD, Value::String("x".to_string()));
        doc.insert("test-model:top", value);

        let (path, node) = decode_document(
            &schema,
            &testing::schema()
                .find_module("test-model")
                .unwrap()
                .collection_name(),
            &doc,
        )
        .unwrap();
        assert_eq!(path, testing::top_path());
        assert!(node.child("top-level-list").is_some());
    }

    #[test]
    fn test_decode_rejects_shape_mismatch() {
        let err = decode_node(&SchemaNode::LeafList, &Value::Int(3));
        assert!(matches!(err, Err(StoreError::Codec(_))));
    }
}
