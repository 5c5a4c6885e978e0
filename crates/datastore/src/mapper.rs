//! Path-to-field-path mapping
//!
//! Translates a structured [`Path`] into the dotted field paths, pipeline
//! stages, and positional array filters the document engine understands.
//! Read and update translations differ on keyed steps: a read narrows with
//! an unwind/match pair and leaves the field path on the list itself, while
//! an update appends a `$[itemN]` placeholder for every keyed step that is
//! not the final one.

use treestore_core::{Document, Path, Result, SchemaContext, Step};
use treestore_engine::{ArrayFilter, Stage};

/// Read translation of a path
#[derive(Debug, Clone)]
pub struct ReadPlan {
    /// Unwind/match stages narrowing to the addressed node
    pub stages: Vec<Stage>,
    /// Dotted field path of the addressed node
    pub field_path: String,
    /// Local name the read result is projected under
    pub simple_name: String,
}

/// Update translation of a path
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    /// Dotted field path, with `$[itemN]` segments for intermediate keyed steps
    pub field_path: String,
    /// Positional filters binding each `$[itemN]` to its key conditions
    pub array_filters: Vec<ArrayFilter>,
    /// Key criteria of the final step, when it selects a list entry
    pub entry_keys: Option<Document>,
}

/// Map a path for reading
///
/// Every keyed step contributes an unwind of the list field followed by a
/// match on the entry's key fields. Keyed steps do not extend the field
/// path: after the unwind the selected element sits at the list field.
pub fn map_read(schema: &SchemaContext, path: &Path) -> Result<ReadPlan> {
    let mut field_path = schema.top_field_name(path)?;
    let mut stages = Vec::new();

    for step in &path.steps()[1..] {
        match step {
            Step::Node(name) => {
                field_path.push('.');
                field_path.push_str(name);
            }
            Step::ListEntry(keys) => {
                stages.push(Stage::Unwind {
                    field: field_path.clone(),
                });
                stages.push(Stage::Match {
                    conditions: keys
                        .iter()
                        .map(|(key, value)| (format!("{}.{}", field_path, key), value.clone()))
                        .collect(),
                });
            }
            Step::Top { .. } => unreachable!("top step only occurs first"),
        }
    }

    let simple_name = field_path
        .rsplit('.')
        .next()
        .unwrap_or(field_path.as_str())
        .to_string();
    Ok(ReadPlan {
        stages,
        field_path,
        simple_name,
    })
}

/// Map a path for updating
///
/// Intermediate keyed steps become `$[itemN]` placeholders with one array
/// filter each; a final keyed step becomes key criteria for push/pull and
/// appends nothing to the field path.
pub fn map_update(schema: &SchemaContext, path: &Path) -> Result<UpdatePlan> {
    let mut field_path = schema.top_field_name(path)?;
    let mut array_filters = Vec::new();
    let mut entry_keys = None;
    let mut index = 0usize;

    let rest = &path.steps()[1..];
    for (position, step) in rest.iter().enumerate() {
        match step {
            Step::Node(name) => {
                field_path.push('.');
                field_path.push_str(name);
            }
            Step::ListEntry(keys) => {
                if position + 1 == rest.len() {
                    let mut criteria = Document::new();
                    for (key, value) in keys {
                        criteria.insert(key.clone(), value.clone());
                    }
                    entry_keys = Some(criteria);
                } else {
                    let placeholder = format!("item{}", index);
                    field_path.push_str(".$[");
                    field_path.push_str(&placeholder);
                    field_path.push(']');
                    array_filters.push(ArrayFilter::new(
                        placeholder.clone(),
                        keys.iter().map(|(key, value)| {
                            (format!("{}.{}", placeholder, key), value.clone())
                        }),
                    ));
                }
                index += 1;
            }
            Step::Top { .. } => unreachable!("top step only occurs first"),
        }
    }

    Ok(UpdatePlan {
        field_path,
        array_filters,
        entry_keys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use treestore_core::{Path, Value};

    fn nested_path() -> Path {
        testing::top_path()
            .node("top-level-list")
            .entry([("name", "test-0")])
            .node("nested-list")
            .entry([("name", "nest-test-0")])
    }

    #[test]
    fn test_read_top_level() {
        let plan = map_read(&testing::schema(), &testing::top_path()).unwrap();
        assert!(plan.stages.is_empty());
        assert_eq!(plan.field_path, "test-model:top");
        assert_eq!(plan.simple_name, "test-model:top");
    }

    #[test]
    fn test_read_keyed_steps_emit_unwind_match() {
        let plan = map_read(&testing::schema(), &nested_path()).unwrap();
        assert_eq!(
            plan.stages,
            vec![
                Stage::Unwind {
                    field: "test-model:top.top-level-list".to_string(),
                },
                Stage::Match {
                    conditions: vec![(
                        "test-model:top.top-level-list.name".to_string(),
                        Value::String("test-0".to_string()),
                    )],
                },
                Stage::Unwind {
                    field: "test-model:top.top-level-list.nested-list".to_string(),
                },
                Stage::Match {
                    conditions: vec![(
                        "test-model:top.top-level-list.nested-list.name".to_string(),
                        Value::String("nest-test-0".to_string()),
                    )],
                },
            ]
        );
        // Keyed selection leaves the field path on the list itself.
        assert_eq!(plan.field_path, "test-model:top.top-level-list.nested-list");
        assert_eq!(plan.simple_name, "nested-list");
    }

    #[test]
    fn test_update_final_entry_becomes_criteria() {
        let plan = map_update(&testing::schema(), &testing::entry_path("test-0")).unwrap();
        assert_eq!(plan.field_path, "test-model:top.top-level-list");
        assert!(plan.array_filters.is_empty());
        let criteria = plan.entry_keys.unwrap();
        assert_eq!(
            criteria.get("name"),
            Some(&Value::String("test-0".to_string()))
        );
    }

    #[test]
    fn test_update_intermediate_entry_becomes_placeholder() {
        let plan = map_update(&testing::schema(), &nested_path()).unwrap();
        assert_eq!(
            plan.field_path,
            "test-model:top.top-level-list.$[item0].nested-list"
        );
        assert_eq!(plan.array_filters.len(), 1);
        assert_eq!(plan.array_filters[0].placeholder, "item0");
        assert_eq!(
            plan.array_filters[0].conditions,
            vec![(
                "item0.name".to_string(),
                Value::String("test-0".to_string())
            )]
        );
        assert!(plan.entry_keys.is_some());
    }

    #[test]
    fn test_update_node_path_has_no_criteria() {
        let path = testing::top_path().node("top-level-leaf-list");
        let plan = map_update(&testing::schema(), &path).unwrap();
        assert_eq!(plan.field_path, "test-model:top.top-level-leaf-list");
        assert!(plan.entry_keys.is_none());
        assert!(plan.array_filters.is_empty());
    }

    #[test]
    fn test_unknown_module_is_rejected() {
        let path = Path::top("no-such-module", "top");
        assert!(map_read(&testing::schema(), &path).is_err());
        assert!(map_update(&testing::schema(), &path).is_err());
    }
}
