//! Field-path interpreter for update operations
//!
//! Resolves dotted field paths with `$[placeholder]` segments against a
//! document, applying one update operator at the terminal field. Placeholder
//! segments fan out over every array element matching the bound filter;
//! intermediate objects are created only for operations that add data.

use crate::update::{UpdateOp, UpdateOptions};
use treestore_core::value::{Fields, ID_FIELD};
use treestore_core::{Document, Result, StoreError, Value};
use uuid::Uuid;

/// One segment of a parsed field path
#[derive(Debug, Clone, PartialEq)]
pub enum PathSeg {
    /// A plain field name
    Field(String),
    /// A `$[placeholder]` array-filter segment
    Filtered(String),
}

/// Parse a dotted field path into segments
///
/// The first and last segments must be plain field names; filtered segments
/// select within the array stored at the preceding field.
pub fn parse_field_path(field_path: &str) -> Result<Vec<PathSeg>> {
    let segments: Vec<PathSeg> = field_path
        .split('.')
        .map(|seg| {
            if let Some(inner) = seg.strip_prefix("$[").and_then(|s| s.strip_suffix(']')) {
                PathSeg::Filtered(inner.to_string())
            } else {
                PathSeg::Field(seg.to_string())
            }
        })
        .collect();

    match (segments.first(), segments.last()) {
        (Some(PathSeg::Field(_)), Some(PathSeg::Field(_))) => Ok(segments),
        _ => Err(StoreError::Storage(format!(
            "field path must begin and end with a field name: {}",
            field_path
        ))),
    }
}

/// What an update did to the matched document
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// A document matched (or was created) and the operator was applied
    pub matched: bool,
    /// The document was created by upsert
    pub created: bool,
    /// The operation removes data (unset/pull)
    pub removal: bool,
    /// Full document after the update, for change-event delivery
    pub post_image: Option<Document>,
}

/// Apply one update against a collection's documents
///
/// The match filter is always-true: the first document is the target (each
/// collection holds one logical document per top-level entity). With upsert,
/// a missing document is created with a fresh `_id` first.
pub fn apply_update(
    documents: &mut Vec<Document>,
    update: &UpdateOp,
    options: &UpdateOptions,
) -> Result<UpdateOutcome> {
    let mut created = false;
    if documents.is_empty() {
        if !options.upsert {
            return Ok(UpdateOutcome {
                matched: false,
                created: false,
                removal: update.is_removal(),
                post_image: None,
            });
        }
        let mut doc = Document::new();
        doc.insert(ID_FIELD, Value::String(Uuid::new_v4().to_string()));
        documents.push(doc);
        created = true;
    }

    let segments = parse_field_path(update.field())?;
    let doc = &mut documents[0];

    match update {
        UpdateOp::Set { value, .. } => {
            apply_at(doc.fields_mut(), &segments, options, true, &mut |fields,
                                                                       name| {
                fields.insert(name.to_string(), value.clone());
                Ok(())
            })?;
        }
        UpdateOp::Unset { .. } => {
            apply_at(doc.fields_mut(), &segments, options, false, &mut |fields,
                                                                        name| {
                fields.remove(name);
                Ok(())
            })?;
        }
        UpdateOp::Push { document, .. } => {
            let element = document.to_value();
            apply_at(doc.fields_mut(), &segments, options, true, &mut |fields,
                                                                       name| {
                match fields.get_mut(name) {
                    None => {
                        fields.insert(name.to_string(), Value::Array(vec![element.clone()]));
                        Ok(())
                    }
                    Some(Value::Array(items)) => {
                        items.push(element.clone());
                        Ok(())
                    }
                    Some(other) => Err(StoreError::Storage(format!(
                        "cannot push into {} field {}",
                        other.type_name(),
                        name
                    ))),
                }
            })?;
        }
        UpdateOp::Pull { criteria, .. } => {
            apply_at(doc.fields_mut(), &segments, options, false, &mut |fields,
                                                                        name| {
                if let Some(Value::Array(items)) = fields.get_mut(name) {
                    items.retain(|element| !matches_criteria(element, criteria));
                }
                Ok(())
            })?;
        }
    }

    let removal = update.is_removal();
    let post_image = if removal { None } else { Some(doc.clone()) };
    Ok(UpdateOutcome {
        matched: true,
        created,
        removal,
        post_image,
    })
}

/// Check an array element against a pull criteria document
fn matches_criteria(element: &Value, criteria: &Document) -> bool {
    let Some(fields) = element.as_object() else {
        return false;
    };
    criteria
        .iter()
        .all(|(key, expected)| fields.get(key) == Some(expected))
}

/// Walk the segments and invoke `op` on every terminal (parent, field) pair
///
/// `create` controls whether missing intermediate objects are materialized;
/// removal operations never create structure they would then delete from.
fn apply_at(
    fields: &mut Fields,
    segments: &[PathSeg],
    options: &UpdateOptions,
    create: bool,
    op: &mut dyn FnMut(&mut Fields, &str) -> Result<()>,
) -> Result<()> {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };
    let name = match first {
        PathSeg::Field(name) => name,
        PathSeg::Filtered(placeholder) => {
            // parse_field_path guarantees a leading field name; nested
            // filtered segments are handled below where the array lives.
            return Err(StoreError::Storage(format!(
                "misplaced array filter ${}",
                placeholder
            )));
        }
    };

    if rest.is_empty() {
        return op(fields, name);
    }

    match rest.first() {
        Some(PathSeg::Filtered(placeholder)) => {
            let filter = options.filter_for(placeholder).ok_or_else(|| {
                StoreError::Storage(format!("no array filter bound to {}", placeholder))
            })?;
            let Some(value) = fields.get_mut(name) else {
                if create {
                    return Err(StoreError::Storage(format!(
                        "array field {} must exist to apply a filtered update",
                        name
                    )));
                }
                // Nothing to remove; the filter applies to zero elements.
                return Ok(());
            };
            let items = value.as_array_mut().ok_or_else(|| {
                StoreError::Storage(format!("field {} is not an array", name))
            })?;
            for element in items.iter_mut() {
                if filter.matches(element) {
                    let child = element.as_object_mut().ok_or_else(|| {
                        StoreError::Storage(format!(
                            "array element under {} is not a document",
                            name
                        ))
                    })?;
                    apply_at(child, &rest[1..], options, create, op)?;
                }
            }
            Ok(())
        }
        Some(PathSeg::Field(_)) => {
            if !fields.contains_key(name) {
                if !create {
                    return Ok(());
                }
                fields.insert(name.to_string(), Value::Object(Fields::new()));
            }
            let child = fields
                .get_mut(name)
                .and_then(Value::as_object_mut)
                .ok_or_else(|| {
                    StoreError::Storage(format!("cannot traverse non-object field {}", name))
                })?;
            apply_at(child, rest, options, create, op)
        }
        None => unreachable!("rest checked non-empty"),
    }
}
