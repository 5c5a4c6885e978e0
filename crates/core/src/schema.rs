//! Externally supplied schema model
//!
//! The schema is produced by a model compiler outside this system; this
//! module only represents it and answers the lookups the datastore needs:
//! resolving a path to its schema node, finding a child by name (descending
//! through choice cases, fail-closed), and naming collections after modules.

use crate::error::{Result, StoreError};
use crate::path::Path;
use std::collections::BTreeMap;

/// Separator between a module namespace and its revision in collection names
pub const REVISION_SEPARATOR: char = '@';

/// Separator between module name and local name in top-level field names
pub const MODULE_SEPARATOR: char = ':';

/// Map of child name to schema node
pub type SchemaChildren = BTreeMap<String, SchemaNode>;

/// Schema description of one field
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// A singleton container of named children
    Container {
        /// Declared children by local name
        children: SchemaChildren,
    },
    /// A keyed list of entries
    List {
        /// Declared key field names, in order
        keys: Vec<String>,
        /// Declared entry children by local name
        children: SchemaChildren,
    },
    /// A scalar leaf
    Leaf,
    /// A collection of scalar leaves
    LeafList,
    /// A field whose shape is one of several declared cases
    ///
    /// The actual child name is not statically known; it is resolved by
    /// scanning all cases for a matching child name.
    Choice {
        /// Case name to the children that case declares
        cases: BTreeMap<String, SchemaChildren>,
    },
}

impl SchemaNode {
    /// Build a container node
    pub fn container<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = (S, SchemaNode)>,
        S: Into<String>,
    {
        SchemaNode::Container {
            children: children.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Build a list node with its declared key fields
    pub fn list<K, I, S>(keys: K, children: I) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        I: IntoIterator<Item = (S, SchemaNode)>,
        S: Into<String>,
    {
        SchemaNode::List {
            keys: keys.into_iter().map(Into::into).collect(),
            children: children.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Build a choice node from (case name, case children) pairs
    pub fn choice<I, S, C, T>(cases: I) -> Self
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: IntoIterator<Item = (T, SchemaNode)>,
        T: Into<String>,
    {
        SchemaNode::Choice {
            cases: cases
                .into_iter()
                .map(|(name, children)| {
                    (
                        name.into(),
                        children.into_iter().map(|(k, v)| (k.into(), v)).collect(),
                    )
                })
                .collect(),
        }
    }

    /// The declared children of this node, if it has any
    pub fn children(&self) -> Option<&SchemaChildren> {
        match self {
            SchemaNode::Container { children } | SchemaNode::List { children, .. } => {
                Some(children)
            }
            _ => None,
        }
    }

    /// The declared key fields, if this is a list
    pub fn list_keys(&self) -> Option<&[String]> {
        match self {
            SchemaNode::List { keys, .. } => Some(keys),
            _ => None,
        }
    }

    /// Find a declared child by name
    ///
    /// Looks up direct children first; when the name is not found, scans the
    /// cases of every declared choice child. Fails closed when no case
    /// matches: an unknown child name is a schema mismatch, never a guess.
    pub fn find_child(&self, name: &str) -> Result<&SchemaNode> {
        let children = self.children().ok_or_else(|| {
            StoreError::SchemaMismatch(format!("{} node has no children", self.kind()))
        })?;

        if let Some(child) = children.get(name) {
            return Ok(child);
        }

        for child in children.values() {
            if let SchemaNode::Choice { cases } = child {
                for case_children in cases.values() {
                    if let Some(found) = case_children.get(name) {
                        return Ok(found);
                    }
                }
            }
        }

        Err(StoreError::SchemaMismatch(format!(
            "cannot find data schema node {}",
            name
        )))
    }

    /// The kind of this node, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaNode::Container { .. } => "container",
            SchemaNode::List { .. } => "list",
            SchemaNode::Leaf => "leaf",
            SchemaNode::LeafList => "leaf-list",
            SchemaNode::Choice { .. } => "choice",
        }
    }
}

/// One schema module: a namespace with top-level children
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Module name, used to qualify top-level field names
    pub name: String,
    /// Module namespace, used to name the module's collection
    pub namespace: String,
    /// Optional revision, suffixed to the collection name when present
    pub revision: Option<String>,
    /// Top-level children declared by the module
    pub children: SchemaChildren,
}

impl Module {
    /// Collection name for this module: `namespace` or `namespace@revision`
    ///
    /// This name is the wire contract with the change feed bridge, which
    /// parses it back into namespace and revision.
    pub fn collection_name(&self) -> String {
        match &self.revision {
            Some(revision) => format!("{}{}{}", self.namespace, REVISION_SEPARATOR, revision),
            None => self.namespace.clone(),
        }
    }

    /// Top-level field name for a child of this module: `module:name`
    pub fn top_field_name(&self, local_name: &str) -> String {
        format!("{}{}{}", self.name, MODULE_SEPARATOR, local_name)
    }
}

/// The complete schema: all modules known to the datastore
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaContext {
    modules: Vec<Module>,
}

impl SchemaContext {
    /// Build a schema context from modules
    pub fn new(modules: Vec<Module>) -> Self {
        SchemaContext { modules }
    }

    /// All modules
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Find a module by name
    pub fn find_module(&self, name: &str) -> Result<&Module> {
        self.modules
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| StoreError::SchemaMismatch(format!("unknown module {}", name)))
    }

    /// Find the module owning a path's top-level step
    pub fn module_for(&self, path: &Path) -> Result<&Module> {
        let (module, _) = path.top_step();
        self.find_module(module)
    }

    /// Top-level field name for a path: `module:name`
    pub fn top_field_name(&self, path: &Path) -> Result<String> {
        let (module, name) = path.top_step();
        Ok(self.find_module(module)?.top_field_name(name))
    }

    /// Resolve a path to its schema node
    ///
    /// List-entry steps select within a list and do not descend in the
    /// schema tree; choice children are looked through fail-closed.
    pub fn resolve(&self, path: &Path) -> Result<&SchemaNode> {
        let module = self.module_for(path)?;
        let mut names = path.schema_names();
        let top = names.next().ok_or_else(|| {
            StoreError::SchemaMismatch("path has no top-level step".to_string())
        })?;
        let mut node = module.children.get(top).ok_or_else(|| {
            StoreError::SchemaMismatch(format!(
                "module {} declares no top-level node {}",
                module.name, top
            ))
        })?;
        for name in names {
            node = node.find_child(name)?;
        }
        Ok(node)
    }

    /// Find the module a collection name refers to
    ///
    /// The reverse of [`Module::collection_name`]: splits an optional
    /// `@revision` suffix off the namespace.
    pub fn module_by_collection(&self, collection: &str) -> Result<&Module> {
        let (namespace, revision) = match collection.split_once(REVISION_SEPARATOR) {
            Some((ns, rev)) => (ns, Some(rev)),
            None => (collection, None),
        };
        self.modules
            .iter()
            .find(|m| m.namespace == namespace && m.revision.as_deref() == revision)
            .ok_or_else(|| {
                StoreError::SchemaMismatch(format!("no module for collection {}", collection))
            })
    }
}
