//! Structured paths
//!
//! A `Path` addresses one node of the schema tree as an ordered sequence of
//! steps. The first step always names a top-level entity (module-qualified);
//! interior steps name singleton containers or lists by local name; a
//! list-entry step selects one element of a keyed list by its key values
//! and always follows the step naming the list itself.

use crate::value::Value;
use std::fmt;

/// One element of a structured path
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A root-level named entity, qualified by its schema module
    Top {
        /// Name of the module declaring the entity
        module: String,
        /// Local name of the entity
        name: String,
    },
    /// A nested container or list, by local name
    Node(String),
    /// One element of a keyed list, by ordered (key name, key value) pairs
    ListEntry(Vec<(String, Value)>),
}

/// A structured path: an ordered, non-empty sequence of steps
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    /// Start a path at a top-level entity
    pub fn top(module: impl Into<String>, name: impl Into<String>) -> Self {
        Path {
            steps: vec![Step::Top {
                module: module.into(),
                name: name.into(),
            }],
        }
    }

    /// Append an interior container/list-name step
    pub fn node(mut self, name: impl Into<String>) -> Self {
        self.steps.push(Step::Node(name.into()));
        self
    }

    /// Append a list-entry step selecting one keyed element
    ///
    /// The entry must follow the step naming its list; two entry steps can
    /// never be adjacent.
    pub fn entry<I, S, V>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<Value>,
    {
        assert!(
            !matches!(self.steps.last(), Some(Step::ListEntry(_))),
            "a list-entry step must follow the step naming its list"
        );
        self.steps.push(Step::ListEntry(
            keys.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ));
        self
    }

    /// All steps in order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The first (top-level) step as (module, name)
    pub fn top_step(&self) -> (&str, &str) {
        match &self.steps[0] {
            Step::Top { module, name } => (module, name),
            // Construction always starts with Path::top.
            _ => unreachable!("path does not start with a top-level step"),
        }
    }

    /// The last step
    pub fn last_step(&self) -> &Step {
        self.steps.last().expect("path is never empty")
    }

    /// True when the path consists of the top-level step only
    pub fn is_top_level(&self) -> bool {
        self.steps.len() == 1
    }

    /// True when the last step selects a keyed list entry
    pub fn is_list_entry(&self) -> bool {
        matches!(self.last_step(), Step::ListEntry(_))
    }

    /// Local names along the path, skipping list-entry steps
    ///
    /// This is the schema location of the path: keyed selection does not
    /// descend in the schema tree.
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            Step::Top { name, .. } => Some(name.as_str()),
            Step::Node(name) => Some(name.as_str()),
            Step::ListEntry(_) => None,
        })
    }

    /// True when every step of `self` is a prefix of `other`
    ///
    /// A path is an ancestor of itself.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.steps.len() <= other.steps.len()
            && self.steps.iter().zip(other.steps.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Top { module, name } => write!(f, "{}:{}", module, name),
            Step::Node(name) => write!(f, "{}", name),
            Step::ListEntry(keys) => {
                for (k, v) in keys {
                    write!(f, "[{}={:?}]", k, v)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Path {
    // Keyed steps render attached to their list name: /m:top/list[name="a"]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            match step {
                Step::ListEntry(_) => write!(f, "{}", step)?,
                _ => write!(f, "/{}", step)?,
            }
        }
        Ok(())
    }
}
