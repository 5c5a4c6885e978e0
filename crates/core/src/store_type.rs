//! Logical store types

use std::fmt;

/// The two logical stores a datastore serves
///
/// Each store maps to its own database in the backing engine; collections
/// are created per schema module in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreType {
    /// Intended configuration, durable across restarts
    Configuration,
    /// Observed operational state, dropped on startup
    Operational,
}

impl StoreType {
    /// Database name for this store in the backing engine
    pub fn database_name(&self) -> &'static str {
        match self {
            StoreType::Configuration => "configuration",
            StoreType::Operational => "operational",
        }
    }

    /// Both store types, in a fixed order
    pub fn all() -> [StoreType; 2] {
        [StoreType::Configuration, StoreType::Operational]
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.database_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_names() {
        assert_eq!(StoreType::Configuration.database_name(), "configuration");
        assert_eq!(StoreType::Operational.database_name(), "operational");
    }

    #[test]
    fn test_display() {
        assert_eq!(StoreType::Operational.to_string(), "operational");
    }
}
