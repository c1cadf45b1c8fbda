//! Table descriptors
//!
//! A table is a consumer of cooked data. It names the cookers (and data
//! processors) it needs; the resolver turns that into a dependency closure.

use pantry_core::{CookerPath, DataProcessorId, PathError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Unique identity of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(Uuid);

impl TableId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn parse(s: &str) -> Result<Self, PathError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| PathError::Malformed { kind: "table id", value: s.to_string() })
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Consumer unit and its declared dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub id: TableId,
    pub name: String,
    #[serde(default)]
    pub required_cookers: BTreeSet<CookerPath>,
    #[serde(default)]
    pub required_data_processors: BTreeSet<DataProcessorId>,
}

impl TableDescriptor {
    pub fn new(id: TableId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            required_cookers: BTreeSet::new(),
            required_data_processors: BTreeSet::new(),
        }
    }

    pub fn with_cooker(mut self, path: CookerPath) -> Self {
        self.required_cookers.insert(path);
        self
    }

    pub fn with_cookers(mut self, paths: impl IntoIterator<Item = CookerPath>) -> Self {
        self.required_cookers.extend(paths);
        self
    }

    pub fn with_data_processor(mut self, id: DataProcessorId) -> Self {
        self.required_data_processors.insert(id);
        self
    }

    pub fn has_dependencies(&self) -> bool {
        !self.required_cookers.is_empty() || !self.required_data_processors.is_empty()
    }

    /// True when both descriptors declare exactly the same dependencies
    pub fn same_dependencies(&self, other: &TableDescriptor) -> bool {
        self.required_cookers == other.required_cookers
            && self.required_data_processors == other.required_data_processors
    }

    /// `name (id)`, used in logs and error context
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_id_parse() {
        let id = TableId::new_v4();
        assert_eq!(TableId::parse(&id.to_string()).unwrap(), id);
        assert!(TableId::parse("not-a-guid").is_err());
    }

    #[test]
    fn test_descriptor_builder_deduplicates() {
        let cpu = CookerPath::source("trace", "cpu").unwrap();
        let table = TableDescriptor::new(TableId::new_v4(), "cpu")
            .with_cooker(cpu.clone())
            .with_cooker(cpu);
        assert_eq!(table.required_cookers.len(), 1);
        assert!(table.has_dependencies());
        assert!(!TableDescriptor::new(TableId::new_v4(), "empty").has_dependencies());
    }
}
