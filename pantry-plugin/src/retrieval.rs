//! Output retrieval
//!
//! A `DataRetrieval` is the query surface a table (or a composite cooker)
//! gets: it forwards to the session, but only for cookers inside its own
//! dependency closure.

use pantry_core::{CookerPath, DataProcessorId, FromValue, OutputPath, QueryError, Value};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Transitive set of cookers (and data processors) required by one consumer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyClosure {
    cookers: BTreeSet<CookerPath>,
    data_processors: BTreeSet<DataProcessorId>,
}

impl DependencyClosure {
    pub fn new(cookers: BTreeSet<CookerPath>, data_processors: BTreeSet<DataProcessorId>) -> Self {
        Self { cookers, data_processors }
    }

    pub fn contains(&self, path: &CookerPath) -> bool {
        self.cookers.contains(path)
    }

    pub fn cookers(&self) -> impl Iterator<Item = &CookerPath> {
        self.cookers.iter()
    }

    pub fn source_cookers(&self) -> impl Iterator<Item = &CookerPath> {
        self.cookers.iter().filter(|p| !p.is_composite())
    }

    pub fn composite_cookers(&self) -> impl Iterator<Item = &CookerPath> {
        self.cookers.iter().filter(|p| p.is_composite())
    }

    pub fn data_processors(&self) -> impl Iterator<Item = &DataProcessorId> {
        self.data_processors.iter()
    }

    pub fn len(&self) -> usize {
        self.cookers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookers.is_empty() && self.data_processors.is_empty()
    }
}

impl FromIterator<CookerPath> for DependencyClosure {
    fn from_iter<I: IntoIterator<Item = CookerPath>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect(), BTreeSet::new())
    }
}

/// Anything that can answer output queries by path
pub trait OutputSource {
    fn query_output(&self, path: &OutputPath) -> Result<Value, QueryError>;
}

/// Query handle scoped to one dependency closure
pub struct DataRetrieval<'a> {
    source: &'a dyn OutputSource,
    scope: Arc<DependencyClosure>,
}

impl<'a> DataRetrieval<'a> {
    pub fn new(source: &'a dyn OutputSource, scope: Arc<DependencyClosure>) -> Self {
        Self { source, scope }
    }

    pub fn scope(&self) -> &DependencyClosure {
        &self.scope
    }

    /// Untyped query
    pub fn query_value(&self, path: &OutputPath) -> Result<Value, QueryError> {
        if !self.scope.contains(&path.cooker) {
            return Err(QueryError::OutOfScope(path.clone()));
        }
        self.source.query_output(path)
    }

    pub fn query_output<T: FromValue>(&self, path: &OutputPath) -> Result<T, QueryError> {
        let value = self.query_value(path)?;
        T::from_value(value).map_err(|found| QueryError::TypeMismatch {
            path: path.clone(),
            expected: T::TYPE_NAME,
            found: found.type_name(),
        })
    }

    /// Never fails; `None` on any error
    pub fn try_query_output<T: FromValue>(&self, path: &OutputPath) -> Option<T> {
        self.query_output(path).ok()
    }

    pub fn query_output_or_default<T: FromValue + Default>(&self, path: &OutputPath) -> T {
        self.try_query_output(path).unwrap_or_default()
    }
}

impl std::fmt::Debug for DataRetrieval<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRetrieval").field("scope", &self.scope).finish()
    }
}
