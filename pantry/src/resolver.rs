//! Dependency resolution
//!
//! Turns table descriptors into transitive cooker closures. All mutable
//! state sits behind one lock, so tables can be added from several threads
//! while the processor is still being configured.

use crate::graph::CookerGraph;
use pantry_core::{CookerPath, DataProcessorId, PantryError, SourceId};
use pantry_plugin::{
    CookerCatalog, DataRetrieval, DependencyClosure, OutputSource, TableDescriptor, TableId,
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct ResolvedTable {
    descriptor: TableDescriptor,
    closure: Arc<DependencyClosure>,
}

#[derive(Default)]
struct ResolverState {
    finalized: bool,
    tables: HashMap<TableId, ResolvedTable>,
    /// Insertion order of `tables`
    order: Vec<TableId>,
    required: BTreeSet<CookerPath>,
    required_processors: BTreeSet<DataProcessorId>,
}

pub struct ExtensionResolver {
    catalog: Arc<CookerCatalog>,
    state: Mutex<ResolverState>,
}

impl ExtensionResolver {
    pub fn new(catalog: Arc<CookerCatalog>) -> Self {
        Self {
            catalog,
            state: Mutex::new(ResolverState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ResolverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transitive closure of `table`, without committing anything
    pub fn compute_closure(&self, table: &TableDescriptor) -> Result<DependencyClosure, PantryError> {
        for id in &table.required_data_processors {
            if !self.catalog.has_data_processor(id) {
                return Err(PantryError::unknown_data_processor(id.as_str()).in_table(table.label()));
            }
        }

        let mut graph = CookerGraph::new();
        let mut visited: HashSet<CookerPath> = HashSet::new();
        let mut queue: VecDeque<(CookerPath, Option<CookerPath>)> = table
            .required_cookers
            .iter()
            .map(|path| (path.clone(), None))
            .collect();

        while let Some((path, parent)) = queue.pop_front() {
            if !visited.insert(path.clone()) {
                continue;
            }
            let Some(entry) = self.catalog.get(&path) else {
                return Err(self.unresolved(&path, parent.as_ref(), table));
            };
            graph.add_cooker(&path);
            for dep in &entry.dependencies {
                graph.add_dependency(&path, dep);
                if !visited.contains(dep) {
                    queue.push_back((dep.clone(), Some(path.clone())));
                }
            }
        }

        if let Some(cycle) = graph.find_cycle() {
            return Err(PantryError::dependency_cycle(&cycle).in_table(table.label()));
        }

        Ok(DependencyClosure::new(
            visited.into_iter().collect(),
            table.required_data_processors.clone(),
        ))
    }

    fn unresolved(&self, path: &CookerPath, parent: Option<&CookerPath>, table: &TableDescriptor) -> PantryError {
        let mut err = PantryError::unresolved_dependency(path).in_table(table.label());
        err = match parent {
            Some(parent) => err.with_note(format!("required by cooker '{}'", parent)),
            None => err.with_note("required directly by the table"),
        };
        let similar: Vec<String> = self
            .catalog
            .find_similar(path)
            .into_iter()
            .take(3)
            .map(|p| p.to_string())
            .collect();
        if !similar.is_empty() {
            err = err.with_suggestion(format!("Did you mean: {}?", similar.join(", ")));
        }
        err
    }

    /// Resolve and record `table`. Nothing is committed on failure.
    pub fn add_table(&self, table: TableDescriptor) -> Result<Arc<DependencyClosure>, PantryError> {
        self.add_table_with(table, |_| Ok(()))
    }

    /// Like `add_table`, with an extra check run on the closure before it is
    /// committed
    pub fn add_table_with<F>(&self, table: TableDescriptor, check: F) -> Result<Arc<DependencyClosure>, PantryError>
    where
        F: FnOnce(&DependencyClosure) -> Result<(), PantryError>,
    {
        let mut state = self.state();
        if state.finalized {
            return Err(PantryError::usage_order(format!(
                "Table {} was added after tables were finalized",
                table.label()
            ))
            .in_table(table.label()));
        }

        if let Some(existing) = state.tables.get(&table.id) {
            if existing.descriptor.same_dependencies(&table) {
                return Ok(existing.closure.clone());
            }
            return Err(PantryError::duplicate_table(table.label()));
        }

        let closure = match self.compute_closure(&table).and_then(|closure| {
            check(&closure)?;
            Ok(closure)
        }) {
            Ok(closure) => Arc::new(closure),
            Err(err) => {
                tracing::warn!(table = %table.label(), code = %err.code, "table rejected: {}", err.message);
                return Err(err);
            }
        };

        state.required.extend(closure.cookers().cloned());
        state.required_processors.extend(closure.data_processors().cloned());
        state.order.push(table.id);
        tracing::debug!(table = %table.label(), cookers = closure.len(), "table resolved");
        state.tables.insert(
            table.id,
            ResolvedTable {
                descriptor: table,
                closure: closure.clone(),
            },
        );
        Ok(closure)
    }

    /// Freeze the table set. Later `add_table` calls fail.
    pub fn finalize_tables(&self) {
        let mut state = self.state();
        if !state.finalized {
            state.finalized = true;
            tracing::info!(
                tables = state.tables.len(),
                cookers = state.required.len(),
                "tables finalized"
            );
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.state().finalized
    }

    pub fn closure_for(&self, table: &TableId) -> Option<Arc<DependencyClosure>> {
        self.state().tables.get(table).map(|t| t.closure.clone())
    }

    /// Every cooker needed by any resolved table
    pub fn required_cookers(&self) -> BTreeSet<CookerPath> {
        self.state().required.clone()
    }

    pub fn required_source_cookers(&self) -> BTreeSet<CookerPath> {
        self.state()
            .required
            .iter()
            .filter(|p| !p.is_composite())
            .cloned()
            .collect()
    }

    pub fn required_source_cookers_for(&self, source: &SourceId) -> BTreeSet<CookerPath> {
        self.state()
            .required
            .iter()
            .filter(|p| p.belongs_to(source))
            .cloned()
            .collect()
    }

    pub fn required_composite_cookers(&self) -> BTreeSet<CookerPath> {
        self.state()
            .required
            .iter()
            .filter(|p| p.is_composite())
            .cloned()
            .collect()
    }

    pub fn required_data_processors(&self) -> BTreeSet<DataProcessorId> {
        self.state().required_processors.clone()
    }

    /// Resolved tables, in the order they were added
    pub fn required_tables(&self) -> Vec<TableDescriptor> {
        let state = self.state();
        state
            .order
            .iter()
            .filter_map(|id| state.tables.get(id))
            .map(|t| t.descriptor.clone())
            .collect()
    }

    /// Query handle for `table`, scoped to its closure
    pub fn retrieval_for<'a>(
        &self,
        table: &TableId,
        source: &'a dyn OutputSource,
    ) -> Result<DataRetrieval<'a>, PantryError> {
        let closure = self
            .closure_for(table)
            .ok_or_else(|| PantryError::unknown_table(table.to_string()))?;
        Ok(DataRetrieval::new(source, closure))
    }
}

impl std::fmt::Debug for ExtensionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ExtensionResolver")
            .field("finalized", &state.finalized)
            .field("tables", &state.order)
            .field("required", &state.required)
            .finish()
    }
}
