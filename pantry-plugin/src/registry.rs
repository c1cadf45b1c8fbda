//! Cooker Registry
//!
//! Maps cooker paths to factories. Discovery happens outside the core: by
//! the time tables are enabled, every cooker they can name is registered
//! here and resolvable by exact path.

use crate::{
    CompositeCookerFactory, CookerInstance, CookerMeta, KeyedRecord, SourceCookerFactory,
};
use pantry_core::{CookerPath, DataProcessorId, PantryError};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CookerKind {
    Source,
    Composite,
}

/// What the resolver needs to know about a registered cooker
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub kind: CookerKind,
    pub dependencies: Vec<CookerPath>,
    pub description: &'static str,
}

/// Type-erased view of the registry, shared with resolvers
#[derive(Debug, Clone, Default)]
pub struct CookerCatalog {
    entries: HashMap<CookerPath, CatalogEntry>,
    data_processors: BTreeSet<DataProcessorId>,
}

impl CookerCatalog {
    pub fn get(&self, path: &CookerPath) -> Option<&CatalogEntry> {
        self.entries.get(path)
    }

    pub fn has_data_processor(&self, id: &DataProcessorId) -> bool {
        self.data_processors.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered paths similar to `path` (for error suggestions)
    pub fn find_similar(&self, path: &CookerPath) -> Vec<CookerPath> {
        let mut matches: Vec<(CookerPath, usize)> = self
            .entries
            .keys()
            .filter_map(|candidate| {
                let score = Self::similarity_score(path, candidate);
                (score > 0).then(|| (candidate.clone(), score))
            })
            .collect();

        // Higher = more similar, ties by path for stable output
        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        matches.into_iter().map(|(path, _)| path).collect()
    }

    /// The cooker name decides whether a candidate matches at all; sharing
    /// the source only breaks ties between similar names.
    fn similarity_score(query: &CookerPath, candidate: &CookerPath) -> usize {
        let name = Self::name_score(
            &query.cooker_id().as_str().to_lowercase(),
            &candidate.cooker_id().as_str().to_lowercase(),
        );
        if name == 0 {
            return 0;
        }
        if query.source_id() == candidate.source_id() {
            name + 10
        } else {
            name
        }
    }

    fn name_score(query: &str, candidate: &str) -> usize {
        if query == candidate {
            return 100;
        }
        let mut score = if candidate.starts_with(query) || query.starts_with(candidate) {
            60
        } else if candidate.contains(query) || query.contains(candidate) {
            40
        } else {
            0
        };

        let words: HashSet<&str> = name_words(query).collect();
        score += name_words(candidate).filter(|w| words.contains(w)).count() * 15;
        score
    }
}

fn name_words(name: &str) -> impl Iterator<Item = &str> {
    name.split(|c: char| c == '_' || c == '-' || c == '.').filter(|w| !w.is_empty())
}

/// Central cooker registry for one record type
pub struct CookerRegistry<R: KeyedRecord> {
    sources: HashMap<CookerPath, Arc<dyn SourceCookerFactory<R>>>,
    composites: HashMap<CookerPath, Arc<dyn CompositeCookerFactory>>,
    catalog: Arc<CookerCatalog>,
}

impl<R: KeyedRecord> CookerRegistry<R> {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            composites: HashMap::new(),
            catalog: Arc::new(CookerCatalog::default()),
        }
    }

    pub fn with_source_cooker<F>(mut self, factory: F) -> Result<Self, PantryError>
    where
        F: SourceCookerFactory<R> + 'static,
    {
        let meta = factory.meta();
        if meta.path.is_composite() {
            return Err(PantryError::new(
                pantry_core::codes::INVALID_PATH,
                format!("Source cooker '{}' must have a source-scoped path", meta.path),
            ));
        }
        if !meta.dependencies.is_empty() {
            return Err(PantryError::new(
                pantry_core::codes::INVALID_PATH,
                format!("Source cooker '{}' cannot declare cooker dependencies", meta.path),
            )
            .with_suggestion("Derive from other cookers in a composite cooker"));
        }
        self.insert_entry(&meta, CookerKind::Source)?;
        self.sources.insert(meta.path, Arc::new(factory));
        Ok(self)
    }

    pub fn with_composite_cooker<F>(mut self, factory: F) -> Result<Self, PantryError>
    where
        F: CompositeCookerFactory + 'static,
    {
        let meta = factory.meta();
        if !meta.path.is_composite() {
            return Err(PantryError::new(
                pantry_core::codes::INVALID_PATH,
                format!("Composite cooker '{}' must not be scoped to a source", meta.path),
            ));
        }
        self.insert_entry(&meta, CookerKind::Composite)?;
        self.composites.insert(meta.path, Arc::new(factory));
        Ok(self)
    }

    pub fn with_data_processor(mut self, id: DataProcessorId) -> Self {
        Arc::make_mut(&mut self.catalog).data_processors.insert(id);
        self
    }

    fn insert_entry(&mut self, meta: &CookerMeta, kind: CookerKind) -> Result<(), PantryError> {
        let catalog = Arc::make_mut(&mut self.catalog);
        if catalog.entries.contains_key(&meta.path) {
            return Err(PantryError::duplicate_cooker(&meta.path));
        }
        catalog.entries.insert(
            meta.path.clone(),
            CatalogEntry {
                kind,
                dependencies: meta.dependencies.clone(),
                description: meta.description,
            },
        );
        tracing::debug!(cooker = %meta.path, ?kind, "registered cooker");
        Ok(())
    }

    pub fn catalog(&self) -> Arc<CookerCatalog> {
        self.catalog.clone()
    }

    pub fn meta(&self, path: &CookerPath) -> Option<CookerMeta> {
        self.sources
            .get(path)
            .map(|f| f.meta())
            .or_else(|| self.composites.get(path).map(|f| f.meta()))
    }

    /// Fresh instance of the cooker at `path`
    pub fn create(&self, path: &CookerPath) -> Option<CookerInstance<R>> {
        if let Some(f) = self.sources.get(path) {
            return Some(CookerInstance::Source(f.create()));
        }
        self.composites.get(path).map(|f| CookerInstance::Composite(f.create()))
    }

    /// Metadata of every registered cooker, ordered by path
    pub fn list_cookers(&self) -> Vec<CookerMeta> {
        let mut metas: Vec<CookerMeta> = self
            .sources
            .values()
            .map(|f| f.meta())
            .chain(self.composites.values().map(|f| f.meta()))
            .collect();
        metas.sort_by(|a, b| a.path.cmp(&b.path));
        metas
    }
}

impl<R: KeyedRecord> Default for CookerRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CompositeCooker, DataRetrieval, FnFactory, KeyInterest, OutputMeta, RecordContext,
        SourceCooker,
    };
    use pantry_core::{codes, Value};

    struct Rec;

    impl KeyedRecord for Rec {
        type Key = ();
        fn key(&self) {}
    }

    struct Noop(CookerPath);

    impl SourceCooker<Rec> for Noop {
        fn path(&self) -> &CookerPath {
            &self.0
        }
        fn interest(&self) -> KeyInterest<()> {
            KeyInterest::All
        }
        fn receive(&mut self, _: &Rec, _: &RecordContext<'_>) -> Result<(), PantryError> {
            Ok(())
        }
        fn output(&self, _: &str) -> Option<Value> {
            None
        }
    }

    struct Derived(CookerPath, Vec<CookerPath>);

    impl CompositeCooker for Derived {
        fn path(&self) -> &CookerPath {
            &self.0
        }
        fn dependencies(&self) -> &[CookerPath] {
            &self.1
        }
        fn derive(&mut self, _: &DataRetrieval<'_>) -> Result<(), PantryError> {
            Ok(())
        }
        fn output(&self, _: &str) -> Option<Value> {
            None
        }
    }

    static NO_OUTPUTS: [OutputMeta; 0] = [];

    fn source_factory(path: &str) -> impl SourceCookerFactory<Rec> {
        let path = CookerPath::parse(path).unwrap();
        let meta = CookerMeta::source(path.clone(), "noop", &NO_OUTPUTS);
        FnFactory::new(meta, move || Box::new(Noop(path.clone())) as Box<dyn SourceCooker<Rec>>)
    }

    fn composite_factory(path: &str, deps: &[&str]) -> impl CompositeCookerFactory {
        let path = CookerPath::parse(path).unwrap();
        let deps: Vec<CookerPath> = deps.iter().map(|d| CookerPath::parse(d).unwrap()).collect();
        let meta = CookerMeta::composite(path.clone(), "derived", deps.clone(), &NO_OUTPUTS);
        FnFactory::new(meta, move || {
            Box::new(Derived(path.clone(), deps.clone())) as Box<dyn CompositeCooker>
        })
    }

    #[test]
    fn test_register_and_create() {
        let registry = CookerRegistry::<Rec>::new()
            .with_source_cooker(source_factory("trace/cpu"))
            .unwrap()
            .with_composite_cooker(composite_factory("summary", &["trace/cpu"]))
            .unwrap();

        let cpu = CookerPath::parse("trace/cpu").unwrap();
        let summary = CookerPath::parse("summary").unwrap();
        assert!(matches!(registry.create(&cpu), Some(CookerInstance::Source(_))));
        assert!(matches!(registry.create(&summary), Some(CookerInstance::Composite(_))));

        let catalog = registry.catalog();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(&summary).unwrap().dependencies, vec![cpu]);
        assert_eq!(registry.list_cookers()[0].path.to_string(), "trace/cpu");
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let err = CookerRegistry::<Rec>::new()
            .with_source_cooker(source_factory("trace/cpu"))
            .unwrap()
            .with_source_cooker(source_factory("trace/cpu"))
            .err()
            .unwrap();
        assert!(err.is(codes::DUPLICATE_COOKER));
    }

    #[test]
    fn test_kind_must_match_path() {
        assert!(CookerRegistry::<Rec>::new()
            .with_source_cooker(source_factory("cpu"))
            .is_err());
        assert!(CookerRegistry::<Rec>::new()
            .with_composite_cooker(composite_factory("trace/summary", &[]))
            .is_err());
    }

    #[test]
    fn test_similar_paths() {
        let registry = CookerRegistry::<Rec>::new()
            .with_source_cooker(source_factory("trace/cpu_usage"))
            .unwrap()
            .with_source_cooker(source_factory("trace/disk"))
            .unwrap();
        let similar = registry.catalog().find_similar(&CookerPath::parse("trace/cpu").unwrap());
        assert_eq!(similar.first().map(|p| p.to_string()).as_deref(), Some("trace/cpu_usage"));
    }

    #[test]
    fn test_same_cooker_on_other_source_ranks_first() {
        let registry = CookerRegistry::<Rec>::new()
            .with_source_cooker(source_factory("web/request_count"))
            .unwrap()
            .with_source_cooker(source_factory("trace/request_latency"))
            .unwrap()
            .with_source_cooker(source_factory("trace/disk"))
            .unwrap();
        let similar: Vec<String> = registry
            .catalog()
            .find_similar(&CookerPath::parse("trace/request_count").unwrap())
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(similar, vec!["web/request_count", "trace/request_latency"]);
    }
}
