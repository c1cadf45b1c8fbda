//! Extension traits

use crate::{DataRetrieval, RecordContext, SourceInfo};
use pantry_core::{CookerPath, PantryError, SourceId, Value};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// A raw unit produced by a source parser.
///
/// Records without a meaningful key still implement this, typically with a
/// sentinel key that no cooker asks for.
pub trait KeyedRecord {
    type Key: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
}

/// Which records a source cooker wants to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInterest<K: Eq + Hash> {
    All,
    Keys(HashSet<K>),
}

impl<K: Eq + Hash> KeyInterest<K> {
    pub fn all() -> Self {
        KeyInterest::All
    }

    pub fn keys(keys: impl IntoIterator<Item = K>) -> Self {
        KeyInterest::Keys(keys.into_iter().collect())
    }

    pub fn matches(&self, key: &K) -> bool {
        match self {
            KeyInterest::All => true,
            KeyInterest::Keys(keys) => keys.contains(key),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, KeyInterest::All)
    }
}

/// Metadata about one cooker output
#[derive(Debug, Clone, Serialize)]
pub struct OutputMeta {
    pub name: &'static str,
    pub typ: &'static str,
    pub description: &'static str,
}

impl OutputMeta {
    pub const fn new(name: &'static str, typ: &'static str, description: &'static str) -> Self {
        Self { name, typ, description }
    }
}

/// Metadata for a cooker, known without instantiating it
#[derive(Debug, Clone, Serialize)]
pub struct CookerMeta {
    pub path: CookerPath,
    pub description: &'static str,
    /// Other cookers this one derives from (composite cookers only)
    pub dependencies: Vec<CookerPath>,
    pub outputs: &'static [OutputMeta],
}

impl CookerMeta {
    pub fn source(path: CookerPath, description: &'static str, outputs: &'static [OutputMeta]) -> Self {
        Self { path, description, dependencies: Vec::new(), outputs }
    }

    pub fn composite(
        path: CookerPath,
        description: &'static str,
        dependencies: Vec<CookerPath>,
        outputs: &'static [OutputMeta],
    ) -> Self {
        Self { path, description, dependencies, outputs }
    }
}

/// Stateful cooker fed with the raw records of one source
pub trait SourceCooker<R: KeyedRecord>: Send + Sync {
    fn path(&self) -> &CookerPath;

    fn interest(&self) -> KeyInterest<R::Key>;

    /// Called once per matching record, in source order
    fn receive(&mut self, record: &R, ctx: &RecordContext<'_>) -> Result<(), PantryError>;

    /// Called once after the last record
    fn end_of_source(&mut self, _info: &SourceInfo) -> Result<(), PantryError> {
        Ok(())
    }

    fn output(&self, name: &str) -> Option<Value>;
}

/// Cooker that derives its state from other cookers' finished outputs
pub trait CompositeCooker: Send + Sync {
    fn path(&self) -> &CookerPath;

    fn dependencies(&self) -> &[CookerPath];

    /// Called once, after every dependency has completed. `inputs` is scoped
    /// to this cooker's transitive dependencies.
    fn derive(&mut self, inputs: &DataRetrieval<'_>) -> Result<(), PantryError>;

    fn output(&self, name: &str) -> Option<Value>;
}

/// A cooker instance owned by a session
pub enum CookerInstance<R: KeyedRecord> {
    Source(Box<dyn SourceCooker<R>>),
    Composite(Box<dyn CompositeCooker>),
}

impl<R: KeyedRecord> CookerInstance<R> {
    pub fn path(&self) -> &CookerPath {
        match self {
            CookerInstance::Source(c) => c.path(),
            CookerInstance::Composite(c) => c.path(),
        }
    }

    pub fn dependencies(&self) -> &[CookerPath] {
        match self {
            CookerInstance::Source(_) => &[],
            CookerInstance::Composite(c) => c.dependencies(),
        }
    }

    pub fn output(&self, name: &str) -> Option<Value> {
        match self {
            CookerInstance::Source(c) => c.output(name),
            CookerInstance::Composite(c) => c.output(name),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, CookerInstance::Composite(_))
    }
}

impl<R: KeyedRecord> Debug for CookerInstance<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_composite() { "Composite" } else { "Source" };
        f.debug_tuple(kind).field(self.path()).finish()
    }
}

/// Creates fresh source cookers; one instance per session
pub trait SourceCookerFactory<R: KeyedRecord>: Send + Sync {
    fn meta(&self) -> CookerMeta;
    fn create(&self) -> Box<dyn SourceCooker<R>>;
}

/// Creates fresh composite cookers; one instance per session
pub trait CompositeCookerFactory: Send + Sync {
    fn meta(&self) -> CookerMeta;
    fn create(&self) -> Box<dyn CompositeCooker>;
}

/// Factory built from metadata and a constructor closure
pub struct FnFactory<F> {
    meta: CookerMeta,
    make: F,
}

impl<F> FnFactory<F> {
    pub fn new(meta: CookerMeta, make: F) -> Self {
        Self { meta, make }
    }
}

impl<R, F> SourceCookerFactory<R> for FnFactory<F>
where
    R: KeyedRecord,
    F: Fn() -> Box<dyn SourceCooker<R>> + Send + Sync,
{
    fn meta(&self) -> CookerMeta {
        self.meta.clone()
    }

    fn create(&self) -> Box<dyn SourceCooker<R>> {
        (self.make)()
    }
}

impl<F> CompositeCookerFactory for FnFactory<F>
where
    F: Fn() -> Box<dyn CompositeCooker> + Send + Sync,
{
    fn meta(&self) -> CookerMeta {
        self.meta.clone()
    }

    fn create(&self) -> Box<dyn CompositeCooker> {
        (self.make)()
    }
}

/// Supplies the ordered record stream of one source.
///
/// A session calls `records` exactly once.
pub trait SourceParser: Send + Sync {
    type Record: KeyedRecord;

    fn source_id(&self) -> &SourceId;

    fn source_info(&self) -> SourceInfo;

    /// Expected number of records, used for progress reporting
    fn record_count_hint(&self) -> Option<u64> {
        None
    }

    fn records(&mut self) -> Box<dyn Iterator<Item = Result<Self::Record, PantryError>> + '_>;
}
