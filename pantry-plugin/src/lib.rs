//! Pantry Plugin System
//!
//! Provides the contracts for extending Pantry with:
//! - Source parsers (ordered streams of keyed records)
//! - Source cookers (stateful consumers of one source's records)
//! - Composite cookers (derived views over other cookers)
//! - Tables (consumers that query cooked outputs by path)

mod cancel;
mod context;
mod progress;
mod registry;
mod retrieval;
mod table;
mod traits;

pub use cancel::CancellationToken;
pub use context::{RecordContext, SourceInfo};
pub use progress::{NoProgress, ProgressSink};
pub use registry::{CatalogEntry, CookerCatalog, CookerKind, CookerRegistry};
pub use retrieval::{DataRetrieval, DependencyClosure, OutputSource};
pub use table::{TableDescriptor, TableId};
pub use traits::{
    CompositeCooker, CompositeCookerFactory, CookerInstance, CookerMeta, FnFactory, KeyInterest,
    KeyedRecord, OutputMeta, SourceCooker, SourceCookerFactory, SourceParser,
};

/// Re-export core types for cooker authors
pub mod prelude {
    pub use crate::{
        CancellationToken, CompositeCooker, CompositeCookerFactory, CookerInstance, CookerMeta,
        CookerRegistry, DataRetrieval, DependencyClosure, FnFactory, KeyInterest, KeyedRecord,
        NoProgress, OutputMeta, OutputSource, ProgressSink, RecordContext, SourceCooker,
        SourceCookerFactory, SourceInfo, SourceParser, TableDescriptor, TableId,
    };
    pub use pantry_core::prelude::*;
}
