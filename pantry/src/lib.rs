//! Pantry - single-pass source processing with memoized data cookers
//!
//! Tables declare the cookers they need; the resolver freezes the transitive
//! closure, a session feeds every record of the source through the enabled
//! cookers exactly once, and each table reads the results through a
//! retrieval handle limited to its own closure.

mod config;
mod graph;
mod processor;
mod resolver;
mod session;

#[cfg(test)]
mod testing;

pub use config::ProcessorConfig;
pub use graph::CookerGraph;
pub use processor::SourceProcessor;
pub use resolver::ExtensionResolver;
pub use session::{ProcessingSummary, SessionState, SourceSession};

pub mod prelude {
    pub use crate::{
        ExtensionResolver, ProcessingSummary, ProcessorConfig, SessionState, SourceProcessor,
        SourceSession,
    };
    pub use pantry_plugin::prelude::*;
}
