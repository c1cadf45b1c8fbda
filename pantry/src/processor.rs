//! Per-source processor
//!
//! Ties one parser to a resolver and a session: tables are enabled against
//! the shared registry, then `process` instantiates the frozen cooker set
//! and runs the pass.

use crate::config::ProcessorConfig;
use crate::resolver::ExtensionResolver;
use crate::session::{ProcessingSummary, SourceSession};
use pantry_core::{PantryError, SourceId};
use pantry_plugin::{
    CancellationToken, CookerRegistry, DataRetrieval, DependencyClosure, ProgressSink,
    SourceParser, TableDescriptor, TableId,
};
use std::sync::Arc;

pub struct SourceProcessor<P: SourceParser> {
    registry: Arc<CookerRegistry<P::Record>>,
    resolver: ExtensionResolver,
    session: SourceSession<P>,
}

impl<P: SourceParser> SourceProcessor<P> {
    pub fn new(
        registry: Arc<CookerRegistry<P::Record>>,
        parser: P,
        config: ProcessorConfig,
    ) -> Result<Self, PantryError> {
        config.validate()?;
        Ok(Self {
            resolver: ExtensionResolver::new(registry.catalog()),
            session: SourceSession::new(parser, config),
            registry,
        })
    }

    pub fn source_id(&self) -> &SourceId {
        self.session.source_id()
    }

    /// Enable `table` for this source.
    ///
    /// Safe to call from several threads; fails once processing started.
    pub fn enable_table(&self, table: TableDescriptor) -> Result<Arc<DependencyClosure>, PantryError> {
        let source = self.source_id();
        self.resolver.add_table_with(table, |closure| {
            match closure.source_cookers().find(|p| !p.belongs_to(source)) {
                Some(foreign) => Err(PantryError::source_mismatch(source.as_str(), foreign)),
                None => Ok(()),
            }
        })
    }

    /// Instantiate every required cooker and run the single pass
    pub fn process(
        &mut self,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ProcessingSummary, PantryError> {
        self.resolver.finalize_tables();

        if self.session.state().accepts_registration() && self.session.registered_cookers().is_empty() {
            for path in self.resolver.required_cookers() {
                let instance = match self.registry.create(&path) {
                    Some(instance) => instance,
                    None => {
                        self.session.fault();
                        return Err(PantryError::internal(format!(
                            "resolved cooker '{}' has no factory",
                            path
                        )));
                    }
                };
                if let Err(err) = self.session.register(instance) {
                    self.session.fault();
                    return Err(err);
                }
            }
        }

        self.session.process(progress, cancel)
    }

    /// Query handle for an enabled table
    pub fn retrieval(&self, table: &TableId) -> Result<DataRetrieval<'_>, PantryError> {
        self.resolver.retrieval_for(table, &self.session)
    }

    pub fn resolver(&self) -> &ExtensionResolver {
        &self.resolver
    }

    pub fn session(&self) -> &SourceSession<P> {
        &self.session
    }

    pub fn registry(&self) -> &CookerRegistry<P::Record> {
        &self.registry
    }
}

impl<P: SourceParser> std::fmt::Debug for SourceProcessor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceProcessor")
            .field("resolver", &self.resolver)
            .field("session", &self.session)
            .finish()
    }
}
