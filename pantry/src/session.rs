//! Source processing session
//!
//! One forward pass over one source. The session owns every enabled cooker
//! instance, routes each record to the cookers interested in its key, then
//! completes source cookers and derives composites in dependency order.

use crate::config::ProcessorConfig;
use crate::graph::CookerGraph;
use pantry_core::{codes, CookerPath, OutputPath, PantryError, QueryError, SourceId, Value};
use pantry_plugin::{
    CancellationToken, CompositeCooker, CookerInstance, DataRetrieval, DependencyClosure,
    KeyInterest, KeyedRecord, OutputSource, ProgressSink, RecordContext, SourceCooker,
    SourceInfo, SourceParser,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

type RecordOf<P> = <P as SourceParser>::Record;
type KeyOf<P> = <RecordOf<P> as KeyedRecord>::Key;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No cooker registered yet
    Built,
    Registering,
    Processing,
    /// Pass completed; outputs are queryable
    Ready,
    /// Pass failed or was cancelled; the session must be discarded
    Faulted,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Built => "built",
            SessionState::Registering => "registering",
            SessionState::Processing => "processing",
            SessionState::Ready => "ready",
            SessionState::Faulted => "faulted",
        }
    }

    pub fn accepts_registration(&self) -> bool {
        matches!(self, SessionState::Built | SessionState::Registering)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a successful pass
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSummary {
    pub source: SourceId,
    pub records: u64,
    /// Total `receive` calls across all source cookers
    pub deliveries: u64,
    pub source_cookers: usize,
    pub composite_cookers: usize,
    pub elapsed: Duration,
}

/// Record index -> interested cookers
struct Routes<K> {
    all: Vec<usize>,
    by_key: HashMap<K, Vec<usize>>,
}

impl<K: Eq + std::hash::Hash> Routes<K> {
    fn targets<'a>(&'a self, key: &K) -> impl Iterator<Item = usize> + 'a {
        let keyed = self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[]);
        self.all.iter().chain(keyed.iter()).copied()
    }
}

/// Emits monotonically increasing percentages, 100 only on completion
struct ProgressReporter<'a> {
    sink: &'a mut dyn ProgressSink,
    total: Option<u64>,
    step: u8,
    last: Option<u8>,
}

impl<'a> ProgressReporter<'a> {
    fn new(sink: &'a mut dyn ProgressSink, total: Option<u64>, step: u8) -> Self {
        Self { sink, total, step, last: None }
    }

    fn emit(&mut self, percent: u8) {
        if self.last.map_or(true, |last| percent > last) {
            self.sink.report(percent);
            self.last = Some(percent);
        }
    }

    fn advance(&mut self, done: u64) {
        let Some(total) = self.total.filter(|t| *t > 0) else {
            return;
        };
        let percent = (done.saturating_mul(100) / total).min(99) as u8;
        let due = self
            .last
            .map_or(true, |last| percent >= last.saturating_add(self.step));
        if due {
            self.emit(percent);
        }
    }

    fn finish(&mut self) {
        self.emit(100);
    }
}

/// Read-only view over registered cookers
struct SlotView<'a, R: KeyedRecord> {
    slots: &'a [Option<CookerInstance<R>>],
    index: &'a HashMap<CookerPath, usize>,
}

impl<R: KeyedRecord> OutputSource for SlotView<'_, R> {
    fn query_output(&self, path: &OutputPath) -> Result<Value, QueryError> {
        let cooker = self
            .index
            .get(&path.cooker)
            .and_then(|&i| self.slots[i].as_ref())
            .ok_or_else(|| QueryError::CookerNotFound(path.cooker.clone()))?;
        cooker
            .output(path.output.as_str())
            .ok_or_else(|| QueryError::OutputNotFound(path.clone()))
    }
}

pub struct SourceSession<P: SourceParser> {
    source_id: SourceId,
    parser: P,
    /// Registration order; a slot is only empty while its composite derives
    slots: Vec<Option<CookerInstance<RecordOf<P>>>>,
    index: HashMap<CookerPath, usize>,
    state: SessionState,
    config: ProcessorConfig,
    info: Option<SourceInfo>,
    records_processed: u64,
}

impl<P: SourceParser> SourceSession<P> {
    pub fn new(parser: P, config: ProcessorConfig) -> Self {
        Self {
            source_id: parser.source_id().clone(),
            parser,
            slots: Vec::new(),
            index: HashMap::new(),
            state: SessionState::Built,
            config,
            info: None,
            records_processed: 0,
        }
    }

    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Source range metadata, known once processing started
    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.info.as_ref()
    }

    pub fn records_processed(&self) -> u64 {
        self.records_processed
    }

    pub fn registered_cookers(&self) -> Vec<&CookerPath> {
        self.slots.iter().flatten().map(|c| c.path()).collect()
    }

    pub fn get_cooker(&self, path: &CookerPath) -> Option<&CookerInstance<RecordOf<P>>> {
        self.index.get(path).and_then(|&i| self.slots[i].as_ref())
    }

    pub fn register(&mut self, cooker: CookerInstance<RecordOf<P>>) -> Result<(), PantryError> {
        let path = cooker.path().clone();
        if !self.state.accepts_registration() {
            return Err(PantryError::usage_order(format!(
                "Cooker '{}' registered while session is {}",
                path, self.state
            ))
            .in_cooker(&path));
        }
        match &cooker {
            CookerInstance::Source(_) if !path.belongs_to(&self.source_id) => {
                return Err(PantryError::source_mismatch(self.source_id.as_str(), &path));
            }
            CookerInstance::Composite(_) if !path.is_composite() => {
                return Err(PantryError::new(
                    codes::INVALID_PATH,
                    format!("Composite cooker '{}' must not be scoped to a source", path),
                )
                .in_cooker(&path));
            }
            _ => {}
        }
        if self.index.contains_key(&path) {
            return Err(PantryError::duplicate_cooker(&path));
        }

        self.index.insert(path, self.slots.len());
        self.slots.push(Some(cooker));
        self.state = SessionState::Registering;
        Ok(())
    }

    pub fn register_source_cooker(&mut self, cooker: Box<dyn SourceCooker<RecordOf<P>>>) -> Result<(), PantryError> {
        self.register(CookerInstance::Source(cooker))
    }

    pub fn register_composite_cooker(&mut self, cooker: Box<dyn CompositeCooker>) -> Result<(), PantryError> {
        self.register(CookerInstance::Composite(cooker))
    }

    pub(crate) fn fault(&mut self) {
        self.state = SessionState::Faulted;
    }

    /// Run the single pass over the source.
    ///
    /// Any error leaves the session `Faulted`; it must then be discarded. A
    /// panicking cooker faults the session too, then the panic continues.
    pub fn process(
        &mut self,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ProcessingSummary, PantryError> {
        if !self.state.accepts_registration() {
            return Err(PantryError::usage_order(format!(
                "Source '{}' processed while session is {}",
                self.source_id, self.state
            )));
        }
        self.state = SessionState::Processing;
        tracing::info!(source = %self.source_id, cookers = self.index.len(), "processing source");

        let started = Instant::now();
        let mut reporter =
            ProgressReporter::new(progress, self.parser.record_count_hint(), self.config.progress_step);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(&mut reporter, cancel, started)));
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                self.state = SessionState::Faulted;
                tracing::error!(source = %self.source_id, records = self.records_processed, "cooker panicked");
                panic::resume_unwind(payload);
            }
        };
        match outcome {
            Ok(summary) => {
                self.state = SessionState::Ready;
                reporter.finish();
                tracing::info!(
                    source = %self.source_id,
                    records = summary.records,
                    deliveries = summary.deliveries,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "source processed"
                );
                Ok(summary)
            }
            Err(err) => {
                self.state = SessionState::Faulted;
                if err.is(codes::CANCELLED) {
                    tracing::warn!(source = %self.source_id, records = self.records_processed, "processing cancelled");
                } else {
                    tracing::error!(source = %self.source_id, code = %err.code, "processing failed: {}", err.message);
                }
                Err(err)
            }
        }
    }

    fn run(
        &mut self,
        reporter: &mut ProgressReporter<'_>,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<ProcessingSummary, PantryError> {
        let graph = self.composite_graph()?;
        let derive_order = graph
            .topological_order()
            .map_err(|cycle| PantryError::dependency_cycle(&cycle))?;
        let routes = self.routes();
        let source_cookers = self.slots.iter().flatten().filter(|c| !c.is_composite()).count();
        let interval = u64::from(self.config.cancel_check_interval.max(1));

        let info = self.parser.source_info();
        self.info = Some(info.clone());
        reporter.emit(0);

        let mut deliveries = 0u64;
        let mut index = 0u64;
        for item in self.parser.records() {
            self.records_processed = index;
            if index % interval == 0 && cancel.is_cancelled() {
                return Err(PantryError::cancelled(index));
            }
            let record = item.map_err(|err| parser_error(err).at_record(index))?;
            let ctx = RecordContext { index, source: &info };

            for target in routes.targets(&record.key()) {
                if let Some(CookerInstance::Source(cooker)) = self.slots[target].as_mut() {
                    if let Err(err) = cooker.receive(&record, &ctx) {
                        return Err(PantryError::processing_failed(cooker.path(), err.to_string()).at_record(index));
                    }
                    deliveries += 1;
                }
            }

            index += 1;
            reporter.advance(index);
        }
        self.records_processed = index;

        if cancel.is_cancelled() {
            return Err(PantryError::cancelled(index));
        }

        for slot in self.slots.iter_mut() {
            if let Some(CookerInstance::Source(cooker)) = slot {
                cooker
                    .end_of_source(&info)
                    .map_err(|err| PantryError::processing_failed(cooker.path(), err.to_string()))?;
            }
        }

        let mut composite_cookers = 0;
        for path in derive_order.iter().filter(|p| p.is_composite()) {
            self.derive(path, &graph)?;
            composite_cookers += 1;
        }

        Ok(ProcessingSummary {
            source: self.source_id.clone(),
            records: index,
            deliveries,
            source_cookers,
            composite_cookers,
            elapsed: started.elapsed(),
        })
    }

    /// Dependency graph of the registered composites. Every dependency must
    /// itself be registered.
    fn composite_graph(&self) -> Result<CookerGraph, PantryError> {
        let mut graph = CookerGraph::new();
        for cooker in self.slots.iter().flatten().filter(|c| c.is_composite()) {
            graph.add_cooker(cooker.path());
            for dep in cooker.dependencies() {
                if !self.index.contains_key(dep) {
                    return Err(PantryError::unresolved_dependency(dep)
                        .in_cooker(cooker.path())
                        .with_note(format!("required by cooker '{}'", cooker.path())));
                }
                graph.add_dependency(cooker.path(), dep);
            }
        }
        Ok(graph)
    }

    fn routes(&self) -> Routes<KeyOf<P>> {
        let mut routes = Routes { all: Vec::new(), by_key: HashMap::new() };
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(CookerInstance::Source(cooker)) = slot else {
                continue;
            };
            match cooker.interest() {
                KeyInterest::All => routes.all.push(i),
                KeyInterest::Keys(keys) => {
                    for key in keys {
                        routes.by_key.entry(key).or_insert_with(Vec::new).push(i);
                    }
                }
            }
        }
        routes
    }

    fn derive(&mut self, path: &CookerPath, graph: &CookerGraph) -> Result<(), PantryError> {
        let slot = self
            .index
            .get(path)
            .copied()
            .ok_or_else(|| PantryError::internal(format!("composite '{}' has no slot", path)))?;
        let mut instance = self.slots[slot]
            .take()
            .ok_or_else(|| PantryError::internal(format!("composite '{}' derived twice", path)))?;

        let result = match &mut instance {
            CookerInstance::Composite(cooker) => {
                let scope: DependencyClosure = graph.dependencies_of(path).into_iter().collect();
                let view = SlotView { slots: &self.slots, index: &self.index };
                let inputs = DataRetrieval::new(&view, Arc::new(scope));
                tracing::debug!(cooker = %path, inputs = inputs.scope().len(), "deriving composite");
                cooker.derive(&inputs)
            }
            CookerInstance::Source(_) => Ok(()),
        };
        self.slots[slot] = Some(instance);
        result.map_err(|err| PantryError::processing_failed(path, err.to_string()))
    }

    /// Value of one output. Only available once the session is `Ready`.
    pub fn query_output(&self, path: &OutputPath) -> Result<Value, QueryError> {
        if self.state != SessionState::Ready {
            return Err(QueryError::NotReady(self.state.name()));
        }
        SlotView { slots: &self.slots, index: &self.index }.query_output(path)
    }
}

fn parser_error(err: PantryError) -> PantryError {
    if err.is(codes::PARSER_FAILED) {
        err
    } else {
        PantryError::parser_failed(err.to_string())
    }
}

impl<P: SourceParser> OutputSource for SourceSession<P> {
    fn query_output(&self, path: &OutputPath) -> Result<Value, QueryError> {
        SourceSession::query_output(self, path)
    }
}

impl<P: SourceParser> fmt::Debug for SourceSession<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSession")
            .field("source_id", &self.source_id)
            .field("state", &self.state)
            .field("cookers", &self.registered_cookers())
            .field("records_processed", &self.records_processed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{output, Recorder, Summed, VecParser};
    use pantry_core::Severity;
    use pantry_plugin::NoProgress;
    use std::sync::atomic::Ordering;

    fn session(keys: &str) -> SourceSession<VecParser> {
        SourceSession::new(VecParser::new("trace", keys), ProcessorConfig::default())
    }

    fn recorder(path: &str) -> CookerInstance<crate::testing::TestRecord> {
        CookerInstance::Source(Box::new(Recorder::new(path, KeyInterest::All)))
    }

    fn seen(session: &SourceSession<VecParser>, cooker: &str) -> Vec<i64> {
        let value = session.query_output(&output(&format!("{}:seen", cooker))).unwrap();
        value.as_list().unwrap().iter().filter_map(Value::as_int).collect()
    }

    #[test]
    fn test_single_pass_over_source() {
        let mut session = session("ABCDEFGHIJ");
        let opened = session.parser.opened.clone();
        for name in ["trace/one", "trace/two", "trace/three"] {
            session.register(recorder(name)).unwrap();
        }

        let summary = session.process(&mut NoProgress, &CancellationToken::new()).unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(summary.records, 10);
        assert_eq!(summary.deliveries, 30);
        assert_eq!(session.state(), SessionState::Ready);
        for name in ["trace/one", "trace/two", "trace/three"] {
            let count = session.query_output(&output(&format!("{}:count", name))).unwrap();
            assert_eq!(count, Value::Int(10));
        }
    }

    #[test]
    fn test_records_delivered_in_source_order() {
        let mut session = session("ABABBAABBA");
        session.register(recorder("trace/all")).unwrap();
        session
            .register_source_cooker(Box::new(Recorder::new("trace/b", KeyInterest::keys(['B']))))
            .unwrap();
        session.process(&mut NoProgress, &CancellationToken::new()).unwrap();

        assert_eq!(seen(&session, "trace/all"), (0..10).collect::<Vec<i64>>());
        assert_eq!(seen(&session, "trace/b"), vec![1, 3, 4, 7, 8]);
        let ended = session.query_output(&output("trace/b:ended")).unwrap();
        assert_eq!(ended, Value::Bool(true));
    }

    #[test]
    fn test_cooker_error_faults_whole_session() {
        let mut session = session("AAAAAAAAAA");
        session.register(recorder("trace/fine")).unwrap();
        session
            .register_source_cooker(Box::new(Recorder::new("trace/bad", KeyInterest::All).failing_at(5)))
            .unwrap();

        let err = session.process(&mut NoProgress, &CancellationToken::new()).unwrap_err();
        assert!(err.is(codes::PROCESSING_FAILED));
        assert_eq!(err.severity, Severity::Fatal);
        assert_eq!(err.context.unwrap().record, Some(5));
        assert_eq!(session.state(), SessionState::Faulted);
        assert_eq!(
            session.query_output(&output("trace/fine:count")),
            Err(QueryError::NotReady("faulted"))
        );
    }

    #[test]
    fn test_parser_error_faults_session() {
        let parser = VecParser::new("trace", "AAAA").failing_at(2);
        let mut session = SourceSession::new(parser, ProcessorConfig::default());
        session.register(recorder("trace/all")).unwrap();
        let err = session.process(&mut NoProgress, &CancellationToken::new()).unwrap_err();
        assert!(err.is(codes::PARSER_FAILED));
        assert_eq!(session.records_processed(), 2);
        assert_eq!(session.state(), SessionState::Faulted);
    }

    #[test]
    fn test_cancellation_stops_delivery() {
        let token = CancellationToken::new();
        let mut session = session("ABABABABAB");
        session
            .register_source_cooker(Box::new(
                Recorder::new("trace/all", KeyInterest::All).cancelling_at(3, token.clone()),
            ))
            .unwrap();

        let err = session.process(&mut NoProgress, &token).unwrap_err();
        assert!(err.is(codes::CANCELLED));
        assert_eq!(session.records_processed(), 4);
        assert_eq!(session.state(), SessionState::Faulted);
        match session.get_cooker(&crate::testing::cooker("trace/all")) {
            Some(cooker) => assert_eq!(cooker.output("count"), Some(Value::Int(4))),
            None => panic!("cooker missing"),
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let mut session = session("AB");
        session.register(recorder("trace/all")).unwrap();
        assert!(session.process(&mut NoProgress, &token).unwrap_err().is(codes::CANCELLED));
        assert_eq!(session.records_processed(), 0);
    }

    #[test]
    fn test_registration_rules() {
        let mut session = session("A");
        let err = session.register(recorder("other/x")).unwrap_err();
        assert!(err.is(codes::SOURCE_MISMATCH));
        assert!(err.is_recoverable());
        assert_eq!(session.state(), SessionState::Built);

        session.register(recorder("trace/x")).unwrap();
        let err = session.register(recorder("trace/x")).unwrap_err();
        assert!(err.is(codes::DUPLICATE_COOKER));
        assert_eq!(session.state(), SessionState::Registering);

        session.process(&mut NoProgress, &CancellationToken::new()).unwrap();
        let err = session.register(recorder("trace/y")).unwrap_err();
        assert!(err.is(codes::USAGE_ORDER));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_process_runs_only_once() {
        let mut session = session("AB");
        let opened = session.parser.opened.clone();
        session.register(recorder("trace/all")).unwrap();
        session.process(&mut NoProgress, &CancellationToken::new()).unwrap();

        let err = session.process(&mut NoProgress, &CancellationToken::new()).unwrap_err();
        assert!(err.is(codes::USAGE_ORDER));
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_query_before_ready() {
        let mut session = session("A");
        session.register(recorder("trace/all")).unwrap();
        assert_eq!(
            session.query_output(&output("trace/all:count")),
            Err(QueryError::NotReady("registering"))
        );
        session.process(&mut NoProgress, &CancellationToken::new()).unwrap();
        assert_eq!(
            session.query_output(&output("trace/all:missing")),
            Err(QueryError::OutputNotFound(output("trace/all:missing")))
        );
        assert!(matches!(
            session.query_output(&output("trace/none:count")),
            Err(QueryError::CookerNotFound(_))
        ));
    }

    #[test]
    fn test_composites_derive_in_dependency_order() {
        let mut session = session("AABBA");
        // Registered before its dependencies on purpose
        session
            .register_composite_cooker(Box::new(Summed::new("outer", &["inner", "trace/b"])))
            .unwrap();
        session
            .register_composite_cooker(Box::new(Summed::new("inner", &["trace/a"]).peeking("trace/b:count")))
            .unwrap();
        session
            .register_source_cooker(Box::new(Recorder::new("trace/a", KeyInterest::keys(['A']))))
            .unwrap();
        session
            .register_source_cooker(Box::new(Recorder::new("trace/b", KeyInterest::keys(['B']))))
            .unwrap();

        let summary = session.process(&mut NoProgress, &CancellationToken::new()).unwrap();
        assert_eq!(summary.composite_cookers, 2);
        assert_eq!(session.query_output(&output("inner:total")), Ok(Value::Int(3)));
        assert_eq!(session.query_output(&output("outer:total")), Ok(Value::Int(5)));

        // inner only sees its own dependencies
        let peek = session.query_output(&output("inner:peek")).unwrap();
        assert!(peek.as_text().unwrap().contains("outside the dependency closure"));
    }

    #[test]
    fn test_missing_composite_dependency_faults() {
        let mut session = session("AB");
        session
            .register_composite_cooker(Box::new(Summed::new("sum", &["trace/missing"])))
            .unwrap();
        let err = session.process(&mut NoProgress, &CancellationToken::new()).unwrap_err();
        assert!(err.is(codes::UNRESOLVED_DEPENDENCY));
        assert_eq!(session.state(), SessionState::Faulted);
    }

    #[test]
    fn test_composite_cycle_faults() {
        let mut session = session("AB");
        session.register_composite_cooker(Box::new(Summed::new("x", &["y"]))).unwrap();
        session.register_composite_cooker(Box::new(Summed::new("y", &["x"]))).unwrap();
        let err = session.process(&mut NoProgress, &CancellationToken::new()).unwrap_err();
        assert!(err.is(codes::DEPENDENCY_CYCLE));
    }

    #[test]
    fn test_completion_hook_error_faults_session() {
        let mut session = session("AB");
        session.register(recorder("trace/fine")).unwrap();
        session
            .register_source_cooker(Box::new(Recorder::new("trace/bad", KeyInterest::All).failing_at_end()))
            .unwrap();

        let err = session.process(&mut NoProgress, &CancellationToken::new()).unwrap_err();
        assert!(err.is(codes::PROCESSING_FAILED));
        assert_eq!(err.context.unwrap().cooker.as_deref(), Some("trace/bad"));
        assert_eq!(session.records_processed(), 2);
        assert_eq!(session.state(), SessionState::Faulted);
        assert_eq!(
            session.query_output(&output("trace/fine:count")),
            Err(QueryError::NotReady("faulted"))
        );
    }

    #[test]
    fn test_derive_error_faults_session() {
        let mut session = session("AB");
        session.register(recorder("trace/a")).unwrap();
        // "ended" is a Bool, so the sum cannot be taken
        session
            .register_composite_cooker(Box::new(Summed::new("sum", &["trace/a"]).summing("ended")))
            .unwrap();

        let err = session.process(&mut NoProgress, &CancellationToken::new()).unwrap_err();
        assert!(err.is(codes::PROCESSING_FAILED));
        assert_eq!(err.context.unwrap().cooker.as_deref(), Some("sum"));
        assert_eq!(session.state(), SessionState::Faulted);
        assert_eq!(
            session.query_output(&output("trace/a:count")),
            Err(QueryError::NotReady("faulted"))
        );
    }

    #[test]
    fn test_panicking_cooker_faults_session() {
        let mut session = session("AAAA");
        session
            .register_source_cooker(Box::new(Recorder::new("trace/bad", KeyInterest::All).panicking_at(2)))
            .unwrap();

        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            session.process(&mut NoProgress, &CancellationToken::new())
        }));
        assert!(caught.is_err());
        assert_eq!(session.state(), SessionState::Faulted);
        assert_eq!(session.records_processed(), 2);
        assert_eq!(
            session.query_output(&output("trace/bad:count")),
            Err(QueryError::NotReady("faulted"))
        );
        let err = session.process(&mut NoProgress, &CancellationToken::new()).unwrap_err();
        assert!(err.is(codes::USAGE_ORDER));
    }

    #[test]
    fn test_progress_is_monotonic_and_completes() {
        let mut reports = Vec::new();
        let mut session = SourceSession::new(
            VecParser::new("trace", &"A".repeat(200)),
            ProcessorConfig::default().with_progress_step(10),
        );
        session.register(recorder("trace/all")).unwrap();
        session
            .process(&mut |p: u8| reports.push(p), &CancellationToken::new())
            .unwrap();

        assert_eq!(reports.first(), Some(&0));
        assert_eq!(reports.last(), Some(&100));
        assert!(reports.windows(2).all(|w| w[0] < w[1]));
        assert!(reports.len() <= 12);
    }

    #[test]
    fn test_empty_source_completes() {
        let mut reports = Vec::new();
        let mut session = session("");
        session.register(recorder("trace/all")).unwrap();
        let summary = session
            .process(&mut |p: u8| reports.push(p), &CancellationToken::new())
            .unwrap();
        assert_eq!(summary.records, 0);
        assert_eq!(reports, vec![0, 100]);
        assert_eq!(session.query_output(&output("trace/all:count")), Ok(Value::Int(0)));
    }
}
