//! Fixtures shared by the engine tests

use pantry_core::{CookerPath, OutputPath, PantryError, SourceId, Value};
use pantry_plugin::{
    CancellationToken, CompositeCooker, CompositeCookerFactory, CookerMeta, CookerRegistry,
    DataRetrieval, FnFactory, KeyInterest, KeyedRecord, OutputMeta, RecordContext, SourceCooker,
    SourceCookerFactory, SourceInfo, SourceParser,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TestRecord {
    pub key: char,
    pub seq: u64,
}

impl KeyedRecord for TestRecord {
    type Key = char;

    fn key(&self) -> char {
        self.key
    }
}

/// Vector-backed parser that counts how often its stream was opened
pub struct VecParser {
    source: SourceId,
    keys: Vec<char>,
    fail_at: Option<u64>,
    pub opened: Arc<AtomicUsize>,
}

impl VecParser {
    pub fn new(source: &str, keys: &str) -> Self {
        Self {
            source: SourceId::new(source).unwrap(),
            keys: keys.chars().collect(),
            fail_at: None,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl SourceParser for VecParser {
    type Record = TestRecord;

    fn source_id(&self) -> &SourceId {
        &self.source
    }

    fn source_info(&self) -> SourceInfo {
        SourceInfo::new(0, self.keys.len() as i64)
    }

    fn record_count_hint(&self) -> Option<u64> {
        Some(self.keys.len() as u64)
    }

    fn records(&mut self) -> Box<dyn Iterator<Item = Result<TestRecord, PantryError>> + '_> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let fail_at = self.fail_at;
        Box::new(self.keys.iter().enumerate().map(move |(i, &key)| {
            let seq = i as u64;
            if Some(seq) == fail_at {
                Err(PantryError::parser_failed("truncated record"))
            } else {
                Ok(TestRecord { key, seq })
            }
        }))
    }
}

pub static RECORDER_OUTPUTS: [OutputMeta; 3] = [
    OutputMeta::new("count", "Int", "records received"),
    OutputMeta::new("seen", "List", "sequence numbers in delivery order"),
    OutputMeta::new("ended", "Bool", "end of source observed"),
];

/// Source cooker that remembers every record it was handed
pub struct Recorder {
    path: CookerPath,
    interest: KeyInterest<char>,
    seen: Vec<u64>,
    ended: bool,
    fail_at: Option<u64>,
    fail_at_end: bool,
    panic_at: Option<u64>,
    cancel_at: Option<(u64, CancellationToken)>,
}

impl Recorder {
    pub fn new(path: &str, interest: KeyInterest<char>) -> Self {
        Self {
            path: cooker(path),
            interest,
            seen: Vec::new(),
            ended: false,
            fail_at: None,
            fail_at_end: false,
            panic_at: None,
            cancel_at: None,
        }
    }

    pub fn failing_at(mut self, seq: u64) -> Self {
        self.fail_at = Some(seq);
        self
    }

    /// Return an error from `end_of_source`
    pub fn failing_at_end(mut self) -> Self {
        self.fail_at_end = true;
        self
    }

    pub fn panicking_at(mut self, seq: u64) -> Self {
        self.panic_at = Some(seq);
        self
    }

    /// Cancel `token` while handling record `seq`
    pub fn cancelling_at(mut self, seq: u64, token: CancellationToken) -> Self {
        self.cancel_at = Some((seq, token));
        self
    }
}

impl SourceCooker<TestRecord> for Recorder {
    fn path(&self) -> &CookerPath {
        &self.path
    }

    fn interest(&self) -> KeyInterest<char> {
        self.interest.clone()
    }

    fn receive(&mut self, record: &TestRecord, ctx: &RecordContext<'_>) -> Result<(), PantryError> {
        assert_eq!(record.seq, ctx.index);
        if self.fail_at == Some(record.seq) {
            return Err(PantryError::new("BOOM", "cooker exploded"));
        }
        if self.panic_at == Some(record.seq) {
            panic!("recorder panicked at record {}", record.seq);
        }
        self.seen.push(record.seq);
        if let Some((seq, token)) = &self.cancel_at {
            if *seq == record.seq {
                token.cancel();
            }
        }
        Ok(())
    }

    fn end_of_source(&mut self, _info: &SourceInfo) -> Result<(), PantryError> {
        if self.fail_at_end {
            return Err(PantryError::new("BOOM", "completion hook failed"));
        }
        self.ended = true;
        Ok(())
    }

    fn output(&self, name: &str) -> Option<Value> {
        match name {
            "count" => Some(Value::from(self.seen.len())),
            "seen" => Some(Value::List(self.seen.iter().map(|&s| Value::from(s)).collect())),
            "ended" => Some(Value::Bool(self.ended)),
            _ => None,
        }
    }
}

pub static SUM_OUTPUTS: [OutputMeta; 2] = [
    OutputMeta::new("total", "Int", "sum of every dependency's count"),
    OutputMeta::new("peek", "Text", "result of the out-of-scope peek"),
];

/// Composite cooker summing one integer output (`count` by default) of its
/// direct dependencies
pub struct Summed {
    path: CookerPath,
    deps: Vec<CookerPath>,
    input: &'static str,
    peek: Option<OutputPath>,
    total: Option<i64>,
    peek_result: Option<String>,
}

impl Summed {
    pub fn new(path: &str, deps: &[&str]) -> Self {
        Self {
            path: cooker(path),
            deps: deps.iter().map(|d| cooker(d)).collect(),
            input: "count",
            peek: None,
            total: None,
            peek_result: None,
        }
    }

    /// Sum output `name` instead of `count`
    pub fn summing(mut self, name: &'static str) -> Self {
        self.input = name;
        self
    }

    /// Query `path` during derivation and expose what happened
    pub fn peeking(mut self, path: &str) -> Self {
        self.peek = Some(output(path));
        self
    }
}

impl CompositeCooker for Summed {
    fn path(&self) -> &CookerPath {
        &self.path
    }

    fn dependencies(&self) -> &[CookerPath] {
        &self.deps
    }

    fn derive(&mut self, inputs: &DataRetrieval<'_>) -> Result<(), PantryError> {
        let mut total = 0;
        for dep in &self.deps {
            let count = dep.output(self.input)?;
            total += inputs.query_output::<i64>(&count)?;
        }
        self.total = Some(total);
        if let Some(peek) = &self.peek {
            self.peek_result = Some(match inputs.query_value(peek) {
                Ok(value) => value.to_string(),
                Err(err) => err.to_string(),
            });
        }
        Ok(())
    }

    fn output(&self, name: &str) -> Option<Value> {
        match name {
            "total" => self.total.map(Value::Int),
            // Composite "count" lets composites stack on composites
            "count" => self.total.map(Value::Int),
            "peek" => self.peek_result.clone().map(Value::Text),
            _ => None,
        }
    }
}

pub fn cooker(path: &str) -> CookerPath {
    CookerPath::parse(path).unwrap()
}

pub fn output(path: &str) -> OutputPath {
    OutputPath::parse(path).unwrap()
}

pub fn recorder_factory(path: &str, interest: KeyInterest<char>) -> impl SourceCookerFactory<TestRecord> {
    let meta = CookerMeta::source(cooker(path), "records deliveries", &RECORDER_OUTPUTS);
    let path = path.to_string();
    FnFactory::new(meta, move || {
        Box::new(Recorder::new(&path, interest.clone())) as Box<dyn SourceCooker<TestRecord>>
    })
}

pub fn summed_factory(path: &str, deps: &[&str]) -> impl CompositeCookerFactory {
    let deps: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
    let meta = CookerMeta::composite(
        cooker(path),
        "sums dependency counts",
        deps.iter().map(|d| cooker(d)).collect(),
        &SUM_OUTPUTS,
    );
    let path = path.to_string();
    FnFactory::new(meta, move || {
        let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
        Box::new(Summed::new(&path, &deps)) as Box<dyn CompositeCooker>
    })
}

/// Registry over source `trace`:
///
/// ```text
/// trace/a (key A)   trace/all (all keys)   trace/b (key B)   other/x (all)
/// sum_a   -> trace/a
/// sum_all -> sum_a, trace/all
/// ```
pub fn registry() -> CookerRegistry<TestRecord> {
    CookerRegistry::new()
        .with_source_cooker(recorder_factory("trace/a", KeyInterest::keys(['A'])))
        .and_then(|r| r.with_source_cooker(recorder_factory("trace/all", KeyInterest::All)))
        .and_then(|r| r.with_source_cooker(recorder_factory("trace/b", KeyInterest::keys(['B']))))
        .and_then(|r| r.with_source_cooker(recorder_factory("other/x", KeyInterest::All)))
        .and_then(|r| r.with_composite_cooker(summed_factory("sum_a", &["trace/a"])))
        .and_then(|r| r.with_composite_cooker(summed_factory("sum_all", &["sum_a", "trace/all"])))
        .unwrap()
}
