//! Per-key record histogram

use crate::names::outputs;
use pantry_plugin::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

pub static HISTOGRAM_OUTPUTS: [OutputMeta; 3] = [
    OutputMeta::new(outputs::HISTOGRAM, "Object", "Records per key"),
    OutputMeta::new(outputs::DISTINCT_KEYS, "Int", "Number of distinct keys seen"),
    OutputMeta::new(outputs::TOTAL, "Int", "Number of records seen"),
];

/// Counts records per key over the whole source
pub struct KeyHistogram<K> {
    path: CookerPath,
    counts: HashMap<K, u64>,
    total: u64,
}

impl<K: Eq + Hash> KeyHistogram<K> {
    pub fn new(path: CookerPath) -> Self {
        Self { path, counts: HashMap::new(), total: 0 }
    }
}

impl<K: Display> KeyHistogram<K> {
    /// Counts keyed by the key's display form
    fn histogram(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        for (key, count) in &self.counts {
            // Distinct keys may share a display form
            let entry = map.entry(key.to_string()).or_insert(Value::Int(0));
            if let Value::Int(n) = entry {
                *n += *count as i64;
            }
        }
        map
    }
}

impl<R> SourceCooker<R> for KeyHistogram<R::Key>
where
    R: KeyedRecord,
    R::Key: Display,
{
    fn path(&self) -> &CookerPath {
        &self.path
    }

    fn interest(&self) -> KeyInterest<R::Key> {
        KeyInterest::All
    }

    fn receive(&mut self, record: &R, _ctx: &RecordContext<'_>) -> Result<(), PantryError> {
        *self.counts.entry(record.key()).or_insert(0) += 1;
        self.total += 1;
        Ok(())
    }

    fn output(&self, name: &str) -> Option<Value> {
        match name {
            outputs::HISTOGRAM => Some(Value::Object(self.histogram())),
            outputs::DISTINCT_KEYS => Some(Value::from(self.counts.len())),
            outputs::TOTAL => Some(Value::from(self.total)),
            _ => None,
        }
    }
}
