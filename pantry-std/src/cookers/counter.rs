//! Record counter

use crate::names::outputs;
use pantry_plugin::prelude::*;

pub static COUNTER_OUTPUTS: [OutputMeta; 1] = [OutputMeta::new(
    outputs::COUNT,
    "Int",
    "Number of records received",
)];

/// Counts the records matching its key interest
pub struct RecordCounter<K: Eq + std::hash::Hash> {
    path: CookerPath,
    interest: KeyInterest<K>,
    count: u64,
}

impl<K: Eq + std::hash::Hash> RecordCounter<K> {
    pub fn new(path: CookerPath, interest: KeyInterest<K>) -> Self {
        Self { path, interest, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<R: KeyedRecord> SourceCooker<R> for RecordCounter<R::Key> {
    fn path(&self) -> &CookerPath {
        &self.path
    }

    fn interest(&self) -> KeyInterest<R::Key> {
        self.interest.clone()
    }

    fn receive(&mut self, _record: &R, _ctx: &RecordContext<'_>) -> Result<(), PantryError> {
        self.count += 1;
        Ok(())
    }

    fn output(&self, name: &str) -> Option<Value> {
        match name {
            outputs::COUNT => Some(Value::from(self.count)),
            _ => None,
        }
    }
}
