//! Observed index range

use crate::names::outputs;
use pantry_plugin::prelude::*;

pub static RANGE_OUTPUTS: [OutputMeta; 3] = [
    OutputMeta::new(outputs::FIRST_INDEX, "Int?", "Index of the first record"),
    OutputMeta::new(outputs::LAST_INDEX, "Int?", "Index of the last record"),
    OutputMeta::new(outputs::ORDERED, "Bool", "Every index was strictly greater than the previous one"),
];

/// Tracks the first and last record index delivered
pub struct IndexRange {
    path: CookerPath,
    first: Option<u64>,
    last: Option<u64>,
    ordered: bool,
}

impl IndexRange {
    pub fn new(path: CookerPath) -> Self {
        Self { path, first: None, last: None, ordered: true }
    }

    fn observe(&mut self, index: u64) {
        if let Some(last) = self.last {
            self.ordered &= index > last;
        }
        self.first.get_or_insert(index);
        self.last = Some(index);
    }
}

impl<R: KeyedRecord> SourceCooker<R> for IndexRange {
    fn path(&self) -> &CookerPath {
        &self.path
    }

    fn interest(&self) -> KeyInterest<R::Key> {
        KeyInterest::All
    }

    fn receive(&mut self, _record: &R, ctx: &RecordContext<'_>) -> Result<(), PantryError> {
        self.observe(ctx.index);
        Ok(())
    }

    fn output(&self, name: &str) -> Option<Value> {
        match name {
            outputs::FIRST_INDEX => Some(Value::from(self.first)),
            outputs::LAST_INDEX => Some(Value::from(self.last)),
            outputs::ORDERED => Some(Value::Bool(self.ordered)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookers::test_support::Event;

    fn output(range: &IndexRange, name: &str) -> Value {
        SourceCooker::<Event>::output(range, name).unwrap()
    }

    #[test]
    fn test_range_of_delivered_indices() {
        let info = SourceInfo::default();
        let mut range = IndexRange::new(CookerPath::parse("log/range").unwrap());
        assert_eq!(output(&range, "first_index"), Value::Null);

        for index in [2, 5, 9] {
            let ctx = RecordContext { index, source: &info };
            SourceCooker::<Event>::receive(&mut range, &Event("a"), &ctx).unwrap();
        }
        assert_eq!(output(&range, "first_index"), Value::Int(2));
        assert_eq!(output(&range, "last_index"), Value::Int(9));
        assert_eq!(output(&range, "ordered"), Value::Bool(true));
    }

    #[test]
    fn test_out_of_order_detected() {
        let mut range = IndexRange::new(CookerPath::parse("log/range").unwrap());
        range.observe(3);
        range.observe(3);
        assert_eq!(output(&range, "ordered"), Value::Bool(false));
    }
}
