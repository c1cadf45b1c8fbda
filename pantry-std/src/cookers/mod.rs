//! Source cookers

mod counter;
mod histogram;
mod range;

pub use counter::{RecordCounter, COUNTER_OUTPUTS};
pub use histogram::{KeyHistogram, HISTOGRAM_OUTPUTS};
pub use range::{IndexRange, RANGE_OUTPUTS};

#[cfg(test)]
pub(crate) mod test_support {
    use pantry_plugin::KeyedRecord;

    pub struct Event(pub &'static str);

    impl KeyedRecord for Event {
        type Key = &'static str;

        fn key(&self) -> &'static str {
            self.0
        }
    }
}
