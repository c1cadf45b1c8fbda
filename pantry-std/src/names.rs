//! Cooker and output names of the standard library

pub const RECORD_COUNTER: &str = "record_counter";
pub const KEY_HISTOGRAM: &str = "key_histogram";
pub const INDEX_RANGE: &str = "index_range";
pub const KEY_SHARE: &str = "key_share";

pub mod outputs {
    pub const COUNT: &str = "count";

    pub const HISTOGRAM: &str = "histogram";
    pub const DISTINCT_KEYS: &str = "distinct_keys";
    pub const TOTAL: &str = "total";

    pub const FIRST_INDEX: &str = "first_index";
    pub const LAST_INDEX: &str = "last_index";
    pub const ORDERED: &str = "ordered";

    pub const SHARES: &str = "shares";
    pub const DOMINANT_KEY: &str = "dominant_key";
}
