//! Source and record context passed to cookers

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Range metadata of a source, supplied by its parser.
///
/// Timestamps are nanoseconds on the source's own clock; `wall_clock`
/// anchors `first_timestamp` to real time when the parser knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub first_timestamp: i64,
    pub last_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_clock: Option<DateTime<Utc>>,
}

impl SourceInfo {
    pub fn new(first_timestamp: i64, last_timestamp: i64) -> Self {
        Self { first_timestamp, last_timestamp, wall_clock: None }
    }

    pub fn with_wall_clock(mut self, anchor: DateTime<Utc>) -> Self {
        self.wall_clock = Some(anchor);
        self
    }

    pub fn duration_nanos(&self) -> i64 {
        self.last_timestamp.saturating_sub(self.first_timestamp)
    }

    /// Wall-clock time of a source timestamp, if the source is anchored
    pub fn wall_clock_at(&self, timestamp: i64) -> Option<DateTime<Utc>> {
        let anchor = self.wall_clock?;
        let delta = timestamp.checked_sub(self.first_timestamp)?;
        anchor.checked_add_signed(Duration::nanoseconds(delta))
    }
}

/// Per-record context handed to `SourceCooker::receive`
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    /// Zero-based position of the record in the source stream
    pub index: u64,
    pub source: &'a SourceInfo,
}
