//! JSON-lines event sources

use chrono::{DateTime, Utc};
use pantry_core::{PantryError, SourceId};
use pantry_plugin::{KeyedRecord, SourceInfo, SourceParser};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One line of an event file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub key: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl EventRecord {
    /// RFC 3339 `time` field, if present
    pub fn wall_clock(&self) -> Option<DateTime<Utc>> {
        let raw = self.fields.get("time")?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

impl KeyedRecord for EventRecord {
    type Key = String;

    fn key(&self) -> String {
        self.key.clone()
    }
}

/// Parser over one JSON-lines file, loaded up front
pub struct JsonLinesParser {
    source: SourceId,
    path: PathBuf,
    contents: String,
}

impl JsonLinesParser {
    pub fn open(path: impl AsRef<Path>, source: SourceId) -> Result<Self, PantryError> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path).map_err(|e| {
            PantryError::parser_failed(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Ok(Self { source, path, contents })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
    }

    fn peek(line: Option<(usize, &str)>) -> Option<EventRecord> {
        line.and_then(|(_, l)| serde_json::from_str(l).ok())
    }
}

impl SourceParser for JsonLinesParser {
    type Record = EventRecord;

    fn source_id(&self) -> &SourceId {
        &self.source
    }

    /// Timestamps of the first and last event; malformed lines surface
    /// later, while streaming
    fn source_info(&self) -> SourceInfo {
        let first = Self::peek(self.lines().next());
        let last = Self::peek(self.lines().last());
        let first_ts = first.as_ref().and_then(|r| r.timestamp).unwrap_or(0);
        let last_ts = last.and_then(|r| r.timestamp).unwrap_or(first_ts);

        let info = SourceInfo::new(first_ts, last_ts);
        match first.and_then(|r| r.wall_clock()) {
            Some(anchor) => info.with_wall_clock(anchor),
            None => info,
        }
    }

    fn record_count_hint(&self) -> Option<u64> {
        Some(self.lines().count() as u64)
    }

    fn records(&mut self) -> Box<dyn Iterator<Item = Result<EventRecord, PantryError>> + '_> {
        let path = self.path.display().to_string();
        Box::new(self.lines().map(move |(number, line)| {
            serde_json::from_str(line).map_err(|e| {
                PantryError::parser_failed(format!("{}:{}: {}", path, number + 1, e))
            })
        }))
    }
}

/// Source ids for `paths`, derived from file stems and made unique
pub fn source_ids(paths: &[PathBuf]) -> Result<Vec<SourceId>, PantryError> {
    let mut taken = HashSet::new();
    let mut ids = Vec::with_capacity(paths.len());
    for path in paths {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut base: String = stem
            .trim()
            .chars()
            .map(|c| if c == '/' || c == ':' || c.is_control() || c.is_whitespace() { '_' } else { c })
            .collect();
        if base.is_empty() {
            base = "events".to_string();
        }

        let mut candidate = base.clone();
        let mut n = 2;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        ids.push(SourceId::new(candidate)?);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_core::codes;
    use std::io::Write;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    fn source() -> SourceId {
        SourceId::new("events").unwrap()
    }

    #[test]
    fn test_reads_records_and_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "events.jsonl",
            "{\"key\":\"open\",\"timestamp\":10,\"time\":\"2024-05-01T12:00:00Z\",\"fd\":3}\n\n{\"key\":\"close\",\"timestamp\":25}\n",
        );
        let mut parser = JsonLinesParser::open(&path, source()).unwrap();
        assert_eq!(parser.record_count_hint(), Some(2));

        let info = parser.source_info();
        assert_eq!((info.first_timestamp, info.last_timestamp), (10, 25));
        assert_eq!(info.wall_clock.unwrap().to_rfc3339(), "2024-05-01T12:00:00+00:00");

        let records: Vec<EventRecord> = parser.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key(), "open");
        assert_eq!(records[0].fields.get("fd"), Some(&serde_json::json!(3)));
        assert_eq!(records[1].timestamp, Some(25));
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.jsonl", "{\"key\":\"a\"}\n{\"nokey\":1}\n");
        let mut parser = JsonLinesParser::open(&path, source()).unwrap();
        let results: Vec<_> = parser.records().collect();
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert!(err.is(codes::PARSER_FAILED));
        assert!(err.message.contains("bad.jsonl:2"));
    }

    #[test]
    fn test_missing_file() {
        let err = JsonLinesParser::open("/definitely/not/here.jsonl", source()).err().unwrap();
        assert!(err.is(codes::PARSER_FAILED));
    }

    #[test]
    fn test_source_ids_are_unique() {
        let paths: Vec<PathBuf> = ["a/web log.jsonl", "b/web log.jsonl", "c/.jsonl"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let ids: Vec<String> = source_ids(&paths)
            .unwrap()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["web_log", "web_log_2", ".jsonl"]);
    }
}
