//! Event tables and per-file reports

use crate::source::{EventRecord, JsonLinesParser};
use pantry::{ProcessingSummary, ProcessorConfig, SourceProcessor};
use pantry_core::{PantryError, SourceId, Value};
use pantry_plugin::{CancellationToken, CookerRegistry, TableDescriptor, TableId};
use pantry_std::names;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const EVENT_SUMMARY: &str = "event-summary";
pub const EVENT_ORDER: &str = "event-order";

/// Tables enabled for every event file
pub fn event_tables(source: &SourceId) -> Result<Vec<TableDescriptor>, PantryError> {
    let summary = TableDescriptor::new(TableId::new_v4(), EVENT_SUMMARY)
        .with_cooker(pantry_std::source_cooker_path(source, names::RECORD_COUNTER)?)
        .with_cooker(pantry_std::source_cooker_path(source, names::KEY_HISTOGRAM)?)
        .with_cooker(pantry_std::key_share_path(source)?);
    let order = TableDescriptor::new(TableId::new_v4(), EVENT_ORDER)
        .with_cooker(pantry_std::source_cooker_path(source, names::INDEX_RANGE)?);
    Ok(vec![summary, order])
}

/// Outputs of one table, keyed by output path
#[derive(Debug, Serialize)]
pub struct TableReport {
    pub name: String,
    pub id: TableId,
    pub outputs: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub source: SourceId,
    pub summary: ProcessingSummary,
    pub tables: Vec<TableReport>,
}

/// Result for one input file
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Report(FileReport),
    Failed { file: PathBuf, error: PantryError },
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

/// Process one file through the event tables
pub fn process_file(
    path: &Path,
    source: SourceId,
    registry: Arc<CookerRegistry<EventRecord>>,
    config: ProcessorConfig,
    cancel: &CancellationToken,
) -> Result<FileReport, PantryError> {
    let parser = JsonLinesParser::open(path, source.clone())?;
    let mut processor = SourceProcessor::new(registry, parser, config)?;

    let tables = event_tables(&source)?;
    for table in &tables {
        processor.enable_table(table.clone())?;
    }

    let label = source.clone();
    let mut progress = |percent: u8| tracing::debug!(source = %label, percent, "progress");
    let summary = processor.process(&mut progress, cancel)?;

    let mut reports = Vec::with_capacity(tables.len());
    for table in &tables {
        reports.push(table_report(&processor, table)?);
    }

    Ok(FileReport {
        file: path.to_path_buf(),
        source,
        summary,
        tables: reports,
    })
}

fn table_report(
    processor: &SourceProcessor<JsonLinesParser>,
    table: &TableDescriptor,
) -> Result<TableReport, PantryError> {
    let retrieval = processor.retrieval(&table.id)?;
    let mut outputs = BTreeMap::new();
    let mut errors = BTreeMap::new();

    for cooker in retrieval.scope().cookers() {
        let Some(meta) = processor.registry().meta(cooker) else {
            continue;
        };
        for output in meta.outputs {
            let path = cooker.output(output.name)?;
            match retrieval.query_value(&path) {
                Ok(value) => {
                    outputs.insert(path.to_string(), value);
                }
                Err(err) => {
                    errors.insert(path.to_string(), err.to_string());
                }
            }
        }
    }

    Ok(TableReport {
        name: table.name.clone(),
        id: table.id,
        outputs,
        errors,
    })
}
