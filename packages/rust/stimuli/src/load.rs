//! Record loading and validation for resolved stimulus sources.
//!
//! Each source loads independently: a read failure or a schema mismatch
//! anywhere in a source drops that source (with a logged error) and yields
//! zero records, without aborting its siblings. Record sets concatenate in
//! source-declaration order.

use tracing::{debug, error};

use trialforge_shared::{Record, RecordSchema, Result, TrialforgeError};

use crate::ResolvedStimuli;
use crate::sources::{ResolvedSource, SourceFormat};

/// Load and validate every record of every source of a stimuli set.
pub async fn load_records(stimuli: &ResolvedStimuli) -> Vec<Record> {
    let mut handles = Vec::with_capacity(stimuli.sources.len());
    for source in &stimuli.sources {
        let source = source.clone();
        let schema = stimuli.schema.clone();
        handles.push(tokio::spawn(
            async move { load_source(&source, &schema).await },
        ));
    }

    let mut records = Vec::new();
    for (handle, source) in handles.into_iter().zip(&stimuli.sources) {
        match handle.await {
            Ok(batch) => records.extend(batch),
            Err(e) => {
                error!(source = %source.basename, error = %e, "source load task failed");
            }
        }
    }

    debug!(
        stimuli = %stimuli.name,
        records = records.len(),
        sources = stimuli.sources.len(),
        "stimulus records loaded"
    );
    records
}

/// Load one source, degrading to zero records on read or validation failure.
pub async fn load_source(source: &ResolvedSource, schema: &RecordSchema) -> Vec<Record> {
    let content = match tokio::fs::read_to_string(&source.path).await {
        Ok(content) => content,
        Err(e) => {
            error!(source = %source.basename, error = %e, "failed to read stimulus source");
            return Vec::new();
        }
    };

    match parse_and_validate(&content, source.format, schema) {
        Ok(records) => records,
        Err(e) => {
            error!(
                source = %source.basename,
                error = %e,
                "failed to validate stimulus source against schema, dropping source"
            );
            Vec::new()
        }
    }
}

/// Parse raw content and validate every record. Any failure rejects the
/// whole source; partial records are not salvaged.
fn parse_and_validate(
    content: &str,
    format: SourceFormat,
    schema: &RecordSchema,
) -> Result<Vec<Record>> {
    let raw = match format {
        SourceFormat::Csv => parse_delimited(content, b',', schema)?,
        SourceFormat::Tsv => parse_delimited(content, b'\t', schema)?,
        SourceFormat::Jsonl => parse_jsonl(content)?,
    };

    raw.iter().map(|r| schema.validate_record(r)).collect()
}

fn parse_delimited(content: &str, delimiter: u8, schema: &RecordSchema) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| TrialforgeError::Stimuli(format!("bad header row: {e}")))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| TrialforgeError::Stimuli(format!("bad row: {e}")))?;
        let mut record = Record::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            record.insert(header.to_string(), schema.coerce_cell(header, cell));
        }
        records.push(record);
    }

    Ok(records)
}

fn parse_jsonl(content: &str) -> Result<Vec<Record>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line)
                .map_err(|e| TrialforgeError::Stimuli(format!("bad JSONL line: {e}")))?;
            value
                .as_object()
                .cloned()
                .ok_or_else(|| TrialforgeError::Stimuli("JSONL line is not an object".into()))
        })
        .collect()
}
