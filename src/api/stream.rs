//! Purpose: JSON-lines record streams on top of a `Marshaller`.
//! Exports: `ErrorPolicy`, `StreamOutcome`, `LoadedRecord`, `write_jsonl`, `read_jsonl`.
//! Role: Boundary helpers for callers that persist one `Json` document per line.
//! Invariants: Written lines keep codec key order; one document per line, `\n`-terminated.
//! Invariants: Skip mode only continues at line boundaries and logs every skipped record.
//! Invariants: Blank lines are ignored and do not count as records.
use std::io::{self, BufRead, Write};

use crate::api::marshaller::Marshaller;
use crate::core::error::{Error, ErrorKind};
use crate::core::value::Value;
use crate::json::{Json, parse};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorPolicy {
    Stop,
    Skip,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StreamOutcome {
    pub records_total: u64,
    pub ok: u64,
    pub failed: u64,
}

/// A successfully loaded line: the parsed document and the value decoded from it.
#[derive(Clone, Debug)]
pub struct LoadedRecord {
    pub line: u64,
    pub json: Json,
    pub value: Value,
}

fn io_error(err: io::Error, message: &str) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(message)
        .with_source(err)
}

pub fn write_jsonl<'a, W, I>(marshaller: &Marshaller, values: I, mut writer: W) -> Result<u64, Error>
where
    W: Write,
    I: IntoIterator<Item = &'a Value>,
{
    let mut written = 0u64;
    for value in values {
        let line = written + 1;
        let json = marshaller.dump(value).map_err(|err| err.with_line(line))?;
        let bytes = parse::to_vec(&json).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode record")
                .with_source(err)
                .with_line(line)
        })?;
        writer
            .write_all(&bytes)
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|err| io_error(err, "failed to write record"))?;
        written += 1;
    }
    writer
        .flush()
        .map_err(|err| io_error(err, "failed to flush records"))?;
    Ok(written)
}

pub fn read_jsonl<R, F>(
    marshaller: &Marshaller,
    reader: R,
    policy: ErrorPolicy,
    mut on_record: F,
) -> Result<StreamOutcome, Error>
where
    R: BufRead,
    F: FnMut(LoadedRecord) -> Result<(), Error>,
{
    let mut outcome = StreamOutcome::default();
    for (idx, chunk) in reader.split(b'\n').enumerate() {
        let line = idx as u64 + 1;
        let mut bytes = chunk.map_err(|err| io_error(err, "failed to read records"))?;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        if bytes.iter().all(|byte| byte.is_ascii_whitespace()) {
            continue;
        }
        outcome.records_total += 1;

        let loaded = parse::from_slice(&bytes)
            .map_err(|err| {
                let hint = parse::hint_for_error(&err, "jsonl record");
                Error::new(ErrorKind::Parse)
                    .with_message("record is not valid JSON")
                    .with_hint(hint)
                    .with_source(err)
            })
            .and_then(|json| marshaller.load(&json).map(|value| (json, value)))
            .map_err(|err| err.with_line(line));

        match loaded {
            Ok((json, value)) => {
                on_record(LoadedRecord { line, json, value })?;
                outcome.ok += 1;
            }
            Err(err) => match policy {
                ErrorPolicy::Stop => return Err(err),
                ErrorPolicy::Skip => {
                    tracing::warn!(line, kind = ?err.kind(), error = %err, "skipping record");
                    outcome.failed += 1;
                }
            },
        }
    }
    Ok(outcome)
}
