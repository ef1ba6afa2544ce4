//! Purpose: Hold top-level CLI command dispatch for `cachew-marshal`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: `check` never writes records; `normalize` writes only re-dumped records.
//! Invariants: Helpers in `main.rs` remain the source of I/O and error shaping.

use std::io::BufWriter;

use cachew_marshal::api::stream::{LoadedRecord, read_jsonl};
use cachew_marshal::json::parse;

use super::*;

pub(super) fn dispatch_command(command: Command, options: &MarshalOptions) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "cachew-marshal", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_json(json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }))?;
            Ok(RunOutcome::ok())
        }
        Command::Describe { schema } => {
            let marshaller = load_marshaller(&schema, options)?;
            let compiled = marshaller.schema();
            let unions = compiled
                .unions()
                .into_iter()
                .map(|(name, tags)| json!({ "name": name, "tags": tags }))
                .collect::<Vec<_>>();
            emit_json(json!({
                "canonical": compiled.canonical(),
                "fingerprint": compiled.fingerprint(),
                "unions": unions,
            }))?;
            Ok(RunOutcome::ok())
        }
        Command::Check {
            schema,
            input,
            errors,
        } => {
            let marshaller = load_marshaller(&schema, options)?;
            let reader = open_input(input.as_deref())?;
            let mut noncanonical = 0u64;
            let outcome = read_jsonl(&marshaller, reader, errors.into(), |record| {
                let (canonical, original) = redump(&marshaller, &record)?;
                if canonical != original {
                    tracing::debug!(line = record.line, "record is not in canonical form");
                    noncanonical += 1;
                }
                Ok(())
            })?;
            tracing::info!(
                records_total = outcome.records_total,
                ok = outcome.ok,
                failed = outcome.failed,
                noncanonical,
                "check finished"
            );
            emit_json(json!({
                "fingerprint": marshaller.fingerprint(),
                "records_total": outcome.records_total,
                "ok": outcome.ok,
                "failed": outcome.failed,
                "noncanonical": noncanonical,
            }))?;
            let exit_code = if outcome.failed > 0 || noncanonical > 0 {
                CHECK_FAILED_EXIT
            } else {
                0
            };
            Ok(RunOutcome::with_code(exit_code))
        }
        Command::Normalize {
            schema,
            input,
            errors,
        } => {
            let marshaller = load_marshaller(&schema, options)?;
            let reader = open_input(input.as_deref())?;
            let mut out = BufWriter::new(io::stdout().lock());
            let outcome = read_jsonl(&marshaller, reader, errors.into(), |record| {
                let (canonical, _) = redump(&marshaller, &record)?;
                out.write_all(&canonical)
                    .and_then(|_| out.write_all(b"\n"))
                    .map_err(|err| {
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write record")
                            .with_source(err)
                            .with_line(record.line)
                    })
            })?;
            out.flush().map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to flush output")
                    .with_source(err)
            })?;
            tracing::info!(
                records_total = outcome.records_total,
                written = outcome.ok,
                failed = outcome.failed,
                "normalize finished"
            );
            Ok(RunOutcome::ok())
        }
    }
}

/// Re-dumps a loaded record, returning `(canonical, original)` encodings.
fn redump(marshaller: &Marshaller, record: &LoadedRecord) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let encode = |json: &Value| {
        parse::to_vec(json).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode record")
                .with_source(err)
                .with_line(record.line)
        })
    };
    let dumped = marshaller
        .dump(&record.value)
        .map_err(|err| err.with_line(record.line))?;
    Ok((encode(&dumped)?, encode(&record.json)?))
}
