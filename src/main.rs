//! Purpose: `cachew-marshal` CLI entry point.
//! Role: Binary crate root; parses args, installs logging, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable JSON envelopes on stdout (JSON lines for `normalize`).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::error::Error as StdError;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use cachew_marshal::api::{
    Error, ErrorKind, ErrorPolicy, MarshalOptions, Marshaller, TypeDesc, to_exit_code,
};

/// Exit code for `check` runs that found bad or non-canonical records.
const CHECK_FAILED_EXIT: i32 = 10;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `cachew-marshal --help` for usage."));
            }
        },
    };

    let options = MarshalOptions::new().with_union_keys(cli.tag_key, cli.value_key);
    command_dispatch::dispatch_command(cli.command, &options)
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .next()
        .unwrap_or("invalid arguments")
        .trim_start_matches("error: ")
        .to_string()
}

#[derive(Parser)]
#[command(
    name = "cachew-marshal",
    version,
    about = "Compile record schemas and verify JSON-lines caches against them",
    long_about = None,
    after_help = r#"EXAMPLES
  $ cachew-marshal describe person.schema.json
  $ cachew-marshal check person.schema.json cache.jsonl
  $ cat cache.jsonl | cachew-marshal normalize person.schema.json --errors skip

NOTES
  - Schemas are JSON descriptors: "int", {"optional": ...}, {"record": {"name", "fields"}}, ...
  - Set RUST_LOG=debug to see compiled schemas and skipped records"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "tag",
        help = "Object key holding a union variant's tag"
    )]
    tag_key: String,
    #[arg(
        long,
        global = true,
        default_value = "value",
        help = "Object key holding a union variant's payload"
    )]
    value_key: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, ValueEnum)]
enum ErrorPolicyCli {
    Stop,
    Skip,
}

impl From<ErrorPolicyCli> for ErrorPolicy {
    fn from(value: ErrorPolicyCli) -> Self {
        match value {
            ErrorPolicyCli::Stop => ErrorPolicy::Stop,
            ErrorPolicyCli::Skip => ErrorPolicy::Skip,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Compile a schema and print its canonical form, fingerprint, and union tags")]
    Describe {
        #[arg(help = "Schema descriptor file (JSON)", value_hint = ValueHint::FilePath)]
        schema: PathBuf,
    },
    #[command(
        about = "Load every record of a JSON-lines file and verify it re-dumps identically",
        after_help = "Exits 10 when any record fails to load or is not in canonical form."
    )]
    Check {
        #[arg(help = "Schema descriptor file (JSON)", value_hint = ValueHint::FilePath)]
        schema: PathBuf,
        #[arg(help = "JSON-lines input (default: stdin; use - for stdin)", value_hint = ValueHint::FilePath)]
        input: Option<String>,
        #[arg(long, value_enum, default_value = "stop", help = "On a bad record: stop|skip")]
        errors: ErrorPolicyCli,
    },
    #[command(about = "Load and re-dump every record, writing canonical JSON lines to stdout")]
    Normalize {
        #[arg(help = "Schema descriptor file (JSON)", value_hint = ValueHint::FilePath)]
        schema: PathBuf,
        #[arg(help = "JSON-lines input (default: stdin; use - for stdin)", value_hint = ValueHint::FilePath)]
        input: Option<String>,
        #[arg(long, value_enum, default_value = "stop", help = "On a bad record: stop|skip")]
        errors: ErrorPolicyCli,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(about = "Print version info")]
    Version,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn load_marshaller(path: &Path, options: &MarshalOptions) -> Result<Marshaller, Error> {
    let bytes = std::fs::read(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to read schema {}", path.display()))
            .with_source(err)
    })?;
    let desc: TypeDesc = serde_json::from_slice(&bytes).map_err(|err| {
        Error::new(ErrorKind::Schema)
            .with_message(format!("invalid schema descriptor {}", path.display()))
            .with_hint(cachew_marshal::json::parse::hint_for_error(&err, "schema descriptor"))
            .with_source(err)
    })?;
    Marshaller::with_options(&desc, options)
}

fn open_input(input: Option<&str>) -> Result<Box<dyn BufRead>, Error> {
    match input {
        None | Some("-") => Ok(Box::new(BufReader::new(io::stdin()))),
        Some(path) => {
            let file = File::open(path).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message(format!("failed to open {path}"))
                    .with_source(err)
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

fn emit_json(value: Value) -> Result<(), Error> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &value)
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode output")
                .with_source(err)
        })
        .and_then(|_| {
            writeln!(stdout).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write output")
                    .with_source(err)
            })
        })
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        if let Some(hint) = err.hint() {
            eprintln!("hint: {hint}");
        }
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert(
        "message".to_string(),
        json!(err.message().unwrap_or("unknown error")),
    );
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(location) = err.location() {
        inner.insert("location".to_string(), json!(location));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}
