//! Runs the fixture cases in `fixtures/cases.json` against the compiled schema.
//!
//! Usage: `cargo run -p dev-test-runner [NAME_REGEX]`
use std::path::PathBuf;
use std::process::ExitCode;

use json_wire::{CodecSet, Schema};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct CaseFile {
    /// relative to the cases file
    schema: String,
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    record: String,
    wire: Value,
    expect: Expect,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Expect {
    /// fromWire then toWire gives back `wire` exactly
    RoundTrip,
    /// toWire output differs from the input (dropped keys, truncated seconds)
    Normalizes(Value),
    /// fromWire fails and the message contains this text
    Error(String),
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("fixtures")
}

fn load() -> Result<(CaseFile, CodecSet), String> {
    let cases_path = fixtures_dir().join("cases.json");
    let source = std::fs::read_to_string(&cases_path)
        .map_err(|e| format!("failed to read {}: {e}", cases_path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    let file: CaseFile = serde_path_to_error::deserialize(de)
        .map_err(|e| format!("at JSON path {} → {}", e.path(), e.inner()))?;

    let schema = Schema::from_file(&fixtures_dir().join(&file.schema)).map_err(|e| e.to_string())?;
    let codecs = json_wire::synthesize_schema(&schema).map_err(|e| e.to_string())?;
    Ok((file, codecs))
}

fn run_case(codecs: &CodecSet, case: &Case) -> Result<(), String> {
    let decoded = codecs.from_wire(&case.record, &case.wire);
    match (&case.expect, decoded) {
        (Expect::Error(needle), Ok(_)) => Err(format!("expected an error containing {needle:?}")),
        (Expect::Error(needle), Err(error)) => {
            let message = error.to_string();
            if message.contains(needle.as_str()) {
                Ok(())
            } else {
                Err(format!("error {message:?} does not contain {needle:?}"))
            }
        }
        (_, Err(error)) => Err(format!("fromWire failed: {error}")),
        (expect, Ok(model)) => {
            let back = codecs.to_wire(&case.record, &model).map_err(|e| format!("toWire failed: {e}"))?;
            let want = match expect {
                Expect::Normalizes(want) => want,
                _ => &case.wire,
            };
            if &back == want {
                Ok(())
            } else {
                Err(format!("round trip produced {back}, wanted {want}"))
            }
        }
    }
}

fn main() -> ExitCode {
    let filter = match std::env::args().nth(1).map(|p| Regex::new(&p)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid name filter: {error}");
            return ExitCode::FAILURE;
        }
    };
    let (file, codecs) = match load() {
        Ok(loaded) => loaded,
        Err(error) => {
            eprintln!("❌ failed to load fixtures: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mut failed = 0usize;
    let mut ran = 0usize;
    for case in &file.cases {
        if filter.as_ref().is_some_and(|re| !re.is_match(&case.name)) {
            continue;
        }
        ran += 1;
        match run_case(&codecs, case) {
            Ok(()) => eprintln!("✅ {}", case.name),
            Err(reason) => {
                failed += 1;
                eprintln!("❌ {}: {reason}", case.name);
            }
        }
    }
    eprintln!("—— {ran} cases, {failed} failed ——");
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
