//! CLI: schema → (TypeScript | decoded documents | round-trip report)
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codegen::Codegen;
use crate::ir::Schema;
use crate::model::Model;
use crate::registry::{CodecSet, Registry};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a record schema into JSON wire codecs; emit them as TypeScript or run them over documents
#[derive(Parser, Debug)]
#[command(name = "json-wire", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit TypeScript types and fromWire/toWire functions for every record
    Ts(TsOut),
    /// convert wire documents into the typed model and print it
    Decode(DecodeOut),
    /// check that every document survives fromWire → toWire unchanged
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema file: `{"records": [...]}`
    #[arg(long, short)]
    schema: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct TsOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output .ts file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DecodeOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// record every document is decoded as
    #[arg(long, short)]
    record: String,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// record every document is checked against
    #[arg(long, short)]
    record: String,
}

/// One input document and where it came from (`file`, `file:line`, `file#n`).
#[derive(Debug, Clone)]
struct Document {
    origin: String,
    value: Value,
}

#[derive(Debug)]
enum Verdict {
    Pass,
    Fail(String),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load(&self) -> Result<(Schema, CodecSet)> {
        let schema = Schema::from_file(&self.schema)
            .with_context(|| format!("failed to load schema {}", self.schema.display()))?;
        let codecs = Registry::compile_all(&schema)
            .with_context(|| format!("failed to compile schema {}", self.schema.display()))?;
        debug!(records = codecs.len(), "schema compiled");
        Ok((schema, codecs))
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (i, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let origin = format!("{source_path_str}:{}", i + 1);
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse NDJSON line ({origin})"))?;
                    self.process(origin, value, &mut out)?;
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                self.process(source_path_str, value, &mut out)?;
            }
        }
        info!(documents = out.len(), "inputs loaded");
        Ok(out)
    }

    fn process(&self, origin: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} matched nothing in {origin}"))?,
        };
        match self.jq_expr.as_ref() {
            None => out.push(Document { origin, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {origin}"))?;
                if results.is_empty() {
                    warn!(%origin, "jq expression produced no documents");
                }
                for (i, value) in results.into_iter().enumerate() {
                    out.push(Document { origin: format!("{origin}#{i}"), value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Ts(target) => {
                let (schema, codecs) = target.schema_settings.load()?;
                let mut cg = Codegen::new();
                cg.emit(&schema, &codecs);
                write_output(target.out.as_deref(), &cg.into_string())
            }
            Command::Decode(target) => {
                let (_, codecs) = target.schema_settings.load()?;
                ensure_record(&codecs, &target.record)?;
                let documents = target.input_settings.load_documents()?;
                let mut models = Vec::<Model>::with_capacity(documents.len());
                for document in &documents {
                    let model = codecs
                        .from_wire(&target.record, &document.value)
                        .with_context(|| format!("failed to decode {}", document.origin))?;
                    models.push(model);
                }
                let rendered = match models.as_slice() {
                    [single] => serde_json::to_string_pretty(single)?,
                    _ => serde_json::to_string_pretty(&models)?,
                };
                write_output(target.out.as_deref(), &rendered)
            }
            Command::Check(target) => {
                let (_, codecs) = target.schema_settings.load()?;
                ensure_record(&codecs, &target.record)?;
                let documents = target.input_settings.load_documents()?;
                let verdicts: Vec<Verdict> = documents
                    .par_iter()
                    .map(|document| check_document(&codecs, &target.record, &document.value))
                    .collect();

                let mut failures = 0usize;
                for (document, verdict) in documents.iter().zip(&verdicts) {
                    match verdict {
                        Verdict::Pass => eprintln!("{} {}", "✅".green(), document.origin),
                        Verdict::Fail(reason) => {
                            failures += 1;
                            eprintln!("{} {}: {}", "❌".red(), document.origin, reason.red());
                        }
                    }
                }
                info!(passed = documents.len() - failures, failed = failures, "check finished");
                if failures > 0 {
                    bail!("{failures} of {} documents failed the round trip", documents.len());
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn ensure_record(codecs: &CodecSet, record: &str) -> Result<()> {
    if codecs.get(record).is_none() {
        let known: Vec<_> = codecs.iter().map(|c| c.name()).collect();
        bail!("record {record} is not in the schema (known: {})", known.join(", "));
    }
    Ok(())
}

fn check_document(codecs: &CodecSet, record: &str, wire: &Value) -> Verdict {
    let model = match codecs.from_wire(record, wire) {
        Ok(model) => model,
        Err(error) => return Verdict::Fail(format!("fromWire: {error}")),
    };
    let back = match codecs.to_wire(record, &model) {
        Ok(back) => back,
        Err(error) => return Verdict::Fail(format!("toWire: {error}")),
    };
    if &back == wire {
        Verdict::Pass
    } else {
        Verdict::Fail(format!("round trip changed the document: {back}"))
    }
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, contents)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), "wrote output");
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
