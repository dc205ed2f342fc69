//! Schema-driven JSON wire codecs.
//!
//! A [`Schema`] of named records is compiled into a [`CodecSet`]: one
//! `fromWire` and one `toWire` routine per record, synthesized from the field
//! types. The routines can be executed directly against JSON values or handed
//! to [`codegen::Codegen`] for rendering.
pub mod cli;
pub mod codegen;
pub mod compile;
pub mod error;
pub mod eval;
pub mod ir;
pub mod jq_exec;
pub mod model;
pub mod namer;
pub mod path_de;
pub mod registry;
pub mod synth;

pub use error::{LoadError, SchemaError, WireShapeError};
pub use ir::{Field, RecordDef, Schema, Ty};
pub use model::{Model, Record};
pub use registry::{CodecSet, Registry};

/// Compile every record of `schema`.
pub fn synthesize_schema(schema: &Schema) -> Result<CodecSet, SchemaError> {
    Registry::compile_all(schema)
}
