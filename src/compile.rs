//! Record compiler: one `fromWire` and one `toWire` routine per record.
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::SchemaError;
use crate::ir::RecordDef;
use crate::namer::Ident;
use crate::registry::Registry;
use crate::synth::{CodecRef, Direction, Expr, Place, Site, Synthesizer};

pub(crate) static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInit {
    pub name: String,
    pub value: Expr,
}

/// A whole-record conversion: reads `param`, builds one field per init, in
/// declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    pub codec: CodecRef,
    pub param: Ident,
    pub fields: Vec<FieldInit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordCodec {
    pub from_wire: Routine,
    pub to_wire: Routine,
}

impl RecordCodec {
    pub fn name(&self) -> &str {
        &self.from_wire.codec.record
    }

    pub fn routine(&self, direction: Direction) -> &Routine {
        match direction {
            Direction::WireToModel => &self.from_wire,
            Direction::ModelToWire => &self.to_wire,
        }
    }
}

pub fn compile_record(def: &RecordDef, registry: &mut Registry<'_>) -> Result<RecordCodec, SchemaError> {
    if !IDENTIFIER.is_match(&def.name) {
        return Err(SchemaError::InvalidRecordName { record: def.name.clone() });
    }
    for (i, field) in def.fields.iter().enumerate() {
        if def.fields[..i].iter().any(|f| f.name == field.name) {
            return Err(SchemaError::DuplicateField {
                record: def.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    let from_wire = compile_routine(def, Direction::WireToModel, registry)?;
    let to_wire = compile_routine(def, Direction::ModelToWire, registry)?;
    debug!(record = %def.name, fields = def.fields.len(), "compiled record");
    Ok(RecordCodec { from_wire, to_wire })
}

fn compile_routine(
    def: &RecordDef,
    direction: Direction,
    registry: &mut Registry<'_>,
) -> Result<Routine, SchemaError> {
    let mut fields = Vec::with_capacity(def.fields.len());
    for field in &def.fields {
        let src = Place::Field { base: Ident::Root, name: field.name.clone() };
        let site = Site::new(&def.name, &field.name);
        let value = Synthesizer::new(registry, direction, site).synthesize(&field.ty, 1, src)?;
        fields.push(FieldInit { name: field.name.clone(), value });
    }
    Ok(Routine {
        codec: CodecRef::new(&def.name, direction),
        param: Ident::Root,
        fields,
    })
}
