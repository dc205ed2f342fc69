//! Codec registry: record name × direction → routine, for one synthesis run.
//!
//! A record is entered as pending before its body is compiled, so a reference
//! back to it (directly or through a cycle) resolves to a forward reference
//! instead of recursing. Not shared between runs; not for concurrent mutation.
//!
//! Finishing a run yields a [`CodecSet`]: immutable, `Send + Sync`, and the
//! only thing conversions need.
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::compile::{compile_record, RecordCodec, Routine};
use crate::error::{SchemaError, WireShapeError};
use crate::ir::Schema;
use crate::model::Model;
use crate::synth::CodecRef;

#[derive(Debug)]
enum Slot {
    Pending,
    Ready(Routine),
}

#[derive(Debug)]
pub struct Registry<'s> {
    schema: &'s Schema,
    slots: IndexMap<CodecRef, Slot>,
}

impl<'s> Registry<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema, slots: IndexMap::new() }
    }

    /// Compile every record of `schema` in declaration order.
    pub fn compile_all(schema: &'s Schema) -> Result<CodecSet, SchemaError> {
        let mut registry = Self::new(schema);
        for def in schema.records() {
            registry.get_or_compile(&def.name)?;
        }
        Ok(registry.finish())
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Idempotent. A record already pending (an enclosing call is compiling
    /// it) is returned as-is: its routines are guaranteed to exist once the
    /// outermost call returns.
    ///
    /// On failure every slot entered by this call is dropped, including
    /// records that compiled against the failed one's pending routines.
    pub fn get_or_compile(&mut self, record: &str) -> Result<(CodecRef, CodecRef), SchemaError> {
        let from_wire = CodecRef::from_wire(record);
        let to_wire = CodecRef::to_wire(record);

        if let Some(slot) = self.slots.get(&from_wire) {
            if matches!(slot, Slot::Pending) {
                debug!(record, "forward reference to record under construction");
            }
            return Ok((from_wire, to_wire));
        }

        let schema = self.schema;
        let def = schema
            .resolve(record)
            .ok_or_else(|| SchemaError::MissingRecord { record: record.to_string() })?;

        let mark = self.slots.len();
        self.slots.insert(from_wire.clone(), Slot::Pending);
        self.slots.insert(to_wire.clone(), Slot::Pending);

        match compile_record(def, self) {
            Ok(codec) => {
                self.slots.insert(from_wire.clone(), Slot::Ready(codec.from_wire));
                self.slots.insert(to_wire.clone(), Slot::Ready(codec.to_wire));
                Ok((from_wire, to_wire))
            }
            Err(err) => {
                debug!(record, error = %err, "record failed to compile");
                self.slots.truncate(mark);
                Err(err)
            }
        }
    }

    pub fn is_pending(&self, codec: &CodecRef) -> bool {
        matches!(self.slots.get(codec), Some(Slot::Pending))
    }

    pub fn is_ready(&self, codec: &CodecRef) -> bool {
        matches!(self.slots.get(codec), Some(Slot::Ready(_)))
    }

    /// Compiled records, in schema declaration order.
    pub fn finish(mut self) -> CodecSet {
        let schema = self.schema;
        let mut codecs = IndexMap::new();
        for def in schema.records() {
            let from_wire = self.slots.swap_remove(&CodecRef::from_wire(def.name.as_str()));
            let to_wire = self.slots.swap_remove(&CodecRef::to_wire(def.name.as_str()));
            if let (Some(Slot::Ready(from_wire)), Some(Slot::Ready(to_wire))) = (from_wire, to_wire) {
                codecs.insert(def.name.clone(), RecordCodec { from_wire, to_wire });
            }
        }
        CodecSet { codecs }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodecSet {
    codecs: IndexMap<String, RecordCodec>,
}

impl CodecSet {
    pub fn get(&self, record: &str) -> Option<&RecordCodec> {
        self.codecs.get(record)
    }

    pub fn routine(&self, codec: &CodecRef) -> Option<&Routine> {
        self.get(&codec.record).map(|c| c.routine(codec.direction))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordCodec> {
        self.codecs.values()
    }

    pub fn len(&self) -> usize { self.codecs.len() }
    pub fn is_empty(&self) -> bool { self.codecs.is_empty() }

    pub fn from_wire(&self, record: &str, wire: &Value) -> Result<Model, WireShapeError> {
        crate::eval::from_wire(self, record, wire)
    }

    pub fn to_wire(&self, record: &str, model: &Model) -> Result<Value, WireShapeError> {
        crate::eval::to_wire(self, record, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Field, RecordDef, Ty};

    fn schema() -> Schema {
        Schema::from_records(vec![
            RecordDef::new("Node", vec![
                Field::new("label", Ty::string()),
                Field::new("children", Ty::list(Ty::named("Node"))),
                Field::new("owner", Ty::optional(Ty::named("Person"))),
            ]),
            RecordDef::new("Person", vec![
                Field::new("name", Ty::string()),
                Field::new("nodes", Ty::map(Ty::named("Node"))),
            ]),
            RecordDef::new("Broken", vec![
                Field::new("ok", Ty::named("Person")),
                Field::new("bad", Ty::named("Missing")),
            ]),
        ]).unwrap()
    }

    #[test]
    fn cyclic_records_terminate() {
        let schema = schema();
        let mut registry = Registry::new(&schema);
        let (from_wire, to_wire) = registry.get_or_compile("Node").unwrap();
        assert!(registry.is_ready(&from_wire));
        assert!(registry.is_ready(&to_wire));
        assert!(registry.is_ready(&CodecRef::from_wire("Person")));

        let codecs = registry.finish();
        let node = codecs.get("Node").unwrap();
        let calls: Vec<_> = node.from_wire.fields[1].value.calls().into_iter().cloned().collect();
        assert_eq!(calls, vec![CodecRef::from_wire("Node")]);
    }

    #[test]
    fn get_or_compile_is_idempotent() {
        let schema = schema();
        let mut registry = Registry::new(&schema);
        let first = registry.get_or_compile("Person").unwrap();
        let before = registry.slots.len();
        let second = registry.get_or_compile("Person").unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.slots.len(), before);
    }

    #[test]
    fn failed_record_leaves_no_pending_slots() {
        let schema = schema();
        let mut registry = Registry::new(&schema);
        let err = registry.get_or_compile("Broken").unwrap_err();
        assert_eq!(err, SchemaError::UnknownRecord {
            record: "Broken".into(),
            field: "bad".into(),
            name: "Missing".into(),
        });
        assert!(!registry.is_pending(&CodecRef::from_wire("Broken")));
        assert!(!registry.is_ready(&CodecRef::from_wire("Broken")));
        assert!(registry.slots.values().all(|s| matches!(s, Slot::Ready(_))));
    }

    #[test]
    fn records_compiled_against_a_failed_record_are_dropped_too() {
        let schema = Schema::from_records(vec![
            RecordDef::new("A", vec![
                Field::new("c", Ty::named("C")),
                Field::new("bad", Ty::named("Missing")),
            ]),
            RecordDef::new("C", vec![Field::new("a", Ty::named("A"))]),
        ]).unwrap();
        let mut registry = Registry::new(&schema);
        assert!(registry.get_or_compile("A").is_err());
        assert!(!registry.is_ready(&CodecRef::from_wire("C")));
        assert!(!registry.is_ready(&CodecRef::to_wire("C")));
        assert!(registry.slots.is_empty());
    }

    #[test]
    fn earlier_records_survive_a_later_failure() {
        let schema = schema();
        let mut registry = Registry::new(&schema);
        registry.get_or_compile("Node").unwrap();
        let before = registry.slots.len();
        assert!(registry.get_or_compile("Broken").is_err());
        assert_eq!(registry.slots.len(), before);
        assert!(registry.is_ready(&CodecRef::from_wire("Person")));
    }

    #[test]
    fn compile_all_aborts_on_first_broken_record() {
        let schema = schema();
        assert!(Registry::compile_all(&schema).is_err());
    }

    #[test]
    fn codec_set_follows_schema_order() {
        let schema = Schema::from_records(vec![
            RecordDef::new("B", vec![Field::new("a", Ty::named("A"))]),
            RecordDef::new("A", vec![Field::new("x", Ty::number())]),
        ]).unwrap();
        let codecs = Registry::compile_all(&schema).unwrap();
        let names: Vec<_> = codecs.iter().map(RecordCodec::name).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn unknown_top_level_record() {
        let schema = schema();
        let mut registry = Registry::new(&schema);
        assert_eq!(
            registry.get_or_compile("Nope").unwrap_err(),
            SchemaError::MissingRecord { record: "Nope".into() },
        );
    }
}
