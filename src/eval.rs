//! Executes synthesized routines against real values.
//!
//! This is the behaviour emitted code has to reproduce: a shape-driven walk in
//! which validation happens as a side effect of conversion, and failures name
//! the field path. Both directions borrow their input and build a fresh output.
pub mod path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::compile::Routine;
use crate::error::WireShapeError;
use crate::ir::{Lit, Prim, Ty};
use crate::model::{Model, Record};
use crate::namer::Ident;
use crate::registry::CodecSet;
use crate::synth::shape::Shape;
use crate::synth::{Arm, CodecRef, Expr, Place, TagArm};
use path::FieldPath;

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

pub fn from_wire(codecs: &CodecSet, record: &str, wire: &Value) -> Result<Model, WireShapeError> {
    let routine = lookup(codecs, &CodecRef::from_wire(record))?;
    Decoder { codecs }.routine(routine, wire, FieldPath::for_record(record))
}

pub fn to_wire(codecs: &CodecSet, record: &str, model: &Model) -> Result<Value, WireShapeError> {
    let routine = lookup(codecs, &CodecRef::to_wire(record))?;
    Encoder { codecs }.routine(routine, model, FieldPath::for_record(record))
}

// ————————————————————————————————————————————————————————————————————————————
// SHARED
// ————————————————————————————————————————————————————————————————————————————

/// What both sides can be asked while resolving a [`Place`].
trait Source {
    /// What a record looks like on this side.
    const RECORD: &'static str;
    fn kind(&self) -> &'static str;
    fn shape(&self) -> Shape;
    /// `None` when the value cannot hold fields at all.
    fn field(&self, name: &str) -> Option<Option<&Self>>;
    fn is_lit(&self, lit: &Lit) -> bool;
    fn as_text(&self) -> Option<&str>;
    /// For error messages.
    fn describe(&self) -> String;
}

impl Source for Value {
    const RECORD: &'static str = "object";
    fn kind(&self) -> &'static str { Shape::of_wire(self).as_str() }
    fn shape(&self) -> Shape { Shape::of_wire(self) }
    fn field(&self, name: &str) -> Option<Option<&Self>> {
        match self {
            Value::Object(map) => Some(map.get(name)),
            _ => None,
        }
    }
    fn is_lit(&self, lit: &Lit) -> bool { *self == lit.to_wire() }
    fn as_text(&self) -> Option<&str> { self.as_str() }
    fn describe(&self) -> String { self.to_string() }
}

impl Source for Model {
    const RECORD: &'static str = "record";
    fn kind(&self) -> &'static str { Model::kind(self) }
    fn shape(&self) -> Shape { Shape::of_model(self) }
    fn field(&self, name: &str) -> Option<Option<&Self>> {
        match self {
            Model::Record(record) => Some(record.fields.get(name)),
            _ => None,
        }
    }
    fn is_lit(&self, lit: &Lit) -> bool {
        match (self, lit) {
            (Model::Bool(a), Lit::Boolean(b)) => a == b,
            (Model::Number(a), Lit::Number(b)) => a.as_i64() == Some(*b),
            (Model::String(a), Lit::String(b)) => a == b,
            _ => false,
        }
    }
    fn as_text(&self) -> Option<&str> {
        match self {
            Model::String(s) => Some(s),
            _ => None,
        }
    }
    fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.kind().to_string())
    }
}

struct Frame<'v, T> {
    ident: Ident,
    value: &'v T,
    path: FieldPath,
}

/// Bindings visible to the routine being executed. Calls start a new scope.
struct Scope<'v, T> {
    frames: Vec<Frame<'v, T>>,
}

impl<'v, T> Scope<'v, T> {
    fn new(ident: Ident, value: &'v T, path: FieldPath) -> Self {
        Self { frames: vec![Frame { ident, value, path }] }
    }

    fn push(&mut self, ident: Ident, value: &'v T, path: FieldPath) {
        self.frames.push(Frame { ident, value, path });
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn lookup(&self, ident: Ident) -> Result<(&'v T, &FieldPath), WireShapeError> {
        match self.frames.iter().rev().find(|f| f.ident == ident) {
            Some(frame) => Ok((frame.value, &frame.path)),
            None => Err(WireShapeError::Unbound {
                path: self.frames.first().map(|f| f.path.clone()).unwrap_or_default(),
                name: ident.to_string(),
            }),
        }
    }
}

fn resolve<'v, T: Source>(place: &Place, scope: &Scope<'v, T>) -> Result<(&'v T, FieldPath), WireShapeError> {
    match place {
        Place::Var(ident) => {
            let (value, path) = scope.lookup(*ident)?;
            Ok((value, path.clone()))
        }
        Place::Field { base, name } => {
            let (value, path) = scope.lookup(*base)?;
            match value.field(name) {
                Some(Some(found)) => Ok((found, path.field(name))),
                Some(None) => Err(WireShapeError::MissingField { path: path.field(name) }),
                None => Err(mismatch(path.clone(), T::RECORD, value.kind())),
            }
        }
    }
}

fn lookup<'c>(codecs: &'c CodecSet, codec: &CodecRef) -> Result<&'c Routine, WireShapeError> {
    codecs
        .routine(codec)
        .ok_or_else(|| WireShapeError::UnknownCodec { record: codec.record.clone() })
}

/// Arm claims are disjoint, so at most one arm matches.
fn choose(arms: &[Arm], shape: Shape) -> Option<&Arm> {
    arms.iter().find(|arm| arm.shapes.contains(&shape))
}

fn check_lit<T: Source>(value: &T, lit: &Lit, path: FieldPath) -> Result<(), WireShapeError> {
    if value.is_lit(lit) {
        Ok(())
    } else {
        Err(mismatch(path, lit.to_string(), value.kind()))
    }
}

fn check_member<T: Source>(value: &T, name: &str, values: &[String], path: FieldPath) -> Result<String, WireShapeError> {
    let Some(text) = value.as_text() else {
        return Err(mismatch(path, format!("enum {name}"), value.kind()));
    };
    if values.iter().any(|v| v == text) {
        Ok(text.to_string())
    } else {
        Err(WireShapeError::NotInEnum { path, name: name.to_string(), value: text.to_string() })
    }
}

/// The arm selected by the record's `tag` field, and the record itself.
fn dispatch<'a, 'v, T: Source>(
    src: &Place,
    tag: &str,
    arms: &'a [TagArm],
    scope: &Scope<'v, T>,
) -> Result<(&'a TagArm, &'v T, FieldPath), WireShapeError> {
    let (value, path) = resolve(src, scope)?;
    let found = match value.field(tag) {
        Some(Some(found)) => found,
        Some(None) => return Err(WireShapeError::MissingField { path: path.field(tag) }),
        None => return Err(mismatch(path, T::RECORD, value.kind())),
    };
    match arms.iter().find(|arm| found.is_lit(&arm.literal)) {
        Some(arm) => Ok((arm, value, path)),
        None => {
            let members: Vec<&str> = arms.iter().map(|arm| arm.codec.record.as_str()).collect();
            Err(WireShapeError::UnknownTag {
                path: path.field(tag),
                union: format!("({})", members.join(" | ")),
                found: found.describe(),
            })
        }
    }
}

fn no_arm(path: FieldPath, arms: &[Arm], nullable: bool, found: &'static str) -> WireShapeError {
    let members = arms.iter().map(|arm| arm.member.clone()).collect();
    WireShapeError::NoMatchingArm {
        path,
        union: Ty::Union { members, nullable }.to_string(),
        found,
    }
}

fn mismatch(path: FieldPath, expected: impl Into<String>, found: &'static str) -> WireShapeError {
    WireShapeError::Mismatch { path, expected: expected.into(), found }
}

/// `seconds × 1000` as epoch milliseconds.
fn instant_from_seconds(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(seconds.checked_mul(1000)?)
}

/// Epoch milliseconds `/ 1000`, flooring away the sub-second part.
fn seconds_from_instant(instant: &DateTime<Utc>) -> i64 {
    instant.timestamp_millis().div_euclid(1000)
}

// ————————————————————————————————————————————————————————————————————————————
// WIRE → MODEL
// ————————————————————————————————————————————————————————————————————————————

struct Decoder<'c> {
    codecs: &'c CodecSet,
}

impl Decoder<'_> {
    fn routine(&self, routine: &Routine, wire: &Value, path: FieldPath) -> Result<Model, WireShapeError> {
        if !wire.is_object() {
            return Err(mismatch(path, "object", wire.kind()));
        }
        let mut scope = Scope::new(routine.param, wire, path);
        let mut fields = IndexMap::with_capacity(routine.fields.len());
        for init in &routine.fields {
            fields.insert(init.name.clone(), self.eval(&init.value, &mut scope)?);
        }
        Ok(Model::Record(Record { name: routine.codec.record.clone(), fields }))
    }

    fn eval<'v>(&self, expr: &Expr, scope: &mut Scope<'v, Value>) -> Result<Model, WireShapeError> {
        match expr {
            Expr::Copy { src, prim } => {
                let (value, path) = resolve(src, scope)?;
                match (prim, value) {
                    (Prim::String, Value::String(s)) => Ok(Model::String(s.clone())),
                    (Prim::Number, Value::Number(n)) => Ok(Model::Number(n.clone())),
                    (Prim::Boolean, Value::Bool(b)) => Ok(Model::Bool(*b)),
                    _ => Err(mismatch(path, prim.to_string(), value.kind())),
                }
            }
            Expr::SecondsToInstant { src } => {
                let (value, path) = resolve(src, scope)?;
                let Value::Number(seconds) = value else {
                    return Err(mismatch(path, "number", value.kind()));
                };
                // anything but whole seconds would not survive the way back
                let whole = match seconds.as_i64() {
                    Some(whole) => whole,
                    None if seconds.is_u64() => {
                        return Err(WireShapeError::TimestampOutOfRange { path, seconds: seconds.to_string() });
                    }
                    None => return Err(mismatch(path, "whole seconds", "fractional number")),
                };
                instant_from_seconds(whole)
                    .map(Model::Instant)
                    .ok_or_else(|| WireShapeError::TimestampOutOfRange { path, seconds: seconds.to_string() })
            }
            Expr::InstantToSeconds { src } => {
                let (value, path) = resolve(src, scope)?;
                Err(mismatch(path, "instant", value.kind()))
            }
            Expr::NullOr { src, then } => {
                let (value, _) = resolve(src, scope)?;
                if value.is_null() {
                    Ok(Model::Null)
                } else {
                    self.eval(then, scope)
                }
            }
            Expr::Select { src, nullable, arms } => {
                let (value, path) = resolve(src, scope)?;
                let shape = value.shape();
                if *nullable && shape == Shape::Null {
                    return Ok(Model::Null);
                }
                match choose(arms, shape) {
                    Some(arm) => self.eval(&arm.body, scope),
                    None => Err(no_arm(path, arms, *nullable, value.kind())),
                }
            }
            Expr::EachElement { src, item, body, .. } => {
                let (value, path) = resolve(src, scope)?;
                let Value::Array(items) = value else {
                    return Err(mismatch(path, "array", value.kind()));
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, element) in items.iter().enumerate() {
                    scope.push(*item, element, path.index(i));
                    let converted = self.eval(body, scope);
                    scope.pop();
                    out.push(converted?);
                }
                Ok(Model::List(out))
            }
            // keys are copied, never converted
            Expr::EachEntry { src, value: bound, body, .. } => {
                let (value, path) = resolve(src, scope)?;
                let Value::Object(entries) = value else {
                    return Err(mismatch(path, "object", value.kind()));
                };
                let mut out = IndexMap::with_capacity(entries.len());
                for (key, entry) in entries {
                    scope.push(*bound, entry, path.key(key));
                    let converted = self.eval(body, scope);
                    scope.pop();
                    out.insert(key.clone(), converted?);
                }
                Ok(Model::Map(out))
            }
            Expr::Call { codec, src } => {
                let (value, path) = resolve(src, scope)?;
                self.routine(lookup(self.codecs, codec)?, value, path)
            }
            Expr::Literal { src, value: lit } => {
                let (value, path) = resolve(src, scope)?;
                check_lit(value, lit, path)?;
                Ok(match lit {
                    Lit::Boolean(b) => Model::Bool(*b),
                    Lit::Number(n) => Model::from(*n),
                    Lit::String(s) => Model::String(s.clone()),
                })
            }
            Expr::Member { src, name, values } => {
                let (value, path) = resolve(src, scope)?;
                check_member(value, name, values, path).map(Model::String)
            }
            Expr::Dispatch { src, tag, arms } => {
                let (arm, value, path) = dispatch(src, tag, arms, scope)?;
                self.routine(lookup(self.codecs, &arm.codec)?, value, path)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MODEL → WIRE
// ————————————————————————————————————————————————————————————————————————————

struct Encoder<'c> {
    codecs: &'c CodecSet,
}

impl Encoder<'_> {
    fn routine(&self, routine: &Routine, model: &Model, path: FieldPath) -> Result<Value, WireShapeError> {
        let record = &routine.codec.record;
        if !matches!(model, Model::Record(r) if &r.name == record) {
            return Err(mismatch(path, format!("record {record}"), model.kind()));
        }
        let mut scope = Scope::new(routine.param, model, path);
        let mut fields = Map::with_capacity(routine.fields.len());
        for init in &routine.fields {
            fields.insert(init.name.clone(), self.eval(&init.value, &mut scope)?);
        }
        Ok(Value::Object(fields))
    }

    fn eval<'v>(&self, expr: &Expr, scope: &mut Scope<'v, Model>) -> Result<Value, WireShapeError> {
        match expr {
            Expr::Copy { src, prim } => {
                let (value, path) = resolve(src, scope)?;
                match (prim, value) {
                    (Prim::String, Model::String(s)) => Ok(Value::String(s.clone())),
                    (Prim::Number, Model::Number(n)) => Ok(Value::Number(n.clone())),
                    (Prim::Boolean, Model::Bool(b)) => Ok(Value::Bool(*b)),
                    _ => Err(mismatch(path, prim.to_string(), value.kind())),
                }
            }
            Expr::SecondsToInstant { src } => {
                let (value, path) = resolve(src, scope)?;
                Err(mismatch(path, "wire timestamp", value.kind()))
            }
            Expr::InstantToSeconds { src } => {
                let (value, path) = resolve(src, scope)?;
                match value {
                    Model::Instant(instant) => Ok(Value::from(seconds_from_instant(instant))),
                    _ => Err(mismatch(path, "instant", value.kind())),
                }
            }
            Expr::NullOr { src, then } => {
                let (value, _) = resolve(src, scope)?;
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    self.eval(then, scope)
                }
            }
            Expr::Select { src, nullable, arms } => {
                let (value, path) = resolve(src, scope)?;
                let shape = value.shape();
                if *nullable && shape == Shape::Null {
                    return Ok(Value::Null);
                }
                match choose(arms, shape) {
                    Some(arm) => self.eval(&arm.body, scope),
                    None => Err(no_arm(path, arms, *nullable, value.kind())),
                }
            }
            Expr::EachElement { src, item, body, .. } => {
                let (value, path) = resolve(src, scope)?;
                let Model::List(items) = value else {
                    return Err(mismatch(path, "list", value.kind()));
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, element) in items.iter().enumerate() {
                    scope.push(*item, element, path.index(i));
                    let converted = self.eval(body, scope);
                    scope.pop();
                    out.push(converted?);
                }
                Ok(Value::Array(out))
            }
            Expr::EachEntry { src, value: bound, body, .. } => {
                let (value, path) = resolve(src, scope)?;
                let Model::Map(entries) = value else {
                    return Err(mismatch(path, "map", value.kind()));
                };
                let mut out = Map::with_capacity(entries.len());
                for (key, entry) in entries {
                    scope.push(*bound, entry, path.key(key));
                    let converted = self.eval(body, scope);
                    scope.pop();
                    out.insert(key.clone(), converted?);
                }
                Ok(Value::Object(out))
            }
            Expr::Call { codec, src } => {
                let (value, path) = resolve(src, scope)?;
                self.routine(lookup(self.codecs, codec)?, value, path)
            }
            Expr::Literal { src, value: lit } => {
                let (value, path) = resolve(src, scope)?;
                check_lit(value, lit, path)?;
                Ok(lit.to_wire())
            }
            Expr::Member { src, name, values } => {
                let (value, path) = resolve(src, scope)?;
                check_member(value, name, values, path).map(Value::String)
            }
            Expr::Dispatch { src, tag, arms } => {
                let (arm, value, path) = dispatch(src, tag, arms, scope)?;
                self.routine(lookup(self.codecs, &arm.codec)?, value, path)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Field, RecordDef, Schema};
    use crate::registry::Registry;
    use serde_json::json;

    fn codecs() -> CodecSet {
        let schema = Schema::from_json_str(include_str!("../fixtures/org.schema.json")).unwrap();
        Registry::compile_all(&schema).unwrap()
    }

    fn user(id: &str) -> Value {
        json!({
            "user_id": id,
            "name": null,
            "roles": ["admin"],
            "options": {"k": {"key": "k", "val": "v"}},
            "maybe_options": null,
            "deep_opts": {"a": {"b": {"c": {"d": {"key": "x", "val": null}}}}},
            "opt_union": 3
        })
    }

    #[test]
    fn opt_round_trips_exactly() {
        let codecs = codecs();
        let wire = json!({"key": "k1", "val": "v1"});
        let model = codecs.from_wire("Opt", &wire).unwrap();
        assert_eq!(model, Model::Record(Record::new("Opt").with("key", "k1").with("val", "v1")));
        assert_eq!(codecs.to_wire("Opt", &model).unwrap(), wire);
    }

    #[test]
    fn created_at_is_epoch_seconds_on_the_wire() {
        let codecs = codecs();
        let wire = json!({"org_id": "o", "created_at": 1700000000, "users": [], "maybe_users": null});
        let model = codecs.from_wire("Org", &wire).unwrap();
        let created = model.as_record().unwrap().get("created_at").unwrap().as_instant().unwrap();
        assert_eq!(created.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(codecs.to_wire("Org", &model).unwrap()["created_at"], json!(1700000000));
    }

    #[test]
    fn to_wire_drops_sub_second_precision() {
        let codecs = codecs();
        let model = Model::Record(
            Record::new("Org")
                .with("org_id", "o")
                .with("created_at", Model::from_millis(1_700_000_000_999).unwrap())
                .with("users", Vec::<Model>::new())
                .with("maybe_users", Model::Null),
        );
        let wire = codecs.to_wire("Org", &model).unwrap();
        assert_eq!(wire["created_at"], json!(1700000000));
        let back = codecs.from_wire("Org", &wire).unwrap();
        let instant = back.as_record().unwrap().get("created_at").unwrap().as_instant().unwrap();
        assert_eq!(instant.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn only_whole_seconds_decode() {
        let codecs = codecs();
        for seconds in [json!(1.5), json!(1700000000.0)] {
            let wire = json!({"org_id": "o", "created_at": seconds, "users": [], "maybe_users": null});
            let err = codecs.from_wire("Org", &wire).unwrap_err();
            assert_eq!(err, WireShapeError::Mismatch {
                path: FieldPath::root("org").field("created_at"),
                expected: "whole seconds".into(),
                found: "fractional number",
            });
        }

        let wire = json!({"org_id": "o", "created_at": u64::MAX, "users": [], "maybe_users": null});
        let err = codecs.from_wire("Org", &wire).unwrap_err();
        assert!(matches!(err, WireShapeError::TimestampOutOfRange { .. }), "{err}");

        assert_eq!(seconds_from_instant(&DateTime::from_timestamp_millis(-1).unwrap()), -1);
        assert!(instant_from_seconds(i64::MAX).is_none());
    }

    #[test]
    fn nested_maps_round_trip_unchanged() {
        let schema = Schema::from_records(vec![
            RecordDef::new("Opt", vec![
                Field::new("key", Ty::string()),
                Field::new("val", Ty::optional(Ty::string())),
            ]),
            RecordDef::new("Holder", vec![
                Field::new("opts", Ty::map(Ty::map(Ty::named("Opt")))),
            ]),
        ]).unwrap();
        let codecs = Registry::compile_all(&schema).unwrap();
        let wire = json!({"opts": {"a": {"b": {"key": "k", "val": null}}}});
        let model = codecs.from_wire("Holder", &wire).unwrap();
        assert_eq!(codecs.to_wire("Holder", &model).unwrap(), wire);
    }

    #[test]
    fn map_keys_pass_through() {
        let codecs = codecs();
        let mut wire = user("u1");
        wire["options"] = json!({"weird key": {"key": "a", "val": null}, "": {"key": "b", "val": "c"}});
        let model = codecs.from_wire("User", &wire).unwrap();
        let Some(Model::Map(options)) = model.as_record().unwrap().get("options") else {
            panic!("options should be a map");
        };
        let keys: Vec<_> = options.keys().map(String::as_str).collect();
        assert_eq!(keys, ["weird key", ""]);
    }

    #[test]
    fn errors_name_the_field_path() {
        let codecs = codecs();
        let mut bad = user("u2");
        bad["options"]["k"]["val"] = json!(5);
        let wire = json!({
            "org_id": "o",
            "created_at": 0,
            "users": [user("u0"), user("u1"), bad],
            "maybe_users": null
        });
        let err = codecs.from_wire("Org", &wire).unwrap_err();
        assert_eq!(err.path().unwrap().to_string(), r#"org.users[2].options["k"].val"#);
        assert!(matches!(err, WireShapeError::Mismatch { found: "number", .. }));
    }

    #[test]
    fn absent_optional_field_is_missing_not_null() {
        let codecs = codecs();
        let err = codecs.from_wire("Opt", &json!({"key": "k"})).unwrap_err();
        assert_eq!(err, WireShapeError::MissingField { path: FieldPath::root("opt").field("val") });
    }

    #[test]
    fn null_only_where_the_type_allows_it() {
        let codecs = codecs();
        let err = codecs.from_wire("Opt", &json!({"key": null, "val": null})).unwrap_err();
        assert!(matches!(err, WireShapeError::Mismatch { found: "null", .. }));

        let model = codecs.from_wire("Opt", &json!({"key": "k", "val": null})).unwrap();
        assert!(model.as_record().unwrap().get("val").unwrap().is_null());
    }

    #[test]
    fn union_selects_by_shape() {
        let codecs = codecs();
        for (input, expected) in [
            (json!(3), Model::from(3_i64)),
            (json!("three"), Model::from("three")),
            (json!(null), Model::Null),
        ] {
            let mut wire = user("u");
            wire["opt_union"] = input.clone();
            let model = codecs.from_wire("User", &wire).unwrap();
            assert_eq!(model.as_record().unwrap().get("opt_union"), Some(&expected));
            assert_eq!(codecs.to_wire("User", &model).unwrap()["opt_union"], input);
        }

        let mut wire = user("u");
        wire["opt_union"] = json!(true);
        let err = codecs.from_wire("User", &wire).unwrap_err();
        assert!(matches!(err, WireShapeError::NoMatchingArm { found: "boolean", .. }), "{err}");
    }

    #[test]
    fn failures_do_not_poison_later_calls() {
        let codecs = codecs();
        assert!(codecs.from_wire("Opt", &json!([])).is_err());
        assert!(codecs.from_wire("Opt", &json!({"key": "k", "val": null})).is_ok());
    }

    #[test]
    fn tagged_shapes_dispatch_on_their_kind() {
        let codecs = codecs();
        let wire = json!({
            "shapes": [{"kind": "circle", "radius": 2}, {"kind": "square", "side": 3}],
            "color": "green",
            "pinned": null
        });
        let model = codecs.from_wire("Drawing", &wire).unwrap();
        let drawing = model.as_record().unwrap();
        let Some(Model::List(shapes)) = drawing.get("shapes") else {
            panic!("shapes should be a list");
        };
        assert_eq!(shapes[0], Model::Record(Record::new("Circle").with("kind", "circle").with("radius", 2_i64)));
        assert_eq!(shapes[1], Model::Record(Record::new("Square").with("kind", "square").with("side", 3_i64)));
        assert_eq!(drawing.get("color"), Some(&Model::from("green")));
        assert_eq!(codecs.to_wire("Drawing", &model).unwrap(), wire);
    }

    #[test]
    fn unknown_or_missing_tags_name_the_tag_field() {
        let codecs = codecs();
        let wire = json!({"shapes": [{"kind": "hexagon"}], "color": "red", "pinned": null});
        let err = codecs.from_wire("Drawing", &wire).unwrap_err();
        assert_eq!(err.to_string(), r#"drawing.shapes[0].kind: "hexagon" selects no member of (Circle | Square)"#);

        let wire = json!({"shapes": [], "color": "red", "pinned": {"side": 1}});
        let err = codecs.from_wire("Drawing", &wire).unwrap_err();
        assert_eq!(err, WireShapeError::MissingField { path: FieldPath::root("drawing").field("pinned").field("kind") });

        let wire = json!({"shapes": [3], "color": "red", "pinned": null});
        let err = codecs.from_wire("Drawing", &wire).unwrap_err();
        assert!(matches!(err, WireShapeError::Mismatch { found: "number", .. }), "{err}");
    }

    #[test]
    fn enum_values_are_checked_both_ways() {
        let codecs = codecs();
        let err = codecs
            .from_wire("Drawing", &json!({"shapes": [], "color": "blue", "pinned": null}))
            .unwrap_err();
        assert!(matches!(err, WireShapeError::NotInEnum { ref value, .. } if value == "blue"), "{err}");

        let model = Model::Record(
            Record::new("Drawing")
                .with("shapes", Vec::<Model>::new())
                .with("color", "purple")
                .with("pinned", Model::Null),
        );
        let err = codecs.to_wire("Drawing", &model).unwrap_err();
        assert_eq!(err.path().unwrap().to_string(), "drawing.color");
    }

    #[test]
    fn literal_fields_accept_only_their_value() {
        let codecs = codecs();
        let err = codecs.from_wire("Circle", &json!({"kind": "square", "radius": 1})).unwrap_err();
        assert_eq!(err, WireShapeError::Mismatch {
            path: FieldPath::root("circle").field("kind"),
            expected: r#""circle""#.into(),
            found: "string",
        });

        let model = Model::Record(Record::new("Circle").with("kind", "circle").with("radius", 1_i64));
        assert_eq!(codecs.to_wire("Circle", &model).unwrap(), json!({"kind": "circle", "radius": 1}));
    }

    #[test]
    fn to_wire_checks_the_record_name() {
        let codecs = codecs();
        let err = codecs.to_wire("Opt", &Model::Record(Record::new("User"))).unwrap_err();
        assert!(matches!(err, WireShapeError::Mismatch { .. }));
        assert_eq!(
            codecs.to_wire("Nope", &Model::Null).unwrap_err(),
            WireShapeError::UnknownCodec { record: "Nope".into() },
        );
    }
}
