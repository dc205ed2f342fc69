// Type model for codec synthesis. Pure structure: no conversion logic here.

use std::fmt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, SchemaError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prim {
    String,
    Number,
    Boolean,
}

/// `One` is the `[T]` notation: still an ordinary sequence, never a tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    One,
    #[default]
    Many,
}

/// A fixed value a field must hold, e.g. the `kind` of a tagged record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lit {
    Boolean(bool),
    Number(i64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ty {
    Primitive(Prim),
    DateTime,                // wire: epoch seconds; model: instant
    Optional(Box<Ty>),
    Union {
        members: Vec<Ty>,    // declaration order
        #[serde(default)]
        nullable: bool,      // explicit null arm
    },
    List {
        item: Box<Ty>,
        #[serde(default)]
        arity: Arity,
    },
    Map(Box<Ty>),            // keys are always strings
    Named(String),           // resolved through the registry
    Literal(Lit),            // passed through, but only this exact value
    /// Closed set of strings. Declared inline; every use of `name` must agree.
    Enum {
        name: String,
        values: Vec<String>,
    },
    /// Records told apart by the literal each one declares in field `tag`.
    Tagged {
        tag: String,
        members: Vec<String>,
    },
}

/// Variant tag, for callers that only need to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TyKind {
    Primitive,
    DateTime,
    Optional,
    Union,
    List,
    Map,
    Named,
    Literal,
    Enum,
    Tagged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Ty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<Field>,  // declared order, preserved in both directions
}

/// Every record of one synthesis run, keyed by name in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    records: IndexMap<String, RecordDef>,
}

/// On-disk form: `{"records": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    pub records: Vec<RecordDef>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTORS
// ————————————————————————————————————————————————————————————————————————————

impl Ty {
    pub fn string() -> Self { Ty::Primitive(Prim::String) }
    pub fn number() -> Self { Ty::Primitive(Prim::Number) }
    pub fn boolean() -> Self { Ty::Primitive(Prim::Boolean) }
    pub fn optional(inner: Ty) -> Self { Ty::Optional(Box::new(inner)) }
    pub fn list(item: Ty) -> Self { Ty::List { item: Box::new(item), arity: Arity::Many } }
    pub fn list_of_one(item: Ty) -> Self { Ty::List { item: Box::new(item), arity: Arity::One } }
    pub fn map(value: Ty) -> Self { Ty::Map(Box::new(value)) }
    pub fn named(name: impl Into<String>) -> Self { Ty::Named(name.into()) }
    pub fn union(members: Vec<Ty>) -> Self { Ty::Union { members, nullable: false } }
    pub fn nullable_union(members: Vec<Ty>) -> Self { Ty::Union { members, nullable: true } }
    pub fn literal(value: impl Into<Lit>) -> Self { Ty::Literal(value.into()) }

    pub fn enumeration(name: impl Into<String>, values: &[&str]) -> Self {
        Ty::Enum { name: name.into(), values: values.iter().map(|v| v.to_string()).collect() }
    }

    pub fn tagged(tag: impl Into<String>, members: &[&str]) -> Self {
        Ty::Tagged { tag: tag.into(), members: members.iter().map(|m| m.to_string()).collect() }
    }
}

impl From<&str> for Lit {
    fn from(s: &str) -> Self { Lit::String(s.to_string()) }
}

impl From<i64> for Lit {
    fn from(n: i64) -> Self { Lit::Number(n) }
}

impl From<bool> for Lit {
    fn from(b: bool) -> Self { Lit::Boolean(b) }
}

impl Lit {
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Lit::Boolean(b) => (*b).into(),
            Lit::Number(n) => (*n).into(),
            Lit::String(s) => s.as_str().into(),
        }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        Self { name: name.into(), ty }
    }
}

impl RecordDef {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self { name: name.into(), fields }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// STRUCTURAL QUERIES
// ————————————————————————————————————————————————————————————————————————————

impl Ty {
    pub fn kind(&self) -> TyKind {
        match self {
            Ty::Primitive(_) => TyKind::Primitive,
            Ty::DateTime => TyKind::DateTime,
            Ty::Optional(_) => TyKind::Optional,
            Ty::Union { .. } => TyKind::Union,
            Ty::List { .. } => TyKind::List,
            Ty::Map(_) => TyKind::Map,
            Ty::Named(_) => TyKind::Named,
            Ty::Literal(_) => TyKind::Literal,
            Ty::Enum { .. } => TyKind::Enum,
            Ty::Tagged { .. } => TyKind::Tagged,
        }
    }

    /// Direct child type expressions. `Named` and `Tagged` have none: records
    /// are reached through the schema, not through the expression.
    pub fn children(&self) -> Vec<&Ty> {
        match self {
            Ty::Primitive(_)
            | Ty::DateTime
            | Ty::Named(_)
            | Ty::Literal(_)
            | Ty::Enum { .. }
            | Ty::Tagged { .. } => Vec::new(),
            Ty::Optional(inner) | Ty::Map(inner) => vec![inner.as_ref()],
            Ty::List { item, .. } => vec![item.as_ref()],
            Ty::Union { members, .. } => members.iter().collect(),
        }
    }

    /// Pre-order, depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Ty)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Record names referenced anywhere inside this expression, in walk order.
    pub fn named_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |ty| {
            match ty {
                Ty::Named(name) => out.push(name.as_str()),
                Ty::Tagged { members, .. } => out.extend(members.iter().map(String::as_str)),
                _ => {}
            }
        });
        out
    }

    /// Whether `null` is a legal wire value at this position.
    pub fn admits_null(&self) -> bool {
        match self {
            Ty::Optional(_) => true,
            Ty::Union { members, nullable } => *nullable || members.iter().any(Ty::admits_null),
            _ => false,
        }
    }
}

impl Schema {
    pub fn from_records(records: Vec<RecordDef>) -> Result<Self, SchemaError> {
        let mut enums: IndexMap<&str, &[String]> = IndexMap::new();
        for record in &records {
            for field in &record.fields {
                let mut conflict = None;
                field.ty.walk(&mut |ty| {
                    if let Ty::Enum { name, values } = ty {
                        let known = enums.entry(name.as_str()).or_insert(values.as_slice());
                        if *known != values.as_slice() && conflict.is_none() {
                            conflict = Some(name.clone());
                        }
                    }
                });
                if let Some(name) = conflict {
                    return Err(SchemaError::ConflictingEnum { name });
                }
            }
        }

        let mut map = IndexMap::with_capacity(records.len());
        for record in records {
            if map.contains_key(&record.name) {
                return Err(SchemaError::DuplicateRecord { record: record.name });
            }
            map.insert(record.name.clone(), record);
        }
        Ok(Self { records: map })
    }

    /// Load the `{"records": [...]}` document form.
    pub fn from_json_str(src: &str) -> Result<Self, LoadError> {
        let file: SchemaFile = crate::path_de::from_str_with_path(src)?;
        Ok(Self::from_records(file.records)?)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, LoadError> {
        let file: SchemaFile = crate::path_de::from_file_with_path(path)?;
        Ok(Self::from_records(file.records)?)
    }

    pub fn resolve(&self, name: &str) -> Option<&RecordDef> {
        self.records.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordDef> {
        self.records.values()
    }

    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

// ————————————————————————————————————————————————————————————————————————————
// DISPLAY
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Prim::String => "string",
            Prim::Number => "number",
            Prim::Boolean => "boolean",
        })
    }
}

/// JSON spelling, which is also the TypeScript literal type.
impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Primitive(p) => write!(f, "{p}"),
            Ty::DateTime => f.write_str("datetime"),
            Ty::Optional(inner) => write!(f, "{inner} | null"),
            Ty::Union { members, nullable } => {
                f.write_str("(")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 { f.write_str(" | ")?; }
                    write!(f, "{m}")?;
                }
                if *nullable {
                    if !members.is_empty() { f.write_str(" | ")?; }
                    f.write_str("null")?;
                }
                f.write_str(")")
            }
            Ty::List { item, arity: Arity::One } => write!(f, "[{item}]"),
            Ty::List { item, arity: Arity::Many } => write!(f, "{item}[]"),
            Ty::Map(value) => write!(f, "Record<string, {value}>"),
            Ty::Named(name) => f.write_str(name),
            Ty::Literal(lit) => write!(f, "{lit}"),
            Ty::Enum { name, .. } => f.write_str(name),
            Ty::Tagged { members, .. } => write!(f, "({})", members.join(" | ")),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    fn deep_opts() -> Ty {
        Ty::map(Ty::map(Ty::map(Ty::map(Ty::named("Opt")))))
    }

    #[test]
    fn children_and_walk_are_depth_first() {
        let ty = Ty::nullable_union(vec![Ty::list(Ty::named("A")), Ty::map(Ty::DateTime)]);
        assert_eq!(ty.children().len(), 2);

        let mut kinds = Vec::new();
        ty.walk(&mut |t| kinds.push(t.kind()));
        assert_eq!(kinds, vec![
            TyKind::Union, TyKind::List, TyKind::Named, TyKind::Map, TyKind::DateTime,
        ]);
    }

    #[test]
    fn named_refs_reach_through_nesting() {
        assert_eq!(deep_opts().named_refs(), vec!["Opt"]);
        assert!(Ty::string().named_refs().is_empty());
    }

    #[test]
    fn admits_null_only_for_nullable_constructs() {
        assert!(Ty::optional(Ty::string()).admits_null());
        assert!(Ty::nullable_union(vec![Ty::number()]).admits_null());
        assert!(!Ty::union(vec![Ty::number(), Ty::string()]).admits_null());
        assert!(!Ty::list(Ty::optional(Ty::string())).admits_null());
    }

    #[test]
    fn display_reads_like_typescript() {
        assert_eq!(deep_opts().to_string(),
            "Record<string, Record<string, Record<string, Record<string, Opt>>>>");
        assert_eq!(Ty::list_of_one(Ty::string()).to_string(), "[string]");
        assert_eq!(Ty::nullable_union(vec![Ty::number(), Ty::string()]).to_string(),
            "(number | string | null)");
        assert_eq!(Ty::optional(Ty::map(Ty::DateTime)).to_string(), "Record<string, datetime> | null");
        assert_eq!(Ty::literal("circle").to_string(), "\"circle\"");
        assert_eq!(Ty::tagged("kind", &["Circle", "Square"]).to_string(), "(Circle | Square)");
    }

    #[test]
    fn tagged_members_count_as_references() {
        let ty = Ty::list(Ty::tagged("kind", &["Circle", "Square"]));
        assert_eq!(ty.named_refs(), vec!["Circle", "Square"]);
        assert!(ty.children()[0].children().is_empty());
    }

    #[test]
    fn same_enum_name_must_mean_the_same_values() {
        let agree = Schema::from_records(vec![
            RecordDef::new("A", vec![Field::new("c", Ty::enumeration("Color", &["red", "green"]))]),
            RecordDef::new("B", vec![Field::new("c", Ty::optional(Ty::enumeration("Color", &["red", "green"])))]),
        ]);
        assert!(agree.is_ok());

        let err = Schema::from_records(vec![
            RecordDef::new("A", vec![Field::new("c", Ty::enumeration("Color", &["red"]))]),
            RecordDef::new("B", vec![Field::new("c", Ty::list(Ty::enumeration("Color", &["blue"])))]),
        ]).unwrap_err();
        assert_eq!(err, SchemaError::ConflictingEnum { name: "Color".into() });
    }

    #[test]
    fn duplicate_records_are_rejected() {
        let err = Schema::from_records(vec![
            RecordDef::new("A", vec![]),
            RecordDef::new("A", vec![]),
        ]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateRecord { record: "A".into() });
    }

    #[test]
    fn schema_document_parses() {
        let src = r#"{
            "records": [
                {"name": "Opt", "fields": [
                    {"name": "key", "type": {"primitive": "string"}},
                    {"name": "val", "type": {"optional": {"primitive": "string"}}}
                ]},
                {"name": "Org", "fields": [
                    {"name": "created_at", "type": "date_time"},
                    {"name": "opts", "type": {"list": {"item": {"named": "Opt"}, "arity": "one"}}},
                    {"name": "tags", "type": {"map": {"union": {"members": [{"primitive": "number"}], "nullable": true}}}}
                ]}
            ]
        }"#;
        let schema = Schema::from_json_str(src).unwrap();
        assert_eq!(schema.len(), 2);
        let org = schema.resolve("Org").unwrap();
        assert_eq!(org.field("created_at").unwrap().ty, Ty::DateTime);
        assert_eq!(org.field("opts").unwrap().ty, Ty::list_of_one(Ty::named("Opt")));
        assert_eq!(
            org.field("tags").unwrap().ty,
            Ty::map(Ty::nullable_union(vec![Ty::number()])),
        );
    }

    #[test]
    fn schema_document_errors_carry_json_path() {
        let src = r#"{"records": [{"name": "A", "fields": [{"name": "x", "type": {"primitive": "int"}}]}]}"#;
        let err = Schema::from_json_str(src).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("records[0].fields[0]"), "{msg}");
    }
}
