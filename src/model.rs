//! The typed in-memory side of a codec.
//!
//! Values here are what `fromWire` produces and `toWire` consumes. Numbers keep
//! their exact wire representation; timestamps are real instants.
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Instant(DateTime<Utc>),
    List(Vec<Model>),
    Map(IndexMap<String, Model>),    // equality ignores entry order
    Record(Record),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub fields: IndexMap<String, Model>,
}

impl Model {
    pub fn kind(&self) -> &'static str {
        match self {
            Model::Null => "null",
            Model::Bool(_) => "boolean",
            Model::Number(_) => "number",
            Model::String(_) => "string",
            Model::Instant(_) => "instant",
            Model::List(_) => "list",
            Model::Map(_) => "map",
            Model::Record(_) => "record",
        }
    }

    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Model::Instant)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Model::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Model::Instant(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Model::Null)
    }
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: IndexMap::new() }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Model>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Model> {
        self.fields.get(field)
    }
}

impl From<bool> for Model {
    fn from(b: bool) -> Self { Model::Bool(b) }
}

impl From<i64> for Model {
    fn from(n: i64) -> Self { Model::Number(n.into()) }
}

impl From<&str> for Model {
    fn from(s: &str) -> Self { Model::String(s.to_string()) }
}

impl From<String> for Model {
    fn from(s: String) -> Self { Model::String(s) }
}

impl From<DateTime<Utc>> for Model {
    fn from(t: DateTime<Utc>) -> Self { Model::Instant(t) }
}

impl From<Record> for Model {
    fn from(r: Record) -> Self { Model::Record(r) }
}

impl<T: Into<Model>> From<Option<T>> for Model {
    fn from(v: Option<T>) -> Self {
        v.map_or(Model::Null, Into::into)
    }
}

impl From<Vec<Model>> for Model {
    fn from(items: Vec<Model>) -> Self { Model::List(items) }
}

impl From<IndexMap<String, Model>> for Model {
    fn from(entries: IndexMap<String, Model>) -> Self { Model::Map(entries) }
}

// Display form only: instants render as RFC 3339, records as plain objects.
impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Model::Null => serializer.serialize_unit(),
            Model::Bool(b) => serializer.serialize_bool(*b),
            Model::Number(n) => n.serialize(serializer),
            Model::String(s) => serializer.serialize_str(s),
            Model::Instant(t) => {
                serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Model::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Model::Map(entries) => serialize_entries(entries, serializer),
            Model::Record(record) => serialize_entries(&record.fields, serializer),
        }
    }
}

fn serialize_entries<S: Serializer>(
    entries: &IndexMap<String, Model>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (k, v) in entries {
        map.serialize_entry(k, v)?;
    }
    map.end()
}
