//! Structural disambiguation for unions.
//!
//! Every type maps to the set of wire shapes its values can take. A union is
//! well formed when those sets (plus `null` for the nullable arm) are pairwise
//! disjoint: then any value selects exactly one arm and declaration order only
//! decides the order the arms are tested in.
use std::collections::BTreeSet;
use std::fmt;
use serde_json::Value;

use crate::ir::{Lit, Prim, Ty};
use crate::model::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shape {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

pub type ShapeSet = BTreeSet<Shape>;

impl Shape {
    pub fn of_wire(value: &Value) -> Self {
        match value {
            Value::Null => Shape::Null,
            Value::Bool(_) => Shape::Boolean,
            Value::Number(_) => Shape::Number,
            Value::String(_) => Shape::String,
            Value::Array(_) => Shape::Array,
            Value::Object(_) => Shape::Object,
        }
    }

    /// The wire shape a model value lowers to.
    pub fn of_model(value: &Model) -> Self {
        match value {
            Model::Null => Shape::Null,
            Model::Bool(_) => Shape::Boolean,
            Model::Number(_) | Model::Instant(_) => Shape::Number,
            Model::String(_) => Shape::String,
            Model::List(_) => Shape::Array,
            Model::Map(_) | Model::Record(_) => Shape::Object,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Null => "null",
            Shape::Boolean => "boolean",
            Shape::Number => "number",
            Shape::String => "string",
            Shape::Array => "array",
            Shape::Object => "object",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn shapes(ty: &Ty) -> ShapeSet {
    let mut out = ShapeSet::new();
    collect(ty, &mut out);
    out
}

fn collect(ty: &Ty, out: &mut ShapeSet) {
    match ty {
        Ty::Primitive(Prim::String) | Ty::Enum { .. } | Ty::Literal(Lit::String(_)) => { out.insert(Shape::String); }
        Ty::Literal(Lit::Number(_)) => { out.insert(Shape::Number); }
        Ty::Literal(Lit::Boolean(_)) => { out.insert(Shape::Boolean); }
        Ty::Primitive(Prim::Number) | Ty::DateTime => { out.insert(Shape::Number); }
        Ty::Primitive(Prim::Boolean) => { out.insert(Shape::Boolean); }
        Ty::Optional(inner) => {
            out.insert(Shape::Null);
            collect(inner, out);
        }
        Ty::Union { members, nullable } => {
            if *nullable { out.insert(Shape::Null); }
            for m in members { collect(m, out); }
        }
        Ty::List { .. } => { out.insert(Shape::Array); }
        Ty::Map(_) | Ty::Named(_) | Ty::Tagged { .. } => { out.insert(Shape::Object); }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claimant {
    NullArm,
    Member(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    pub shape: Shape,
    pub first: Claimant,
    pub second: usize,
}

/// Shape set per member, or the first overlap found in declaration order.
pub fn disambiguate(members: &[Ty], nullable: bool) -> Result<Vec<ShapeSet>, Overlap> {
    let mut claimed: Vec<(Shape, Claimant)> = Vec::new();
    if nullable {
        claimed.push((Shape::Null, Claimant::NullArm));
    }
    let mut out = Vec::with_capacity(members.len());
    for (i, member) in members.iter().enumerate() {
        let set = shapes(member);
        for shape in &set {
            if let Some((_, first)) = claimed.iter().find(|(s, _)| s == shape) {
                return Err(Overlap { shape: *shape, first: *first, second: i });
            }
        }
        claimed.extend(set.iter().map(|s| (*s, Claimant::Member(i))));
        out.push(set);
    }
    Ok(out)
}
