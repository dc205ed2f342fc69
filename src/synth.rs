//! Codec synthesis.
//!
//! `synthesize(ty, direction, depth)` turns a type expression into an
//! expression tree describing how to convert one value of that type. The
//! recursion follows the generic constructors; it stops at named records,
//! which are compiled once through the [`Registry`] and referenced by call.
//!
//! Depth is the depth of the next binding to introduce. Only `List` and `Map`
//! bind names and therefore only they increment it.
pub mod shape;

use std::fmt;
use tracing::trace;

use crate::error::SchemaError;
use crate::ir::{Lit, Prim, Ty};
use crate::namer::{self, Ident, Role};
use crate::registry::Registry;
use shape::{Claimant, ShapeSet};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    WireToModel,
    ModelToWire,
}

/// Names one synthesized routine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodecRef {
    pub record: String,
    pub direction: Direction,
}

/// Where an expression reads its input from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Place {
    Var(Ident),
    Field { base: Ident, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// primitive, checked and passed through
    Copy { src: Place, prim: Prim },
    /// wire seconds → instant (`× 1000` as milliseconds)
    SecondsToInstant { src: Place },
    /// instant → wire seconds (milliseconds `/ 1000`, sub-second part dropped)
    InstantToSeconds { src: Place },
    NullOr { src: Place, then: Box<Expr> },
    Select { src: Place, nullable: bool, arms: Vec<Arm> },
    EachElement { src: Place, item: Ident, item_ty: Ty, body: Box<Expr> },
    EachEntry { src: Place, key: Ident, value: Ident, value_ty: Ty, body: Box<Expr> },
    Call { codec: CodecRef, src: Place },
    /// must equal `value`; passed through
    Literal { src: Place, value: Lit },
    /// string restricted to the values of enum `name`
    Member { src: Place, name: String, values: Vec<String> },
    /// read field `tag` of the record, call the routine of the arm whose
    /// literal it holds
    Dispatch { src: Place, tag: String, arms: Vec<TagArm> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagArm {
    pub literal: Lit,
    pub codec: CodecRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    pub member: Ty,
    pub shapes: ShapeSet,
    pub body: Expr,
}

/// The record field being synthesized; every schema error names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub record: String,
    pub field: String,
}

pub struct Synthesizer<'r, 's> {
    registry: &'r mut Registry<'s>,
    direction: Direction,
    site: Site,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::WireToModel, Direction::ModelToWire];
}

impl CodecRef {
    pub fn new(record: impl Into<String>, direction: Direction) -> Self {
        Self { record: record.into(), direction }
    }
    pub fn from_wire(record: impl Into<String>) -> Self {
        Self::new(record, Direction::WireToModel)
    }
    pub fn to_wire(record: impl Into<String>) -> Self {
        Self::new(record, Direction::ModelToWire)
    }
}

impl fmt::Display for CodecRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::WireToModel => write!(f, "{} (wire → model)", self.record),
            Direction::ModelToWire => write!(f, "{} (model → wire)", self.record),
        }
    }
}

impl Site {
    pub fn new(record: impl Into<String>, field: impl Into<String>) -> Self {
        Self { record: record.into(), field: field.into() }
    }
}

impl Expr {
    pub fn src(&self) -> &Place {
        match self {
            Expr::Copy { src, .. }
            | Expr::SecondsToInstant { src }
            | Expr::InstantToSeconds { src }
            | Expr::NullOr { src, .. }
            | Expr::Select { src, .. }
            | Expr::EachElement { src, .. }
            | Expr::EachEntry { src, .. }
            | Expr::Call { src, .. }
            | Expr::Literal { src, .. }
            | Expr::Member { src, .. }
            | Expr::Dispatch { src, .. } => src,
        }
    }

    /// Pre-order over this expression and its nested expressions.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::NullOr { then, .. } => then.walk(visit),
            Expr::Select { arms, .. } => {
                for arm in arms { arm.body.walk(visit); }
            }
            Expr::EachElement { body, .. } | Expr::EachEntry { body, .. } => body.walk(visit),
            Expr::Copy { .. }
            | Expr::SecondsToInstant { .. }
            | Expr::InstantToSeconds { .. }
            | Expr::Call { .. }
            | Expr::Literal { .. }
            | Expr::Member { .. }
            | Expr::Dispatch { .. } => {}
        }
    }

    /// Identifiers this expression introduces, outermost first.
    pub fn bindings(&self) -> Vec<Ident> {
        let mut out = Vec::new();
        self.walk(&mut |e| match e {
            Expr::EachElement { item, .. } => out.push(*item),
            Expr::EachEntry { key, value, .. } => {
                out.push(*key);
                out.push(*value);
            }
            _ => {}
        });
        out
    }

    pub fn calls(&self) -> Vec<&CodecRef> {
        let mut out = Vec::new();
        self.walk(&mut |e| match e {
            Expr::Call { codec, .. } => out.push(codec),
            Expr::Dispatch { arms, .. } => out.extend(arms.iter().map(|arm| &arm.codec)),
            _ => {}
        });
        out
    }
}

impl<'r, 's> Synthesizer<'r, 's> {
    pub fn new(registry: &'r mut Registry<'s>, direction: Direction, site: Site) -> Self {
        Self { registry, direction, site }
    }

    pub fn synthesize(&mut self, ty: &Ty, depth: u32, src: Place) -> Result<Expr, SchemaError> {
        trace!(record = %self.site.record, field = %self.site.field, depth, ty = %ty, "synthesize");
        match ty {
            Ty::Primitive(prim) => Ok(Expr::Copy { src, prim: *prim }),
            Ty::DateTime => Ok(match self.direction {
                Direction::WireToModel => Expr::SecondsToInstant { src },
                Direction::ModelToWire => Expr::InstantToSeconds { src },
            }),
            Ty::Optional(inner) => {
                let then = self.synthesize(inner, depth, src.clone())?;
                Ok(Expr::NullOr { src, then: Box::new(then) })
            }
            Ty::Union { members, nullable } => self.union(ty, members, *nullable, depth, src),
            Ty::List { item, .. } => {
                let bound = namer::name(Role::Value, depth);
                let body = self.synthesize(item, depth + 1, Place::Var(bound))?;
                Ok(Expr::EachElement {
                    src,
                    item: bound,
                    item_ty: item.as_ref().clone(),
                    body: Box::new(body),
                })
            }
            Ty::Map(value) => {
                let key = namer::name(Role::Key, depth);
                let bound = namer::name(Role::Value, depth);
                let body = self.synthesize(value, depth + 1, Place::Var(bound))?;
                Ok(Expr::EachEntry {
                    src,
                    key,
                    value: bound,
                    value_ty: value.as_ref().clone(),
                    body: Box::new(body),
                })
            }
            Ty::Named(name) => {
                if self.registry.schema().resolve(name).is_none() {
                    return Err(SchemaError::UnknownRecord {
                        record: self.site.record.clone(),
                        field: self.site.field.clone(),
                        name: name.clone(),
                    });
                }
                let codec = self.compiled(name)?;
                Ok(Expr::Call { codec, src })
            }
            Ty::Literal(value) => Ok(Expr::Literal { src, value: value.clone() }),
            Ty::Enum { name, values } => {
                if values.is_empty() {
                    return Err(SchemaError::EmptyEnum {
                        record: self.site.record.clone(),
                        field: self.site.field.clone(),
                        name: name.clone(),
                    });
                }
                Ok(Expr::Member { src, name: name.clone(), values: values.clone() })
            }
            Ty::Tagged { tag, members } => self.tagged(ty, tag, members, src),
        }
    }

    /// The routine for `record` in this direction, compiling it if needed.
    fn compiled(&mut self, record: &str) -> Result<CodecRef, SchemaError> {
        let (from_wire, to_wire) = self.registry.get_or_compile(record)?;
        Ok(match self.direction {
            Direction::WireToModel => from_wire,
            Direction::ModelToWire => to_wire,
        })
    }

    fn tagged(&mut self, ty: &Ty, tag: &str, members: &[String], src: Place) -> Result<Expr, SchemaError> {
        if members.is_empty() {
            return Err(SchemaError::EmptyUnion {
                record: self.site.record.clone(),
                field: self.site.field.clone(),
                union: ty.to_string(),
            });
        }
        let schema = self.registry.schema();
        let mut arms: Vec<TagArm> = Vec::with_capacity(members.len());
        for member in members {
            let def = schema.resolve(member).ok_or_else(|| SchemaError::UnknownRecord {
                record: self.site.record.clone(),
                field: self.site.field.clone(),
                name: member.clone(),
            })?;
            let literal = match def.field(tag).map(|f| &f.ty) {
                Some(Ty::Literal(lit)) => lit.clone(),
                _ => {
                    return Err(SchemaError::MissingDiscriminant {
                        record: self.site.record.clone(),
                        field: self.site.field.clone(),
                        member: member.clone(),
                        tag: tag.to_string(),
                    });
                }
            };
            if arms.iter().any(|arm| arm.literal == literal) {
                return Err(SchemaError::DuplicateDiscriminant {
                    record: self.site.record.clone(),
                    field: self.site.field.clone(),
                    tag: tag.to_string(),
                    literal: literal.to_string(),
                });
            }
            let codec = self.compiled(member)?;
            arms.push(TagArm { literal, codec });
        }
        Ok(Expr::Dispatch { src, tag: tag.to_string(), arms })
    }

    fn union(
        &mut self,
        ty: &Ty,
        members: &[Ty],
        nullable: bool,
        depth: u32,
        src: Place,
    ) -> Result<Expr, SchemaError> {
        if members.is_empty() && !nullable {
            return Err(SchemaError::EmptyUnion {
                record: self.site.record.clone(),
                field: self.site.field.clone(),
                union: ty.to_string(),
            });
        }
        let sets = shape::disambiguate(members, nullable).map_err(|overlap| {
            let first = match overlap.first {
                Claimant::NullArm => "null".to_string(),
                Claimant::Member(i) => members[i].to_string(),
            };
            SchemaError::AmbiguousUnion {
                record: self.site.record.clone(),
                field: self.site.field.clone(),
                union: ty.to_string(),
                shape: overlap.shape,
                first,
                second: members[overlap.second].to_string(),
            }
        })?;

        let mut arms = Vec::with_capacity(members.len());
        for (member, shapes) in members.iter().zip(sets) {
            let body = self.synthesize(member, depth, src.clone())?;
            arms.push(Arm { member: member.clone(), shapes, body });
        }
        Ok(Expr::Select { src, nullable, arms })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
