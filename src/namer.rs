//! Binding names for values introduced while unwrapping nested generics.
//!
//! A name is a pure function of `(role, depth)`: the same pair yields the same
//! identifier in every field, and different pairs never collide. Depth is
//! unbounded; `root` is reserved for the record parameter.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Key,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ident {
    Root,
    Bound { role: Role, depth: u32 },
}

pub fn name(role: Role, depth: u32) -> Ident {
    Ident::Bound { role, depth }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ident::Root => f.write_str("root"),
            Ident::Bound { role: Role::Key, depth } => write!(f, "k{depth}"),
            Ident::Bound { role: Role::Value, depth } => write!(f, "v{depth}"),
        }
    }
}
