//! TypeScript rendering of a synthesized codec set.
//!
//! Pure formatting: every conversion decision was already made by the
//! synthesizer, this walks the expression trees and prints them.
use std::fmt::Write;

use indexmap::IndexMap;

use crate::compile::{IDENTIFIER, Routine};
use crate::ir::{Arity, Prim, RecordDef, Schema, Ty};
use crate::registry::CodecSet;
use crate::synth::shape::{self, Shape};
use crate::synth::{Arm, CodecRef, Direction, Expr, Place, TagArm};

const HEADER: &str = "// Generated by json-wire. Do not edit.\n";

const UNREACHABLE: &str = "\
function unreachable(value: unknown): never {
  throw new Error(`unexpected wire value: ${JSON.stringify(value)}`);
}
";

#[derive(Debug, Default)]
pub struct Codegen {
    out: String,
    needs_unreachable: bool,
}

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enums and type declarations first, then every `fromWire`, then every
    /// `toWire`, each group in schema order.
    pub fn emit(&mut self, schema: &Schema, codecs: &CodecSet) {
        for (name, values) in enums(schema) {
            self.emit_enum(name, values);
        }
        for def in schema.records() {
            self.emit_type(def);
        }
        for direction in Direction::BOTH {
            for codec in codecs.iter() {
                self.emit_routine(codec.routine(direction));
            }
        }
    }

    pub fn into_string(self) -> String {
        let mut src = String::from(HEADER);
        if self.needs_unreachable {
            src.push('\n');
            src.push_str(UNREACHABLE);
        }
        src.push_str(&self.out);
        src
    }

    fn emit_enum(&mut self, name: &str, values: &[String]) {
        let _ = writeln!(self.out, "\nexport enum {name} {{");
        for value in values {
            let _ = writeln!(self.out, "  {} = {},", property(value), quote(value));
        }
        self.out.push_str("}\n");
    }

    fn emit_type(&mut self, def: &RecordDef) {
        let _ = writeln!(self.out, "\nexport type {} = {{", def.name);
        for field in &def.fields {
            let _ = writeln!(self.out, "  {}: {};", property(&field.name), ts_type(&field.ty));
        }
        self.out.push_str("};\n");
    }

    fn emit_routine(&mut self, routine: &Routine) {
        let record = &routine.codec.record;
        let (param, ret) = match routine.codec.direction {
            Direction::WireToModel => ("any".to_string(), record.clone()),
            Direction::ModelToWire => (record.clone(), "any".to_string()),
        };
        let _ = writeln!(
            self.out,
            "\nexport function {}({}: {param}): {ret} {{\n  return {{",
            routine_name(&routine.codec),
            routine.param,
        );
        for init in &routine.fields {
            let value = self.expr(&init.value, routine.codec.direction);
            let _ = writeln!(self.out, "    {}: {value},", property(&init.name));
        }
        self.out.push_str("  };\n}\n");
    }

    fn expr(&mut self, expr: &Expr, direction: Direction) -> String {
        match expr {
            Expr::Copy { src, .. } => place(src),
            Expr::SecondsToInstant { src } => format!("new Date({} * 1000)", place(src)),
            Expr::InstantToSeconds { src } => format!("Math.floor({}.getTime() / 1000)", place(src)),
            Expr::NullOr { src, then } => {
                let then = self.expr(then, direction);
                format!("{} === null ? null : {then}", place(src))
            }
            Expr::Select { src, nullable, arms } => self.select(src, *nullable, arms, direction),
            Expr::EachElement { src, item, item_ty, body } => {
                let body = self.expr(body, direction);
                format!("{}.map(({item}: {}) => {body})", place(src), ts_type(item_ty))
            }
            Expr::EachEntry { src, key, value, value_ty, body } => {
                let body = self.expr(body, direction);
                format!(
                    "Object.fromEntries(Object.entries({} as Record<string, {}>).map(([{key}, {value}]) => [{key}, {body}]))",
                    place(src),
                    ts_type(value_ty),
                )
            }
            Expr::Call { codec, src } => format!("{}({})", routine_name(codec), place(src)),
            // the declared type already narrows these
            Expr::Literal { src, .. } | Expr::Member { src, .. } => place(src),
            Expr::Dispatch { src, tag, arms } => self.dispatch(src, tag, arms),
        }
    }

    fn dispatch(&mut self, src: &Place, tag: &str, arms: &[TagArm]) -> String {
        self.needs_unreachable = true;
        let subject = place(src);
        let discriminant = member(&subject, tag);
        let mut out = String::from("(");
        for arm in arms {
            let _ = write!(out, "{discriminant} === {} ? {}({subject}) : ", arm.literal, routine_name(&arm.codec));
        }
        let _ = write!(out, "unreachable({subject}))");
        out
    }

    fn select(&mut self, src: &Place, nullable: bool, arms: &[Arm], direction: Direction) -> String {
        self.needs_unreachable = true;
        let subject = place(src);
        let mut out = String::from("(");
        if nullable {
            let _ = write!(out, "{subject} === null ? null : ");
        }
        for arm in arms {
            let test = arm_test(&subject, arm, direction);
            let body = self.expr(&arm.body, direction);
            let _ = write!(out, "{test} ? {body} : ");
        }
        let _ = write!(out, "unreachable({subject}))");
        out
    }
}

/// `getOrgFromWire` / `convertOrgToWire`
pub fn routine_name(codec: &CodecRef) -> String {
    match codec.direction {
        Direction::WireToModel => format!("get{}FromWire", codec.record),
        Direction::ModelToWire => format!("convert{}ToWire", codec.record),
    }
}

pub fn ts_type(ty: &Ty) -> String {
    match ty {
        Ty::Primitive(Prim::String) => "string".into(),
        Ty::Primitive(Prim::Number) => "number".into(),
        Ty::Primitive(Prim::Boolean) => "boolean".into(),
        Ty::DateTime => "Date".into(),
        Ty::Optional(inner) => format!("{} | null", ts_type(inner)),
        Ty::Union { members, nullable } => {
            let mut parts: Vec<String> = Vec::with_capacity(members.len() + 1);
            if *nullable {
                parts.push("null".into());
            }
            parts.extend(members.iter().map(ts_type));
            parts.join(" | ")
        }
        Ty::List { item, arity: Arity::One } => format!("[{}]", ts_type(item)),
        Ty::List { item, arity: Arity::Many } => {
            let item = ts_type(item);
            if item.contains('|') { format!("({item})[]") } else { format!("{item}[]") }
        }
        Ty::Map(value) => format!("Record<string, {}>", ts_type(value)),
        Ty::Named(name) => name.clone(),
        Ty::Literal(lit) => lit.to_string(),
        Ty::Enum { name, .. } => name.clone(),
        Ty::Tagged { members, .. } => members.join(" | "),
    }
}

/// Every enum reachable from a field type, first declaration wins.
fn enums(schema: &Schema) -> IndexMap<&str, &[String]> {
    let mut out = IndexMap::new();
    for def in schema.records() {
        for field in &def.fields {
            field.ty.walk(&mut |ty| {
                if let Ty::Enum { name, values } = ty {
                    out.entry(name.as_str()).or_insert(values.as_slice());
                }
            });
        }
    }
    out
}

fn place(place: &Place) -> String {
    match place {
        Place::Var(ident) => ident.to_string(),
        Place::Field { base, name } if IDENTIFIER.is_match(name) => format!("{base}.{name}"),
        Place::Field { base, name } => format!("{base}[{}]", quote(name)),
    }
}

fn member(subject: &str, name: &str) -> String {
    if IDENTIFIER.is_match(name) { format!("{subject}.{name}") } else { format!("{subject}[{}]", quote(name)) }
}

fn property(name: &str) -> String {
    if IDENTIFIER.is_match(name) { name.to_string() } else { quote(name) }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

fn arm_test(subject: &str, arm: &Arm, direction: Direction) -> String {
    let mut tests = Vec::new();
    type_tests(subject, &arm.member, direction, &mut tests);
    match tests.as_slice() {
        [single] => single.clone(),
        _ => format!("({})", tests.join(" || ")),
    }
}

/// Runtime checks that together accept exactly the values of `ty` on the
/// input side of `direction`.
fn type_tests(subject: &str, ty: &Ty, direction: Direction, out: &mut Vec<String>) {
    match ty {
        // model-side timestamps are `Date` objects, not numbers
        Ty::DateTime if direction == Direction::ModelToWire => push_new(out, format!("{subject} instanceof Date")),
        Ty::Optional(inner) => {
            push_new(out, shape_test(subject, Shape::Null, direction));
            type_tests(subject, inner, direction, out);
        }
        Ty::Union { members, nullable } => {
            if *nullable {
                push_new(out, shape_test(subject, Shape::Null, direction));
            }
            for member in members {
                type_tests(subject, member, direction, out);
            }
        }
        _ => {
            for shape in shape::shapes(ty).iter() {
                push_new(out, shape_test(subject, *shape, direction));
            }
        }
    }
}

fn push_new(tests: &mut Vec<String>, test: String) {
    if !tests.contains(&test) {
        tests.push(test);
    }
}

fn shape_test(subject: &str, shape: Shape, direction: Direction) -> String {
    match shape {
        Shape::Null => format!("{subject} === null"),
        Shape::Boolean | Shape::Number | Shape::String => format!("typeof {subject} === \"{shape}\""),
        Shape::Array => format!("Array.isArray({subject})"),
        Shape::Object => {
            let mut test = format!("(typeof {subject} === \"object\" && {subject} !== null && !Array.isArray({subject})");
            if direction == Direction::ModelToWire {
                let _ = write!(test, " && !({subject} instanceof Date)");
            }
            test.push(')');
            test
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Field;
    use crate::registry::Registry;

    fn render(schema: &Schema) -> String {
        let codecs = Registry::compile_all(schema).unwrap();
        let mut cg = Codegen::new();
        cg.emit(schema, &codecs);
        cg.into_string()
    }

    #[test]
    fn renders_a_flat_record() {
        let schema = Schema::from_records(vec![RecordDef::new("Opt", vec![
            Field::new("key", Ty::string()),
            Field::new("val", Ty::optional(Ty::string())),
        ])]).unwrap();
        let expected = "\
// Generated by json-wire. Do not edit.

export type Opt = {
  key: string;
  val: string | null;
};

export function getOptFromWire(root: any): Opt {
  return {
    key: root.key,
    val: root.val === null ? null : root.val,
  };
}

export function convertOptToWire(root: Opt): any {
  return {
    key: root.key,
    val: root.val === null ? null : root.val,
  };
}
";
        assert_eq!(render(&schema), expected);
    }

    #[test]
    fn renders_the_org_fixture() {
        let schema = Schema::from_json_str(include_str!("../fixtures/org.schema.json")).unwrap();
        let src = render(&schema);
        assert!(src.contains("  deep_opts: Record<string, Record<string, Record<string, Record<string, Opt>>>>;"));
        assert!(src.contains("  roles: [string];"));
        assert!(src.contains("  opt_union: null | number | string;"));
        assert!(src.contains("created_at: new Date(root.created_at * 1000),"));
        assert!(src.contains("created_at: Math.floor(root.created_at.getTime() / 1000),"));
        assert!(src.contains("root.users.map((v1: User) => getUserFromWire(v1))"));
        assert!(src.contains(
            "Object.entries(v3 as Record<string, Opt>).map(([k4, v4]) => [k4, getOptFromWire(v4)])"
        ));
        assert!(src.contains("function unreachable(value: unknown): never"));
        assert!(src.contains("(root.opt_union === null ? null : typeof root.opt_union === \"number\" ? root.opt_union"));
    }

    #[test]
    fn no_helper_without_unions() {
        let schema = Schema::from_records(vec![RecordDef::new("A", vec![Field::new("x", Ty::list(Ty::number()))])]).unwrap();
        let src = render(&schema);
        assert!(!src.contains("unreachable"));
        assert!(src.contains("  x: number[];"));
    }

    #[test]
    fn awkward_field_names_are_quoted() {
        let schema = Schema::from_records(vec![RecordDef::new("A", vec![Field::new("content-type", Ty::string())])]).unwrap();
        let src = render(&schema);
        assert!(src.contains("  \"content-type\": string;"));
        assert!(src.contains("\"content-type\": root[\"content-type\"],"));
    }

    #[test]
    fn datetime_arms_test_for_dates_on_the_way_out() {
        let schema = Schema::from_records(vec![
            RecordDef::new("B", vec![Field::new("n", Ty::number())]),
            RecordDef::new("A", vec![Field::new("when", Ty::union(vec![Ty::DateTime, Ty::named("B")]))]),
        ]).unwrap();
        let src = render(&schema);
        assert!(src.contains("root.when instanceof Date ? Math.floor(root.when.getTime() / 1000)"));
        assert!(src.contains("typeof root.when === \"number\" ? new Date(root.when * 1000)"));
    }

    #[test]
    fn optional_datetime_arms_still_test_for_dates() {
        let schema = Schema::from_records(vec![RecordDef::new("A", vec![Field::new(
            "u",
            Ty::union(vec![Ty::optional(Ty::DateTime), Ty::string()]),
        )])]).unwrap();
        let src = render(&schema);
        assert!(src.contains("(root.u === null || root.u instanceof Date) ? root.u === null ? null : Math.floor("));
        assert!(src.contains("(root.u === null || typeof root.u === \"number\") ? root.u === null ? null : new Date("));
    }

    #[test]
    fn datetime_inside_a_nested_union_is_tested_as_a_date() {
        let schema = Schema::from_records(vec![
            RecordDef::new("B", vec![Field::new("n", Ty::number())]),
            RecordDef::new("A", vec![Field::new(
                "u",
                Ty::union(vec![Ty::union(vec![Ty::DateTime, Ty::boolean()]), Ty::named("B")]),
            )]),
        ]).unwrap();
        let src = render(&schema);
        assert!(src.contains("(root.u instanceof Date || typeof root.u === \"boolean\") ?"));
        assert!(src.contains("&& !(root.u instanceof Date)) ? convertBToWire(root.u)"));
    }

    #[test]
    fn tagged_unions_switch_on_the_tag() {
        let schema = Schema::from_json_str(include_str!("../fixtures/org.schema.json")).unwrap();
        let src = render(&schema);
        assert!(src.contains("export enum Color {\n  red = \"red\",\n  green = \"green\",\n}\n"));
        assert!(src.find("export enum Color").unwrap() < src.find("export type Drawing").unwrap());
        assert!(src.contains("  kind: \"circle\";"));
        assert!(src.contains("  shapes: (Circle | Square)[];"));
        assert!(src.contains("  color: Color;"));
        assert!(src.contains("  pinned: Circle | Square | null;"));
        assert!(src.contains(
            "(v1.kind === \"circle\" ? getCircleFromWire(v1) : v1.kind === \"square\" ? getSquareFromWire(v1) : unreachable(v1))"
        ));
        assert!(src.contains(
            "pinned: root.pinned === null ? null : (root.pinned.kind === \"circle\" ? convertCircleToWire(root.pinned)"
        ));
    }

    #[test]
    fn routine_names() {
        assert_eq!(routine_name(&CodecRef::from_wire("Org")), "getOrgFromWire");
        assert_eq!(routine_name(&CodecRef::to_wire("Org")), "convertOrgToWire");
    }
}
