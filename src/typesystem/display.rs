//! Schema DSL rendering of compiled types

use std::fmt::{self, Write};

use super::{EnumRepr, MapRepr, StructRepr, TypeBody, TypeId, TypeRef, UnionRepr};
use crate::dmt::ImplicitValue;

impl fmt::Display for TypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {} ", self.name())?;
        match self.kind() {
            TypeBody::Bool
            | TypeBody::String
            | TypeBody::Bytes
            | TypeBody::Int
            | TypeBody::Float => f.write_str(self.type_kind().as_str()),
            TypeBody::Link(link) => match link.expected_type {
                Some(id) => write!(f, "&{}", self.resolve(id).name()),
                None => f.write_str("&Any"),
            },
            TypeBody::List(list) => write!(
                f,
                "[{}{}]",
                nullable(list.value_nullable),
                self.resolve(list.value_type).name()
            ),
            TypeBody::Map(map) => {
                write!(
                    f,
                    "{{{}:{}{}}}",
                    self.resolve(map.key_type).name(),
                    nullable(map.value_nullable),
                    self.resolve(map.value_type).name()
                )?;
                match &map.representation {
                    MapRepr::Map => Ok(()),
                    MapRepr::ListPairs => f.write_str(" representation listpairs"),
                    MapRepr::StringPairs {
                        inner_delim,
                        entry_delim,
                    } => write!(
                        f,
                        " representation stringpairs {{\n\tinnerDelim {:?}\n\tentryDelim {:?}\n}}",
                        inner_delim, entry_delim
                    ),
                }
            }
            TypeBody::Struct(st) => {
                f.write_str("struct {\n")?;
                for field in &st.fields {
                    write!(
                        f,
                        "\t{} {}{}{}",
                        field.name,
                        if field.optional { "optional " } else { "" },
                        nullable(field.nullable),
                        self.resolve(field.ty).name()
                    )?;
                    if let StructRepr::Map { fields } = &st.representation {
                        if let Some(details) = fields.get(&field.name) {
                            let mut parts = Vec::new();
                            if let Some(rename) = &details.rename {
                                parts.push(format!("rename {:?}", rename));
                            }
                            if let Some(implicit) = &details.implicit {
                                parts.push(format!("implicit {}", implicit_literal(implicit)));
                            }
                            write!(f, " ({})", parts.join(" "))?;
                        }
                    }
                    f.write_char('\n')?;
                }
                f.write_str("} representation ")?;
                let declared: Vec<&str> = st.fields.iter().map(|field| field.name.as_str()).collect();
                match &st.representation {
                    StructRepr::Map { .. } => f.write_str("map"),
                    StructRepr::ListPairs => f.write_str("listpairs"),
                    StructRepr::Tuple { field_order } => {
                        f.write_str("tuple")?;
                        if !same_order(field_order, &declared) {
                            write!(f, " {{\n\tfieldOrder {:?}\n}}", field_order)?;
                        }
                        Ok(())
                    }
                    StructRepr::StringPairs {
                        inner_delim,
                        entry_delim,
                    } => write!(
                        f,
                        "stringpairs {{\n\tinnerDelim {:?}\n\tentryDelim {:?}\n}}",
                        inner_delim, entry_delim
                    ),
                    StructRepr::StringJoin { join, field_order } => {
                        write!(f, "stringjoin {{\n\tjoin {:?}\n", join)?;
                        if !same_order(field_order, &declared) {
                            writeln!(f, "\tfieldOrder {:?}", field_order)?;
                        }
                        f.write_char('}')
                    }
                }
            }
            TypeBody::Union(union) => {
                f.write_str("union {\n")?;
                let labelled: Vec<(TypeId, String)> = match &union.representation {
                    UnionRepr::Keyed(table)
                    | UnionRepr::Envelope {
                        discriminant_table: table,
                        ..
                    }
                    | UnionRepr::Inline {
                        discriminant_table: table,
                        ..
                    }
                    | UnionRepr::StringPrefix(table) => table
                        .iter()
                        .map(|(key, &id)| (id, format!("{:?}", key)))
                        .collect(),
                    UnionRepr::Kinded(table) => table
                        .iter()
                        .map(|(kind, &id)| (id, kind.to_string()))
                        .collect(),
                    UnionRepr::BytePrefix(table) => table
                        .iter()
                        .map(|(&id, byte)| (id, byte.to_string()))
                        .collect(),
                };
                for (id, label) in &labelled {
                    writeln!(f, "\t| {} {}", self.resolve(*id).name(), label)?;
                }
                let listed: Vec<TypeId> = labelled.iter().map(|(id, _)| *id).collect();
                for id in union.members.iter().filter(|id| !listed.contains(id)) {
                    writeln!(f, "\t| {}", self.resolve(*id).name())?;
                }
                write!(f, "}} representation {}", union.representation.name())?;
                match &union.representation {
                    UnionRepr::Envelope {
                        discriminant_key,
                        content_key,
                        ..
                    } => write!(
                        f,
                        " {{\n\tdiscriminantKey {:?}\n\tcontentKey {:?}\n}}",
                        discriminant_key, content_key
                    ),
                    UnionRepr::Inline {
                        discriminant_key, ..
                    } => write!(f, " {{\n\tdiscriminantKey {:?}\n}}", discriminant_key),
                    _ => Ok(()),
                }
            }
            TypeBody::Enum(en) => {
                f.write_str("enum {\n")?;
                for member in &en.members {
                    write!(f, "\t| {}", member)?;
                    match &en.representation {
                        EnumRepr::String(wire) => {
                            if let Some(value) = wire.get(member).filter(|v| *v != member) {
                                write!(f, " ({:?})", value)?;
                            }
                        }
                        EnumRepr::Int(wire) => {
                            if let Some(value) = wire.get(member) {
                                write!(f, " (\"{}\")", value)?;
                            }
                        }
                    }
                    f.write_char('\n')?;
                }
                match en.representation {
                    EnumRepr::String(_) => f.write_str("} representation string"),
                    EnumRepr::Int(_) => f.write_str("} representation int"),
                }
            }
        }
    }
}

fn nullable(flag: bool) -> &'static str {
    if flag {
        "nullable "
    } else {
        ""
    }
}

fn same_order(order: &[String], declared: &[&str]) -> bool {
    order.len() == declared.len() && order.iter().zip(declared).all(|(a, b)| a == b)
}

fn implicit_literal(value: &ImplicitValue) -> String {
    match value {
        ImplicitValue::Bool(b) => b.to_string(),
        ImplicitValue::Int(i) => i.to_string(),
        ImplicitValue::Float(x) => x.to_string(),
        ImplicitValue::String(s) => format!("{:?}", s),
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::super::{
        MapFieldDetails, StructField, StructType, Type, TypeSystem, UnionType,
    };
    use super::*;
    use crate::checksum::Checksum;

    fn system(bodies: Vec<(&str, TypeBody)>) -> TypeSystem {
        let types = bodies
            .into_iter()
            .enumerate()
            .map(|(i, (name, body))| Type {
                id: TypeId(i),
                name: name.to_string(),
                anonymous: false,
                body,
            })
            .collect();
        TypeSystem::from_arena(types, Checksum::from_str("display"))
    }

    #[test]
    fn test_struct_renders_in_dsl_form() {
        let mut details = IndexMap::new();
        details.insert(
            "age".to_string(),
            MapFieldDetails {
                rename: Some("a".to_string()),
                implicit: Some(ImplicitValue::Int(0)),
            },
        );
        let ts = system(vec![
            ("Int", TypeBody::Int),
            (
                "Person",
                TypeBody::Struct(StructType {
                    fields: vec![StructField {
                        name: "age".to_string(),
                        ty: TypeId(0),
                        optional: false,
                        nullable: true,
                    }],
                    representation: StructRepr::Map { fields: details },
                }),
            ),
        ]);
        assert_eq!(
            ts.get("Person").unwrap().to_string(),
            "type Person struct {\n\tage nullable Int (rename \"a\" implicit 0)\n} representation map"
        );
        assert_eq!(ts.get("Int").unwrap().to_string(), "type Int int");
    }

    #[test]
    fn test_keyed_union_lists_wire_keys() {
        let ts = system(vec![
            ("A", TypeBody::String),
            ("B", TypeBody::Int),
            (
                "AorB",
                TypeBody::Union(UnionType {
                    members: vec![TypeId(0), TypeId(1)],
                    representation: UnionRepr::Keyed(IndexMap::from([
                        ("a".to_string(), TypeId(0)),
                        ("b".to_string(), TypeId(1)),
                    ])),
                }),
            ),
        ]);
        assert_eq!(
            ts.get("AorB").unwrap().to_string(),
            "type AorB union {\n\t| A \"a\"\n\t| B \"b\"\n} representation keyed"
        );
    }
}
