//! Checks that need every type compiled first
//!
//! These look across types: a map and its key type, a union and the shapes
//! of its members, a struct field and its implicit value. Types that failed
//! to compile are skipped; their own errors already explain them.

use super::{CompilerSettings, Slot};
use crate::dmt::ImplicitValue;
use crate::error::CompileError;
use crate::kind::Kind;
use crate::typesystem::{StructRepr, TypeBody, TypeId, UnionRepr};

pub(super) fn check(slots: &[Slot], settings: &CompilerSettings) -> Vec<CompileError> {
    let mut errors = Vec::new();
    let body = |id: TypeId| slots[id.0].body.as_ref();
    let name = |id: TypeId| slots[id.0].name.as_str();

    for slot in slots {
        let Some(own) = &slot.body else {
            continue;
        };
        let mut invalid = |reason: String| {
            for owner in &slot.owners {
                errors.push(CompileError::invalid_config(owner, reason.clone()));
            }
        };

        match own {
            TypeBody::Map(map) if settings.strict_map_keys => {
                if let Some(key) = body(map.key_type) {
                    let kind = key.representation_kind();
                    if kind != Some(Kind::String) {
                        invalid(format!(
                            "map {} key type {} has {} representation, expected string",
                            slot.name,
                            name(map.key_type),
                            kind_label(kind)
                        ));
                    }
                }
            }
            TypeBody::Union(union) => match &union.representation {
                UnionRepr::Kinded(table) => {
                    for (&kind, &member) in table {
                        let Some(member_body) = body(member) else {
                            continue;
                        };
                        let actual = member_body.representation_kind();
                        if actual != Some(kind) {
                            invalid(format!(
                                "kinded union {} maps kind {} to {}, which has {} representation",
                                slot.name,
                                kind,
                                name(member),
                                kind_label(actual)
                            ));
                        }
                    }
                }
                UnionRepr::Inline {
                    discriminant_key,
                    discriminant_table,
                } => {
                    for &member in discriminant_table.values() {
                        match body(member) {
                            Some(TypeBody::Struct(st)) if matches!(st.representation, StructRepr::Map { .. }) => {
                                if st.wire_names().contains(&discriminant_key.as_str()) {
                                    invalid(format!(
                                        "inline union {} member {} has a field named like discriminant key '{}'",
                                        slot.name,
                                        name(member),
                                        discriminant_key
                                    ));
                                }
                            }
                            Some(_) => invalid(format!(
                                "inline union {} member {} must be a struct with map representation",
                                slot.name,
                                name(member)
                            )),
                            None => {}
                        }
                    }
                }
                _ => {}
            },
            TypeBody::Struct(st) => {
                let StructRepr::Map { fields: details } = &st.representation else {
                    continue;
                };
                for (field_name, detail) in details {
                    let (Some(implicit), Some(field)) = (&detail.implicit, st.field(field_name)) else {
                        continue;
                    };
                    let Some(field_body) = body(field.ty) else {
                        continue;
                    };
                    let expected = field_body.representation_kind();
                    if !implicit_fits(implicit, expected) {
                        invalid(format!(
                            "field '{}' of {} has {} implicit value but type {} has {} representation",
                            field_name,
                            slot.name,
                            implicit.kind(),
                            name(field.ty),
                            kind_label(expected)
                        ));
                    }
                }
            }
            _ => {}
        }
    }
    errors
}

fn implicit_fits(value: &ImplicitValue, expected: Option<Kind>) -> bool {
    match (value.kind(), expected) {
        (actual, Some(kind)) if actual == kind => true,
        (Kind::Int, Some(Kind::Float)) => true,
        _ => false,
    }
}

fn kind_label(kind: Option<Kind>) -> &'static str {
    kind.map_or("varying", |k| k.as_str())
}
