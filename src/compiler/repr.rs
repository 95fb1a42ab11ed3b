//! Representation strategy translation
//!
//! Each declared representation is checked against the type it belongs to
//! and rewritten into its compiled form. Translation of one representation
//! reports every fault it finds and produces nothing if there was any.

use indexmap::IndexMap;
use std::collections::HashSet;

use super::resolve::unresolved;
use crate::dmt::{
    Entries, EnumDefn, EnumRepresentation, FieldName, MapRepresentation, StringPairsRepr,
    StructDefn, StructRepresentation, TypeName, UnionRepresentation,
};
use crate::error::CompileError;
use crate::typesystem::{EnumRepr, MapFieldDetails, MapRepr, StructRepr, TypeId, UnionRepr};

type Translated<T> = Result<T, Vec<CompileError>>;

/// Faults found while translating one representation
struct Faults<'a> {
    type_name: &'a str,
    errors: Vec<CompileError>,
}

impl<'a> Faults<'a> {
    fn new(type_name: &'a str) -> Self {
        Self {
            type_name,
            errors: Vec::new(),
        }
    }

    fn invalid(&mut self, reason: impl Into<String>) {
        self.errors
            .push(CompileError::invalid_config(self.type_name, reason));
    }

    fn finish<T>(self, value: T) -> Translated<T> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

// =============================================================================
// Maps
// =============================================================================

pub(super) fn translate_map(type_name: &str, repr: &MapRepresentation) -> Translated<MapRepr> {
    let mut faults = Faults::new(type_name);
    let compiled = match repr {
        MapRepresentation::Map {} => MapRepr::Map,
        MapRepresentation::ListPairs {} => MapRepr::ListPairs,
        MapRepresentation::StringPairs(pairs) => {
            check_delimiters(&mut faults, pairs);
            MapRepr::StringPairs {
                inner_delim: pairs.inner_delim.clone(),
                entry_delim: pairs.entry_delim.clone(),
            }
        }
    };
    faults.finish(compiled)
}

fn check_delimiters(faults: &mut Faults<'_>, pairs: &StringPairsRepr) {
    if pairs.inner_delim.is_empty() {
        faults.invalid("stringpairs innerDelim is empty");
    }
    if pairs.entry_delim.is_empty() {
        faults.invalid("stringpairs entryDelim is empty");
    }
    if !pairs.inner_delim.is_empty() && pairs.inner_delim == pairs.entry_delim {
        faults.invalid(format!(
            "stringpairs innerDelim and entryDelim are both '{}'",
            pairs.inner_delim
        ));
    }
}

// =============================================================================
// Structs
// =============================================================================

pub(super) fn translate_struct(type_name: &str, st: &StructDefn) -> Translated<StructRepr> {
    let mut faults = Faults::new(type_name);
    let declared: Vec<&str> = st.fields.keys().map(String::as_str).collect();

    let compiled = match &st.representation {
        StructRepresentation::Map(map) => {
            let mut details = IndexMap::new();
            if let Some(entries) = &map.fields {
                let mut seen = HashSet::new();
                for (field, detail) in entries.iter() {
                    if !declared.contains(&field.as_str()) {
                        faults.invalid(format!("representation details name undeclared field '{}'", field));
                        continue;
                    }
                    if !seen.insert(field.as_str()) {
                        faults.invalid(format!("representation details for field '{}' are given more than once", field));
                        continue;
                    }
                    if detail.rename.as_deref() == Some("") {
                        faults.invalid(format!("field '{}' is renamed to an empty string", field));
                    }
                    if detail.implicit.is_some() && st.fields.get(field).is_some_and(|f| f.optional) {
                        faults.invalid(format!("field '{}' is optional and cannot have an implicit value", field));
                    }
                    if detail.rename.is_some() || detail.implicit.is_some() {
                        details.insert(
                            field.clone(),
                            MapFieldDetails {
                                rename: detail.rename.clone(),
                                implicit: detail.implicit.clone(),
                            },
                        );
                    }
                }
            }

            // Repeated field names are reported by the struct itself
            let mut visited = HashSet::new();
            let mut wire_names = HashSet::new();
            for field in declared.iter().filter(|f| visited.insert(**f)) {
                let wire = details
                    .get(*field)
                    .and_then(|d| d.rename.as_deref())
                    .unwrap_or(*field);
                if !wire_names.insert(wire) {
                    faults.invalid(format!("wire name '{}' is used by more than one field", wire));
                }
            }
            StructRepr::Map { fields: details }
        }
        StructRepresentation::Tuple(tuple) => StructRepr::Tuple {
            field_order: field_order(&mut faults, &declared, tuple.field_order.as_deref()),
        },
        StructRepresentation::StringPairs(pairs) => {
            check_delimiters(&mut faults, pairs);
            StructRepr::StringPairs {
                inner_delim: pairs.inner_delim.clone(),
                entry_delim: pairs.entry_delim.clone(),
            }
        }
        StructRepresentation::StringJoin(join) => {
            if join.join.is_empty() {
                faults.invalid("stringjoin join delimiter is empty");
            }
            StructRepr::StringJoin {
                join: join.join.clone(),
                field_order: field_order(&mut faults, &declared, join.field_order.as_deref()),
            }
        }
        StructRepresentation::ListPairs {} => StructRepr::ListPairs,
    };
    faults.finish(compiled)
}

/// Explicit field order: absent means declared order, present must be a
/// permutation of the declared fields
fn field_order(faults: &mut Faults<'_>, declared: &[&str], order: Option<&[FieldName]>) -> Vec<FieldName> {
    let Some(order) = order else {
        return declared.iter().map(|f| f.to_string()).collect();
    };
    if order.is_empty() && !declared.is_empty() {
        faults.invalid("fieldOrder is present but empty");
        return Vec::new();
    }

    let mut seen = HashSet::new();
    for field in order {
        if !declared.contains(&field.as_str()) {
            faults.invalid(format!("fieldOrder names undeclared field '{}'", field));
        } else if !seen.insert(field.as_str()) {
            faults.invalid(format!("fieldOrder lists field '{}' more than once", field));
        }
    }
    for field in declared {
        if !order.iter().any(|f| f == field) {
            faults.invalid(format!("fieldOrder omits field '{}'", field));
        }
    }
    order.to_vec()
}

// =============================================================================
// Unions
// =============================================================================

/// Union members by name, for checking discriminant tables
pub(super) struct MemberLookup<'a> {
    pub(super) members: &'a IndexMap<TypeName, TypeId>,
    /// Members that failed to resolve; their error is already reported
    pub(super) unresolved: &'a HashSet<TypeName>,
    pub(super) declared: &'a IndexMap<TypeName, TypeId>,
}

impl MemberLookup<'_> {
    /// Member handle for a table entry; `None` after recording a fault, or
    /// silently for members whose failure was already reported
    fn find(&self, faults: &mut Faults<'_>, name: &str) -> Option<TypeId> {
        if let Some(&id) = self.members.get(name) {
            return Some(id);
        }
        if self.unresolved.contains(name) {
            return None;
        }
        if self.declared.contains_key(name) {
            faults.invalid(format!("'{}' is not a member of the union", name));
        } else {
            faults.errors.push(unresolved(name, faults.type_name, self.declared));
        }
        None
    }
}

pub(super) fn translate_union(
    type_name: &str,
    lookup: &MemberLookup<'_>,
    repr: &UnionRepresentation,
) -> Translated<UnionRepr> {
    let mut faults = Faults::new(type_name);
    let compiled = match repr {
        UnionRepresentation::Keyed(table) => {
            UnionRepr::Keyed(discriminant_table(&mut faults, lookup, table, "wire key"))
        }
        UnionRepresentation::Kinded(table) => {
            let mut compiled = IndexMap::new();
            for (kind, member) in table.iter() {
                if compiled.contains_key(kind) {
                    faults.invalid(format!("kind '{}' is listed more than once", kind));
                    continue;
                }
                if let Some(id) = lookup.find(&mut faults, member) {
                    compiled.insert(*kind, id);
                }
            }
            UnionRepr::Kinded(compiled)
        }
        UnionRepresentation::Envelope(envelope) => {
            if envelope.discriminant_key.is_empty() {
                faults.invalid("envelope discriminantKey is empty");
            }
            if envelope.content_key.is_empty() {
                faults.invalid("envelope contentKey is empty");
            }
            if !envelope.content_key.is_empty() && envelope.discriminant_key == envelope.content_key {
                faults.invalid(format!(
                    "envelope discriminantKey and contentKey are both '{}'",
                    envelope.content_key
                ));
            }
            UnionRepr::Envelope {
                discriminant_key: envelope.discriminant_key.clone(),
                content_key: envelope.content_key.clone(),
                discriminant_table: discriminant_table(
                    &mut faults,
                    lookup,
                    &envelope.discriminant_table,
                    "discriminant",
                ),
            }
        }
        UnionRepresentation::Inline(inline) => {
            if inline.discriminant_key.is_empty() {
                faults.invalid("inline discriminantKey is empty");
            }
            UnionRepr::Inline {
                discriminant_key: inline.discriminant_key.clone(),
                discriminant_table: discriminant_table(
                    &mut faults,
                    lookup,
                    &inline.discriminant_table,
                    "discriminant",
                ),
            }
        }
        UnionRepresentation::StringPrefix(prefixes) => {
            let table = discriminant_table(&mut faults, lookup, &prefixes.discriminant_table, "prefix");
            let keys: Vec<&String> = prefixes.discriminant_table.keys().collect();
            for (i, a) in keys.iter().enumerate() {
                if a.is_empty() {
                    faults.invalid("stringprefix prefix is empty");
                    continue;
                }
                for b in keys.iter().skip(i + 1) {
                    if a != b && (b.starts_with(a.as_str()) || a.starts_with(b.as_str())) {
                        faults.invalid(format!("prefixes '{}' and '{}' overlap", a, b));
                    }
                }
            }
            UnionRepr::StringPrefix(table)
        }
        UnionRepresentation::BytePrefix(prefixes) => {
            let mut compiled: IndexMap<TypeId, u8> = IndexMap::new();
            let mut used = HashSet::new();
            for (member, &value) in prefixes.discriminant_table.iter() {
                let Ok(byte) = u8::try_from(value) else {
                    faults.invalid(format!("byte prefix {} for '{}' is outside 0..=255", value, member));
                    continue;
                };
                if !used.insert(byte) {
                    faults.invalid(format!("byte prefix {} is used more than once", byte));
                }
                if let Some(id) = lookup.find(&mut faults, member) {
                    if compiled.insert(id, byte).is_some() {
                        faults.invalid(format!("member '{}' has more than one byte prefix", member));
                    }
                }
            }
            UnionRepr::BytePrefix(compiled)
        }
    };
    faults.finish(compiled)
}

/// Ordered discriminant to member table; several keys may name one member
fn discriminant_table(
    faults: &mut Faults<'_>,
    lookup: &MemberLookup<'_>,
    table: &Entries<String, TypeName>,
    what: &str,
) -> IndexMap<String, TypeId> {
    let mut compiled = IndexMap::new();
    for (key, member) in table.iter() {
        if compiled.contains_key(key) {
            faults.invalid(format!("{} '{}' is used more than once", what, key));
            continue;
        }
        if let Some(id) = lookup.find(faults, member) {
            compiled.insert(key.clone(), id);
        }
    }
    compiled
}

// =============================================================================
// Enums
// =============================================================================

pub(super) fn translate_enum(type_name: &str, en: &EnumDefn) -> Translated<EnumRepr> {
    let mut faults = Faults::new(type_name);
    let compiled = match &en.representation {
        EnumRepresentation::String(table) => {
            check_enum_keys(&mut faults, en, table.keys());
            let mut wire = IndexMap::new();
            let mut used = HashSet::new();
            for member in &en.members {
                let value = table.get(member).unwrap_or(member);
                if value.is_empty() {
                    faults.invalid(format!("enum member '{}' has an empty wire string", member));
                } else if !used.insert(value.as_str()) {
                    faults.invalid(format!("wire string '{}' is used by more than one member", value));
                }
                wire.insert(member.clone(), value.clone());
            }
            EnumRepr::String(wire)
        }
        EnumRepresentation::Int(table) => {
            check_enum_keys(&mut faults, en, table.keys());
            let mut wire = IndexMap::new();
            let mut used = HashSet::new();
            for member in &en.members {
                match table.get(member) {
                    Some(&value) => {
                        if !used.insert(value) {
                            faults.invalid(format!("wire int {} is used by more than one member", value));
                        }
                        wire.insert(member.clone(), value);
                    }
                    None => faults.invalid(format!("enum member '{}' has no int value", member)),
                }
            }
            EnumRepr::Int(wire)
        }
    };
    faults.finish(compiled)
}

fn check_enum_keys<'k>(faults: &mut Faults<'_>, en: &EnumDefn, keys: impl Iterator<Item = &'k String>) {
    let mut seen = HashSet::new();
    for key in keys {
        if !en.members.contains(key) {
            faults.invalid(format!("representation names unknown enum member '{}'", key));
        } else if !seen.insert(key) {
            faults.invalid(format!("enum member '{}' is given more than one wire value", key));
        }
    }
}
