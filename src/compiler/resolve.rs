//! Type reference resolution
//!
//! Named references are looked up among declared types. Inline definitions
//! become anonymous types, deduplicated by the fingerprint of their
//! canonical form and named after their structure.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use indexmap::IndexMap;
use tracing::trace;

use super::{InlineState, Session, Slot};
use crate::checksum::Checksum;
use crate::dmt::{TypeDefn, TypeName, TypeReference};
use crate::error::CompileError;
use crate::typesystem::{MapRepr, TypeBody, TypeId};

impl Session<'_> {
    /// Resolve a reference on behalf of the declared type `owner`
    pub(super) fn resolve(&mut self, reference: &TypeReference, owner: &str) -> Option<TypeId> {
        match reference {
            TypeReference::Name(name) => self.resolve_name(name, owner),
            TypeReference::Inline(defn) => self.resolve_inline(defn, owner),
        }
    }

    pub(super) fn resolve_name(&mut self, name: &str, owner: &str) -> Option<TypeId> {
        if let Some(&id) = self.declared.get(name) {
            return Some(id);
        }
        self.errors.push(unresolved(name, owner, &self.declared));
        None
    }

    /// Find or create the anonymous type for an inline definition.
    ///
    /// The returned handle is valid even when the definition itself failed
    /// to compile; its errors are already recorded, once per owner.
    fn resolve_inline(&mut self, defn: &TypeDefn, owner: &str) -> Option<TypeId> {
        let fingerprint = Checksum::of(&defn.canonical());
        match self.inline.get(&fingerprint) {
            Some(&InlineState::Finished(id)) => {
                self.share(id, owner);
                return Some(id);
            }
            Some(InlineState::InProgress) => {
                self.errors.push(CompileError::unsupported_form(
                    owner,
                    format!("inline {} definition contains itself", defn.kind_name()),
                ));
                return None;
            }
            None => {}
        }
        if self.depth >= self.settings.max_inline_depth {
            self.errors.push(CompileError::unsupported_form(
                owner,
                format!(
                    "inline definitions nested deeper than {} levels",
                    self.settings.max_inline_depth
                ),
            ));
            return None;
        }

        let id = TypeId(self.slots.len());
        self.slots.push(Slot {
            name: String::new(),
            owners: vec![owner.to_string()],
            anonymous: true,
            body: None,
            faults: Vec::new(),
        });
        self.inline.insert(fingerprint.clone(), InlineState::InProgress);

        let before = self.errors.len();
        self.depth += 1;
        let body = self.compile_defn(owner, defn);
        self.depth -= 1;
        let faults = self.errors[before..].to_vec();

        let name = self.synthesize_name(defn, body.as_ref(), &fingerprint);
        trace!(%id, name = %name, owner, "registered anonymous type");
        self.anonymous_names.insert(name.clone());
        let slot = &mut self.slots[id.0];
        slot.name = name;
        slot.body = body;
        slot.faults = faults;
        self.inline.insert(fingerprint, InlineState::Finished(id));
        Some(id)
    }

    /// Record `owner` as containing an existing anonymous type and the
    /// anonymous types it refers to, replaying its errors for a new owner
    fn share(&mut self, id: TypeId, owner: &str) {
        let slot = &mut self.slots[id.0];
        if !slot.anonymous || slot.owners.iter().any(|o| o == owner) {
            return;
        }
        slot.owners.push(owner.to_string());
        let replayed: Vec<CompileError> = slot.faults.iter().map(|e| e.reattributed(owner)).collect();
        let nested = slot.body.as_ref().map(TypeBody::references).unwrap_or_default();
        self.errors.extend(replayed);
        for child in nested {
            self.share(child, owner);
        }
    }

    fn synthesize_name(&self, defn: &TypeDefn, body: Option<&TypeBody>, fingerprint: &Checksum) -> TypeName {
        let base = body
            .and_then(|b| self.describe(b))
            .unwrap_or_else(|| format!("Anon{}__{}", capitalize(defn.kind_name()), fingerprint.short()));
        if !self.name_taken(&base) {
            return base;
        }
        let mut candidate = format!("{}__{}", base, fingerprint.short());
        let mut counter = 1;
        while self.name_taken(&candidate) {
            counter += 1;
            candidate = format!("{}__{}_{}", base, fingerprint.short(), counter);
        }
        candidate
    }

    /// Structural name for links, lists and maps
    fn describe(&self, body: &TypeBody) -> Option<TypeName> {
        let name_of = |id: TypeId| self.slots[id.0].name.as_str();
        match body {
            TypeBody::Link(link) => Some(match link.expected_type {
                Some(id) => format!("Link__{}", name_of(id)),
                None => "Link__Any".to_string(),
            }),
            TypeBody::List(list) => Some(format!(
                "List__{}{}",
                nullable_prefix(list.value_nullable),
                name_of(list.value_type)
            )),
            TypeBody::Map(map) => {
                let suffix = match map.representation {
                    MapRepr::Map => "",
                    MapRepr::ListPairs => "__ListPairs",
                    MapRepr::StringPairs { .. } => "__StringPairs",
                };
                Some(format!(
                    "Map__{}__{}{}{}",
                    name_of(map.key_type),
                    nullable_prefix(map.value_nullable),
                    name_of(map.value_type),
                    suffix
                ))
            }
            _ => None,
        }
    }

    fn name_taken(&self, name: &str) -> bool {
        self.declared.contains_key(name) || self.anonymous_names.contains(name)
    }
}

/// Build an unresolved-reference error with a "did you mean" suggestion
pub(super) fn unresolved(name: &str, owner: &str, declared: &IndexMap<TypeName, TypeId>) -> CompileError {
    CompileError::UnresolvedReference {
        name: name.to_string(),
        referenced_by: owner.to_string(),
        suggestion: suggest(name, declared.keys().map(String::as_str)),
    }
}

/// Closest candidate by fuzzy score, if any matches at all
fn suggest<'a>(query: &str, candidates: impl Iterator<Item = &'a str>) -> Option<TypeName> {
    let matcher = SkimMatcherV2::default().ignore_case();
    let mut best: Option<(i64, &str)> = None;
    for candidate in candidates {
        if let Some(score) = matcher.fuzzy_match(candidate, query) {
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, candidate));
            }
        }
    }
    best.map(|(_, name)| name.to_string())
}

fn nullable_prefix(nullable: bool) -> &'static str {
    if nullable {
        "Nullable_"
    } else {
        ""
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::dmt::{FieldDefn, MapDefn, MapRepresentation, Schema, StructDefn};

    #[test]
    fn test_suggest_picks_closest() {
        let names = ["String", "Int", "Person"];
        assert_eq!(suggest("Strng", names.iter().copied()), Some("String".to_string()));
        assert_eq!(suggest("Qqq", names.iter().copied()), None);
    }

    #[test]
    fn test_descriptive_anonymous_names() {
        let schema = Schema::new()
            .with_type("String", TypeDefn::string())
            .with_type("Int", TypeDefn::int())
            .with_type(
                "Holder",
                StructDefn::new()
                    .field("names", FieldDefn::new(TypeDefn::list_of("String")))
                    .field("ref", FieldDefn::new(TypeDefn::link()))
                    .field(
                        "counts",
                        FieldDefn::new(TypeDefn::Map(
                            MapDefn::new("String", "Int")
                                .value_nullable()
                                .representation(MapRepresentation::ListPairs {}),
                        )),
                    ),
            );
        let ts = compile(&schema).unwrap();
        let names: Vec<_> = ts.anonymous_types().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["List__String", "Link__Any", "Map__String__Nullable_Int__ListPairs"]
        );
    }

    #[test]
    fn test_anonymous_name_avoids_declared_clash() {
        let schema = Schema::new()
            .with_type("String", TypeDefn::string())
            .with_type("List__String", TypeDefn::list_of("String"))
            .with_type(
                "Holder",
                StructDefn::new().field("names", FieldDefn::new(TypeDefn::list_of("String"))),
            );
        let ts = compile(&schema).unwrap();
        let anon = ts.anonymous_types().next().unwrap();
        assert!(anon.name().starts_with("List__String__"));
        assert_eq!(anon.name().len(), "List__String__".len() + 8);
    }

    #[test]
    fn test_equivalent_inline_spellings_share_a_type() {
        let schema = Schema::from_json_str(
            r#"{"types": {
                "String": {"string": {}},
                "A": {"struct": {"fields": {
                    "x": {"type": {"struct": {
                        "fields": {"v": {"type": "String"}},
                        "representation": {"map": {}}
                    }}},
                    "c": {"type": {"enum": {
                        "members": ["Red"],
                        "representation": {"string": {"Red": "Red"}}
                    }}}
                }}},
                "B": {"struct": {"fields": {
                    "y": {"type": {"struct": {
                        "fields": {"v": {"type": "String"}},
                        "representation": {"map": {"fields": {}}}
                    }}},
                    "c": {"type": {"enum": {"members": ["Red"]}}}
                }}}
            }}"#,
        )
        .unwrap();
        let ts = compile(&schema).unwrap();

        let a = ts.get("A").unwrap();
        let b = ts.get("B").unwrap();
        assert_eq!(a.field_type("x"), b.field_type("y"));
        assert_eq!(a.field_type("c"), b.field_type("c"));
        assert_eq!(ts.anonymous_types().count(), 2);
    }

    #[test]
    fn test_shared_faulty_inline_reported_for_each_owner() {
        let nested = || TypeDefn::list_of(TypeDefn::list_of("Missing"));
        let schema = Schema::new()
            .with_type("A", nested())
            .with_type("B", StructDefn::new().field("items", FieldDefn::new(nested())));
        let errors = compile(&schema).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.for_type("A").count(), 1);
        assert_eq!(errors.for_type("B").count(), 1);
    }

    #[test]
    fn test_shared_inline_cross_type_fault_reported_for_each_owner() {
        let schema = Schema::new()
            .with_type("Int", TypeDefn::int())
            .with_type("String", TypeDefn::string())
            .with_type("A", TypeDefn::list_of(TypeDefn::map_of("Int", "String")))
            .with_type("B", TypeDefn::list_of(TypeDefn::map_of("Int", "String")));
        let errors = compile(&schema).unwrap_err();

        assert_eq!(errors.for_type("A").count(), 1);
        assert_eq!(errors.for_type("B").count(), 1);
    }

    #[test]
    fn test_other_inline_kinds_use_fingerprint_names() {
        let schema = Schema::new()
            .with_type("String", TypeDefn::string())
            .with_type(
                "Outer",
                StructDefn::new().field(
                    "inner",
                    FieldDefn::new(TypeDefn::Struct(StructDefn::new().field("x", "String"))),
                ),
            );
        let ts = compile(&schema).unwrap();
        let anon = ts.anonymous_types().next().unwrap();
        assert!(anon.name().starts_with("AnonStruct__"));
    }
}
