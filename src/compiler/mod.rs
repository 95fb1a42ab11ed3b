//! Schema Compiler
//!
//! Turns a [`Schema`] declaration into an immutable [`TypeSystem`].
//!
//! Compilation runs in four phases:
//! 1. every declared name is registered, so references may point forward;
//! 2. each declaration is compiled in order, resolving references and
//!    translating its representation;
//! 3. checks that need the finished arena run over all types;
//! 4. the type system is returned, or every error found on the way.
//!
//! Errors never stop the compile early. A declaration with any fault is
//! left out entirely, and the compile as a whole fails.

mod repr;
mod resolve;
mod validate;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::checksum::Checksum;
use crate::dmt::{
    EnumDefn, LinkDefn, ListDefn, MapDefn, Schema, StructDefn, TypeDefn, TypeName, TypeReference,
    UnionDefn,
};
use crate::error::{CompileError, CompileErrors};
use crate::typesystem::{
    EnumType, LinkType, ListType, MapType, StructField, StructType, Type, TypeBody, TypeId,
    TypeSystem, UnionType,
};

/// Compile a schema with default settings
pub fn compile(schema: &Schema) -> Result<TypeSystem, CompileErrors> {
    Compiler::new().compile(schema)
}

/// Tunables for a compile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Deepest allowed nesting of inline type definitions
    #[serde(default = "default_max_inline_depth")]
    pub max_inline_depth: usize,

    /// Require map key types to have a string representation
    #[serde(default = "default_strict_map_keys")]
    pub strict_map_keys: bool,
}

fn default_max_inline_depth() -> usize {
    32
}

fn default_strict_map_keys() -> bool {
    true
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            max_inline_depth: default_max_inline_depth(),
            strict_map_keys: default_strict_map_keys(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    settings: CompilerSettings,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: CompilerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    pub fn compile(&self, schema: &Schema) -> Result<TypeSystem, CompileErrors> {
        let mut session = Session::new(&self.settings);

        let mut accepted = Vec::with_capacity(schema.types.len());
        for (name, defn) in schema.types.iter() {
            match session.declare(name) {
                Some(id) => accepted.push((id, name.as_str(), defn)),
                None => session.errors.push(CompileError::DuplicateName { name: name.clone() }),
            }
        }
        debug!(declared = accepted.len(), "registered declared types");

        for (id, name, defn) in accepted {
            let body = session.compile_defn(name, defn);
            session.slots[id.0].body = body;
        }

        let cross_type = validate::check(&session.slots, &self.settings);
        session.errors.extend(cross_type);

        let anonymous = session.slots.iter().filter(|s| s.anonymous).count();
        if let Some(errors) = CompileErrors::new(session.errors) {
            debug!(errors = errors.len(), "schema compilation failed");
            return Err(errors);
        }

        let types = session
            .slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| match slot.body {
                Some(body) => Type {
                    id: TypeId(index),
                    name: slot.name,
                    anonymous: slot.anonymous,
                    body,
                },
                None => panic!("type '{}' left uncompiled without a reported error", slot.name),
            })
            .collect::<Vec<_>>();

        debug!(
            types = types.len(),
            anonymous,
            "compiled type system"
        );
        Ok(TypeSystem::from_arena(types, schema.fingerprint()))
    }
}

// =============================================================================
// Compile Session
// =============================================================================

/// Arena entry under construction
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) name: TypeName,
    /// Declared types whose declarations contain this slot, first one first
    pub(crate) owners: Vec<TypeName>,
    pub(crate) anonymous: bool,
    pub(crate) body: Option<TypeBody>,
    /// Errors raised while compiling an anonymous slot, replayed for each
    /// further owner
    pub(crate) faults: Vec<CompileError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineState {
    InProgress,
    Finished(TypeId),
}

/// Mutable state of one compile call
struct Session<'s> {
    settings: &'s CompilerSettings,
    slots: Vec<Slot>,
    declared: IndexMap<TypeName, TypeId>,
    anonymous_names: HashSet<TypeName>,
    inline: HashMap<Checksum, InlineState>,
    errors: Vec<CompileError>,
    depth: usize,
}

impl<'s> Session<'s> {
    fn new(settings: &'s CompilerSettings) -> Self {
        Self {
            settings,
            slots: Vec::new(),
            declared: IndexMap::new(),
            anonymous_names: HashSet::new(),
            inline: HashMap::new(),
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Reserve a slot for a declared name; `None` if it is already taken
    fn declare(&mut self, name: &str) -> Option<TypeId> {
        if self.declared.contains_key(name) {
            return None;
        }
        let id = TypeId(self.slots.len());
        self.slots.push(Slot {
            name: name.to_string(),
            owners: vec![name.to_string()],
            anonymous: false,
            body: None,
            faults: Vec::new(),
        });
        self.declared.insert(name.to_string(), id);
        Some(id)
    }

    /// Compile one declaration body. All-or-nothing: any error reported
    /// while compiling it (including in nested inline types) yields `None`.
    fn compile_defn(&mut self, owner: &str, defn: &TypeDefn) -> Option<TypeBody> {
        let before = self.errors.len();
        let body = match defn {
            TypeDefn::Bool {} => Some(TypeBody::Bool),
            TypeDefn::String {} => Some(TypeBody::String),
            TypeDefn::Bytes {} => Some(TypeBody::Bytes),
            TypeDefn::Int {} => Some(TypeBody::Int),
            TypeDefn::Float {} => Some(TypeBody::Float),
            TypeDefn::Link(link) => self.compile_link(owner, link),
            TypeDefn::Map(map) => self.compile_map(owner, map),
            TypeDefn::List(list) => self.compile_list(owner, list),
            TypeDefn::Struct(st) => self.compile_struct(owner, st),
            TypeDefn::Union(union) => self.compile_union(owner, union),
            TypeDefn::Enum(en) => self.compile_enum(owner, en),
            TypeDefn::Copy(_) => {
                self.errors.push(CompileError::UnsupportedKind {
                    type_name: owner.to_string(),
                    kind: defn.kind_name().to_string(),
                });
                None
            }
        };
        if self.errors.len() > before {
            None
        } else {
            body
        }
    }

    fn compile_link(&mut self, owner: &str, link: &LinkDefn) -> Option<TypeBody> {
        let expected_type = match &link.expected_type {
            Some(reference) => Some(self.resolve(reference, owner)?),
            None => None,
        };
        Some(TypeBody::Link(LinkType { expected_type }))
    }

    fn compile_map(&mut self, owner: &str, map: &MapDefn) -> Option<TypeBody> {
        let key_type = match &map.key_type {
            TypeReference::Name(name) => self.resolve_name(name, owner),
            TypeReference::Inline(_) => {
                self.errors.push(CompileError::unsupported_form(
                    owner,
                    "map key types must be named, not defined inline",
                ));
                None
            }
        };
        let value_type = self.resolve(&map.value_type, owner);
        let representation = self.absorb(repr::translate_map(owner, &map.representation));
        Some(TypeBody::Map(MapType {
            key_type: key_type?,
            value_type: value_type?,
            value_nullable: map.value_nullable,
            representation: representation?,
        }))
    }

    fn compile_list(&mut self, owner: &str, list: &ListDefn) -> Option<TypeBody> {
        let value_type = self.resolve(&list.value_type, owner)?;
        Some(TypeBody::List(ListType {
            value_type,
            value_nullable: list.value_nullable,
        }))
    }

    fn compile_struct(&mut self, owner: &str, st: &StructDefn) -> Option<TypeBody> {
        let mut seen = HashSet::new();
        for name in st.fields.keys() {
            if name.is_empty() {
                self.errors
                    .push(CompileError::invalid_config(owner, "field name is empty"));
            } else if !seen.insert(name.as_str()) {
                self.errors.push(CompileError::invalid_config(
                    owner,
                    format!("field '{}' is declared more than once", name),
                ));
            }
        }

        let mut fields = Vec::with_capacity(st.fields.len());
        let mut resolved = true;
        for (name, field) in st.fields.iter() {
            match self.resolve(&field.ty, owner) {
                Some(ty) => fields.push(StructField {
                    name: name.clone(),
                    ty,
                    optional: field.optional,
                    nullable: field.nullable,
                }),
                None => resolved = false,
            }
        }

        let representation = self.absorb(repr::translate_struct(owner, st));
        if !resolved {
            return None;
        }
        Some(TypeBody::Struct(StructType {
            fields,
            representation: representation?,
        }))
    }

    fn compile_union(&mut self, owner: &str, union: &UnionDefn) -> Option<TypeBody> {
        let mut members: IndexMap<TypeName, TypeId> = IndexMap::new();
        let mut unresolved = HashSet::new();
        for member in &union.members {
            match member {
                TypeReference::Name(name) => {
                    let Some(id) = self.resolve_name(name, owner) else {
                        unresolved.insert(name.clone());
                        continue;
                    };
                    if members.insert(name.clone(), id).is_some() {
                        self.errors.push(CompileError::invalid_config(
                            owner,
                            format!("union member '{}' is listed more than once", name),
                        ));
                    }
                }
                TypeReference::Inline(defn) => {
                    self.errors.push(CompileError::unsupported_form(
                        owner,
                        format!(
                            "union members must be named types, found inline {} definition",
                            defn.kind_name()
                        ),
                    ));
                }
            }
        }

        let lookup = repr::MemberLookup {
            members: &members,
            unresolved: &unresolved,
            declared: &self.declared,
        };
        let translated = repr::translate_union(owner, &lookup, &union.representation);
        let representation = self.absorb(translated)?;
        Some(TypeBody::Union(UnionType {
            members: members.values().copied().collect(),
            representation,
        }))
    }

    fn compile_enum(&mut self, owner: &str, en: &EnumDefn) -> Option<TypeBody> {
        let mut seen = HashSet::new();
        for member in &en.members {
            if member.is_empty() {
                self.errors
                    .push(CompileError::invalid_config(owner, "enum member is empty"));
            } else if !seen.insert(member.as_str()) {
                self.errors.push(CompileError::invalid_config(
                    owner,
                    format!("enum member '{}' is listed more than once", member),
                ));
            }
        }
        let representation = self.absorb(repr::translate_enum(owner, en))?;
        Some(TypeBody::Enum(EnumType {
            members: en.members.clone(),
            representation,
        }))
    }

    /// Move translator errors into the session
    fn absorb<T>(&mut self, result: Result<T, Vec<CompileError>>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(errors) => {
                self.errors.extend(errors);
                None
            }
        }
    }
}
