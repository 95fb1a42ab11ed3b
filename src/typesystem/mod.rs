//! Compiled Type System
//!
//! An immutable arena of compiled types produced by
//! [`compile`](crate::compiler::compile). Types refer to each other by
//! [`TypeId`]; [`TypeRef`] pairs a handle with the owning [`TypeSystem`] so
//! callers can walk from one type to the types it references.
//!
//! Arena order is declared types in declaration order, followed by
//! anonymous types in the order they were first encountered.

mod display;
mod types;

pub(crate) use types::Type;
pub use types::{
    EnumRepr, EnumType, LinkType, ListType, MapFieldDetails, MapRepr, MapType, StructField,
    StructRepr, StructType, TypeBody, TypeId, TypeKind, UnionRepr, UnionType,
};

use indexmap::IndexMap;
use std::fmt;

use crate::checksum::Checksum;
use crate::dmt::TypeName;
use crate::kind::Kind;

/// A fully linked, immutable set of compiled types
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSystem {
    types: Vec<Type>,
    by_name: IndexMap<TypeName, TypeId>,
    fingerprint: Checksum,
}

impl TypeSystem {
    /// Assemble from a complete arena; each type's id must equal its index
    pub(crate) fn from_arena(types: Vec<Type>, fingerprint: Checksum) -> Self {
        let by_name = types.iter().map(|t| (t.name.clone(), t.id)).collect();
        Self {
            types,
            by_name,
            fingerprint,
        }
    }

    /// Look up a declared or synthesized type name
    pub fn get(&self, name: &str) -> Option<TypeRef<'_>> {
        self.by_name.get(name).map(|&id| self.type_by_id(id))
    }

    /// Resolve a handle from this type system
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different type system.
    pub fn type_by_id(&self, id: TypeId) -> TypeRef<'_> {
        assert!(id.0 < self.types.len(), "type id {} is not from this type system", id);
        TypeRef { ts: self, id }
    }

    /// Every type in arena order
    pub fn iter(&self) -> impl Iterator<Item = TypeRef<'_>> {
        self.types.iter().map(move |t| TypeRef { ts: self, id: t.id })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn named_types(&self) -> impl Iterator<Item = TypeRef<'_>> {
        self.iter().filter(|t| !t.is_anonymous())
    }

    pub fn anonymous_types(&self) -> impl Iterator<Item = TypeRef<'_>> {
        self.iter().filter(|t| t.is_anonymous())
    }

    /// Fingerprint of the schema this system was compiled from
    pub fn fingerprint(&self) -> &Checksum {
        &self.fingerprint
    }

    fn slot(&self, id: TypeId) -> &Type {
        &self.types[id.0]
    }
}

// =============================================================================
// Borrowed View
// =============================================================================

/// A compiled type together with the type system that owns it
#[derive(Clone, Copy)]
pub struct TypeRef<'ts> {
    ts: &'ts TypeSystem,
    id: TypeId,
}

impl<'ts> TypeRef<'ts> {
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'ts str {
        &self.ts.slot(self.id).name
    }

    /// Kind-specific payload
    pub fn kind(&self) -> &'ts TypeBody {
        &self.ts.slot(self.id).body
    }

    pub fn type_kind(&self) -> TypeKind {
        self.kind().type_kind()
    }

    pub fn is_anonymous(&self) -> bool {
        self.ts.slot(self.id).anonymous
    }

    /// Data model kind of this type's values on the wire
    pub fn representation_kind(&self) -> Option<Kind> {
        self.kind().representation_kind()
    }

    pub fn type_system(&self) -> &'ts TypeSystem {
        self.ts
    }

    /// Another type of the same system
    pub fn resolve(&self, id: TypeId) -> TypeRef<'ts> {
        self.ts.type_by_id(id)
    }

    /// Whether a link type names a target type (false for "any" and non-links)
    pub fn has_expected_type(&self) -> bool {
        self.expected_type().is_some()
    }

    /// Target of a link type; `None` means any type or not a link
    pub fn expected_type(&self) -> Option<TypeRef<'ts>> {
        match self.kind() {
            TypeBody::Link(link) => link.expected_type.map(|id| self.resolve(id)),
            _ => None,
        }
    }

    /// Key type of a map
    pub fn key_type(&self) -> Option<TypeRef<'ts>> {
        match self.kind() {
            TypeBody::Map(map) => Some(self.resolve(map.key_type)),
            _ => None,
        }
    }

    /// Value type of a map or list
    pub fn value_type(&self) -> Option<TypeRef<'ts>> {
        match self.kind() {
            TypeBody::Map(map) => Some(self.resolve(map.value_type)),
            TypeBody::List(list) => Some(self.resolve(list.value_type)),
            _ => None,
        }
    }

    /// Struct fields with their resolved types; empty for other kinds
    pub fn fields(&self) -> Vec<(&'ts StructField, TypeRef<'ts>)> {
        match self.kind() {
            TypeBody::Struct(st) => st.fields.iter().map(|f| (f, self.resolve(f.ty))).collect(),
            _ => Vec::new(),
        }
    }

    pub fn field_type(&self, name: &str) -> Option<TypeRef<'ts>> {
        match self.kind() {
            TypeBody::Struct(st) => st.field(name).map(|f| self.resolve(f.ty)),
            _ => None,
        }
    }

    /// Union members in declared order; empty for other kinds
    pub fn members(&self) -> Vec<TypeRef<'ts>> {
        match self.kind() {
            TypeBody::Union(union) => union.members.iter().map(|&id| self.resolve(id)).collect(),
            _ => Vec::new(),
        }
    }

    /// Every type referenced directly by this one
    pub fn references(&self) -> Vec<TypeRef<'ts>> {
        self.kind()
            .references()
            .into_iter()
            .map(|id| self.resolve(id))
            .collect()
    }
}

impl PartialEq for TypeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ts, other.ts) && self.id == other.id
    }
}

impl Eq for TypeRef<'_> {}

impl fmt::Debug for TypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRef")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("kind", &self.type_kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TypeSystem {
        let types = vec![
            Type {
                id: TypeId(0),
                name: "String".to_string(),
                anonymous: false,
                body: TypeBody::String,
            },
            Type {
                id: TypeId(1),
                name: "Ref".to_string(),
                anonymous: false,
                body: TypeBody::Link(LinkType {
                    expected_type: Some(TypeId(2)),
                }),
            },
            Type {
                id: TypeId(2),
                name: "List__String".to_string(),
                anonymous: true,
                body: TypeBody::List(ListType {
                    value_type: TypeId(0),
                    value_nullable: false,
                }),
            },
        ];
        TypeSystem::from_arena(types, Checksum::from_str("sample"))
    }

    #[test]
    fn test_lookup_by_name_and_id() {
        let ts = sample();
        let list = ts.get("List__String").unwrap();
        assert_eq!(list.id(), TypeId(2));
        assert_eq!(ts.type_by_id(TypeId(2)), list);
        assert!(ts.get("Missing").is_none());
    }

    #[test]
    fn test_link_navigation() {
        let ts = sample();
        let link = ts.get("Ref").unwrap();
        assert!(link.has_expected_type());
        let target = link.expected_type().unwrap();
        assert_eq!(target.name(), "List__String");
        assert_eq!(target.value_type().unwrap().name(), "String");
        assert_eq!(target.type_system().len(), 3);
    }

    #[test]
    fn test_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeSystem>();
    }

    #[test]
    fn test_named_and_anonymous_partition() {
        let ts = sample();
        assert_eq!(ts.named_types().count(), 2);
        assert_eq!(
            ts.anonymous_types().map(|t| t.name()).collect::<Vec<_>>(),
            vec!["List__String"]
        );
    }
}
