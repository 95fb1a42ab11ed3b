//! Compiled type payloads
//!
//! Every reference between types is a [`TypeId`] into the owning
//! [`TypeSystem`](super::TypeSystem) arena. Representations are stored in
//! their compiled form: defaults filled in, field orders made explicit and
//! discriminant tables pointing at member handles.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use crate::dmt::{EnumValue, FieldName, ImplicitValue, TypeName};
use crate::kind::Kind;

/// Handle of a compiled type inside its type system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One compiled type, stored in the arena of a [`TypeSystem`](super::TypeSystem)
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Type {
    pub(crate) id: TypeId,
    pub(crate) name: TypeName,
    pub(crate) anonymous: bool,
    pub(crate) body: TypeBody,
}

// =============================================================================
// Kind Tags
// =============================================================================

/// Kind of a compiled type, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Bool,
    String,
    Bytes,
    Int,
    Float,
    Link,
    Map,
    List,
    Struct,
    Union,
    Enum,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Bool => "bool",
            TypeKind::String => "string",
            TypeKind::Bytes => "bytes",
            TypeKind::Int => "int",
            TypeKind::Float => "float",
            TypeKind::Link => "link",
            TypeKind::Map => "map",
            TypeKind::List => "list",
            TypeKind::Struct => "struct",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Kind-specific content of a compiled type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeBody {
    Bool,
    String,
    Bytes,
    Int,
    Float,
    Link(LinkType),
    Map(MapType),
    List(ListType),
    Struct(StructType),
    Union(UnionType),
    Enum(EnumType),
}

impl TypeBody {
    pub fn type_kind(&self) -> TypeKind {
        match self {
            TypeBody::Bool => TypeKind::Bool,
            TypeBody::String => TypeKind::String,
            TypeBody::Bytes => TypeKind::Bytes,
            TypeBody::Int => TypeKind::Int,
            TypeBody::Float => TypeKind::Float,
            TypeBody::Link(_) => TypeKind::Link,
            TypeBody::Map(_) => TypeKind::Map,
            TypeBody::List(_) => TypeKind::List,
            TypeBody::Struct(_) => TypeKind::Struct,
            TypeBody::Union(_) => TypeKind::Union,
            TypeBody::Enum(_) => TypeKind::Enum,
        }
    }

    /// Data model kind produced on the wire; `None` for kinded unions
    pub fn representation_kind(&self) -> Option<Kind> {
        match self {
            TypeBody::Bool => Some(Kind::Bool),
            TypeBody::String => Some(Kind::String),
            TypeBody::Bytes => Some(Kind::Bytes),
            TypeBody::Int => Some(Kind::Int),
            TypeBody::Float => Some(Kind::Float),
            TypeBody::Link(_) => Some(Kind::Link),
            TypeBody::List(_) => Some(Kind::List),
            TypeBody::Map(map) => Some(match map.representation {
                MapRepr::Map => Kind::Map,
                MapRepr::ListPairs => Kind::List,
                MapRepr::StringPairs { .. } => Kind::String,
            }),
            TypeBody::Struct(st) => Some(match st.representation {
                StructRepr::Map { .. } => Kind::Map,
                StructRepr::Tuple { .. } | StructRepr::ListPairs => Kind::List,
                StructRepr::StringPairs { .. } | StructRepr::StringJoin { .. } => Kind::String,
            }),
            TypeBody::Union(union) => match union.representation {
                UnionRepr::Keyed(_) | UnionRepr::Envelope { .. } | UnionRepr::Inline { .. } => {
                    Some(Kind::Map)
                }
                UnionRepr::Kinded(_) => None,
                UnionRepr::StringPrefix(_) => Some(Kind::String),
                UnionRepr::BytePrefix(_) => Some(Kind::Bytes),
            },
            TypeBody::Enum(en) => Some(match en.representation {
                EnumRepr::String(_) => Kind::String,
                EnumRepr::Int(_) => Kind::Int,
            }),
        }
    }

    /// Handles of every type this one refers to, in declaration order
    pub fn references(&self) -> Vec<TypeId> {
        match self {
            TypeBody::Bool | TypeBody::String | TypeBody::Bytes | TypeBody::Int | TypeBody::Float => {
                Vec::new()
            }
            TypeBody::Enum(_) => Vec::new(),
            TypeBody::Link(link) => link.expected_type.into_iter().collect(),
            TypeBody::Map(map) => vec![map.key_type, map.value_type],
            TypeBody::List(list) => vec![list.value_type],
            TypeBody::Struct(st) => st.fields.iter().map(|f| f.ty).collect(),
            TypeBody::Union(union) => union.members.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkType {
    /// `None` means any target type
    pub expected_type: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapType {
    pub key_type: TypeId,
    pub value_type: TypeId,
    pub value_nullable: bool,
    pub representation: MapRepr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapRepr {
    Map,
    ListPairs,
    StringPairs { inner_delim: String, entry_delim: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListType {
    pub value_type: TypeId,
    pub value_nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub fields: Vec<StructField>,
    pub representation: StructRepr,
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names as they appear on the wire, in declared order
    pub fn wire_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|f| match &self.representation {
                StructRepr::Map { fields } => fields
                    .get(&f.name)
                    .and_then(|d| d.rename.as_deref())
                    .unwrap_or(f.name.as_str()),
                _ => f.name.as_str(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: FieldName,
    pub ty: TypeId,
    pub optional: bool,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructRepr {
    /// Only fields with a rename or implicit value have an entry
    Map { fields: IndexMap<FieldName, MapFieldDetails> },
    Tuple { field_order: Vec<FieldName> },
    StringPairs { inner_delim: String, entry_delim: String },
    StringJoin { join: String, field_order: Vec<FieldName> },
    ListPairs,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapFieldDetails {
    pub rename: Option<String>,
    pub implicit: Option<ImplicitValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub members: Vec<TypeId>,
    pub representation: UnionRepr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnionRepr {
    Keyed(IndexMap<String, TypeId>),
    Kinded(IndexMap<Kind, TypeId>),
    Envelope {
        discriminant_key: String,
        content_key: String,
        discriminant_table: IndexMap<String, TypeId>,
    },
    Inline {
        discriminant_key: String,
        discriminant_table: IndexMap<String, TypeId>,
    },
    StringPrefix(IndexMap<String, TypeId>),
    BytePrefix(IndexMap<TypeId, u8>),
}

impl UnionRepr {
    pub fn name(&self) -> &'static str {
        match self {
            UnionRepr::Keyed(_) => "keyed",
            UnionRepr::Kinded(_) => "kinded",
            UnionRepr::Envelope { .. } => "envelope",
            UnionRepr::Inline { .. } => "inline",
            UnionRepr::StringPrefix(_) => "stringprefix",
            UnionRepr::BytePrefix(_) => "byteprefix",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub members: Vec<EnumValue>,
    pub representation: EnumRepr,
}

/// Wire value of every enum member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumRepr {
    String(IndexMap<EnumValue, String>),
    Int(IndexMap<EnumValue, i64>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn struct_with(representation: StructRepr) -> TypeBody {
        TypeBody::Struct(StructType {
            fields: vec![StructField {
                name: "a".to_string(),
                ty: TypeId(0),
                optional: false,
                nullable: false,
            }],
            representation,
        })
    }

    #[test]
    fn test_struct_representation_kinds() {
        let map = struct_with(StructRepr::Map { fields: IndexMap::new() });
        let tuple = struct_with(StructRepr::Tuple { field_order: vec!["a".to_string()] });
        let join = struct_with(StructRepr::StringJoin {
            join: ":".to_string(),
            field_order: vec!["a".to_string()],
        });
        assert_eq!(map.representation_kind(), Some(Kind::Map));
        assert_eq!(tuple.representation_kind(), Some(Kind::List));
        assert_eq!(join.representation_kind(), Some(Kind::String));
    }

    #[test]
    fn test_kinded_union_has_no_single_kind() {
        let union = TypeBody::Union(UnionType {
            members: vec![TypeId(1)],
            representation: UnionRepr::Kinded(IndexMap::from([(Kind::String, TypeId(1))])),
        });
        assert_eq!(union.representation_kind(), None);
        assert_eq!(union.references(), vec![TypeId(1)]);
    }

    #[test]
    fn test_wire_names_apply_renames() {
        let mut details = IndexMap::new();
        details.insert(
            "a".to_string(),
            MapFieldDetails {
                rename: Some("x".to_string()),
                implicit: None,
            },
        );
        let TypeBody::Struct(st) = struct_with(StructRepr::Map { fields: details }) else {
            unreachable!()
        };
        assert_eq!(st.wire_names(), vec!["x"]);
    }
}
