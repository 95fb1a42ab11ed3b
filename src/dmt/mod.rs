//! Schema Declarations
//!
//! The input side of the compiler: a tree of named type declarations as it
//! appears in a schema document, before any reference is resolved.
//!
//! ## JSON form
//!
//! ```json
//! {
//!   "types": {
//!     "Name": { "string": {} },
//!     "Names": { "list": { "valueType": "Name" } },
//!     "Person": {
//!       "struct": {
//!         "fields": {
//!           "name": { "type": "Name" },
//!           "tags": { "type": { "list": { "valueType": "String" } }, "optional": true }
//!         },
//!         "representation": { "map": {} }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! A type reference is either a type name (a JSON string) or an inline
//! anonymous declaration (a JSON object). Every JSON object that maps names
//! to things is read as [`Entries`] so repeated keys stay visible.

mod entries;

pub use entries::Entries;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::checksum::Checksum;
use crate::error::{Result, SchemaError};
use crate::kind::Kind;

pub type TypeName = String;
pub type FieldName = String;
pub type EnumValue = String;

/// A complete schema declaration: named types in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub types: Entries<TypeName, TypeDefn>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a declaration
    pub fn with_type(mut self, name: impl Into<TypeName>, defn: impl Into<TypeDefn>) -> Self {
        self.types.push(name.into(), defn.into());
        self
    }

    /// Parse a schema document, reporting the JSON path of malformed nodes
    pub fn from_json_str(src: &str) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_str(src);
        let schema = serde_path_to_error::deserialize(&mut de)?;
        de.end().map_err(|e| SchemaError::Json {
            path: ".".to_string(),
            message: e.to_string(),
        })?;
        Ok(schema)
    }

    /// Read and parse a schema document from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Canonical JSON form
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Fingerprint of the canonical JSON form
    pub fn fingerprint(&self) -> Checksum {
        Checksum::of(self)
    }
}

// =============================================================================
// Type References
// =============================================================================

/// A reference to a type: by name, or an anonymous definition in place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeReference {
    Name(TypeName),
    Inline(Box<TypeDefn>),
}

impl TypeReference {
    pub fn inline(defn: impl Into<TypeDefn>) -> Self {
        TypeReference::Inline(Box::new(defn.into()))
    }

    fn canonical(&self) -> Self {
        match self {
            TypeReference::Name(name) => TypeReference::Name(name.clone()),
            TypeReference::Inline(defn) => TypeReference::Inline(Box::new(defn.canonical())),
        }
    }
}

impl From<&str> for TypeReference {
    fn from(name: &str) -> Self {
        TypeReference::Name(name.to_string())
    }
}

impl From<String> for TypeReference {
    fn from(name: String) -> Self {
        TypeReference::Name(name)
    }
}

impl From<TypeDefn> for TypeReference {
    fn from(defn: TypeDefn) -> Self {
        TypeReference::Inline(Box::new(defn))
    }
}

// =============================================================================
// Type Declarations
// =============================================================================

/// One type declaration, keyed by its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDefn {
    Bool {},
    String {},
    Bytes {},
    Int {},
    Float {},
    Link(LinkDefn),
    Map(MapDefn),
    List(ListDefn),
    Struct(StructDefn),
    Union(UnionDefn),
    Enum(EnumDefn),
    Copy(CopyDefn),
}

impl TypeDefn {
    pub fn bool() -> Self {
        TypeDefn::Bool {}
    }

    pub fn string() -> Self {
        TypeDefn::String {}
    }

    pub fn bytes() -> Self {
        TypeDefn::Bytes {}
    }

    pub fn int() -> Self {
        TypeDefn::Int {}
    }

    pub fn float() -> Self {
        TypeDefn::Float {}
    }

    /// Link with no expected type ("any")
    pub fn link() -> Self {
        TypeDefn::Link(LinkDefn { expected_type: None })
    }

    pub fn link_to(expected: impl Into<TypeReference>) -> Self {
        TypeDefn::Link(LinkDefn {
            expected_type: Some(expected.into()),
        })
    }

    pub fn list_of(value: impl Into<TypeReference>) -> Self {
        TypeDefn::List(ListDefn::new(value))
    }

    pub fn map_of(key: impl Into<TypeReference>, value: impl Into<TypeReference>) -> Self {
        TypeDefn::Map(MapDefn::new(key, value))
    }

    /// The declaration's kind keyword as written in schema documents
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDefn::Bool {} => "bool",
            TypeDefn::String {} => "string",
            TypeDefn::Bytes {} => "bytes",
            TypeDefn::Int {} => "int",
            TypeDefn::Float {} => "float",
            TypeDefn::Link(_) => "link",
            TypeDefn::Map(_) => "map",
            TypeDefn::List(_) => "list",
            TypeDefn::Struct(_) => "struct",
            TypeDefn::Union(_) => "union",
            TypeDefn::Enum(_) => "enum",
            TypeDefn::Copy(_) => "copy",
        }
    }

    /// Equivalent declaration with redundant spellings removed.
    ///
    /// Only spellings that cannot change the outcome of a compile are
    /// dropped: empty struct field details, enum wire strings equal to the
    /// member name, and a field order equal to the declared order. Inline
    /// definitions with equal canonical forms compile to the same type.
    pub fn canonical(&self) -> TypeDefn {
        match self {
            TypeDefn::Link(link) => TypeDefn::Link(LinkDefn {
                expected_type: link.expected_type.as_ref().map(TypeReference::canonical),
            }),
            TypeDefn::Map(map) => TypeDefn::Map(MapDefn {
                key_type: map.key_type.canonical(),
                value_type: map.value_type.canonical(),
                value_nullable: map.value_nullable,
                representation: map.representation.clone(),
            }),
            TypeDefn::List(list) => TypeDefn::List(ListDefn {
                value_type: list.value_type.canonical(),
                value_nullable: list.value_nullable,
            }),
            TypeDefn::Struct(st) => TypeDefn::Struct(st.canonical()),
            TypeDefn::Enum(en) => TypeDefn::Enum(en.canonical()),
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDefn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<TypeReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDefn {
    /// Must name a type; inline key types are rejected by the compiler
    pub key_type: TypeReference,
    pub value_type: TypeReference,
    #[serde(default)]
    pub value_nullable: bool,
    #[serde(default)]
    pub representation: MapRepresentation,
}

impl MapDefn {
    pub fn new(key: impl Into<TypeReference>, value: impl Into<TypeReference>) -> Self {
        Self {
            key_type: key.into(),
            value_type: value.into(),
            value_nullable: false,
            representation: MapRepresentation::default(),
        }
    }

    pub fn value_nullable(mut self) -> Self {
        self.value_nullable = true;
        self
    }

    pub fn representation(mut self, representation: MapRepresentation) -> Self {
        self.representation = representation;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDefn {
    pub value_type: TypeReference,
    #[serde(default)]
    pub value_nullable: bool,
}

impl ListDefn {
    pub fn new(value: impl Into<TypeReference>) -> Self {
        Self {
            value_type: value.into(),
            value_nullable: false,
        }
    }

    pub fn value_nullable(mut self) -> Self {
        self.value_nullable = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructDefn {
    pub fields: Entries<FieldName, FieldDefn>,
    #[serde(default)]
    pub representation: StructRepresentation,
}

impl StructDefn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<FieldName>, field: impl Into<FieldDefn>) -> Self {
        self.fields.push(name.into(), field.into());
        self
    }

    pub fn representation(mut self, representation: StructRepresentation) -> Self {
        self.representation = representation;
        self
    }

    fn canonical(&self) -> Self {
        let fields = self
            .fields
            .iter()
            .map(|(name, field)| {
                let field = FieldDefn {
                    ty: field.ty.canonical(),
                    optional: field.optional,
                    nullable: field.nullable,
                };
                (name.clone(), field)
            })
            .collect();

        let representation = match &self.representation {
            StructRepresentation::Map(map) => {
                let details = map.fields.as_ref().map(|details| {
                    details
                        .iter()
                        .filter(|(name, detail)| {
                            detail.rename.is_some()
                                || detail.implicit.is_some()
                                || details.occurrences(*name) > 1
                                || !self.fields.contains_key(*name)
                        })
                        .map(|(name, detail)| (name.clone(), detail.clone()))
                        .collect::<Entries<_, _>>()
                });
                StructRepresentation::Map(StructMapRepr {
                    fields: details.filter(|d| !d.is_empty()),
                })
            }
            StructRepresentation::Tuple(tuple) => StructRepresentation::Tuple(TupleRepr {
                field_order: self.explicit_order(tuple.field_order.as_deref()),
            }),
            StructRepresentation::StringJoin(join) => StructRepresentation::StringJoin(StringJoinRepr {
                join: join.join.clone(),
                field_order: self.explicit_order(join.field_order.as_deref()),
            }),
            other => other.clone(),
        };

        Self {
            fields,
            representation,
        }
    }

    /// `None` when `order` says no more than the declared order does
    fn explicit_order(&self, order: Option<&[FieldName]>) -> Option<Vec<FieldName>> {
        let order = order?;
        let declared_once = self.fields.keys().all(|name| self.fields.occurrences(name) == 1);
        if declared_once && order.iter().eq(self.fields.keys()) {
            None
        } else {
            Some(order.to_vec())
        }
    }
}

/// A struct member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefn {
    #[serde(rename = "type")]
    pub ty: TypeReference,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDefn {
    pub fn new(ty: impl Into<TypeReference>) -> Self {
        Self {
            ty: ty.into(),
            optional: false,
            nullable: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

impl From<&str> for FieldDefn {
    fn from(name: &str) -> Self {
        FieldDefn::new(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionDefn {
    pub members: Vec<TypeReference>,
    pub representation: UnionRepresentation,
}

impl UnionDefn {
    pub fn new<I, T>(members: I, representation: UnionRepresentation) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeReference>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            representation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDefn {
    pub members: Vec<EnumValue>,
    #[serde(default)]
    pub representation: EnumRepresentation,
}

impl EnumDefn {
    pub fn new<I, T>(members: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EnumValue>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            representation: EnumRepresentation::default(),
        }
    }

    pub fn representation(mut self, representation: EnumRepresentation) -> Self {
        self.representation = representation;
        self
    }

    fn canonical(&self) -> Self {
        let representation = match &self.representation {
            EnumRepresentation::String(table) => EnumRepresentation::String(
                table
                    .iter()
                    .filter(|(member, value)| {
                        member != value
                            || table.occurrences(*member) > 1
                            || !self.members.contains(*member)
                    })
                    .map(|(member, value)| (member.clone(), value.clone()))
                    .collect(),
            ),
            other => other.clone(),
        };
        Self {
            members: self.members.clone(),
            representation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyDefn {
    pub from_type: TypeName,
}

macro_rules! impl_into_defn {
    ($($payload:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for TypeDefn {
                fn from(defn: $payload) -> Self {
                    TypeDefn::$variant(defn)
                }
            }
        )*
    };
}

impl_into_defn! {
    LinkDefn => Link,
    MapDefn => Map,
    ListDefn => List,
    StructDefn => Struct,
    UnionDefn => Union,
    EnumDefn => Enum,
    CopyDefn => Copy,
}

// =============================================================================
// Representations
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapRepresentation {
    Map {},
    #[serde(rename = "listpairs")]
    ListPairs {},
    #[serde(rename = "stringpairs")]
    StringPairs(StringPairsRepr),
}

impl Default for MapRepresentation {
    fn default() -> Self {
        MapRepresentation::Map {}
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringPairsRepr {
    pub inner_delim: String,
    pub entry_delim: String,
}

impl StringPairsRepr {
    pub fn new(inner_delim: impl Into<String>, entry_delim: impl Into<String>) -> Self {
        Self {
            inner_delim: inner_delim.into(),
            entry_delim: entry_delim.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructRepresentation {
    Map(StructMapRepr),
    Tuple(TupleRepr),
    #[serde(rename = "stringpairs")]
    StringPairs(StringPairsRepr),
    #[serde(rename = "stringjoin")]
    StringJoin(StringJoinRepr),
    #[serde(rename = "listpairs")]
    ListPairs {},
}

impl Default for StructRepresentation {
    fn default() -> Self {
        StructRepresentation::Map(StructMapRepr::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructMapRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Entries<FieldName, FieldDetails>>,
}

/// Per-field wire details of a map-represented struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit: Option<ImplicitValue>,
}

/// A scalar value assumed for a field absent from the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImplicitValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ImplicitValue {
    pub fn kind(&self) -> Kind {
        match self {
            ImplicitValue::Bool(_) => Kind::Bool,
            ImplicitValue::Int(_) => Kind::Int,
            ImplicitValue::Float(_) => Kind::Float,
            ImplicitValue::String(_) => Kind::String,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TupleRepr {
    /// `None` means declared field order; `Some(vec![])` is a distinct, invalid value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_order: Option<Vec<FieldName>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringJoinRepr {
    pub join: String,
    /// `None` means declared field order; `Some(vec![])` is a distinct, invalid value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_order: Option<Vec<FieldName>>,
}

impl StringJoinRepr {
    pub fn new(join: impl Into<String>) -> Self {
        Self {
            join: join.into(),
            field_order: None,
        }
    }

    pub fn field_order<I, T>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FieldName>,
    {
        self.field_order = Some(order.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnionRepresentation {
    Keyed(Entries<String, TypeName>),
    Kinded(Entries<Kind, TypeName>),
    Envelope(EnvelopeRepr),
    Inline(InlineRepr),
    #[serde(rename = "stringprefix")]
    StringPrefix(StringPrefixRepr),
    #[serde(rename = "byteprefix")]
    BytePrefix(BytePrefixRepr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeRepr {
    pub discriminant_key: String,
    pub content_key: String,
    pub discriminant_table: Entries<String, TypeName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineRepr {
    pub discriminant_key: String,
    pub discriminant_table: Entries<String, TypeName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringPrefixRepr {
    pub discriminant_table: Entries<String, TypeName>,
}

/// Byte discriminants, keyed by member name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BytePrefixRepr {
    pub discriminant_table: Entries<TypeName, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumRepresentation {
    String(Entries<EnumValue, String>),
    Int(Entries<EnumValue, i64>),
}

impl Default for EnumRepresentation {
    fn default() -> Self {
        EnumRepresentation::String(Entries::new())
    }
}
