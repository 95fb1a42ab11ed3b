//! Schema Compiler
//!
//! Compiles IPLD-style schema declarations into an immutable, fully linked
//! type system for codecs and traversal engines to work from.
//!
//! ## Features
//!
//! - **Reference Resolution**: Forward and mutual references between named types
//! - **Anonymous Types**: Inline definitions deduplicated by structural fingerprint
//! - **Representation Strategies**: Every map, struct, union and enum representation
//!   checked and translated into compiled form
//! - **Error Accumulation**: One compile reports every fault in the schema
//! - **Graph Analysis**: Dependency queries, recursion groups and DOT export
//!
//! ## Example
//!
//! ```
//! use schema_compiler::{compile, Schema};
//!
//! let schema = Schema::from_json_str(r#"{
//!     "types": {
//!         "String": {"string": {}},
//!         "Names": {"list": {"valueType": "String"}}
//!     }
//! }"#).unwrap();
//!
//! let ts = compile(&schema).unwrap();
//! let names = ts.get("Names").unwrap();
//! assert_eq!(names.value_type().unwrap().name(), "String");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Schema (dmt) ──► Compiler ──► TypeSystem ──► TypeGraph
//!                    ├── resolve   (names, inline definitions)
//!                    ├── repr      (representation strategies)
//!                    └── validate  (cross-type checks)
//! ```

pub mod checksum;
pub mod compiler;
pub mod config;
pub mod dmt;
pub mod error;
pub mod graph;
pub mod kind;
pub mod typesystem;

pub use checksum::Checksum;
pub use compiler::{compile, Compiler, CompilerSettings};
pub use dmt::{Schema, TypeDefn, TypeReference};
pub use error::{CompileError, CompileErrors, Result, SchemaError};
pub use graph::TypeGraph;
pub use kind::Kind;
pub use typesystem::{TypeBody, TypeId, TypeKind, TypeRef, TypeSystem};
