//! Golden Tests for Schema Compilation
//!
//! Compiles the schema documents under tests/fixtures and checks the
//! resulting type systems and error reports.

use std::path::{Path, PathBuf};

use schema_compiler::typesystem::{EnumRepr, StructRepr, UnionRepr};
use schema_compiler::{
    compile, CompileError, Compiler, CompilerSettings, Kind, Schema, SchemaError, TypeBody,
    TypeGraph, TypeKind,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load(name: &str) -> Schema {
    Schema::from_path(fixture(name)).unwrap()
}

// =============================================================================
// Well-Formed Schemas
// =============================================================================

#[test]
fn test_catalog_compiles() {
    let ts = compile(&load("catalog.json")).unwrap();

    assert_eq!(ts.named_types().count(), 18);
    let anonymous: Vec<_> = ts.anonymous_types().map(|t| t.name()).collect();
    assert_eq!(
        anonymous,
        vec!["List__String", "List__Link__Product", "Link__Product"]
    );
}

#[test]
fn test_round_trip_on_reference() {
    let schema = load("catalog.json");
    let ts = compile(&schema).unwrap();

    for (name, defn) in schema.types.iter() {
        let ty = ts.get(name).unwrap();
        assert_eq!(ty.name(), name);
        assert!(!ty.is_anonymous());
        assert_eq!(ty.type_kind().as_str(), defn.kind_name());
    }

    let product = ts.get("Product").unwrap();
    let product_fields = product.fields();
    let fields: Vec<_> = product_fields
        .iter()
        .map(|(f, ty)| (f.name.as_str(), ty.name(), f.optional))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("name", "String", false),
            ("price", "Float", false),
            ("aliases", "List__String", true),
            ("related", "List__Link__Product", false),
            ("color", "Color", false),
            ("inStock", "Bool", false),
        ]
    );

    let related = product.field_type("related").unwrap();
    let link = related.value_type().unwrap();
    assert_eq!(link.expected_type().unwrap(), product);
    assert!(!ts.get("AnyLink").unwrap().has_expected_type());

    let catalog = ts.get("Catalog").unwrap();
    let TypeBody::Map(map) = catalog.kind() else {
        panic!("expected map");
    };
    assert!(map.value_nullable);
    assert_eq!(catalog.key_type().unwrap().name(), "String");
}

#[test]
fn test_determinism() {
    let schema = load("catalog.json");
    let first = compile(&schema).unwrap();
    let second = compile(&schema).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    let names = |ts: &schema_compiler::TypeSystem| ts.iter().map(|t| t.name().to_string()).collect::<Vec<_>>();
    assert_eq!(names(&first), names(&second));
}

#[test]
fn test_inline_dedup() {
    let ts = compile(&load("catalog.json")).unwrap();

    let aliases = ts.get("Product").unwrap().field_type("aliases").unwrap();
    let keywords = ts.get("Review").unwrap().field_type("keywords").unwrap();
    assert_eq!(aliases, keywords);
    assert_eq!(aliases.id(), keywords.id());

    // Different structure, different type
    let related = ts.get("Product").unwrap().field_type("related").unwrap();
    assert_ne!(aliases, related);
}

#[test]
fn test_representations_compiled() {
    let ts = compile(&load("catalog.json")).unwrap();

    let product = ts.get("Product").unwrap();
    let TypeBody::Struct(st) = product.kind() else {
        panic!("expected struct");
    };
    assert_eq!(st.wire_names().last(), Some(&"stock"));
    assert_eq!(product.representation_kind(), Some(Kind::Map));

    let TypeBody::Struct(review) = ts.get("Review").unwrap().kind() else {
        panic!("expected struct");
    };
    assert!(matches!(
        &review.representation,
        StructRepr::Tuple { field_order } if field_order == &["score", "author", "keywords"]
    ));

    let entry = ts.get("Entry").unwrap();
    let TypeBody::Union(union) = entry.kind() else {
        panic!("expected union");
    };
    let UnionRepr::Keyed(table) = &union.representation else {
        panic!("expected keyed");
    };
    assert_eq!(table.keys().collect::<Vec<_>>(), vec!["product", "review", "item"]);
    assert_eq!(table["item"], product.id());

    assert_eq!(ts.get("Scalar").unwrap().representation_kind(), None);
    assert_eq!(ts.get("Blob").unwrap().representation_kind(), Some(Kind::Bytes));
    assert_eq!(ts.get("Labels").unwrap().representation_kind(), Some(Kind::String));
    assert_eq!(ts.get("Version").unwrap().representation_kind(), Some(Kind::String));

    let TypeBody::Enum(color) = ts.get("Color").unwrap().kind() else {
        panic!("expected enum");
    };
    let EnumRepr::String(wire) = &color.representation else {
        panic!("expected string enum");
    };
    assert_eq!(
        wire.values().map(String::as_str).collect::<Vec<_>>(),
        vec!["r", "Green", "Blue"]
    );
}

#[test]
fn test_dsl_rendering() {
    let ts = compile(&load("catalog.json")).unwrap();
    assert_eq!(
        ts.get("Version").unwrap().to_string(),
        "type Version struct {\n\tmajor Int\n\tminor Int\n} representation stringjoin {\n\tjoin \".\"\n}"
    );
    assert_eq!(
        ts.get("Catalog").unwrap().to_string(),
        "type Catalog {String:nullable Product}"
    );
    assert_eq!(ts.get("AnyLink").unwrap().to_string(), "type AnyLink &Any");
}

// =============================================================================
// Faulty Schemas
// =============================================================================

#[test]
fn test_duplicate_type_names() {
    let errors = compile(&load("duplicate_names.json")).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.first(),
        &CompileError::DuplicateName {
            name: "Name".to_string()
        }
    );
}

#[test]
fn test_unresolved_reference() {
    let errors = compile(&load("unresolved.json")).unwrap_err();
    assert_eq!(
        errors.into_vec(),
        vec![CompileError::UnresolvedReference {
            name: "Strng".to_string(),
            referenced_by: "Person".to_string(),
            suggestion: Some("String".to_string()),
        }]
    );
}

#[test]
fn test_unsupported_kind_does_not_stop_compile() {
    let errors = compile(&load("accumulate.json")).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(matches!(
        errors.first(),
        CompileError::UnsupportedKind { type_name, kind } if type_name == "Copied" && kind == "copy"
    ));
    assert!(errors
        .iter()
        .any(|e| matches!(e, CompileError::UnresolvedReference { name, .. } if name == "Missing")));
    assert_eq!(errors.for_type("Fine").count(), 0);
}

#[test]
fn test_stringjoin_absent_versus_empty_field_order() {
    let errors = compile(&load("stringjoin.json")).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.first(),
        &CompileError::InvalidConfig {
            type_name: "EmptyOrder".to_string(),
            reason: "fieldOrder is present but empty".to_string(),
        }
    );
}

#[test]
fn test_stringjoin_explicit_field_order_is_kept() {
    let ts = compile(&load("stringjoin_orders.json")).unwrap();
    let order = |name: &str| {
        let TypeBody::Struct(st) = ts.get(name).unwrap().kind() else {
            panic!("expected struct");
        };
        let StructRepr::StringJoin { join, field_order } = &st.representation else {
            panic!("expected stringjoin");
        };
        assert_eq!(join, ":");
        field_order.clone()
    };

    assert_eq!(order("DeclaredOrder"), vec!["a", "b"]);
    assert_eq!(order("ForwardOrder"), vec!["a", "b"]);
    assert_eq!(order("ReverseOrder"), vec!["b", "a"]);
    assert!(ts
        .get("ReverseOrder")
        .unwrap()
        .to_string()
        .contains("fieldOrder [\"b\", \"a\"]"));
}

#[test]
fn test_keyed_union_duplicate_wire_key() {
    let errors = compile(&load("keyed_duplicate_key.json")).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors.first(),
        CompileError::InvalidConfig { type_name, reason }
            if type_name == "Either" && reason.contains("'v'")
    ));
}

#[test]
fn test_inline_union_member_rejected() {
    let errors = compile(&load("inline_union_member.json")).unwrap_err();
    assert!(matches!(
        errors.first(),
        CompileError::UnsupportedForm { type_name, .. } if type_name == "Either"
    ));
}

#[test]
fn test_kinded_union_member_kind_mismatch() {
    let errors = compile(&load("kinded_wrong_kind.json")).unwrap_err();
    assert_eq!(errors.len(), 1);
    let CompileError::InvalidConfig { type_name, reason } = errors.first() else {
        panic!("expected invalid config, got {:?}", errors.first());
    };
    assert_eq!(type_name, "Mixed");
    assert!(reason.contains("maps kind map to Int"));
}

#[test]
fn test_map_keys_need_string_representation() {
    let schema = load("map_int_keys.json");
    let errors = compile(&schema).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors.for_type("Histogram").count(), 1);
    assert_eq!(errors.for_type("Index").count(), 1);

    let lenient = Compiler::with_settings(CompilerSettings {
        strict_map_keys: false,
        ..CompilerSettings::default()
    });
    let ts = lenient.compile(&schema).unwrap();
    assert_eq!(
        ts.get("Index").unwrap().value_type().unwrap().name(),
        "Map__Int__String"
    );
}

#[test]
fn test_malformed_json_reports_path() {
    let err = Schema::from_json_str(r#"{"types": {"Bad": {"list": {"valueNullable": true}}}}"#)
        .unwrap_err();
    assert!(matches!(err, SchemaError::Json { .. }));
    assert!(err.to_string().contains("types.Bad"));
}

// =============================================================================
// Graph Analysis
// =============================================================================

#[test]
fn test_recursive_group() {
    let ts = compile(&load("recursive.json")).unwrap();
    let graph = TypeGraph::build(&ts);

    let groups = graph.recursive_groups();
    assert_eq!(groups.len(), 1);
    let names: Vec<_> = groups[0].iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["Expr", "Call", "List__Expr"]);

    assert!(graph.is_recursive("Expr"));
    assert!(!graph.is_recursive("Literal"));
    assert!(!graph.is_recursive("Cached"));

    let dependents: Vec<_> = graph.dependents_of("Expr").iter().map(|t| t.name()).collect();
    assert_eq!(dependents, vec!["Cached", "List__Expr"]);
    assert_eq!(ts.get("Cached").unwrap().type_kind(), TypeKind::Link);
}
