//! Integration tests for loading parser dumps.

use apix_codemodel::{AccessPolicy, FileModel, ItemRef, ScopeRef, TypeInfo};
use pretty_assertions::assert_eq;

fn fixture() -> FileModel {
    let json = include_str!("fixtures/shapes.json");
    FileModel::from_json(json).expect("fixture should load")
}

#[test]
fn loads_nested_classes_with_scopes() {
    let model = fixture();
    let circle = model.find_class("Geo::Circle").expect("Circle");
    assert_eq!(circle.scope.scope, vec!["Geo".to_string()]);
    assert_eq!(circle.base_class_names(), vec!["Shape".to_string()]);
    assert_eq!(circle.scope.variables[0].access, AccessPolicy::Public);
}

#[test]
fn functions_default_to_void_return() {
    let model = fixture();
    let shape = model.find_class("Geo::Shape").unwrap();
    let ctor = &shape.scope.functions[0];
    assert!(ctor.return_type.is_void());
    assert_eq!(ctor.scope, vec!["Geo".to_string(), "Shape".to_string()]);
    assert_eq!(shape.scope.functions[1].raw_signature(), "area()");
}

#[test]
fn enum_initializers_are_kept_verbatim() {
    let model = fixture();
    let shape = model.find_class("Geo::Shape").unwrap();
    let kind = &shape.scope.enums[0];
    assert_eq!(kind.qualified_name().join("::"), "Geo::Shape::Kind");
    assert_eq!(kind.enumerators[1].value, "Round << 1");
}

#[test]
fn namespace_typedef_unwraps_to_class_pointer() {
    let model = fixture();
    let geo = model.global.find_namespace("Geo").unwrap();
    let resolved = TypeInfo::named("ShapePtr").resolve_typedefs(ScopeRef::Namespace(geo));
    assert_eq!(resolved.to_string(), "Geo::Shape*");
    assert!(matches!(
        model.global_scope().find_item(&resolved.qualified_name),
        Some(ItemRef::Class(_))
    ));
}

#[test]
fn named_global_namespace_is_rejected() {
    let err = FileModel::from_json(r#"{ "name": "oops" }"#).unwrap_err();
    assert!(err.to_string().contains("unnamed"));
}
