use std::path::PathBuf;

use apix_typesystem::{
    CodeGeneration, EntryKind, Include, TypeDatabase, TypeSystemDocument,
};
use pretty_assertions::assert_eq;

fn fixture() -> TypeDatabase {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/geometry.toml");
    TypeSystemDocument::load(&path)
        .expect("fixture should parse")
        .into_database()
        .expect("fixture should register")
}

#[test]
fn fixture_entries_are_registered() {
    let db = fixture();
    let shape = db.find_complex_type("Geo::Shape").expect("Shape entry");
    assert_eq!(db.entry(shape).kind, EntryKind::Object);
    assert_eq!(db.entry(shape).include, Some(Include::local("shape.h")));
    assert_eq!(db.entry(shape).code_generation, CodeGeneration::GenerateAll);
    assert!(db.find_namespace_type("Geo").is_some());
    assert!(db.find_primitive_type("QString").is_some());
    assert!(db.find_container_type("QList<Geo::Shape*>").is_some());
}

#[test]
fn function_modifications_are_normalized() {
    let db = fixture();
    let shape = db.find_complex_type("Geo::Shape").unwrap();
    let mods = db.function_modifications(shape, "area()const");
    assert_eq!(mods.len(), 1);
    assert_eq!(mods[0].renamed_to.as_deref(), Some("surface"));
}

#[test]
fn api_version_filters_newer_entries() {
    let db = fixture();
    let circle = db.find_complex_type("Geo::Circle").unwrap();
    let polygon = db.find_complex_type("Geo::Polygon").unwrap();
    assert!(db.is_api_compatible(circle));
    assert!(!db.is_api_compatible(polygon));
}

#[test]
fn enum_flags_and_interfaces() {
    let db = fixture();
    let kind = db.find_enum_type("Geo::Shape::Kind").unwrap();
    let flags = db.find_flags_type("QFlags<Geo::Shape::Kind>").unwrap();
    assert_eq!(db.entry(kind).flags, Some(flags));
    assert_eq!(db.entry(kind).rejected_enum_values, vec!["Legacy".to_string()]);

    let drawable = db.find_complex_type("Geo::Drawable").unwrap();
    let iface = db.entry(drawable).designated_interface.unwrap();
    assert_eq!(db.entry(iface).name, "Geo::DrawableInterface");
}

#[test]
fn global_rules() {
    let db = fixture();
    assert!(db.is_class_rejected("Geo::Internal"));
    assert!(db.is_function_rejected("Geo::Shape", "metaObject"));
    assert_eq!(db.global_added_functions().len(), 1);
    assert_eq!(db.global_added_functions()[0].return_type, "Geo::Circle");
    let distance = db.find_function_type("Geo::distance").unwrap();
    assert_eq!(db.entry(distance).signatures.len(), 1);
}
