use std::path::Path;

use anyhow::Context;
use apix_codemodel::FileModel;
use apix_config::BuilderConfig;
use apix_meta::MetaModel;
use apix_typesystem::{TypeDatabase, TypeSystemDocument};

/// Loads the registry and the code model, then runs the metamodel build.
///
/// Registry settings that come from the builder config are set before the
/// type-system document is applied, so flags entries are created with the
/// configured template.
pub fn build(
    code_model: &Path,
    typesystem: &Path,
    config: BuilderConfig,
) -> anyhow::Result<MetaModel> {
    let mut db = TypeDatabase::new();
    db.set_flags_template(&config.flags_template);
    db.set_interface_suffix(&config.interface_suffix);

    TypeSystemDocument::load(typesystem)
        .and_then(|document| document.apply(&mut db))
        .with_context(|| format!("failed to load type system {}", typesystem.display()))?;
    tracing::debug!(entries = db.iter().count(), "type system loaded");

    let json = std::fs::read_to_string(code_model)
        .with_context(|| format!("failed to read code model {}", code_model.display()))?;
    let file = FileModel::from_json(&json)
        .with_context(|| format!("failed to parse code model {}", code_model.display()))?;

    let model = apix_meta::build_model(&file, &mut db, config)
        .context("metamodel build failed")?;
    tracing::info!(
        classes = model.class_ids().len(),
        rejected = model.rejects().len(),
        diagnostics = model.diagnostics().len(),
        "metamodel built"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    const CODE_MODEL: &str = r#"{
        "classes": [
            {
                "name": "Point",
                "file_name": "/src/include/point.h",
                "functions": [
                    {"name": "x", "return_type": {"qualified_name": ["int"]}, "is_constant": true}
                ]
            }
        ]
    }"#;

    const TYPESYSTEM: &str = r#"
[[type]]
name = "int"
kind = "primitive"

[[type]]
name = "Point"
kind = "value"

[[type]]
name = "Missing"
kind = "object"
"#;

    fn write_inputs(dir: &TempDir, code_model: &str, typesystem: &str) -> (PathBuf, PathBuf) {
        let model_path = dir.path().join("model.json");
        let types_path = dir.path().join("types.toml");
        fs::write(&model_path, code_model).unwrap();
        fs::write(&types_path, typesystem).unwrap();
        (model_path, types_path)
    }

    #[test]
    fn builds_from_files_on_disk() {
        let dir = TempDir::new().unwrap();
        let (model_path, types_path) = write_inputs(&dir, CODE_MODEL, TYPESYSTEM);

        let model = build(&model_path, &types_path, BuilderConfig::default()).unwrap();

        let names: Vec<&str> = model.sorted_classes().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Point"]);
        assert!(
            model
                .diagnostics()
                .iter()
                .any(|d| d.subject == "Missing"),
            "unmatched registry entry should be reported"
        );
    }

    #[test]
    fn malformed_code_model_names_the_file() {
        let dir = TempDir::new().unwrap();
        let (model_path, types_path) = write_inputs(&dir, "{ not json", TYPESYSTEM);

        let error = build(&model_path, &types_path, BuilderConfig::default()).unwrap_err();
        assert!(format!("{error:#}").contains("failed to parse code model"));
    }

    #[test]
    fn missing_type_system_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (model_path, _) = write_inputs(&dir, CODE_MODEL, TYPESYSTEM);

        let error = build(&model_path, &dir.path().join("absent.toml"), BuilderConfig::default())
            .unwrap_err();
        assert!(format!("{error:#}").contains("failed to load type system"));
    }
}
