use std::collections::BTreeMap;
use std::fmt::Write as _;

use apix_meta::{ClassKind, Diagnostic, MetaClass, MetaModel, RejectMaps, RejectReason};
use serde::Serialize;

use crate::cli::OutputFormat;

/// Plain-text rendering of a report.
pub trait TextReport {
    fn to_text(&self) -> String;
}

/// Render a report to a string in the requested format.
pub fn render<T: Serialize + TextReport>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Text => Ok(value.to_text()),
    }
}

/// Print a report in the requested format.
pub fn output<T: Serialize + TextReport>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub kind: ClassKind,
    pub base: Option<String>,
    pub interfaces: Vec<String>,
    pub functions: usize,
    pub enums: usize,
    pub is_abstract: bool,
}

impl ClassSummary {
    fn new(model: &MetaModel, class: &MetaClass) -> Self {
        Self {
            name: class.name.clone(),
            kind: class.kind,
            base: class.base_class.map(|id| model.class(id).name.clone()),
            interfaces: class
                .interfaces
                .iter()
                .map(|&id| model.class(id).name.clone())
                .collect(),
            functions: class.functions.len(),
            enums: class.enums.len(),
            is_abstract: class.is_abstract(),
        }
    }
}

/// What the build bound, in dependency order.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub classes: Vec<ClassSummary>,
    pub templates: Vec<String>,
    pub global_functions: Vec<String>,
    pub global_enums: Vec<String>,
    pub used_types: Vec<String>,
    pub rejected: usize,
    pub diagnostics: usize,
}

impl Summary {
    #[must_use]
    pub fn new(model: &MetaModel) -> Self {
        Self {
            classes: model
                .sorted_classes()
                .map(|class| ClassSummary::new(model, class))
                .collect(),
            templates: model.templates().map(|c| c.name.clone()).collect(),
            global_functions: model
                .global_functions()
                .iter()
                .map(apix_meta::MetaFunction::signature)
                .collect(),
            global_enums: model.global_enums().iter().map(|e| e.name.clone()).collect(),
            used_types: model.used_types().iter().cloned().collect(),
            rejected: model.rejects().len(),
            diagnostics: model.diagnostics().len(),
        }
    }
}

impl TextReport for Summary {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "classes ({}):", self.classes.len());
        for class in &self.classes {
            let _ = write!(out, "  {} [{}]", class.name, class.kind);
            if let Some(base) = &class.base {
                let _ = write!(out, " : {base}");
            }
            if !class.interfaces.is_empty() {
                let _ = write!(out, " implements {}", class.interfaces.join(", "));
            }
            if class.is_abstract {
                out.push_str(" abstract");
            }
            let _ = writeln!(out, " ({} functions, {} enums)", class.functions, class.enums);
        }
        write_list(&mut out, "templates", &self.templates);
        write_list(&mut out, "global functions", &self.global_functions);
        write_list(&mut out, "global enums", &self.global_enums);
        let _ = write!(
            out,
            "{} used types, {} rejected, {} diagnostics",
            self.used_types.len(),
            self.rejected,
            self.diagnostics
        );
        out
    }
}

fn write_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title} ({}):", items.len());
    for item in items {
        let _ = writeln!(out, "  {item}");
    }
}

// ---------------------------------------------------------------------------
// Rejects
// ---------------------------------------------------------------------------

/// Rejected names per entity kind, grouped by reason.
#[derive(Debug, Default, Serialize)]
pub struct RejectReport {
    pub classes: BTreeMap<String, Vec<String>>,
    pub enums: BTreeMap<String, Vec<String>>,
    pub functions: BTreeMap<String, Vec<String>>,
    pub fields: BTreeMap<String, Vec<String>>,
}

fn group(map: &BTreeMap<String, RejectReason>) -> BTreeMap<String, Vec<String>> {
    RejectMaps::by_reason(map)
        .into_iter()
        .map(|(reason, names)| {
            (
                reason.as_str().to_string(),
                names.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

impl RejectReport {
    #[must_use]
    pub fn new(rejects: &RejectMaps) -> Self {
        Self {
            classes: group(&rejects.classes),
            enums: group(&rejects.enums),
            functions: group(&rejects.functions),
            fields: group(&rejects.fields),
        }
    }

    fn sections(&self) -> [(&'static str, &BTreeMap<String, Vec<String>>); 4] {
        [
            ("classes", &self.classes),
            ("enums", &self.enums),
            ("functions", &self.functions),
            ("fields", &self.fields),
        ]
    }
}

impl TextReport for RejectReport {
    fn to_text(&self) -> String {
        let mut out = String::new();
        for (title, groups) in self.sections() {
            if groups.is_empty() {
                continue;
            }
            let _ = writeln!(out, "rejected {title}:");
            for (reason, names) in groups {
                let _ = writeln!(out, "  {reason}:");
                for name in names {
                    let _ = writeln!(out, "    {name}");
                }
            }
        }
        if out.is_empty() {
            out.push_str("nothing rejected");
        }
        out.trim_end().to_string()
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct DiagnosticsReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticsReport {
    #[must_use]
    pub fn new(model: &MetaModel) -> Self {
        Self {
            diagnostics: model.diagnostics().to_vec(),
        }
    }
}

impl TextReport for DiagnosticsReport {
    fn to_text(&self) -> String {
        if self.diagnostics.is_empty() {
            return "no diagnostics".to_string();
        }
        self.diagnostics
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use apix_meta::DiagnosticKind;
    use pretty_assertions::assert_eq;

    use super::*;

    fn rejects() -> RejectMaps {
        let mut rejects = RejectMaps::default();
        rejects
            .classes
            .insert("Hidden".to_string(), RejectReason::GenerationDisabled);
        rejects
            .functions
            .insert("Widget::paint(Brush)".to_string(), RejectReason::UnmatchedArgumentType);
        rejects
            .functions
            .insert("Widget::brush()".to_string(), RejectReason::UnmatchedReturnType);
        rejects
            .functions
            .insert("Widget::fill(Brush)".to_string(), RejectReason::UnmatchedArgumentType);
        rejects
    }

    #[test]
    fn rejects_are_grouped_by_reason() {
        let report = RejectReport::new(&rejects());
        assert_eq!(
            report.functions.get("unmatched_argument_type"),
            Some(&vec![
                "Widget::fill(Brush)".to_string(),
                "Widget::paint(Brush)".to_string()
            ])
        );
        assert_eq!(report.classes.len(), 1);
        assert!(report.enums.is_empty());
    }

    #[test]
    fn reject_text_lists_each_section() {
        let text = RejectReport::new(&rejects()).to_text();
        assert_eq!(
            text,
            "rejected classes:\n  generation_disabled:\n    Hidden\n\
             rejected functions:\n  unmatched_argument_type:\n    Widget::fill(Brush)\n    \
             Widget::paint(Brush)\n  unmatched_return_type:\n    Widget::brush()"
        );
    }

    #[test]
    fn empty_reports_say_so() {
        assert_eq!(RejectReport::default().to_text(), "nothing rejected");
        let report = DiagnosticsReport {
            diagnostics: Vec::new(),
        };
        assert_eq!(report.to_text(), "no diagnostics");
    }

    #[test]
    fn diagnostics_render_as_json() {
        let report = DiagnosticsReport {
            diagnostics: vec![Diagnostic {
                kind: DiagnosticKind::EnumNotDeclared,
                subject: "Gfx::Mode".to_string(),
                message: "missing".to_string(),
            }],
        };
        let json = render(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["diagnostics"][0]["kind"], "enum_not_declared");
        assert_eq!(
            render(&report, OutputFormat::Text).unwrap(),
            "[enum_not_declared] Gfx::Mode: missing"
        );
    }

    #[test]
    fn summary_lists_classes_with_their_base() {
        let dir = tempfile::TempDir::new().unwrap();
        let model_path = dir.path().join("model.json");
        let types_path = dir.path().join("types.toml");
        std::fs::write(
            &model_path,
            r#"{"classes": [
                {"name": "Shape", "functions": [{"name": "area", "return_type": {"qualified_name": ["int"]}}]},
                {"name": "Circle", "base_classes": [{"name": "Shape"}]}
            ]}"#,
        )
        .unwrap();
        std::fs::write(
            &types_path,
            "[[type]]\nname = \"int\"\nkind = \"primitive\"\n\n\
             [[type]]\nname = \"Shape\"\nkind = \"object\"\n\n\
             [[type]]\nname = \"Circle\"\nkind = \"object\"\n",
        )
        .unwrap();

        let model = crate::pipeline::build(
            &model_path,
            &types_path,
            apix_config::BuilderConfig::default(),
        )
        .unwrap();
        let summary = Summary::new(&model);

        let names: Vec<&str> = summary.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Shape", "Circle"]);
        assert_eq!(summary.classes[1].base.as_deref(), Some("Shape"));
        assert!(summary.to_text().starts_with("classes (2):\n  Shape [ordinary]"));
    }
}
