//! Phase 9: registry entries the build never matched.
//!
//! Everything here is a warning; the model is left untouched.

use apix_typesystem::{EntryKind, TypeEntryId, normalize_signature, signature_name};

use super::MetaBuilder;
use crate::model::DiagnosticKind;

impl MetaBuilder<'_, '_> {
    pub(super) fn check_consistency(&mut self) {
        let mut findings: Vec<(DiagnosticKind, String, String)> = Vec::new();

        for (id, entry) in self.db.iter() {
            if !entry.generates_code() || !self.db.is_api_compatible(id) {
                continue;
            }
            match entry.kind {
                EntryKind::Object | EntryKind::Value | EntryKind::Namespace => {
                    if self.model.class_id(&entry.name).is_none()
                        && !self.model.rejects.classes.contains_key(&entry.name)
                    {
                        findings.push((
                            DiagnosticKind::TypeNotDefined,
                            entry.name.clone(),
                            format!("{} type is declared in the type system but not found in the code", entry.kind),
                        ));
                    }
                    self.check_modifications(id, &mut findings);
                }
                EntryKind::Enum => {
                    if self.model.find_enum(&entry.name).is_none()
                        && !self.model.rejects.enums.contains_key(&entry.name)
                    {
                        findings.push((
                            DiagnosticKind::EnumNotDeclared,
                            entry.name.clone(),
                            "enum is declared in the type system but not found in the code".to_string(),
                        ));
                    }
                }
                EntryKind::Function => {
                    let missing: Vec<String> = if entry.signatures.is_empty() {
                        if self.bound_global_signatures.contains(&entry.name) {
                            Vec::new()
                        } else {
                            vec![entry.name.clone()]
                        }
                    } else {
                        entry
                            .signatures
                            .iter()
                            .map(|s| normalize_signature(s))
                            .filter(|s| !self.bound_global_signatures.contains(s))
                            .collect()
                    };
                    for signature in missing {
                        findings.push((
                            DiagnosticKind::GlobalFunctionNotDefined,
                            entry.name.clone(),
                            format!("global function '{signature}' is declared in the type system but not found in the code"),
                        ));
                    }
                }
                _ => {}
            }
        }

        for (kind, subject, message) in findings {
            self.diagnose(kind, &subject, message);
        }
    }

    /// Modification rules of a class entry that matched no function.
    fn check_modifications(&self, id: TypeEntryId, findings: &mut Vec<(DiagnosticKind, String, String)>) {
        let entry = self.db.entry(id);
        let class = self.model.find_class(&entry.name);
        for modification in &entry.function_modifications {
            let signature = normalize_signature(&modification.signature);
            if self.applied_modifications.contains(&(id, signature.clone())) {
                continue;
            }
            let name = signature_name(&signature);
            let candidates: Vec<String> = class
                .map(|c| c.functions_named(name).map(|f| f.minimal_signature()).collect())
                .unwrap_or_default();
            let message = if candidates.is_empty() {
                format!("no function matches the modification '{signature}'")
            } else {
                format!(
                    "no function matches the modification '{signature}'; candidates: {}",
                    candidates.join(", ")
                )
            };
            findings.push((DiagnosticKind::ModificationNotFound, entry.name.clone(), message));
        }
    }
}
