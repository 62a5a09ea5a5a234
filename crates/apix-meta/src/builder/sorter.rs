//! Phase 8: dependency order of the ordinary classes.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rustworkx_core::petgraph::algo::toposort;
use rustworkx_core::petgraph::graph::{DiGraph, NodeIndex};

use super::MetaBuilder;
use crate::model::{ClassId, DiagnosticKind, MetaClass, MetaModel};

static CALL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*\)").expect("valid call suffix regex"));

/// Why one class has to precede another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DependencyEdge {
    Enclosing,
    Base,
    TemplateBase,
    DefaultArgument,
}

impl DependencyEdge {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Enclosing => "enclosing",
            Self::Base => "base",
            Self::TemplateBase => "template_base",
            Self::DefaultArgument => "default_argument",
        }
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed graph with an edge from every dependency to its dependent.
pub(crate) struct ClassGraph {
    graph: DiGraph<ClassId, DependencyEdge>,
    id_to_index: HashMap<ClassId, NodeIndex>,
}

impl ClassGraph {
    fn new(classes: &[ClassId]) -> Self {
        let mut graph = DiGraph::new();
        let mut id_to_index = HashMap::new();
        for &id in classes {
            id_to_index.entry(id).or_insert_with(|| graph.add_node(id));
        }
        Self { graph, id_to_index }
    }

    /// Ignored when either end is outside the graph or both are the same class.
    fn add_dependency(&mut self, dependency: ClassId, dependent: ClassId, edge: DependencyEdge) {
        if dependency == dependent {
            return;
        }
        let (Some(&from), Some(&to)) = (
            self.id_to_index.get(&dependency),
            self.id_to_index.get(&dependent),
        ) else {
            return;
        };
        self.graph.update_edge(from, to, edge);
    }

    fn toposort(&self) -> Option<Vec<ClassId>> {
        let sorted = toposort(&self.graph, None).ok()?;
        Some(sorted.into_iter().map(|idx| self.graph[idx]).collect())
    }

    fn edge_dump(&self, model: &MetaModel) -> String {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| {
                format!(
                    "{} -> {} ({})",
                    model.class(self.graph[edge.source()]).name,
                    model.class(self.graph[edge.target()]).name,
                    edge.weight
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Classes a default-argument expression refers to, looked up on the class
/// itself, its bases, then bare. `0` on a value type names that type.
fn default_argument_dependencies(model: &MetaModel, id: ClassId, class: &MetaClass) -> Vec<ClassId> {
    let mut dependencies = Vec::new();
    let bases: Vec<String> = model
        .base_chain(id)
        .map(|base| model.class(base).name.clone())
        .collect();

    for function in &class.functions {
        for argument in &function.arguments {
            let Some(expression) = argument.original_default_value.as_deref() else {
                continue;
            };
            let expression = if expression == "0" && argument.ty.is_value() {
                argument.ty.name.as_str()
            } else {
                expression
            };
            let called = CALL_SUFFIX.replace(expression, "");
            let called = called.trim();
            if called.is_empty() {
                continue;
            }
            let head = called.split("::").next().unwrap_or(called);

            let mut candidates = vec![called.to_string()];
            candidates.push(format!("{}::{head}", class.name));
            candidates.extend(bases.iter().map(|base| format!("{base}::{head}")));
            candidates.push(head.to_string());
            if let Some(found) = candidates.iter().find_map(|c| model.class_id(c))
                && !dependencies.contains(&found)
            {
                dependencies.push(found);
            }
        }
    }
    dependencies
}

impl MetaBuilder<'_, '_> {
    pub(super) fn sort_classes(&mut self) {
        let classes = self.model.ordinary.clone();
        let mut graph = ClassGraph::new(&classes);
        for &id in &classes {
            let class = self.model.class(id);
            if let Some(enclosing) = class.enclosing_class {
                graph.add_dependency(enclosing, id, DependencyEdge::Enclosing);
            }
            if let Some(base) = class.base_class {
                graph.add_dependency(base, id, DependencyEdge::Base);
            }
            if let Some(template) = class.template_base_class {
                graph.add_dependency(template, id, DependencyEdge::TemplateBase);
            }
            for dependency in default_argument_dependencies(&self.model, id, class) {
                graph.add_dependency(dependency, id, DependencyEdge::DefaultArgument);
            }
        }

        let Some(order) = graph.toposort() else {
            let dump = graph.edge_dump(&self.model);
            self.diagnose(
                DiagnosticKind::DependencyCycle,
                "<classes>",
                format!("classes cannot be sorted, dependency cycle among: {dump}"),
            );
            self.model.sorted.clear();
            return;
        };

        let rank: HashMap<ClassId, usize> = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        for &id in &classes {
            self.model
                .class_mut(id)
                .inner_classes
                .sort_by_key(|inner| rank.get(inner).copied().unwrap_or(usize::MAX));
        }
        self.model.sorted = order
            .into_iter()
            .filter(|&id| !self.model.class(id).is_interface())
            .collect();
    }
}
