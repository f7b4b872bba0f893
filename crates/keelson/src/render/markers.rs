//! Initial-state markers
//!
//! The layout leaves `[*]` pseudostates out, so this post-pass rewrites its
//! own copy of the DOT text and adds a small point node plus an arrow for
//! every initial: the root one at the top level, nested ones inside the
//! cluster of their composite or region, one indent level deeper.

use super::dot::{cluster_name, draws_as_cluster, quote, INDENT};
use crate::core::{MachineError, MachineResult, ScopedId};
use crate::machine::HierarchicalModel;
use tracing::debug;

/// Prefix of every generated marker node id
pub const MARKER_PREFIX: &str = "__initial__";

/// Inserts initial markers into a DOT body
#[derive(Debug, Default)]
pub struct InitialMarkers;

struct Insertion {
    /// Index of the line the block goes after
    after: usize,
    lines: Vec<String>,
}

impl InitialMarkers {
    pub fn new() -> Self {
        Self
    }

    /// Marker node id for a scope; `None` is the top level
    pub fn marker_id(scope: Option<&ScopedId>) -> String {
        match scope {
            Some(scope) => format!("{}{}", MARKER_PREFIX, scope),
            None => MARKER_PREFIX.to_string(),
        }
    }

    fn marker_lines(
        model: &HierarchicalModel,
        scope: Option<&ScopedId>,
        target: &ScopedId,
        indent: &str,
    ) -> Vec<String> {
        let marker = quote(&Self::marker_id(scope));
        let mut edge = format!("{}{} -> {}", indent, marker, quote(target.as_str()));
        if draws_as_cluster(model, target) {
            edge.push_str(&format!(" [lhead={}]", quote(&cluster_name(target))));
        }
        edge.push(';');
        vec![
            format!(
                "{}{} [shape=point, width=0.15, label=\"\"];",
                indent, marker
            ),
            edge,
        ]
    }

    pub fn inject(&self, dot: &str, model: &HierarchicalModel) -> MachineResult<String> {
        let lines: Vec<&str> = dot.lines().collect();
        let mut insertions = Vec::with_capacity(model.nested_initials().len() + 1);

        let header = lines
            .iter()
            .position(|line| line.trim_start().starts_with("digraph ") && line.trim_end().ends_with('{'))
            .ok_or_else(|| MachineError::render_error("graph body has no `digraph` header"))?;
        insertions.push(Insertion {
            after: header,
            lines: Self::marker_lines(model, None, model.root_initial(), INDENT),
        });

        for (scope, target) in model.nested_initials() {
            let opening = format!("subgraph {} {{", quote(&cluster_name(scope)));
            let (index, line) = lines
                .iter()
                .enumerate()
                .find(|(_, line)| line.trim() == opening)
                .ok_or_else(|| {
                    MachineError::render_error(format!(
                        "no cluster for `{}` in the graph body",
                        scope
                    ))
                })?;
            let indent = format!("{}{}", leading_whitespace(line), INDENT);
            insertions.push(Insertion {
                after: index,
                lines: Self::marker_lines(model, Some(scope), target, &indent),
            });
        }

        // Bottom-up so earlier indices stay valid
        insertions.sort_by(|a, b| b.after.cmp(&a.after));
        let mut output: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
        for insertion in insertions {
            let at = insertion.after + 1;
            output.splice(at..at, insertion.lines);
        }

        debug!(
            markers = model.nested_initials().len() + 1,
            "Injected initial markers"
        );
        let mut text = output.join("\n");
        text.push('\n');
        Ok(text)
    }
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}
