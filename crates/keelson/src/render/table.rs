//! Plain-text views of a model: the transition table and a state outline

use crate::core::{display_width, pad_right};
use crate::machine::{HierarchicalModel, RegionNode, StateNode};
use serde::Serialize;

/// One row of the transition table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRow {
    pub from: String,
    pub to: String,
    pub event: Option<String>,
    pub guard: Option<String>,
    pub action: Option<String>,
}

impl TransitionRow {
    fn cells(&self) -> [&str; 5] {
        [
            self.from.as_str(),
            self.to.as_str(),
            self.event.as_deref().unwrap_or("-"),
            self.guard.as_deref().unwrap_or("-"),
            self.action.as_deref().unwrap_or("-"),
        ]
    }
}

const HEADERS: [&str; 5] = ["From", "To", "Event", "Guard", "Action"];

/// Typed From/To/Event/Guard/Action records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransitionTable {
    rows: Vec<TransitionRow>,
}

impl TransitionTable {
    pub fn from_model(model: &HierarchicalModel) -> Self {
        let rows = model
            .transitions()
            .iter()
            .map(|transition| TransitionRow {
                from: transition.source.to_string(),
                to: transition.dest.to_string(),
                event: transition.trigger.clone(),
                guard: transition.guard.clone(),
                action: transition.action.clone(),
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[TransitionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column-aligned text, one line per row under a header
    pub fn render(&self) -> String {
        let mut widths = HEADERS.map(display_width);
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row.cells()) {
                *width = (*width).max(display_width(cell));
            }
        }

        let format_line = |cells: [&str; 5]| {
            let padded: Vec<String> = cells
                .iter()
                .zip(widths)
                .map(|(cell, width)| pad_right(cell, width))
                .collect();
            padded.join("  ").trim_end().to_string()
        };

        let mut lines = vec![format_line(HEADERS)];
        lines.push(
            widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("  "),
        );
        lines.extend(self.rows.iter().map(|row| format_line(row.cells())));
        lines.join("\n")
    }
}

/// Indented state tree; `*` marks each scope's initial state
pub fn outline(model: &HierarchicalModel) -> String {
    let mut lines = Vec::new();
    for node in model.root_states() {
        let initial = node.id() == model.root_initial();
        outline_node(model, node, 0, initial, &mut lines);
    }
    lines.join("\n")
}

fn outline_node(
    model: &HierarchicalModel,
    node: &StateNode,
    depth: usize,
    initial: bool,
    lines: &mut Vec<String>,
) {
    let marker = if initial { "* " } else { "  " };
    let indent = "    ".repeat(depth);
    let mut line = format!("{}{}{}", indent, marker, node.name());

    match node {
        StateNode::Simple { id, .. } => {
            if model.final_states().contains(id) {
                line.push_str(" (final)");
            }
            lines.push(line);
        }
        StateNode::History { .. } => {
            line.push_str(" (history)");
            lines.push(line);
        }
        StateNode::Composite {
            children, initial, ..
        } => {
            if model.defaulted_initials().contains(node.id()) {
                line.push_str(" (default initial)");
            }
            lines.push(line);
            for child in children {
                let is_initial = initial.as_ref() == Some(child.id());
                outline_node(model, child, depth + 1, is_initial, lines);
            }
        }
        StateNode::Concurrent { regions, .. } => {
            line.push_str(" (concurrent)");
            lines.push(line);
            for region in regions {
                outline_region(model, region, depth + 1, lines);
            }
        }
    }
}

fn outline_region(
    model: &HierarchicalModel,
    region: &RegionNode,
    depth: usize,
    lines: &mut Vec<String>,
) {
    lines.push(format!("{}  [{}]", "    ".repeat(depth), region.name));
    for child in &region.children {
        let is_initial = region.initial.as_ref() == Some(child.id());
        outline_node(model, child, depth + 1, is_initial, lines);
    }
}
