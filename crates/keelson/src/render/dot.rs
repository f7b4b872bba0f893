//! Graph layout seam and the built-in Graphviz DOT layout
//!
//! Composite and concurrent states become clusters. Each one also gets an
//! invisible anchor node carrying the state's own id, so transitions into or
//! out of a composite can be drawn with `lhead`/`ltail` clipping. Initial and
//! final pseudostates are left out; the marker pass adds the initial arrows.

use crate::core::{wrap_label, MachineResult, RenderConfig, ScopedId, StateKind};
use crate::machine::{AnnotationKind, HierarchicalModel, RegionNode, StateAnnotation, StateNode};

/// Turns a validated model into a graph description
pub trait GraphLayout: Send + Sync {
    /// Produce the graph text for `model`
    fn layout(&self, model: &HierarchicalModel, config: &RenderConfig) -> MachineResult<String>;

    /// Get the name of this layout
    fn name(&self) -> &'static str;

    /// Get the output format
    fn format(&self) -> &'static str;
}

/// Name of the cluster drawn for a composite, concurrent state or region
pub fn cluster_name(id: &ScopedId) -> String {
    format!("cluster_{}", id)
}

/// Quote a DOT identifier or label
pub fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Indentation unit of the emitted DOT
pub const INDENT: &str = "  ";

struct Emitter {
    out: String,
    depth: usize,
}

impl Emitter {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }
}

/// Graphviz DOT emitter
#[derive(Debug, Clone, Default)]
pub struct DotLayout;

impl DotLayout {
    pub fn new() -> Self {
        Self
    }

    fn annotation_lines(
        model: &HierarchicalModel,
        id: &ScopedId,
        config: &RenderConfig,
    ) -> Vec<String> {
        if !config.show_annotations {
            return Vec::new();
        }
        model
            .annotations_for(id)
            .flat_map(|annotation| wrap_label(&annotation_text(annotation), config.label_width))
            .collect()
    }

    /// Label text with DOT line breaks between the name and annotations
    fn label(name: &str, annotations: &[String]) -> String {
        let mut parts = vec![name.to_string()];
        parts.extend(annotations.iter().cloned());
        let escaped: Vec<String> = parts
            .iter()
            .map(|part| part.replace('\\', "\\\\").replace('"', "\\\""))
            .collect();
        format!("\"{}\"", escaped.join("\\n"))
    }

    fn emit_node(
        &self,
        emitter: &mut Emitter,
        model: &HierarchicalModel,
        node: &StateNode,
        config: &RenderConfig,
    ) {
        let id = node.id();
        let display = model
            .state(id)
            .map(|state| state.display_name().to_string())
            .unwrap_or_else(|| node.name().to_string());
        let annotations = Self::annotation_lines(model, id, config);

        match node {
            StateNode::Simple { .. } => {
                let mut attrs = vec![format!("label={}", Self::label(&display, &annotations))];
                if model.final_states().contains(id) {
                    attrs.push("peripheries=2".to_string());
                }
                emitter.line(format!("{} [{}];", quote(id.as_str()), attrs.join(", ")));
            }
            StateNode::History { .. } => {
                emitter.line(format!(
                    "{} [label=\"H\", shape=circle, width=0.3, fixedsize=true];",
                    quote(id.as_str())
                ));
            }
            StateNode::Composite { children, .. } => {
                self.open_cluster(emitter, id, &display, &annotations, "rounded");
                for child in children {
                    self.emit_node(emitter, model, child, config);
                }
                self.close_cluster(emitter);
            }
            StateNode::Concurrent { regions, .. } => {
                self.open_cluster(emitter, id, &display, &annotations, "rounded");
                for region in regions {
                    self.emit_region(emitter, model, region, config);
                }
                self.close_cluster(emitter);
            }
        }
    }

    fn emit_region(
        &self,
        emitter: &mut Emitter,
        model: &HierarchicalModel,
        region: &RegionNode,
        config: &RenderConfig,
    ) {
        emitter.line(format!("subgraph {} {{", quote(&cluster_name(&region.id))));
        emitter.depth += 1;
        emitter.line("label=\"\";");
        emitter.line("style=dashed;");
        for child in &region.children {
            self.emit_node(emitter, model, child, config);
        }
        self.close_cluster(emitter);
    }

    fn open_cluster(
        &self,
        emitter: &mut Emitter,
        id: &ScopedId,
        display: &str,
        annotations: &[String],
        style: &str,
    ) {
        emitter.line(format!("subgraph {} {{", quote(&cluster_name(id))));
        emitter.depth += 1;
        emitter.line(format!("label={};", Self::label(display, annotations)));
        emitter.line(format!("style={};", style));
        emitter.line(format!(
            "{} [shape=point, style=invis, width=0, label=\"\"];",
            quote(id.as_str())
        ));
    }

    fn close_cluster(&self, emitter: &mut Emitter) {
        emitter.depth = emitter.depth.saturating_sub(1);
        emitter.line("}");
    }
}

fn annotation_text(annotation: &StateAnnotation) -> String {
    match annotation.kind {
        AnnotationKind::Entry | AnnotationKind::Exit | AnnotationKind::Do => {
            format!("{} / {}", annotation.kind, annotation.text)
        }
        AnnotationKind::Description | AnnotationKind::Note => annotation.text.clone(),
    }
}

impl GraphLayout for DotLayout {
    fn layout(&self, model: &HierarchicalModel, config: &RenderConfig) -> MachineResult<String> {
        let direction = config.direction.or(model.direction()).unwrap_or_default();
        let mut emitter = Emitter {
            out: String::new(),
            depth: 0,
        };

        emitter.line(format!("digraph {} {{", quote(&config.title)));
        emitter.depth += 1;
        emitter.line("compound=true;");
        emitter.line(format!("rankdir={};", direction.rankdir()));
        emitter.line("node [shape=box, style=rounded, fontname=\"Helvetica\"];");
        emitter.line("edge [fontname=\"Helvetica\"];");

        for node in model.root_states() {
            self.emit_node(&mut emitter, model, node, config);
        }

        for transition in model.transitions() {
            let mut attrs = Vec::new();
            let label = transition.label();
            if !label.is_empty() {
                attrs.push(format!("label={}", quote(&label)));
            }
            let (source, dest) = (&transition.source, &transition.dest);
            if source != dest {
                if draws_as_cluster(model, source) && !dest.is_descendant_of(source) {
                    attrs.push(format!("ltail={}", quote(&cluster_name(source))));
                }
                if draws_as_cluster(model, dest) && !source.is_descendant_of(dest) {
                    attrs.push(format!("lhead={}", quote(&cluster_name(dest))));
                }
            }
            let attrs = if attrs.is_empty() {
                String::new()
            } else {
                format!(" [{}]", attrs.join(", "))
            };
            emitter.line(format!(
                "{} -> {}{};",
                quote(source.as_str()),
                quote(dest.as_str()),
                attrs
            ));
        }

        emitter.depth = 0;
        emitter.line("}");
        Ok(emitter.out)
    }

    fn name(&self) -> &'static str {
        "dot"
    }

    fn format(&self) -> &'static str {
        "graphviz"
    }
}

/// Whether an id belongs to a state drawn as a cluster
pub fn draws_as_cluster(model: &HierarchicalModel, id: &ScopedId) -> bool {
    model
        .state(id)
        .is_some_and(|state| matches!(state.kind, StateKind::Composite | StateKind::Concurrent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn dot(input: &str) -> String {
        let model = parse(input).unwrap();
        DotLayout::new()
            .layout(&model, &RenderConfig::default())
            .unwrap()
    }

    #[test]
    fn test_flat_graph() {
        let out = dot("[*] --> A\nA --> B : go\nB --> [*]");
        assert!(out.starts_with("digraph \"StateMachine\" {\n"));
        assert!(out.contains("  \"A\" [label=\"A\"];"));
        assert!(out.contains("  \"B\" [label=\"B\", peripheries=2];"));
        assert!(out.contains("  \"A\" -> \"B\" [label=\"go\"];"));
        assert!(out.trim_end().ends_with('}'));
    }

    #[test]
    fn test_composite_becomes_cluster_with_anchor() {
        let out = dot("[*] --> Off\nOff --> On : power\nstate On {\n  [*] --> Idle\n  Idle --> Busy\n}");
        assert!(out.contains("  subgraph \"cluster_On\" {"));
        assert!(out.contains("    \"On\" [shape=point, style=invis, width=0, label=\"\"];"));
        assert!(out.contains("    \"On/Idle\" [label=\"Idle\"];"));
        assert!(out.contains("\"Off\" -> \"On\" [label=\"power\", lhead=\"cluster_On\"];"));
    }

    #[test]
    fn test_regions_are_dashed_clusters() {
        let out = dot(
            "[*] --> Power\nstate Power {\n  [*] --> Off\n  Off --> Lit\n  --\n  [*] --> Off\n  Off --> Dim\n}",
        );
        assert!(out.contains("subgraph \"cluster_Power/region1\" {"));
        assert!(out.contains("subgraph \"cluster_Power/region2\" {"));
        assert!(out.contains("style=dashed;"));
        assert!(out.contains("\"Power/region2/Off\" -> \"Power/region2/Dim\";"));
    }

    #[test]
    fn test_annotations_and_direction() {
        let model = parse("direction LR\n[*] --> Idle\nIdle : entry / warm up").unwrap();
        let out = DotLayout::new()
            .layout(&model, &RenderConfig::default())
            .unwrap();
        assert!(out.contains("rankdir=LR;"));
        assert!(out.contains("\"Idle\" [label=\"Idle\\nentry / warm up\"];"));

        let plain = DotLayout::new()
            .layout(
                &model,
                &RenderConfig::default()
                    .with_annotations(false)
                    .with_direction(crate::core::Direction::BottomUp),
            )
            .unwrap();
        assert!(plain.contains("rankdir=BT;"));
        assert!(plain.contains("\"Idle\" [label=\"Idle\"];"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
    }
}
