//! Fixed processing pipeline
//!
//! Text moves through the stages in [`Stage::ALL`] order:
//! Scan → Scope → Resolve → History → Assemble → Layout → Markers.
//! Each stage runs inside its own tracing span.

use crate::core::{MachineResult, ParseOptions, RenderConfig};
use crate::machine::{
    HierarchicalModel, HistoryResolver, ModelAssembler, Scanner, ScopeTracker, StateDatabase,
};
use crate::render::{GraphLayout, RenderAdapter, RenderedGraph};
use std::fmt;
use tracing::{debug, info, span, Level};

/// One step of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Lines to structural events
    Scan,
    /// Events to nested blocks
    Scope,
    /// Blocks to scoped states, transitions and initials
    Resolve,
    /// History notes to pseudostates
    History,
    /// Validation and nesting
    Assemble,
    /// Model to graph text
    Layout,
    /// Initial-state markers
    Markers,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Scan,
        Stage::Scope,
        Stage::Resolve,
        Stage::History,
        Stage::Assemble,
        Stage::Layout,
        Stage::Markers,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Scan => "scan",
            Stage::Scope => "scope",
            Stage::Resolve => "resolve",
            Stage::History => "history",
            Stage::Assemble => "assemble",
            Stage::Layout => "layout",
            Stage::Markers => "markers",
        }
    }

    /// Stages that build the model, before any rendering
    pub fn is_parse_stage(&self) -> bool {
        !matches!(self, Stage::Layout | Stage::Markers)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs diagram text through every stage
///
/// # Example
/// ```
/// use keelson::pipeline::Pipeline;
///
/// let pipeline = Pipeline::new();
/// let rendered = pipeline.process("[*] --> Idle\nIdle --> Busy : start").unwrap();
/// assert!(rendered.dot.contains("\"Idle\" -> \"Busy\""));
/// assert_eq!(rendered.config.initial, "Idle");
/// ```
pub struct Pipeline {
    options: ParseOptions,
    adapter: RenderAdapter,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default(), RenderConfig::default())
    }

    pub fn with_options(options: ParseOptions, render: RenderConfig) -> Self {
        Self {
            options,
            adapter: RenderAdapter::new(render),
        }
    }

    /// Swap the layout collaborator
    pub fn with_layout(mut self, layout: Box<dyn GraphLayout>) -> Self {
        let config = self.adapter.config().clone();
        self.adapter = RenderAdapter::with_layout(layout, config);
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn adapter(&self) -> &RenderAdapter {
        &self.adapter
    }

    /// Scan through Assemble
    pub fn parse(&self, input: &str) -> MachineResult<HierarchicalModel> {
        let parse_span = span!(Level::INFO, "parse_diagram", input_len = input.len());
        let _enter = parse_span.enter();

        let events = run(Stage::Scan, || Scanner::new().scan(input))?;
        let tree = run(Stage::Scope, || ScopeTracker::new().build(events))?;
        let mut flat = run(Stage::Resolve, || {
            StateDatabase::from_tree(&tree).map(StateDatabase::into_parts)
        })?;

        let resolved = run(Stage::History, || {
            HistoryResolver::new().resolve(
                std::mem::take(&mut flat.states),
                std::mem::take(&mut flat.transitions),
                &flat.notes,
            )
        })?;
        flat.states = resolved.states;
        flat.transitions = resolved.transitions;
        flat.annotations.extend(resolved.annotations);

        let model = run(Stage::Assemble, || {
            ModelAssembler::new(self.options.clone()).assemble(flat)
        })?;

        info!(
            states = model.states().len(),
            transitions = model.transitions().len(),
            "Parsed state diagram"
        );
        Ok(model)
    }

    /// Layout and Markers
    pub fn render(&self, model: &HierarchicalModel) -> MachineResult<RenderedGraph> {
        let render_span = span!(Level::INFO, "render_model", layout = self.adapter.layout_name());
        let _enter = render_span.enter();

        let graph = run(Stage::Layout, || self.adapter.layout(model))?;
        let dot = run(Stage::Markers, || self.adapter.mark(&graph, model))?;
        Ok(RenderedGraph {
            dot,
            config: crate::render::MachineConfig::from_model(model),
        })
    }

    /// Every stage, text to rendered graph
    pub fn process(&self, input: &str) -> MachineResult<RenderedGraph> {
        let model = self.parse(input)?;
        self.render(&model)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn run<T>(stage: Stage, step: impl FnOnce() -> MachineResult<T>) -> MachineResult<T> {
    let stage_span = span!(Level::DEBUG, "stage", stage = stage.name());
    let _enter = stage_span.enter();
    let result = step();
    match &result {
        Ok(_) => debug!(%stage, "Stage completed"),
        Err(error) => debug!(%stage, %error, "Stage failed"),
    }
    result
}
