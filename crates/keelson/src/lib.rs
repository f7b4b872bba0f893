//! Keelson - Mermaid state diagrams to hierarchical state machines
//!
//! Parses `stateDiagram-v2` text into a validated [`HierarchicalModel`]:
//! scoped state ids, one initial state per scope, orthogonal regions,
//! history pseudostates and decomposed transition labels. The model can then
//! be exported as a runtime machine configuration or handed to a graph layout.
//!
//! # Quick Start
//!
//! ```rust
//! use keelson::parse;
//!
//! let model = parse("[*] --> Idle\nIdle --> Busy : start [ready] / spin()").unwrap();
//! assert_eq!(model.root_initial().as_str(), "Idle");
//! assert_eq!(model.transitions()[0].guard.as_deref(), Some("ready"));
//! ```
//!
//! # Advanced Usage
//!
//! For more control, use the pipeline and render adapter directly:
//!
//! ```rust
//! use keelson::prelude::*;
//!
//! let input = "[*] --> On\nstate On {\n  [*] --> Idle\n  Idle --> Busy\n}";
//!
//! let pipeline = Pipeline::with_options(ParseOptions::strict(), RenderConfig::default());
//! let model = pipeline.parse(input).unwrap();
//! assert_eq!(
//!     model.initial_of(&ScopedId::new("On")).map(|id| id.as_str()),
//!     Some("On/Idle")
//! );
//!
//! let rendered = pipeline.render(&model).unwrap();
//! assert!(rendered.dot.contains("cluster_On"));
//! assert_eq!(rendered.config.initial, "On");
//! ```

pub mod core;
pub mod machine;
pub mod pipeline;
pub mod render;

pub use crate::core::*;
pub use crate::machine::HierarchicalModel;
pub use crate::render::MachineConfig;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        Direction, InitialPolicy, MachineError, MachineResult, ParseOptions, RenderConfig,
        ScopedId, StateKind,
    };
    pub use crate::machine::{
        AnnotationKind, HierarchicalModel, Region, State, StateAnnotation, StateNode, Transition,
    };
    pub use crate::pipeline::{Pipeline, Stage};
    pub use crate::render::{
        DotLayout, GraphDrawer, GraphLayout, GraphvizCommand, MachineConfig, RenderAdapter,
        RenderedGraph, TransitionTable,
    };
}

/// Parse state diagram text with default options
///
/// Composites without an explicit `[*]` fall back to their first declared
/// child. Use [`parse_with`] to reject them instead.
///
/// # Example
/// ```rust
/// use keelson::{parse, MachineError};
///
/// let model = parse("[*] --> A\nA --> B\nB --> [*]").unwrap();
/// assert_eq!(model.states().len(), 2);
/// assert_eq!(model.final_states()[0].as_str(), "B");
///
/// let err = parse("state A {\n  [*] --> B\n").unwrap_err();
/// assert!(matches!(err, MachineError::StructuralParse { .. }));
/// ```
pub fn parse(input: &str) -> MachineResult<HierarchicalModel> {
    parse_with(input, &ParseOptions::default())
}

/// Parse state diagram text with explicit options
///
/// # Example
/// ```rust
/// use keelson::{parse_with, InitialPolicy, MachineError, ParseOptions};
///
/// let input = "[*] --> On\nstate On {\n  Idle --> Busy\n}";
/// let options = ParseOptions::new().with_initial_policy(InitialPolicy::Reject);
/// let err = parse_with(input, &options).unwrap_err();
/// assert!(matches!(err, MachineError::Validation { .. }));
/// ```
pub fn parse_with(input: &str, options: &ParseOptions) -> MachineResult<HierarchicalModel> {
    pipeline::Pipeline::with_options(options.clone(), RenderConfig::default()).parse(input)
}

/// Parse and lay out as Graphviz DOT, initial markers included
///
/// # Example
/// ```rust
/// use keelson::render_dot;
///
/// let dot = render_dot("[*] --> A\nA --> B : go").unwrap();
/// assert!(dot.starts_with("digraph"));
/// assert!(dot.contains("\"A\" -> \"B\" [label=\"go\"];"));
/// ```
pub fn render_dot(input: &str) -> anyhow::Result<String> {
    let rendered = pipeline::Pipeline::new().process(input)?;
    Ok(rendered.dot)
}

/// Parse and export the runtime machine configuration
///
/// # Example
/// ```rust
/// use keelson::machine_config;
///
/// let config = machine_config("[*] --> Idle\nIdle --> Busy : start").unwrap();
/// assert_eq!(config.initial, "Idle");
/// assert_eq!(config.transitions[0].trigger.as_deref(), Some("start"));
/// ```
pub fn machine_config(input: &str) -> anyhow::Result<MachineConfig> {
    let model = parse(input)?;
    Ok(MachineConfig::from_model(&model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_machine() {
        let model = parse("stateDiagram-v2\n    [*] --> Idle\n    Idle --> Busy").unwrap();
        assert_eq!(model.states().len(), 2);
        assert_eq!(model.root_initial().as_str(), "Idle");
    }

    #[test]
    fn test_render_dot_reports_errors() {
        let err = render_dot("Idle --> Busy").unwrap_err();
        assert!(err.to_string().contains("top-level initial"));
    }

    #[test]
    fn test_machine_config_json() {
        let config = machine_config("[*] --> A\nA --> B : go").unwrap();
        let json = config.to_json().unwrap();
        assert!(json.contains("\"initial\":\"A\""));
    }
}
