//! Render adapter: model to runtime configuration and drawable graph
//!
//! The model is only read here. Layout goes through [`GraphLayout`], marker
//! injection rewrites the layout's own text, and drawing is left to an
//! optional [`GraphDrawer`].

mod config;
mod dot;
mod drawer;
mod markers;
mod table;

pub use config::{ConfigState, ConfigTransition, MachineConfig};
pub use dot::{cluster_name, draws_as_cluster, quote, DotLayout, GraphLayout};
pub use drawer::{GraphDrawer, GraphvizCommand};
pub use markers::{InitialMarkers, MARKER_PREFIX};
pub use table::{outline, TransitionRow, TransitionTable};

use crate::core::{MachineResult, RenderConfig};
use crate::machine::HierarchicalModel;

/// Runtime configuration plus the marked-up graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedGraph {
    pub dot: String,
    pub config: MachineConfig,
}

/// Hands a model to the layout collaborator and post-processes the result
pub struct RenderAdapter {
    layout: Box<dyn GraphLayout>,
    markers: InitialMarkers,
    config: RenderConfig,
}

impl RenderAdapter {
    pub fn new(config: RenderConfig) -> Self {
        Self::with_layout(Box::new(DotLayout::new()), config)
    }

    pub fn with_layout(layout: Box<dyn GraphLayout>, config: RenderConfig) -> Self {
        Self {
            layout,
            markers: InitialMarkers::new(),
            config,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn layout_name(&self) -> &'static str {
        self.layout.name()
    }

    /// Raw layout output, without initial markers
    pub fn layout(&self, model: &HierarchicalModel) -> MachineResult<String> {
        self.layout.layout(model, &self.config)
    }

    /// Copy of `graph` with initial markers added
    pub fn mark(&self, graph: &str, model: &HierarchicalModel) -> MachineResult<String> {
        self.markers.inject(graph, model)
    }

    pub fn render(&self, model: &HierarchicalModel) -> MachineResult<RenderedGraph> {
        let graph = self.layout(model)?;
        let dot = self.mark(&graph, model)?;
        Ok(RenderedGraph {
            dot,
            config: MachineConfig::from_model(model),
        })
    }

    /// Render, then draw with `drawer`
    pub fn draw(&self, model: &HierarchicalModel, drawer: &dyn GraphDrawer) -> MachineResult<Vec<u8>> {
        let rendered = self.render(model)?;
        drawer.draw(&rendered.dot)
    }
}

impl Default for RenderAdapter {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}
