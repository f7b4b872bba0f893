//! The hierarchical machine model and its parts
//!
//! [`HierarchicalModel`] is only ever built by the assembler, after every
//! validation rule has passed. Its fields are private; callers get read-only
//! views.

use crate::core::{Direction, ScopedId, StateKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A named node of the machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
    /// Name as written in the diagram
    pub bare_name: String,
    /// Unique path-qualified name
    pub scoped_id: ScopedId,
    /// Enclosing composite or concurrent state
    pub parent_id: Option<ScopedId>,
    /// Region index when the parent is concurrent
    pub region: Option<usize>,
    pub kind: StateKind,
    /// Display text from `state "Label" as Name`
    pub label: Option<String>,
    /// Line of first mention
    pub line: usize,
}

impl State {
    pub fn new(
        bare_name: impl Into<String>,
        scoped_id: ScopedId,
        parent_id: Option<ScopedId>,
        kind: StateKind,
        line: usize,
    ) -> Self {
        Self {
            bare_name: bare_name.into(),
            scoped_id,
            parent_id,
            region: None,
            kind,
            label: None,
            line,
        }
    }

    pub fn in_region(mut self, region: Option<usize>) -> Self {
        self.region = region;
        self
    }

    /// Text to draw for this state
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.bare_name)
    }
}

/// A directed edge between two states
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub source: ScopedId,
    pub dest: ScopedId,
    /// `None` for an automatic transition
    pub trigger: Option<String>,
    pub guard: Option<String>,
    pub action: Option<String>,
    pub line: usize,
}

impl Transition {
    /// Recompose the label as `trigger [guard] / action`
    pub fn label(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(trigger) = &self.trigger {
            parts.push(trigger.clone());
        }
        if let Some(guard) = &self.guard {
            parts.push(format!("[{}]", guard));
        }
        if let Some(action) = &self.action {
            parts.push(format!("/ {}", action));
        }
        parts.join(" ")
    }
}

/// Kind of free-text decoration attached to a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Entry,
    Exit,
    Do,
    /// `Name : text` line
    Description,
    /// Any other note text
    Note,
}

impl AnnotationKind {
    /// Split `entry / x`, `exit: y`, `do / z` into kind and body
    pub fn classify(line: &str) -> Option<(AnnotationKind, String)> {
        let trimmed = line.trim();
        for (prefix, kind) in [
            ("entry", AnnotationKind::Entry),
            ("exit", AnnotationKind::Exit),
            ("do", AnnotationKind::Do),
        ] {
            let matches_prefix = trimmed
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
            if !matches_prefix {
                continue;
            }
            let rest = trimmed[prefix.len()..].trim_start();
            if let Some(body) = rest.strip_prefix('/').or_else(|| rest.strip_prefix(':')) {
                return Some((kind, body.trim().to_string()));
            }
        }
        None
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationKind::Entry => write!(f, "entry"),
            AnnotationKind::Exit => write!(f, "exit"),
            AnnotationKind::Do => write!(f, "do"),
            AnnotationKind::Description => write!(f, "description"),
            AnnotationKind::Note => write!(f, "note"),
        }
    }
}

/// Decoration only; never part of execution semantics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateAnnotation {
    pub state: ScopedId,
    pub kind: AnnotationKind,
    pub text: String,
    pub line: usize,
}

/// One independently active partition of a concurrent state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    /// The concurrent state
    pub owner: ScopedId,
    /// Zero-based position in the owner's body
    pub index: usize,
    /// `region1`, `region2`, ...
    pub name: String,
    /// `Owner/regionN`
    pub scoped_id: ScopedId,
    pub initial: ScopedId,
    pub members: Vec<ScopedId>,
}

impl Region {
    pub fn name_for(index: usize) -> String {
        format!("region{}", index + 1)
    }
}

/// Region of a concurrent state inside the nested tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionNode {
    pub id: ScopedId,
    pub name: String,
    pub initial: Option<ScopedId>,
    pub children: Vec<StateNode>,
}

/// Nested view of the machine, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateNode {
    Simple {
        id: ScopedId,
        name: String,
    },
    History {
        id: ScopedId,
        name: String,
    },
    Composite {
        id: ScopedId,
        name: String,
        initial: Option<ScopedId>,
        children: Vec<StateNode>,
    },
    Concurrent {
        id: ScopedId,
        name: String,
        regions: Vec<RegionNode>,
    },
}

impl StateNode {
    pub fn id(&self) -> &ScopedId {
        match self {
            StateNode::Simple { id, .. }
            | StateNode::History { id, .. }
            | StateNode::Composite { id, .. }
            | StateNode::Concurrent { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            StateNode::Simple { name, .. }
            | StateNode::History { name, .. }
            | StateNode::Composite { name, .. }
            | StateNode::Concurrent { name, .. } => name,
        }
    }

    /// Depth-first ids of this node and everything below it
    pub fn collect_ids<'a>(&'a self, out: &mut Vec<&'a ScopedId>) {
        out.push(self.id());
        match self {
            StateNode::Composite { children, .. } => {
                for child in children {
                    child.collect_ids(out);
                }
            }
            StateNode::Concurrent { regions, .. } => {
                for child in regions.iter().flat_map(|region| &region.children) {
                    child.collect_ids(out);
                }
            }
            StateNode::Simple { .. } | StateNode::History { .. } => {}
        }
    }
}

/// Validated hierarchical state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchicalModel {
    states: Vec<State>,
    root_states: Vec<StateNode>,
    root_initial: ScopedId,
    nested_initials: BTreeMap<ScopedId, ScopedId>,
    defaulted_initials: Vec<ScopedId>,
    regions: Vec<Region>,
    transitions: Vec<Transition>,
    final_states: Vec<ScopedId>,
    state_annotations: Vec<StateAnnotation>,
    direction: Option<Direction>,
}

/// Everything the assembler hands over once validation has passed
pub(crate) struct ModelParts {
    pub states: Vec<State>,
    pub root_states: Vec<StateNode>,
    pub root_initial: ScopedId,
    pub nested_initials: BTreeMap<ScopedId, ScopedId>,
    pub defaulted_initials: Vec<ScopedId>,
    pub regions: Vec<Region>,
    pub transitions: Vec<Transition>,
    pub final_states: Vec<ScopedId>,
    pub state_annotations: Vec<StateAnnotation>,
    pub direction: Option<Direction>,
}

impl HierarchicalModel {
    pub(crate) fn from_parts(parts: ModelParts) -> Self {
        Self {
            states: parts.states,
            root_states: parts.root_states,
            root_initial: parts.root_initial,
            nested_initials: parts.nested_initials,
            defaulted_initials: parts.defaulted_initials,
            regions: parts.regions,
            transitions: parts.transitions,
            final_states: parts.final_states,
            state_annotations: parts.state_annotations,
            direction: parts.direction,
        }
    }

    /// All states, flat, in declaration order
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Top-level nodes of the nested tree
    pub fn root_states(&self) -> &[StateNode] {
        &self.root_states
    }

    pub fn root_initial(&self) -> &ScopedId {
        &self.root_initial
    }

    /// Composite or region id to its initial child
    pub fn nested_initials(&self) -> &BTreeMap<ScopedId, ScopedId> {
        &self.nested_initials
    }

    /// Composites whose initial came from the first-child default
    pub fn defaulted_initials(&self) -> &[ScopedId] {
        &self.defaulted_initials
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn final_states(&self) -> &[ScopedId] {
        &self.final_states
    }

    pub fn state_annotations(&self) -> &[StateAnnotation] {
        &self.state_annotations
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn state(&self, id: &ScopedId) -> Option<&State> {
        self.states.iter().find(|state| &state.scoped_id == id)
    }

    /// Look a state up by its path string
    pub fn state_by_path(&self, path: &str) -> Option<&State> {
        self.states
            .iter()
            .find(|state| state.scoped_id.as_str() == path)
    }

    /// Every state with the given bare name, across all scopes
    pub fn states_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a State> + 'a {
        self.states
            .iter()
            .filter(move |state| state.bare_name == name)
    }

    pub fn history_states(&self) -> impl Iterator<Item = &State> {
        self.states
            .iter()
            .filter(|state| state.kind == StateKind::HistoryPseudostate)
    }

    /// Direct children of `parent`, in declaration order
    pub fn children_of<'a>(&'a self, parent: &'a ScopedId) -> impl Iterator<Item = &'a State> + 'a {
        self.states
            .iter()
            .filter(move |state| state.parent_id.as_ref() == Some(parent))
    }

    pub fn initial_of(&self, scope: &ScopedId) -> Option<&ScopedId> {
        self.nested_initials.get(scope)
    }

    pub fn annotations_for<'a>(
        &'a self,
        state: &'a ScopedId,
    ) -> impl Iterator<Item = &'a StateAnnotation> + 'a {
        self.state_annotations
            .iter()
            .filter(move |annotation| &annotation.state == state)
    }

    /// Ids of the nested tree, depth-first
    pub fn nested_ids(&self) -> Vec<&ScopedId> {
        let mut ids = Vec::with_capacity(self.states.len());
        for node in &self.root_states {
            node.collect_ids(&mut ids);
        }
        ids
    }

    /// Pretty JSON dump of the whole model
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
