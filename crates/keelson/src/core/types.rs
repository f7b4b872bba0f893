//! Core type definitions shared across the pipeline
//!
//! Scoped identifiers, state kinds, layout direction and the option structs
//! that configure parsing and rendering.

use serde::Serialize;
use std::fmt;

/// Separator between the segments of a [`ScopedId`]
pub const SCOPE_SEPARATOR: char = '/';

/// Globally unique, path-qualified state name such as `On/Busy/Print`
///
/// States inside a concurrent state carry their region segment
/// (`Power/region1/Off`), so identically named states in sibling regions stay
/// distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ScopedId(String);

impl ScopedId {
    /// Wrap an already-qualified path
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Qualify `name` under an optional enclosing path
    pub fn child_of(parent: Option<&ScopedId>, name: &str) -> Self {
        match parent {
            Some(parent) => Self(format!("{}{}{}", parent.0, SCOPE_SEPARATOR, name)),
            None => Self(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment
    pub fn bare_name(&self) -> &str {
        self.0
            .rsplit(SCOPE_SEPARATOR)
            .next()
            .unwrap_or(self.0.as_str())
    }

    /// Everything before the last segment, if any
    pub fn parent_path(&self) -> Option<ScopedId> {
        self.0
            .rsplit_once(SCOPE_SEPARATOR)
            .map(|(parent, _)| Self(parent.to_string()))
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SCOPE_SEPARATOR)
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// True when `self` lies strictly inside `ancestor`
    pub fn is_descendant_of(&self, ancestor: &ScopedId) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0[ancestor.0.len()..].starts_with(SCOPE_SEPARATOR)
    }
}

impl fmt::Display for ScopedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopedId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What a state is, structurally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Leaf state
    #[default]
    Simple,
    /// State with one nested sub-machine
    Composite,
    /// State whose children are split into independently active regions
    Concurrent,
    /// Synthetic `H` marker remembering the last active substate
    HistoryPseudostate,
}

impl StateKind {
    /// Composite or concurrent
    pub fn has_children(&self) -> bool {
        matches!(self, StateKind::Composite | StateKind::Concurrent)
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKind::Simple => write!(f, "simple"),
            StateKind::Composite => write!(f, "composite"),
            StateKind::Concurrent => write!(f, "concurrent"),
            StateKind::HistoryPseudostate => write!(f, "history"),
        }
    }
}

/// Layout direction, from a `direction` line or the render config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
pub enum Direction {
    /// Top to bottom (TD or TB)
    #[default]
    TopDown,
    /// Left to right (LR)
    LeftRight,
    /// Right to left (RL)
    RightLeft,
    /// Bottom to top (BT)
    BottomUp,
}

impl Direction {
    /// Parse direction from mermaid syntax (TD, TB, LR, RL, BT)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TD" | "TB" => Some(Direction::TopDown),
            "LR" => Some(Direction::LeftRight),
            "RL" => Some(Direction::RightLeft),
            "BT" => Some(Direction::BottomUp),
            _ => None,
        }
    }

    /// Graphviz `rankdir` value
    pub fn rankdir(&self) -> &'static str {
        match self {
            Direction::TopDown => "TB",
            Direction::LeftRight => "LR",
            Direction::RightLeft => "RL",
            Direction::BottomUp => "BT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::TopDown => write!(f, "TD"),
            Direction::LeftRight => write!(f, "LR"),
            Direction::RightLeft => write!(f, "RL"),
            Direction::BottomUp => write!(f, "BT"),
        }
    }
}

/// What to do with a composite that has children but no `[*] -->` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialPolicy {
    /// Use the first-declared child and record the composite in
    /// `HierarchicalModel::defaulted_initials`
    #[default]
    FirstChild,
    /// Fail validation
    Reject,
}

/// Options for the parse half of the pipeline
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub initial_policy: InitialPolicy,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject composites without an explicit initial state
    pub fn strict() -> Self {
        Self {
            initial_policy: InitialPolicy::Reject,
        }
    }

    pub fn with_initial_policy(mut self, policy: InitialPolicy) -> Self {
        self.initial_policy = policy;
        self
    }
}

/// Configuration for DOT emission
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Overrides the diagram's own `direction` line when set
    pub direction: Option<Direction>,
    /// Fold entry/exit/do annotations into node labels
    pub show_annotations: bool,
    /// Graph name and caption
    pub title: String,
    /// Wrap annotation text at this many columns (0 disables wrapping)
    pub label_width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            direction: None,
            show_annotations: true,
            title: "StateMachine".to_string(),
            label_width: 32,
        }
    }
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_annotations(mut self, show: bool) -> Self {
        self.show_annotations = show;
        self
    }
}
