//! Scope tracker: folds the flat event stream into nested blocks
//!
//! Every `state Name {` opens a block and every `}` closes the innermost one.
//! `--` lines split the innermost block into regions, which is what turns a
//! composite into a concurrent state. Region membership is only known once
//! the block closes, so scoped identifiers are assigned afterwards by the
//! state database.

use super::scanner::{Event, Spanned};
use crate::core::{Direction, MachineError, MachineResult};
use tracing::debug;

/// One entry of a block body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A statement that does not open or close a scope
    Event(Spanned<Event>),
    /// A `state Name { ... }` body, split into one or more regions
    Composite {
        name: String,
        label: Option<String>,
        line: usize,
        text: String,
        regions: Vec<Block>,
    },
}

/// A scope body in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub items: Vec<Item>,
}

/// The block tree for a whole diagram
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeTree {
    pub root: Block,
    /// Last `direction` line at the top level
    pub direction: Option<Direction>,
}

/// An open `state Name {` awaiting its `}`
struct Frame {
    name: String,
    label: Option<String>,
    line: usize,
    text: String,
    regions: Vec<Block>,
    current: Block,
}

/// Builds the [`ScopeTree`] from scanner events
pub struct ScopeTracker;

impl ScopeTracker {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, events: Vec<Spanned<Event>>) -> MachineResult<ScopeTree> {
        let mut tree = ScopeTree::default();
        let mut stack: Vec<Frame> = Vec::new();

        for spanned in events {
            let opens_or_closes = matches!(
                spanned.node,
                Event::Open { .. } | Event::Separator | Event::Close | Event::Direction(_)
            );
            if !opens_or_closes {
                match stack.last_mut() {
                    Some(frame) => frame.current.items.push(Item::Event(spanned)),
                    None => tree.root.items.push(Item::Event(spanned)),
                }
                continue;
            }

            match &spanned.node {
                Event::Open { name, label } => {
                    stack.push(Frame {
                        name: name.clone(),
                        label: label.clone(),
                        line: spanned.line,
                        text: spanned.text.clone(),
                        regions: Vec::new(),
                        current: Block::default(),
                    });
                }
                Event::Separator => {
                    let frame = stack
                        .last_mut()
                        .ok_or_else(|| {
                            spanned.error("region separator `--` outside a composite state")
                        })?;
                    let finished = std::mem::take(&mut frame.current);
                    frame.regions.push(finished);
                }
                Event::Close => {
                    let mut frame = stack
                        .pop()
                        .ok_or_else(|| spanned.error("unbalanced `}` with no open composite state"))?;
                    frame.regions.push(std::mem::take(&mut frame.current));
                    debug!(
                        composite = %frame.name,
                        regions = frame.regions.len(),
                        "Closed composite scope"
                    );
                    let item = Item::Composite {
                        name: frame.name,
                        label: frame.label,
                        line: frame.line,
                        text: frame.text,
                        regions: frame.regions,
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.current.items.push(item),
                        None => tree.root.items.push(item),
                    }
                }
                Event::Direction(direction) => {
                    if stack.is_empty() {
                        tree.direction = Some(*direction);
                    } else {
                        debug!(line = spanned.line, "Ignoring nested direction line");
                    }
                }
                _ => {}
            }
        }

        if let Some(frame) = stack.pop() {
            return Err(MachineError::parse_error(
                format!("unbalanced `{{`: composite state `{}` is never closed", frame.name),
                frame.line,
                1,
                frame.text,
            ));
        }

        Ok(tree)
    }
}

impl Default for ScopeTracker {
    fn default() -> Self {
        Self::new()
    }
}
