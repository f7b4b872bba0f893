//! Hierarchy builder: flat scoped states to the nested [`StateNode`] tree

use super::database::RegionInfo;
use super::model::{Region, RegionNode, State, StateNode};
use crate::core::{MachineError, MachineResult, ScopedId, StateKind};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Nests states under their parents, children in declaration order
#[derive(Debug, Default)]
pub struct HierarchyBuilder;

struct Index<'a> {
    children: HashMap<&'a ScopedId, Vec<&'a State>>,
    regions: &'a [RegionInfo],
    initials: &'a BTreeMap<ScopedId, ScopedId>,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self
    }

    /// `initials` maps composite and region ids to their initial child
    pub fn build(
        &self,
        states: &[State],
        regions: &[RegionInfo],
        initials: &BTreeMap<ScopedId, ScopedId>,
    ) -> MachineResult<Vec<StateNode>> {
        let mut by_id = HashMap::with_capacity(states.len());
        for state in states {
            if by_id.insert(&state.scoped_id, state).is_some() {
                return Err(MachineError::validation_error(format!(
                    "duplicate scoped id `{}`",
                    state.scoped_id
                )));
            }
        }

        let mut children: HashMap<&ScopedId, Vec<&State>> = HashMap::new();
        for state in states {
            let Some(parent) = &state.parent_id else {
                continue;
            };
            let Some(parent_state) = by_id.get(parent) else {
                return Err(MachineError::validation_error(format!(
                    "state `{}` names unknown parent `{}`",
                    state.scoped_id, parent
                )));
            };
            if !parent_state.kind.has_children() {
                return Err(MachineError::validation_error(format!(
                    "state `{}` is nested under {} state `{}`",
                    state.scoped_id, parent_state.kind, parent
                )));
            }
            children.entry(parent).or_default().push(state);
        }

        check_acyclic(states, &by_id)?;

        let index = Index {
            children,
            regions,
            initials,
        };
        let roots = states
            .iter()
            .filter(|state| state.parent_id.is_none())
            .map(|state| index.node(state))
            .collect::<MachineResult<Vec<_>>>()?;

        debug!(roots = roots.len(), states = states.len(), "Built state hierarchy");
        Ok(roots)
    }
}

/// Every parent chain must reach a root within `states.len()` steps
fn check_acyclic(states: &[State], by_id: &HashMap<&ScopedId, &State>) -> MachineResult<()> {
    for state in states {
        let mut current = state;
        let mut steps = 0;
        while let Some(parent) = &current.parent_id {
            steps += 1;
            if steps > states.len() {
                return Err(MachineError::validation_error(format!(
                    "cyclic hierarchy through `{}`",
                    state.scoped_id
                )));
            }
            match by_id.get(parent) {
                Some(next) => current = *next,
                None => break,
            }
        }
    }
    Ok(())
}

impl<'a> Index<'a> {
    fn children_of(&self, id: &ScopedId) -> &[&'a State] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn node(&self, state: &'a State) -> MachineResult<StateNode> {
        let id = state.scoped_id.clone();
        let name = state.bare_name.clone();
        let node = match state.kind {
            StateKind::Simple => StateNode::Simple { id, name },
            StateKind::HistoryPseudostate => StateNode::History { id, name },
            StateKind::Composite => {
                let children = self
                    .children_of(&state.scoped_id)
                    .iter()
                    .map(|child| self.node(*child))
                    .collect::<MachineResult<Vec<_>>>()?;
                StateNode::Composite {
                    initial: self.initials.get(&id).cloned(),
                    id,
                    name,
                    children,
                }
            }
            StateKind::Concurrent => StateNode::Concurrent {
                regions: self.region_nodes(state)?,
                id,
                name,
            },
        };
        Ok(node)
    }

    fn region_nodes(&self, owner: &'a State) -> MachineResult<Vec<RegionNode>> {
        let mut slots: Vec<&RegionInfo> = self
            .regions
            .iter()
            .filter(|region| region.owner == owner.scoped_id)
            .collect();
        slots.sort_by_key(|region| region.index);

        let members = self.children_of(&owner.scoped_id);
        if let Some(stray) = members.iter().find(|child| {
            child
                .region
                .map_or(true, |index| !slots.iter().any(|slot| slot.index == index))
        }) {
            return Err(MachineError::validation_error(format!(
                "state `{}` of concurrent state `{}` belongs to no region",
                stray.scoped_id, owner.scoped_id
            )));
        }

        slots
            .into_iter()
            .map(|slot| {
                let children = members
                    .iter()
                    .filter(|child| child.region == Some(slot.index))
                    .map(|child| self.node(*child))
                    .collect::<MachineResult<Vec<_>>>()?;
                Ok(RegionNode {
                    id: slot.scoped_id.clone(),
                    name: Region::name_for(slot.index),
                    initial: self.initials.get(&slot.scoped_id).cloned(),
                    children,
                })
            })
            .collect()
    }
}
