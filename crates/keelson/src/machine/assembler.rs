//! Model assembler: validates the resolved flat machine and freezes it into a
//! [`HierarchicalModel`]
//!
//! Validation is all-or-nothing. The first violated rule aborts assembly and
//! no partial model is returned.

use super::database::{FlatMachine, InitialDecl, RegionInfo, ScopeRef};
use super::hierarchy::HierarchyBuilder;
use super::model::{HierarchicalModel, ModelParts, Region, State};
use crate::core::{InitialPolicy, MachineError, MachineResult, ParseOptions, ScopedId, StateKind};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Validates and assembles the final model
#[derive(Debug, Clone, Default)]
pub struct ModelAssembler {
    options: ParseOptions,
}

impl ModelAssembler {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn assemble(&self, flat: FlatMachine) -> MachineResult<HierarchicalModel> {
        check_unique_ids(&flat.states)?;
        check_transitions(&flat)?;

        let root_initial = root_initial(&flat.initials)?;
        let mut nested_initials = BTreeMap::new();
        let regions = assemble_regions(&flat, &mut nested_initials)?;
        let defaulted_initials = self.composite_initials(&flat, &mut nested_initials)?;

        let root_states =
            HierarchyBuilder::new().build(&flat.states, &flat.regions, &nested_initials)?;

        let model = HierarchicalModel::from_parts(ModelParts {
            states: flat.states,
            root_states,
            root_initial,
            nested_initials,
            defaulted_initials,
            regions,
            transitions: flat.transitions,
            final_states: flat.finals,
            state_annotations: flat.annotations,
            direction: flat.direction,
        });
        check_round_trip(&model)?;

        debug!(
            states = model.states().len(),
            transitions = model.transitions().len(),
            regions = model.regions().len(),
            "Assembled model"
        );
        Ok(model)
    }

    /// Initial child of every composite, applying the default policy
    fn composite_initials(
        &self,
        flat: &FlatMachine,
        nested_initials: &mut BTreeMap<ScopedId, ScopedId>,
    ) -> MachineResult<Vec<ScopedId>> {
        let mut defaulted = Vec::new();

        for composite in flat
            .states
            .iter()
            .filter(|state| state.kind == StateKind::Composite)
        {
            let scope = ScopeRef::Composite(composite.scoped_id.clone());
            let declared = initials_in(&flat.initials, &scope);
            match declared.as_slice() {
                [single] => {
                    nested_initials.insert(composite.scoped_id.clone(), single.target.clone());
                }
                [] => {
                    let first_child = flat.states.iter().find(|state| {
                        state.parent_id.as_ref() == Some(&composite.scoped_id)
                            && state.kind != StateKind::HistoryPseudostate
                    });
                    let Some(first_child) = first_child else {
                        continue;
                    };
                    match self.options.initial_policy {
                        InitialPolicy::FirstChild => {
                            warn!(
                                composite = %composite.scoped_id,
                                initial = %first_child.scoped_id,
                                "No initial state declared; defaulting to the first declared child"
                            );
                            nested_initials.insert(
                                composite.scoped_id.clone(),
                                first_child.scoped_id.clone(),
                            );
                            defaulted.push(composite.scoped_id.clone());
                        }
                        InitialPolicy::Reject => {
                            return Err(MachineError::validation_error(format!(
                                "composite state `{}` has children but no initial state `[*] --> ...`",
                                composite.scoped_id
                            )));
                        }
                    }
                }
                many => {
                    return Err(MachineError::validation_error(format!(
                        "composite state `{}` declares {} initial states (lines {})",
                        composite.scoped_id,
                        many.len(),
                        lines(many)
                    )));
                }
            }
        }
        Ok(defaulted)
    }
}

fn initials_in<'a>(initials: &'a [InitialDecl], scope: &ScopeRef) -> Vec<&'a InitialDecl> {
    initials
        .iter()
        .filter(|initial| &initial.scope == scope)
        .collect()
}

fn lines(initials: &[&InitialDecl]) -> String {
    initials
        .iter()
        .map(|initial| initial.line.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_unique_ids(states: &[State]) -> MachineResult<()> {
    let mut seen = HashSet::with_capacity(states.len());
    for state in states {
        if !seen.insert(&state.scoped_id) {
            return Err(MachineError::validation_error(format!(
                "duplicate scoped id `{}`",
                state.scoped_id
            )));
        }
    }
    Ok(())
}

/// Endpoints exist, and history is never re-entered from inside its owner
fn check_transitions(flat: &FlatMachine) -> MachineResult<()> {
    for transition in &flat.transitions {
        let mut endpoints = Vec::with_capacity(2);
        for id in [&transition.source, &transition.dest] {
            let state = flat.state(id).ok_or_else(|| {
                MachineError::validation_error(format!(
                    "transition at line {} refers to unresolved state `{}`",
                    transition.line, id
                ))
            })?;
            endpoints.push(state);
        }

        let dest = endpoints[1];
        if dest.kind != StateKind::HistoryPseudostate {
            continue;
        }
        if let Some(owner) = &dest.parent_id {
            if transition.source.is_descendant_of(owner) {
                return Err(MachineError::validation_error(format!(
                    "transition at line {} targets `{}` from inside `{}`",
                    transition.line, dest.scoped_id, owner
                )));
            }
        }
    }
    Ok(())
}

fn root_initial(initials: &[InitialDecl]) -> MachineResult<ScopedId> {
    match initials_in(initials, &ScopeRef::Root).as_slice() {
        [single] => Ok(single.target.clone()),
        [] => Err(MachineError::validation_error(
            "no top-level initial state; add `[*] --> <State>`",
        )),
        many => Err(MachineError::validation_error(format!(
            "{} top-level initial states (lines {}); exactly one is allowed",
            many.len(),
            lines(many)
        ))),
    }
}

/// Regions need exactly one initial each and come at least two per owner
fn assemble_regions(
    flat: &FlatMachine,
    nested_initials: &mut BTreeMap<ScopedId, ScopedId>,
) -> MachineResult<Vec<Region>> {
    for concurrent in flat
        .states
        .iter()
        .filter(|state| state.kind == StateKind::Concurrent)
    {
        let count = flat
            .regions
            .iter()
            .filter(|region| region.owner == concurrent.scoped_id)
            .count();
        if count < 2 {
            return Err(MachineError::validation_error(format!(
                "concurrent state `{}` has {} region(s); at least 2 are required",
                concurrent.scoped_id, count
            )));
        }
    }

    let mut regions = Vec::with_capacity(flat.regions.len());
    for info in &flat.regions {
        let RegionInfo {
            owner,
            index,
            scoped_id,
        } = info;
        let scope = ScopeRef::Region {
            owner: owner.clone(),
            index: *index,
        };
        let name = Region::name_for(*index);
        let initial = match initials_in(&flat.initials, &scope).as_slice() {
            [single] => single.target.clone(),
            [] => {
                return Err(MachineError::validation_error(format!(
                    "region `{}` of concurrent state `{}` has no initial state `[*] --> ...`",
                    name, owner
                )));
            }
            many => {
                return Err(MachineError::validation_error(format!(
                    "region `{}` of concurrent state `{}` declares {} initial states (lines {})",
                    name,
                    owner,
                    many.len(),
                    lines(many)
                )));
            }
        };

        let members = flat
            .states
            .iter()
            .filter(|state| state.parent_id.as_ref() == Some(owner) && state.region == Some(*index))
            .map(|state| state.scoped_id.clone())
            .collect();

        nested_initials.insert(scoped_id.clone(), initial.clone());
        regions.push(Region {
            owner: owner.clone(),
            index: *index,
            name,
            scoped_id: scoped_id.clone(),
            initial,
            members,
        });
    }
    Ok(regions)
}

/// Every state sits exactly once in the nested tree
fn check_round_trip(model: &HierarchicalModel) -> MachineResult<()> {
    let nested = model.nested_ids();
    let unique: HashSet<&ScopedId> = nested.iter().copied().collect();
    if nested.len() != model.states().len() || unique.len() != nested.len() {
        return Err(MachineError::validation_error(format!(
            "nested tree holds {} entries ({} distinct) for {} states",
            nested.len(),
            unique.len(),
            model.states().len()
        )));
    }
    Ok(())
}
