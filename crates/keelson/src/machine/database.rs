//! State database: scoped, flat storage of everything a diagram declares
//!
//! Built from the [`ScopeTree`] in two passes. The first registers every
//! `state` declaration, composite body and `[*] -->` target in its lexical
//! scope. The second resolves the remaining references in document order,
//! auto-declaring names that are not found anywhere visible.

use super::label::decompose;
use super::model::{AnnotationKind, Region, State, StateAnnotation, Transition};
use super::scanner::{Event, Spanned};
use super::scope::{Block, Item, ScopeTree};
use super::statement::NotePosition;
use crate::core::{Direction, MachineError, MachineResult, ScopedId, StateKind};
use tracing::{debug, trace};

const ROOT: usize = 0;

/// Where an initial pseudostate lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeRef {
    Root,
    Composite(ScopedId),
    Region { owner: ScopedId, index: usize },
}

impl ScopeRef {
    /// Key used in the model's nested initials map; `None` for the root
    pub fn key(&self) -> Option<ScopedId> {
        match self {
            ScopeRef::Root => None,
            ScopeRef::Composite(id) => Some(id.clone()),
            ScopeRef::Region { owner, index } => {
                Some(ScopedId::child_of(Some(owner), &Region::name_for(*index)))
            }
        }
    }
}

impl std::fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeRef::Root => write!(f, "the top level"),
            ScopeRef::Composite(id) => write!(f, "composite state `{}`", id),
            ScopeRef::Region { owner, index } => write!(
                f,
                "region `{}` of concurrent state `{}`",
                Region::name_for(*index),
                owner
            ),
        }
    }
}

/// A `[*] --> Target` line after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialDecl {
    pub scope: ScopeRef,
    pub target: ScopedId,
    pub line: usize,
}

/// A note attached to a resolved state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub state: ScopedId,
    pub position: NotePosition,
    pub text: String,
    pub line: usize,
    /// Opening line of the note, for error reports
    pub source: String,
}

/// A region slot known before its initial is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
    pub owner: ScopedId,
    pub index: usize,
    pub scoped_id: ScopedId,
}

#[derive(Debug, Clone)]
struct ScopeFrame {
    /// Path prefix for members; `None` at the root
    path: Option<ScopedId>,
    parent: Option<usize>,
    /// Composite or concurrent state the members belong to
    owner: Option<ScopedId>,
    region: Option<usize>,
}

impl ScopeFrame {
    fn scope_ref(&self) -> ScopeRef {
        match (&self.owner, self.region) {
            (None, _) => ScopeRef::Root,
            (Some(owner), Some(index)) => ScopeRef::Region {
                owner: owner.clone(),
                index,
            },
            (Some(owner), None) => ScopeRef::Composite(owner.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    state: State,
    scope: usize,
    seq: usize,
}

/// Flat, scope-resolved contents of one diagram
#[derive(Debug, Clone)]
pub struct StateDatabase {
    scopes: Vec<ScopeFrame>,
    entries: Vec<Entry>,
    regions: Vec<RegionInfo>,
    transitions: Vec<Transition>,
    initials: Vec<InitialDecl>,
    finals: Vec<ScopedId>,
    notes: Vec<Note>,
    annotations: Vec<StateAnnotation>,
    direction: Option<Direction>,
}

impl StateDatabase {
    fn empty(direction: Option<Direction>) -> Self {
        Self {
            scopes: vec![ScopeFrame {
                path: None,
                parent: None,
                owner: None,
                region: None,
            }],
            entries: Vec::new(),
            regions: Vec::new(),
            transitions: Vec::new(),
            initials: Vec::new(),
            finals: Vec::new(),
            notes: Vec::new(),
            annotations: Vec::new(),
            direction,
        }
    }

    /// Register and resolve a whole block tree
    pub fn from_tree(tree: &ScopeTree) -> MachineResult<Self> {
        let mut db = Self::empty(tree.direction);
        let mut pending = Vec::new();
        db.register_block(&tree.root, ROOT, &mut pending)?;
        debug!(
            declared = db.entries.len(),
            pending = pending.len(),
            "Registered declarations"
        );

        let mut notes = Vec::new();
        for (scope, spanned) in pending {
            if matches!(spanned.node, Event::Note { .. }) {
                notes.push((scope, spanned));
                continue;
            }
            match &spanned.node {
                Event::Transition {
                    source,
                    target,
                    label,
                } => {
                    let source_id = db.resolve_or_declare(scope, source, &spanned)?;
                    let dest_id = db.resolve_or_declare(scope, target, &spanned)?;
                    let parts = decompose(label.as_deref());
                    trace!(source = %source_id, dest = %dest_id, "Resolved transition");
                    db.transitions.push(Transition {
                        source: source_id,
                        dest: dest_id,
                        trigger: parts.trigger,
                        guard: parts.guard,
                        action: parts.action,
                        line: spanned.line,
                    });
                }
                Event::Final { source } => {
                    let id = db.resolve_or_declare(scope, source, &spanned)?;
                    if !db.finals.contains(&id) {
                        db.finals.push(id);
                    }
                }
                Event::Description { name, text } => {
                    let id = db.resolve_or_declare(scope, name, &spanned)?;
                    let (kind, text) = AnnotationKind::classify(text)
                        .unwrap_or((AnnotationKind::Description, text.clone()));
                    db.annotations.push(StateAnnotation {
                        state: id,
                        kind,
                        text,
                        line: spanned.line,
                    });
                }
                Event::Initial { .. }
                | Event::Note { .. }
                | Event::Declare { .. }
                | Event::Open { .. }
                | Event::Close
                | Event::Separator
                | Event::Direction(_) => {}
            }
        }

        for (scope, spanned) in notes {
            if let Event::Note {
                name,
                position,
                text,
            } = &spanned.node
            {
                let index = db.lookup(scope, name, &spanned)?.ok_or_else(|| {
                    spanned.error(format!("note attached to undeclared state `{}`", name))
                })?;
                db.touch(index, spanned.line);
                db.notes.push(Note {
                    state: db.entries[index].state.scoped_id.clone(),
                    position: *position,
                    text: text.clone(),
                    line: spanned.line,
                    source: spanned.text.clone(),
                });
            }
        }

        db.entries
            .sort_by_key(|entry| (entry.state.line, entry.seq));
        debug!(
            states = db.entries.len(),
            transitions = db.transitions.len(),
            initials = db.initials.len(),
            notes = db.notes.len(),
            "Resolved state database"
        );
        Ok(db)
    }

    fn register_block(
        &mut self,
        block: &Block,
        scope: usize,
        pending: &mut Vec<(usize, Spanned<Event>)>,
    ) -> MachineResult<()> {
        for item in &block.items {
            match item {
                Item::Event(spanned) => match &spanned.node {
                    Event::Declare { name, label } => {
                        self.declare(
                            scope,
                            name,
                            StateKind::Simple,
                            label.clone(),
                            spanned.line,
                            &spanned.text,
                        )?;
                    }
                    // An initial target is always a member of its own scope
                    Event::Initial { target } => {
                        let id = self.declare(
                            scope,
                            target,
                            StateKind::Simple,
                            None,
                            spanned.line,
                            &spanned.text,
                        )?;
                        trace!(state = %id, line = spanned.line, "Registered initial target");
                        self.initials.push(InitialDecl {
                            scope: self.scopes[scope].scope_ref(),
                            target: id,
                            line: spanned.line,
                        });
                    }
                    _ => pending.push((scope, spanned.clone())),
                },
                Item::Composite {
                    name,
                    label,
                    line,
                    text,
                    regions,
                } => {
                    let kind = if regions.len() > 1 {
                        StateKind::Concurrent
                    } else {
                        StateKind::Composite
                    };
                    let id = self.declare(scope, name, kind, label.clone(), *line, text)?;

                    if kind == StateKind::Concurrent {
                        for (index, body) in regions.iter().enumerate() {
                            let path = ScopedId::child_of(Some(&id), &Region::name_for(index));
                            let child = self.push_scope(path.clone(), scope, &id, Some(index));
                            self.regions.push(RegionInfo {
                                owner: id.clone(),
                                index,
                                scoped_id: path,
                            });
                            self.register_block(body, child, pending)?;
                        }
                    } else {
                        let child = self.push_scope(id.clone(), scope, &id, None);
                        if let Some(body) = regions.first() {
                            self.register_block(body, child, pending)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn push_scope(
        &mut self,
        path: ScopedId,
        parent: usize,
        owner: &ScopedId,
        region: Option<usize>,
    ) -> usize {
        self.scopes.push(ScopeFrame {
            path: Some(path),
            parent: Some(parent),
            owner: Some(owner.clone()),
            region,
        });
        self.scopes.len() - 1
    }

    /// Register an explicit declaration, merging with an earlier one
    fn declare(
        &mut self,
        scope: usize,
        name: &str,
        kind: StateKind,
        label: Option<String>,
        line: usize,
        text: &str,
    ) -> MachineResult<ScopedId> {
        let Some(index) = self.find_in_scope(scope, name) else {
            return Ok(self.insert(scope, name, kind, label, line));
        };

        let state = &mut self.entries[index].state;
        if kind.has_children() {
            if state.kind.has_children() {
                return Err(MachineError::parse_error(
                    format!("composite state `{}` is given a body twice", name),
                    line,
                    1,
                    text,
                ));
            }
            trace!(state = %state.scoped_id, %kind, "Promoted flat declaration");
            state.kind = kind;
        }
        if label.is_some() {
            state.label = label;
        }
        state.line = state.line.min(line);
        Ok(state.scoped_id.clone())
    }

    fn insert(
        &mut self,
        scope: usize,
        name: &str,
        kind: StateKind,
        label: Option<String>,
        line: usize,
    ) -> ScopedId {
        let frame = &self.scopes[scope];
        let scoped_id = ScopedId::child_of(frame.path.as_ref(), name);
        let mut state = State::new(name, scoped_id.clone(), frame.owner.clone(), kind, line)
            .in_region(frame.region);
        state.label = label;
        let seq = self.entries.len();
        self.entries.push(Entry { state, scope, seq });
        scoped_id
    }

    fn find_in_scope(&self, scope: usize, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.scope == scope && entry.state.bare_name == name)
    }

    /// `scope` followed by each enclosing scope up to the root
    fn chain(&self, scope: usize) -> Vec<usize> {
        let mut chain = vec![scope];
        let mut current = scope;
        while let Some(parent) = self.scopes[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    fn is_within(&self, scope: usize, ancestor: usize) -> bool {
        self.chain(scope).contains(&ancestor)
    }

    /// Scope chain first, then a search of the scope's own descendants
    ///
    /// The descendant search never reaches into sibling composites or
    /// sibling regions, so same-named states there stay distinct.
    fn lookup(
        &self,
        scope: usize,
        name: &str,
        spanned: &Spanned<Event>,
    ) -> MachineResult<Option<usize>> {
        if let Some(found) = self
            .chain(scope)
            .iter()
            .find_map(|level| self.find_in_scope(*level, name))
        {
            return Ok(Some(found));
        }

        let candidates: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.state.bare_name == name && self.is_within(entry.scope, scope))
            .map(|(index, _)| index)
            .collect();

        match candidates.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            many => {
                let names: Vec<String> = many
                    .iter()
                    .map(|index| format!("`{}`", self.entries[*index].state.scoped_id))
                    .collect();
                Err(spanned.error(format!(
                    "ambiguous reference `{}` could mean {}",
                    name,
                    names.join(" or ")
                )))
            }
        }
    }

    fn touch(&mut self, index: usize, line: usize) {
        let state = &mut self.entries[index].state;
        state.line = state.line.min(line);
    }

    fn resolve_or_declare(
        &mut self,
        scope: usize,
        name: &str,
        spanned: &Spanned<Event>,
    ) -> MachineResult<ScopedId> {
        match self.lookup(scope, name, spanned)? {
            Some(index) => {
                self.touch(index, spanned.line);
                Ok(self.entries[index].state.scoped_id.clone())
            }
            None => {
                let id = self.insert(scope, name, StateKind::Simple, None, spanned.line);
                trace!(state = %id, line = spanned.line, "Auto-declared state");
                Ok(id)
            }
        }
    }

    /// States in first-mention order
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.entries.iter().map(|entry| &entry.state)
    }

    pub fn state_count(&self) -> usize {
        self.entries.len()
    }

    pub fn regions(&self) -> &[RegionInfo] {
        &self.regions
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn initials(&self) -> &[InitialDecl] {
        &self.initials
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn into_parts(self) -> FlatMachine {
        FlatMachine {
            states: self.entries.into_iter().map(|entry| entry.state).collect(),
            regions: self.regions,
            transitions: self.transitions,
            initials: self.initials,
            finals: self.finals,
            notes: self.notes,
            annotations: self.annotations,
            direction: self.direction,
        }
    }
}

/// Owned output of the database, consumed by the later stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatMachine {
    pub states: Vec<State>,
    pub regions: Vec<RegionInfo>,
    pub transitions: Vec<Transition>,
    pub initials: Vec<InitialDecl>,
    pub finals: Vec<ScopedId>,
    pub notes: Vec<Note>,
    pub annotations: Vec<StateAnnotation>,
    pub direction: Option<Direction>,
}

impl FlatMachine {
    pub fn state(&self, id: &ScopedId) -> Option<&State> {
        self.states.iter().find(|state| &state.scoped_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::scanner::Scanner;
    use crate::machine::scope::ScopeTracker;

    fn database(input: &str) -> MachineResult<StateDatabase> {
        let events = Scanner::new().scan(input)?;
        let tree = ScopeTracker::new().build(events)?;
        StateDatabase::from_tree(&tree)
    }

    fn ids(db: &StateDatabase) -> Vec<String> {
        db.states()
            .map(|state| state.scoped_id.to_string())
            .collect()
    }

    #[test]
    fn test_flat_diagram() {
        let db = database("state A\nstate B\n[*] --> A\nA --> B : go").unwrap();
        assert_eq!(ids(&db), vec!["A", "B"]);
        assert_eq!(db.initials()[0].scope, ScopeRef::Root);
        assert_eq!(db.transitions()[0].trigger.as_deref(), Some("go"));
    }

    #[test]
    fn test_nested_states_get_scoped_ids() {
        let db = database(
            "[*] --> On\nstate On {\n  [*] --> Idle\n  Idle --> Busy\n  state Busy {\n    [*] --> Print\n    Print --> Scan\n  }\n}",
        )
        .unwrap();
        assert_eq!(
            ids(&db),
            vec!["On", "On/Idle", "On/Busy", "On/Busy/Print", "On/Busy/Scan"]
        );
        let busy = db.states().find(|s| s.scoped_id.as_str() == "On/Busy").unwrap();
        assert_eq!(busy.kind, StateKind::Composite);
        assert_eq!(busy.parent_id, Some(ScopedId::new("On")));
    }

    #[test]
    fn test_sibling_regions_keep_same_names_apart() {
        let db = database(
            "[*] --> Power\nstate Power {\n  [*] --> Off\n  Off --> On\n  --\n  [*] --> Off\n  Off --> Dim\n}",
        )
        .unwrap();
        let ids = ids(&db);
        assert!(ids.contains(&"Power/region1/Off".to_string()));
        assert!(ids.contains(&"Power/region2/Off".to_string()));
        assert_eq!(db.regions().len(), 2);
        let off = db
            .states()
            .find(|s| s.scoped_id.as_str() == "Power/region2/Off")
            .unwrap();
        assert_eq!(off.parent_id, Some(ScopedId::new("Power")));
        assert_eq!(off.region, Some(1));
    }

    #[test]
    fn test_outer_reference_finds_unique_nested_state() {
        let db = database(
            "[*] --> On\nstate On {\n  [*] --> Idle\n  Idle --> Busy\n  state Busy\n}\nSuspended --> Busy : resume",
        )
        .unwrap();
        let transition = &db.transitions()[1];
        assert_eq!(transition.source.as_str(), "Suspended");
        assert_eq!(transition.dest.as_str(), "On/Busy");
    }

    #[test]
    fn test_ambiguous_outer_reference_is_an_error() {
        let err = database(
            "state A {\n  state X\n}\nstate B {\n  state X\n}\n[*] --> A\nA --> X",
        )
        .unwrap_err();
        assert_eq!(err.line(), Some(8));
        assert!(err.to_string().contains("ambiguous reference"));
    }

    #[test]
    fn test_sibling_composites_do_not_share_local_names() {
        let db = database(
            "[*] --> P1\nstate P1 {\n  [*] --> Job\n  Job --> Wait\n}\nP1 --> P2\nstate P2 {\n  [*] --> Job\n  Job --> Wait\n}",
        )
        .unwrap();
        let ids = ids(&db);
        assert!(ids.contains(&"P1/Wait".to_string()));
        assert!(ids.contains(&"P2/Wait".to_string()));
        assert_eq!(db.transitions()[2].dest.as_str(), "P2/Wait");
    }

    #[test]
    fn test_earlier_reference_is_promoted_to_composite() {
        let db = database("[*] --> On\nOff --> On\nstate On {\n  [*] --> Idle\n  Idle --> Run\n}")
            .unwrap();
        let on = db.states().find(|s| s.scoped_id.as_str() == "On").unwrap();
        assert_eq!(on.kind, StateKind::Composite);
        assert_eq!(on.line, 1);
        assert_eq!(db.state_count(), 4);
    }

    #[test]
    fn test_flat_declaration_then_body_merges() {
        let db = database("state On\n[*] --> On\nstate On {\n  state Idle\n  [*] --> Idle\n}").unwrap();
        assert_eq!(ids(&db), vec!["On", "On/Idle"]);
    }

    #[test]
    fn test_two_bodies_for_one_composite_are_rejected() {
        let err = database("state On {\n  [*] --> A\n}\nstate On {\n  [*] --> B\n}").unwrap_err();
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_initial_target_is_declared_in_its_own_scope() {
        let db = database("state On {\n  state Idle\n}\n[*] --> Idle").unwrap();
        assert_eq!(ids(&db), vec!["On", "On/Idle", "Idle"]);
        assert_eq!(db.initials()[0].scope, ScopeRef::Root);
        assert_eq!(db.initials()[0].target.as_str(), "Idle");
    }

    #[test]
    fn test_outer_name_does_not_capture_nested_initial() {
        let db = database(
            "[*] --> Idle\nIdle --> On : go\nstate On {\n  [*] --> Idle\n  Idle --> Busy\n}",
        )
        .unwrap();
        assert_eq!(ids(&db), vec!["Idle", "On", "On/Idle", "On/Busy"]);
        assert_eq!(db.transitions()[0].source.as_str(), "Idle");
        assert_eq!(db.transitions()[1].source.as_str(), "On/Idle");
        assert_eq!(
            db.initials()[1].scope,
            ScopeRef::Composite(ScopedId::new("On"))
        );
        assert_eq!(db.initials()[1].target.as_str(), "On/Idle");
    }

    #[test]
    fn test_nested_initial_does_not_capture_later_root_initial() {
        let db = database(
            "state On {\n  [*] --> Idle\n  Idle --> Busy\n}\n[*] --> Idle\nIdle --> On : go",
        )
        .unwrap();
        let go = &db.transitions()[1];
        assert_eq!(go.source.as_str(), "Idle");
        assert_eq!(go.dest.as_str(), "On");
        let root = db
            .initials()
            .iter()
            .find(|initial| initial.scope == ScopeRef::Root)
            .unwrap();
        assert_eq!(root.target.as_str(), "Idle");
    }

    #[test]
    fn test_initial_counts_later_references() {
        let db = database("[*] --> A\nA --> B").unwrap();
        assert_eq!(db.initials()[0].target.as_str(), "A");
        assert_eq!(db.state_count(), 2);
    }

    #[test]
    fn test_note_on_unknown_state_is_an_error() {
        let err = database("A --> B\nnote right of Ghost : boo").unwrap_err();
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_descriptions_become_annotations() {
        let db = database("[*] --> Idle\nIdle : waiting\nIdle : entry / reset()").unwrap();
        let parts = db.into_parts();
        assert_eq!(parts.annotations.len(), 2);
        assert_eq!(parts.annotations[0].kind, AnnotationKind::Description);
        assert_eq!(parts.annotations[1].kind, AnnotationKind::Entry);
        assert_eq!(parts.annotations[1].text, "reset()");
    }

    #[test]
    fn test_final_markers_are_collected_once() {
        let db = database("[*] --> A\nA --> [*]\nA --> [*]").unwrap();
        assert_eq!(db.into_parts().finals, vec![ScopedId::new("A")]);
    }
}
