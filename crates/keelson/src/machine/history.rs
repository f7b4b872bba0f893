//! History annotation resolver
//!
//! A composite only gains a history pseudostate when a note says so in so
//! many words: "resume returns to Busy history state". Anything looser that
//! still mentions history is rejected. The resolver works per named
//! composite and never looks at the shape of sibling composites.

use super::database::Note;
use super::model::{AnnotationKind, State, StateAnnotation, Transition};
use crate::core::{MachineError, MachineResult, ScopedId, StateKind};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Bare name of every history pseudostate
pub const HISTORY_NAME: &str = "H";

fn history_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:returns?|transitions?|goes|go)\s+(?:back\s+)?to\s+(?:the\s+)?([A-Za-z_][\w/]*)\s+history(?:\s+state)?\b",
        )
        .expect("history phrase pattern must compile")
    })
}

fn history_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bhistory\b").expect("history word pattern must compile"))
}

/// Byte ranges of every history phrase in `text`
fn phrase_spans(text: &str) -> Vec<Range<usize>> {
    history_phrase().find_iter(text).map(|m| m.range()).collect()
}

fn overlaps(spans: &[Range<usize>], range: &Range<usize>) -> bool {
    spans
        .iter()
        .any(|span| span.start < range.end && range.start < span.end)
}

/// States and transitions after history placement, plus note decorations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
    pub annotations: Vec<StateAnnotation>,
}

/// Turns explicit history notes into pseudostates and retargeted transitions
#[derive(Debug, Default)]
pub struct HistoryResolver;

impl HistoryResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        mut states: Vec<State>,
        mut transitions: Vec<Transition>,
        notes: &[Note],
    ) -> MachineResult<Resolved> {
        let mut annotations = Vec::new();

        for note in notes {
            let named: Vec<String> = history_phrase()
                .captures_iter(&note.text)
                .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()))
                .collect();
            let spans = phrase_spans(&note.text);
            let stray = history_word()
                .find_iter(&note.text)
                .any(|word| !overlaps(&spans, &word.range()));

            if stray {
                return Err(MachineError::ambiguous_history(
                    note.state.as_str(),
                    note.line,
                    &note.source,
                    "mentions history without naming a composite, e.g. \
                     \"returns to <Composite> history state\"",
                ));
            }

            for name in &named {
                let composite = find_composite(&states, note, name)?;
                let history = ensure_history(&mut states, &composite, note)?;
                let rewritten = retarget(&mut transitions, note, &composite, &history)?;
                info!(
                    composite = %composite,
                    history = %history,
                    rewritten,
                    "Attached history pseudostate"
                );
            }

            annotations.extend(note_annotations(note, &spans));
        }

        debug!(
            history_states = states
                .iter()
                .filter(|state| state.kind == StateKind::HistoryPseudostate)
                .count(),
            "Resolved history notes"
        );
        Ok(Resolved {
            states,
            transitions,
            annotations,
        })
    }
}

fn ambiguous(note: &Note, reason: String) -> MachineError {
    MachineError::ambiguous_history(note.state.as_str(), note.line, &note.source, reason)
}

/// The single composite a note names, by bare name or full path
fn find_composite(states: &[State], note: &Note, name: &str) -> MachineResult<ScopedId> {
    let matches_name = |state: &&State| {
        if name.contains('/') {
            state.scoped_id.as_str() == name
        } else {
            state.bare_name == name
        }
    };
    let named: Vec<&State> = states
        .iter()
        .filter(matches_name)
        .filter(|state| state.kind != StateKind::HistoryPseudostate)
        .collect();
    if named.is_empty() {
        return Err(ambiguous(note, format!("no state named `{}`", name)));
    }

    let composites: Vec<&State> = named
        .iter()
        .copied()
        .filter(|state| state.kind.has_children())
        .collect();

    let chosen = match composites.as_slice() {
        [] => {
            return Err(ambiguous(
                note,
                format!("`{}` is not a composite state", named[0].scoped_id),
            ));
        }
        [single] => *single,
        many => {
            // Prefer the composites whose enclosing scope also encloses the note
            let visible: Vec<&State> = many
                .iter()
                .copied()
                .filter(|state| match &state.parent_id {
                    None => true,
                    Some(parent) => note.state == *parent || note.state.is_descendant_of(parent),
                })
                .collect();
            match visible.as_slice() {
                [single] => *single,
                _ => {
                    let ids: Vec<String> =
                        many.iter().map(|state| format!("`{}`", state.scoped_id)).collect();
                    return Err(ambiguous(
                        note,
                        format!("`{}` could mean {}", name, ids.join(" or ")),
                    ));
                }
            }
        }
    };

    if chosen.kind == StateKind::Concurrent {
        return Err(ambiguous(
            note,
            format!(
                "`{}` is a concurrent state; history is only supported on composites",
                chosen.scoped_id
            ),
        ));
    }
    if note.state.is_descendant_of(&chosen.scoped_id) {
        return Err(ambiguous(
            note,
            format!(
                "`{}` lies inside `{}` and cannot re-enter its history",
                note.state, chosen.scoped_id
            ),
        ));
    }
    Ok(chosen.scoped_id.clone())
}

/// Create `<composite>/H` unless it already exists
fn ensure_history(
    states: &mut Vec<State>,
    composite: &ScopedId,
    note: &Note,
) -> MachineResult<ScopedId> {
    let history = ScopedId::child_of(Some(composite), HISTORY_NAME);
    let existing = states
        .iter()
        .find(|state| state.scoped_id == history)
        .map(|state| state.kind);
    match existing {
        Some(StateKind::HistoryPseudostate) => {
            debug!(history = %history, "History pseudostate already present");
        }
        Some(kind) => {
            return Err(ambiguous(
                note,
                format!(
                    "`{}` is already a {} state, not a history pseudostate",
                    history, kind
                ),
            ));
        }
        None => states.push(State::new(
            HISTORY_NAME,
            history.clone(),
            Some(composite.clone()),
            StateKind::HistoryPseudostate,
            note.line,
        )),
    }
    Ok(history)
}

/// Point the note's motivating transitions at the history pseudostate
fn retarget(
    transitions: &mut [Transition],
    note: &Note,
    composite: &ScopedId,
    history: &ScopedId,
) -> MachineResult<usize> {
    let on_composite = note.state == *composite;
    let motivated = |transition: &Transition| {
        let into = transition.dest == *composite || transition.dest == *history;
        let from = if on_composite {
            !transition.source.is_descendant_of(composite)
        } else {
            transition.source == note.state
        };
        into && from
    };

    let mut motivating = 0;
    let mut rewritten = 0;
    for transition in transitions.iter_mut().filter(|t| motivated(&**t)) {
        motivating += 1;
        if transition.dest == *composite {
            transition.dest = history.clone();
            rewritten += 1;
        }
    }

    if motivating == 0 {
        let from = if on_composite {
            "outside".to_string()
        } else {
            format!("`{}`", note.state)
        };
        return Err(ambiguous(
            note,
            format!("no transition from {} into `{}` to re-target", from, composite),
        ));
    }
    Ok(rewritten)
}

/// Entry, exit and do lines become typed annotations; the rest is kept as
/// one free-text note. Lines touched by a history phrase are consumed by the
/// resolver, even when the phrase spans several lines.
fn note_annotations(note: &Note, spans: &[Range<usize>]) -> Vec<StateAnnotation> {
    let mut annotations = Vec::new();
    let mut free_text = Vec::new();

    let mut offset = 0;
    for raw in note.text.split('\n') {
        let range = offset..offset + raw.len();
        offset = range.end + 1;
        let line = raw.trim();
        if line.is_empty() || overlaps(spans, &range) {
            continue;
        }
        if let Some((kind, text)) = AnnotationKind::classify(line) {
            annotations.push(StateAnnotation {
                state: note.state.clone(),
                kind,
                text,
                line: note.line,
            });
        } else {
            free_text.push(line);
        }
    }

    if !free_text.is_empty() {
        annotations.push(StateAnnotation {
            state: note.state.clone(),
            kind: AnnotationKind::Note,
            text: free_text.join("\n"),
            line: note.line,
        });
    }
    annotations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::database::StateDatabase;
    use crate::machine::scanner::Scanner;
    use crate::machine::scope::ScopeTracker;

    const BUSY: &str = "stateDiagram-v2
[*] --> On
state On {
  [*] --> Idle
  Idle --> Busy : start
  Busy --> Suspended : pause
  state Busy {
    [*] --> Print
    Print --> Scan
  }
}";

    fn resolve(input: &str) -> MachineResult<Resolved> {
        let events = Scanner::new().scan(input)?;
        let tree = ScopeTracker::new().build(events)?;
        let flat = StateDatabase::from_tree(&tree)?.into_parts();
        HistoryResolver::new().resolve(flat.states, flat.transitions, &flat.notes)
    }

    fn history_ids(resolved: &Resolved) -> Vec<&str> {
        resolved
            .states
            .iter()
            .filter(|state| state.kind == StateKind::HistoryPseudostate)
            .map(|state| state.scoped_id.as_str())
            .collect()
    }

    #[test]
    fn test_explicit_note_attaches_history() {
        let input = format!(
            "{}\nSuspended --> Busy : resume\nnote right of Suspended : resume returns to Busy history state",
            BUSY
        );
        let resolved = resolve(&input).unwrap();
        assert_eq!(history_ids(&resolved), vec!["On/Busy/H"]);
        let resume = resolved
            .transitions
            .iter()
            .find(|t| t.trigger.as_deref() == Some("resume"))
            .unwrap();
        assert_eq!(resume.dest.as_str(), "On/Busy/H");
        let start = resolved
            .transitions
            .iter()
            .find(|t| t.trigger.as_deref() == Some("start"))
            .unwrap();
        assert_eq!(start.dest.as_str(), "On/Busy");
    }

    #[test]
    fn test_duplicate_note_is_idempotent() {
        let input = format!(
            "{}\nSuspended --> Busy : resume\nnote right of Suspended : resume returns to Busy history state\nnote left of Suspended : goes back to the Busy history state",
            BUSY
        );
        let resolved = resolve(&input).unwrap();
        assert_eq!(history_ids(&resolved), vec!["On/Busy/H"]);
    }

    #[test]
    fn test_bare_history_word_is_rejected() {
        let input = format!(
            "{}\nSuspended --> Busy : resume\nnote right of Suspended : this is a history state",
            BUSY
        );
        let err = resolve(&input).unwrap_err();
        assert!(matches!(err, MachineError::AmbiguousHistory { .. }));
    }

    #[test]
    fn test_unknown_or_simple_target_is_rejected() {
        let input = format!(
            "{}\nSuspended --> Busy : resume\nnote right of Suspended : returns to Idle history state",
            BUSY
        );
        let err = resolve(&input).unwrap_err();
        assert!(err.to_string().contains("not a composite"));

        let input = format!(
            "{}\nnote right of Suspended : returns to Nowhere history state",
            BUSY
        );
        assert!(resolve(&input).is_err());
    }

    #[test]
    fn test_note_without_motivating_transition_is_rejected() {
        let input = format!(
            "{}\nnote right of Suspended : returns to Busy history state",
            BUSY
        );
        let err = resolve(&input).unwrap_err();
        assert!(err.to_string().contains("no transition"));
    }

    #[test]
    fn test_substate_cannot_target_own_history() {
        let input = format!(
            "{}\nnote right of Print : returns to Busy history state",
            BUSY
        );
        let err = resolve(&input).unwrap_err();
        assert!(err.to_string().contains("inside"));
    }

    #[test]
    fn test_notes_become_annotations() {
        let input = format!(
            "{}\nnote right of Idle\n  entry / warm up\n  waits for a job\nend note",
            BUSY
        );
        let resolved = resolve(&input).unwrap();
        let kinds: Vec<AnnotationKind> =
            resolved.annotations.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AnnotationKind::Entry, AnnotationKind::Note]);
        assert_eq!(resolved.annotations[0].state.as_str(), "On/Idle");
        assert!(history_ids(&resolved).is_empty());
    }

    #[test]
    fn test_composite_named_history() {
        let input = "[*] --> A\nA --> History : go\nstate History {\n  [*] --> X\n  X --> Y\n}\nnote right of A : returns to History history state";
        let resolved = resolve(input).unwrap();
        assert_eq!(history_ids(&resolved), vec!["History/H"]);
        assert_eq!(resolved.transitions[0].dest.as_str(), "History/H");

        let loose = format!("{}, unlike the old history", input);
        let err = resolve(&loose).unwrap_err();
        assert!(matches!(err, MachineError::AmbiguousHistory { .. }));
    }

    #[test]
    fn test_phrase_across_note_lines_is_consumed() {
        let input = format!(
            "{}\nSuspended --> Busy : resume\nnote right of Suspended\n  resume returns to Busy\n  history state\n  waits for the user\nend note",
            BUSY
        );
        let resolved = resolve(&input).unwrap();
        assert_eq!(history_ids(&resolved), vec!["On/Busy/H"]);
        assert_eq!(resolved.annotations.len(), 1);
        assert_eq!(resolved.annotations[0].kind, AnnotationKind::Note);
        assert_eq!(resolved.annotations[0].text, "waits for the user");
    }
}
