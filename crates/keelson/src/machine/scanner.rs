//! Line scanner: diagram text to a flat stream of structural events
//!
//! Handles the parts of the grammar that span lines or sit outside the
//! statement grammar: the `stateDiagram` header, `%%` comments, blank lines
//! and `note ... end note` blocks.

use super::statement::{Endpoint, NotePosition, Statement, StatementParser};
use crate::core::{Direction, MachineError, MachineResult};
use tracing::{debug, trace};

/// An item tagged with the source line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    /// 1-based line number
    pub line: usize,
    /// The trimmed source text of that line
    pub text: String,
}

impl<T> Spanned<T> {
    pub fn new(node: T, line: usize, text: impl Into<String>) -> Self {
        Self {
            node,
            line,
            text: text.into(),
        }
    }

    /// Error pointing at this item's line
    pub fn error(&self, message: impl Into<String>) -> MachineError {
        MachineError::parse_error(message, self.line, 1, self.text.clone())
    }
}

/// Structural event produced for one statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Direction(Direction),
    /// `state Name`
    Declare { name: String, label: Option<String> },
    /// `state Name {`
    Open { name: String, label: Option<String> },
    /// `}`
    Close,
    /// `--`
    Separator,
    /// `[*] --> Target`
    Initial { target: String },
    /// `Source --> [*]`
    Final { source: String },
    Transition {
        source: String,
        target: String,
        label: Option<String>,
    },
    /// `Name : text`
    Description { name: String, text: String },
    Note {
        name: String,
        position: NotePosition,
        text: String,
    },
}

/// An open `note ... end note` block
struct PendingNote {
    name: String,
    position: NotePosition,
    line: usize,
    text: String,
    body: Vec<String>,
}

/// Line scanner for state diagrams
pub struct Scanner {
    statements: StatementParser,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            statements: StatementParser::new(),
        }
    }

    fn is_header_line(line: &str) -> bool {
        line.to_lowercase().starts_with("statediagram")
    }

    fn is_comment(line: &str) -> bool {
        line.starts_with("%%")
    }

    /// Scan the whole diagram into events, in source order
    pub fn scan(&self, input: &str) -> MachineResult<Vec<Spanned<Event>>> {
        let mut events = Vec::new();
        let mut pending_note: Option<PendingNote> = None;

        for (index, raw) in input.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();

            if pending_note.is_some() {
                if trimmed.eq_ignore_ascii_case("end note") {
                    if let Some(note) = pending_note.take() {
                        trace!(line = note.line, state = %note.name, "Closed note block");
                        events.push(Spanned::new(
                            Event::Note {
                                name: note.name,
                                position: note.position,
                                text: note.body.join("\n"),
                            },
                            note.line,
                            note.text,
                        ));
                    }
                } else if let Some(note) = pending_note.as_mut() {
                    note.body.push(trimmed.to_string());
                }
                continue;
            }

            if trimmed.is_empty() || Self::is_comment(trimmed) || Self::is_header_line(trimmed) {
                continue;
            }

            let statement = self.statements.parse_line(trimmed, line)?;
            trace!(line, ?statement, "Parsed statement");

            let event = match statement {
                Statement::Direction(value) => {
                    let direction = Direction::parse(&value).ok_or_else(|| {
                        MachineError::parse_error(
                            format!("unknown direction `{}`", value),
                            line,
                            1,
                            trimmed,
                        )
                    })?;
                    Event::Direction(direction)
                }
                Statement::State {
                    id,
                    label,
                    opens_block: true,
                } => Event::Open { name: id, label },
                Statement::State { id, label, .. } => Event::Declare { name: id, label },
                Statement::CloseBlock => Event::Close,
                Statement::RegionSeparator => Event::Separator,
                Statement::Transition { from, to, label } => match (from, to) {
                    (Endpoint::Pseudo, Endpoint::Pseudo) => {
                        return Err(MachineError::parse_error(
                            "`[*] --> [*]` connects two pseudostates",
                            line,
                            1,
                            trimmed,
                        ));
                    }
                    (Endpoint::Pseudo, Endpoint::Named(target)) => {
                        if label.is_some() {
                            debug!(line, "Ignoring label on initial transition");
                        }
                        Event::Initial { target }
                    }
                    (Endpoint::Named(source), Endpoint::Pseudo) => Event::Final { source },
                    (Endpoint::Named(source), Endpoint::Named(target)) => Event::Transition {
                        source,
                        target,
                        label,
                    },
                },
                Statement::Description { id, text } => Event::Description { name: id, text },
                Statement::Note {
                    position,
                    id,
                    text: Some(text),
                } => Event::Note {
                    name: id,
                    position,
                    text,
                },
                Statement::Note {
                    position,
                    id,
                    text: None,
                } => {
                    pending_note = Some(PendingNote {
                        name: id,
                        position,
                        line,
                        text: trimmed.to_string(),
                        body: Vec::new(),
                    });
                    continue;
                }
            };

            events.push(Spanned::new(event, line, trimmed));
        }

        if let Some(note) = pending_note {
            return Err(MachineError::parse_error(
                format!("note on `{}` is missing `end note`", note.name),
                note.line,
                1,
                note.text,
            ));
        }

        debug!(event_count = events.len(), "Scanned diagram");
        Ok(events)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}
