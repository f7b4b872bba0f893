//! Single-line statement grammar for `stateDiagram-v2`
//!
//! Each non-blank, non-comment line of a diagram is exactly one statement.
//! Multi-line note bodies are collected by the scanner, not here.

use crate::core::chumsky_utils::{
    colon_text, identifier, inline_whitespace, inline_whitespace_required, keyword,
    quoted_string, Extra,
};
use crate::core::MachineError;
use chumsky::prelude::*;

/// One side of a `-->` arrow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `[*]`
    Pseudo,
    Named(String),
}

/// Which side of the state a note is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotePosition {
    Left,
    Right,
}

/// A parsed diagram line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `direction LR`
    Direction(String),
    /// `state Name`, `state "Label" as Name`, optionally followed by `{`
    State {
        id: String,
        label: Option<String>,
        opens_block: bool,
    },
    /// `}`
    CloseBlock,
    /// `--`
    RegionSeparator,
    /// `A --> B`, `[*] --> A`, `A --> [*]`, with an optional `: label`
    Transition {
        from: Endpoint,
        to: Endpoint,
        label: Option<String>,
    },
    /// `Name : text`
    Description { id: String, text: String },
    /// `note right of Name : text`, or the opening line of a note block when
    /// `text` is `None`
    Note {
        position: NotePosition,
        id: String,
        text: Option<String>,
    },
}

/// Statement parser for state diagram lines
pub struct StatementParser;

impl StatementParser {
    pub fn new() -> Self {
        Self
    }

    fn endpoint<'src>() -> impl Parser<'src, &'src str, Endpoint, Extra<'src>> + Clone {
        just("[*]")
            .to(Endpoint::Pseudo)
            .or(identifier().map(Endpoint::Named))
    }

    fn direction<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
        keyword("direction")
            .ignore_then(identifier())
            .then_ignore(inline_whitespace())
            .then_ignore(end())
            .map(Statement::Direction)
    }

    /// `state Name [{]` or `state "Label" as Name [{]`
    fn state_decl<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
        let labelled = quoted_string()
            .then_ignore(inline_whitespace_required())
            .then_ignore(keyword("as"))
            .then(identifier())
            .map(|(label, id)| (id, Some(label)));
        let plain = identifier().map(|id| (id, None));

        keyword("state")
            .ignore_then(labelled.or(plain))
            .then_ignore(inline_whitespace())
            .then(just('{').or_not())
            .then_ignore(inline_whitespace())
            .then_ignore(end())
            .map(|((id, label), brace)| Statement::State {
                id,
                label,
                opens_block: brace.is_some(),
            })
    }

    fn close_block<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
        just('}')
            .then_ignore(inline_whitespace())
            .then_ignore(end())
            .to(Statement::CloseBlock)
    }

    fn region_separator<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
        just("--")
            .then_ignore(inline_whitespace())
            .then_ignore(end())
            .to(Statement::RegionSeparator)
    }

    fn transition<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
        Self::endpoint()
            .then_ignore(inline_whitespace())
            .then_ignore(just("-->"))
            .then_ignore(inline_whitespace())
            .then(Self::endpoint())
            .then_ignore(inline_whitespace())
            .then(colon_text().or_not())
            .then_ignore(end())
            .map(|((from, to), label)| Statement::Transition {
                from,
                to,
                label: label.filter(|s| !s.is_empty()),
            })
    }

    fn note<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
        let position = just("right")
            .to(NotePosition::Right)
            .or(just("left").to(NotePosition::Left));

        keyword("note")
            .ignore_then(position)
            .then_ignore(inline_whitespace_required())
            .then_ignore(keyword("of"))
            .then(identifier())
            .then_ignore(inline_whitespace())
            .then(colon_text().or_not())
            .then_ignore(end())
            .map(|((position, id), text)| Statement::Note { position, id, text })
    }

    fn description<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
        identifier()
            .then_ignore(inline_whitespace())
            .then(colon_text())
            .then_ignore(end())
            .map(|(id, text)| Statement::Description { id, text })
    }

    fn statement<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
        choice((
            Self::state_decl(),
            Self::note(),
            Self::direction(),
            Self::close_block(),
            Self::region_separator(),
            Self::transition(),
            Self::description(),
        ))
    }

    /// Parse one trimmed line; `line` is the 1-based source line for errors
    pub fn parse_line(&self, text: &str, line: usize) -> Result<Statement, MachineError> {
        Self::statement()
            .parse(text)
            .into_result()
            .map_err(|errors| {
                let column = errors.first().map(|e| e.span().start + 1).unwrap_or(1);
                let reason = errors
                    .first()
                    .map(|e| format!("unsupported statement ({})", e))
                    .unwrap_or_else(|| "unsupported statement".to_string());
                MachineError::parse_error(reason, line, column, text)
            })
    }
}

impl Default for StatementParser {
    fn default() -> Self {
        Self::new()
    }
}
