//! Shared chumsky combinators for line-oriented statement grammars
//!
//! Statements are parsed one line at a time, so none of these consume
//! newlines.

use chumsky::prelude::*;

/// Error/extra type used by every statement parser
pub type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Optional spaces and tabs.
pub fn inline_whitespace<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    one_of(" \t").repeated().ignored()
}

/// At least one space or tab.
pub fn inline_whitespace_required<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone
{
    one_of(" \t").repeated().at_least(1).ignored()
}

/// A state identifier: letters, digits and underscores.
pub fn identifier<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .collect::<String>()
}

/// A double-quoted string without escapes.
pub fn quoted_string<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    just('"')
        .ignore_then(none_of('"').repeated().collect::<String>())
        .then_ignore(just('"'))
}

/// `: text` up to the end of the line, trimmed.
pub fn colon_text<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    just(':')
        .ignore_then(any().repeated().collect::<String>())
        .map(|s| s.trim().to_string())
}

/// A keyword that must be followed by inline whitespace.
pub fn keyword<'src>(word: &'static str) -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    just(word).then(inline_whitespace_required()).ignored()
}
