//! Core error types for state machine reconstruction
//!
//! Every stage of the pipeline reports failures through [`MachineError`]. None of
//! these errors are recoverable inside the library: a failing stage aborts the
//! whole parse and no partial model is ever returned.

use thiserror::Error;

/// Errors raised while turning diagram text into a hierarchical model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    /// Unbalanced braces, unparseable lines, ambiguous or undeclared references
    #[error("Structural parse error at line {line}, column {column}: {message} (`{text}`)")]
    StructuralParse {
        message: String,
        line: usize,
        column: usize,
        text: String,
    },

    /// A note uses history language without naming exactly one composite
    #[error("Ambiguous history note on `{state}` at line {line}: {reason} (`{text}`)")]
    AmbiguousHistory {
        state: String,
        line: usize,
        text: String,
        reason: String,
    },

    /// The assembled machine violates a structural invariant
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The layout or drawing collaborator rejected the graph
    #[error("Render error: {message}")]
    Render { message: String },
}

impl MachineError {
    /// Create a new structural parse error
    pub fn parse_error(
        message: impl Into<String>,
        line: usize,
        column: usize,
        text: impl Into<String>,
    ) -> Self {
        Self::StructuralParse {
            message: message.into(),
            line,
            column,
            text: text.into(),
        }
    }

    /// Create a new ambiguous history error
    pub fn ambiguous_history(
        state: impl Into<String>,
        line: usize,
        text: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::AmbiguousHistory {
            state: state.into(),
            line,
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// Create a new validation error
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new render error
    pub fn render_error(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Source line the error points at, when it has one
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::StructuralParse { line, .. } | Self::AmbiguousHistory { line, .. } => {
                Some(*line)
            }
            Self::Validation { .. } | Self::Render { .. } => None,
        }
    }
}

/// Result alias used throughout the core
pub type MachineResult<T> = Result<T, MachineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error() {
        let error = MachineError::parse_error("unbalanced `}`", 5, 1, "}");
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Structural parse error"));
        assert!(error_msg.contains("unbalanced"));
        assert!(error_msg.contains("line 5"));
        assert!(error_msg.contains("column 1"));
        assert_eq!(error.line(), Some(5));
    }

    #[test]
    fn test_ambiguous_history_error() {
        let error = MachineError::ambiguous_history("X", 3, "a history state", "no composite");
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Ambiguous history note on `X`"));
        assert!(error_msg.contains("no composite"));
        assert_eq!(error.line(), Some(3));
    }

    #[test]
    fn test_validation_error() {
        let error = MachineError::validation_error("no root initial state");
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Validation error"));
        assert!(error_msg.contains("no root initial state"));
        assert_eq!(error.line(), None);
    }

    #[test]
    fn test_render_error() {
        let error = MachineError::render_error("dot exited with status 1");
        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Render error"));
        assert!(error_msg.contains("status 1"));
    }
}
