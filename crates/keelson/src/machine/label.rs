//! Transition label decomposition: `event [guard] / action`
//!
//! Extraction order is fixed: the action is cut off first, then the guard,
//! and whatever remains is the trigger. Cutting the action first keeps a
//! bracketed guard from being read as part of a trailing action expression.

use serde::Serialize;

/// Trigger, guard and action of a transition, each optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TransitionLabel {
    /// Event name; `None` means an automatic transition
    pub trigger: Option<String>,
    pub guard: Option<String>,
    pub action: Option<String>,
}

impl TransitionLabel {
    pub fn is_automatic(&self) -> bool {
        self.trigger.is_none()
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Byte offset of the last `/` outside `[]`, `()` and `{}`
fn last_unbracketed_slash(text: &str) -> Option<usize> {
    let mut depth: usize = 0;
    let mut found = None;
    for (index, c) in text.char_indices() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => found = Some(index),
            _ => {}
        }
    }
    found
}

/// Byte range of the first balanced `[...]`, brackets included
fn first_bracketed(text: &str) -> Option<(usize, usize)> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    for (offset, c) in text[start..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_braces(action: &str) -> &str {
    let trimmed = action.trim();
    trimmed
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(trimmed)
}

/// Split a raw transition label into trigger, guard and action
///
/// # Example
/// ```
/// use keelson::machine::decompose;
///
/// let label = decompose(Some("coin [credit >= 2] / {dispense()}"));
/// assert_eq!(label.trigger.as_deref(), Some("coin"));
/// assert_eq!(label.guard.as_deref(), Some("credit >= 2"));
/// assert_eq!(label.action.as_deref(), Some("dispense()"));
/// ```
pub fn decompose(label: Option<&str>) -> TransitionLabel {
    let Some(raw) = label else {
        return TransitionLabel::default();
    };

    let mut remaining = raw.to_string();

    let action = match last_unbracketed_slash(&remaining) {
        Some(index) => {
            let action = non_empty(strip_braces(&remaining[index + 1..]));
            remaining.truncate(index);
            action
        }
        None => None,
    };

    let guard = match first_bracketed(&remaining) {
        Some((start, end)) => {
            let guard = non_empty(&remaining[start + 1..end - 1]);
            remaining.replace_range(start..end, " ");
            guard
        }
        None => None,
    };

    TransitionLabel {
        trigger: non_empty(&remaining),
        guard,
        action,
    }
}
