//! Every failure aborts the parse with a typed, actionable error

use keelson::{parse, MachineError};

#[test]
fn test_region_without_initial_names_the_region() {
    let input = "[*] --> Power
state Power {
  Off --> On
  --
  Off --> Dim
}";
    let err = parse(input).unwrap_err();
    assert!(matches!(err, MachineError::Validation { .. }));
    let message = err.to_string();
    assert!(message.contains("region1"));
    assert!(message.contains("Power"));
    assert!(message.contains("no initial state"));
}

#[test]
fn test_second_region_without_initial() {
    let input = "[*] --> Power
state Power {
  [*] --> Off
  Off --> On
  --
  Off --> Dim
}";
    let err = parse(input).unwrap_err();
    assert!(err.to_string().contains("region2"));
}

#[test]
fn test_missing_root_initial() {
    let err = parse("Idle --> Busy").unwrap_err();
    assert!(matches!(err, MachineError::Validation { .. }));
    assert!(err.to_string().contains("no top-level initial state"));
}

#[test]
fn test_multiple_root_initials() {
    let err = parse("[*] --> A\n[*] --> B\nA --> B").unwrap_err();
    assert!(matches!(err, MachineError::Validation { .. }));
    assert!(err.to_string().contains("2 top-level initial states"));
}

#[test]
fn test_unclosed_brace_reports_opening_line() {
    let err = parse("[*] --> On\nstate On {\n  [*] --> Idle\n  Idle --> Busy\n").unwrap_err();
    assert!(matches!(err, MachineError::StructuralParse { .. }));
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_stray_close_brace() {
    let err = parse("[*] --> A\nA --> B\n}").unwrap_err();
    assert!(matches!(err, MachineError::StructuralParse { .. }));
    assert_eq!(err.line(), Some(3));
}

#[test]
fn test_unparseable_line_is_not_skipped() {
    let err = parse("[*] --> A\nA -> B").unwrap_err();
    match err {
        MachineError::StructuralParse { line, text, .. } => {
            assert_eq!(line, 2);
            assert_eq!(text, "A -> B");
        }
        other => panic!("Expected structural parse error, got {:?}", other),
    }
}

#[test]
fn test_fork_pseudostate_is_rejected() {
    let err = parse("[*] --> A\nstate Split <<fork>>\nA --> Split").unwrap_err();
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_ambiguous_reference() {
    let input = "[*] --> A
state A {
  [*] --> X
  X --> Y
}
state B {
  [*] --> X
  X --> Y
}
A --> B
B --> X";
    let err = parse(input).unwrap_err();
    assert_eq!(err.line(), Some(11));
    assert!(err.to_string().contains("ambiguous reference `X`"));
}

#[test]
fn test_separator_outside_composite() {
    let err = parse("[*] --> A\n--\nA --> B").unwrap_err();
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_note_on_unknown_state() {
    let err = parse("[*] --> A\nA --> B\nnote right of Ghost : hello").unwrap_err();
    assert!(matches!(err, MachineError::StructuralParse { .. }));
    assert_eq!(err.line(), Some(3));
}

#[test]
fn test_no_partial_model_on_late_failure() {
    // Everything up to the last line is valid
    let result = parse("[*] --> A\nA --> B\nB --> C\nnote right of C : returns home, no history");
    assert!(matches!(result, Err(MachineError::AmbiguousHistory { .. })));
}
