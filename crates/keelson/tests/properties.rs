//! Property tests: determinism, scope uniqueness and nesting round-trip

use keelson::machine::decompose;
use keelson::parse;
use keelson::ScopedId;
use proptest::prelude::*;
use std::collections::HashSet;

const CHILDREN: [&str; 4] = ["Idle", "Busy", "Paused", "Done"];

#[derive(Debug, Clone, Copy)]
struct Shape {
    composites: usize,
    children: usize,
    with_note: bool,
    /// Emit `state X` lines for every child
    declared: bool,
    /// A top-level state that reuses the first child name
    shadowed: bool,
}

impl Shape {
    fn state_count(&self) -> usize {
        self.composites * (self.children + 1)
            + if self.with_note { 2 } else { 0 }
            + usize::from(self.shadowed)
    }
}

/// Sibling composites that all reuse the same child names
fn diagram(shape: Shape) -> String {
    let mut lines = vec!["stateDiagram-v2".to_string()];
    if shape.shadowed {
        lines.push(format!("[*] --> {}", CHILDREN[0]));
        lines.push(format!("{} --> C0 : start", CHILDREN[0]));
    } else {
        lines.push("[*] --> C0".to_string());
    }
    for c in 0..shape.composites {
        lines.push(format!("state C{} {{", c));
        if shape.declared {
            for name in &CHILDREN[..shape.children] {
                lines.push(format!("  state {}", name));
            }
        }
        lines.push(format!("  [*] --> {}", CHILDREN[0]));
        for pair in CHILDREN[..shape.children].windows(2) {
            lines.push(format!("  {} --> {} : next", pair[0], pair[1]));
        }
        lines.push("}".to_string());
        if c + 1 < shape.composites {
            lines.push(format!("C{} --> C{} : advance", c, c + 1));
        }
    }
    if shape.shadowed {
        lines.push(format!("C{} --> {} : reset", shape.composites - 1, CHILDREN[0]));
    }
    if shape.with_note {
        lines.push("Away --> C0 : back".to_string());
        lines.push("C0 --> Away : leave".to_string());
        lines.push("note right of Away : back returns to C0 history state".to_string());
    }
    lines.join("\n")
}

prop_compose! {
    fn shapes()(
        composites in 1usize..5,
        children in 1usize..=4,
        with_note in any::<bool>(),
        declared in any::<bool>(),
        shadowed in any::<bool>()
    ) -> Shape {
        Shape { composites, children, with_note, declared, shadowed }
    }
}

proptest! {
    #[test]
    fn reparse_is_identical(shape in shapes()) {
        let text = diagram(shape);
        let first = parse(&text).unwrap();
        let second = parse(&text).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn scoped_ids_are_unique(shape in shapes()) {
        let model = parse(&diagram(shape)).unwrap();
        let ids: HashSet<&str> = model.states().iter().map(|s| s.scoped_id.as_str()).collect();
        prop_assert_eq!(ids.len(), model.states().len());

        prop_assert_eq!(model.states().len(), shape.state_count());
        prop_assert_eq!(
            model.states_named(CHILDREN[0]).count(),
            shape.composites + usize::from(shape.shadowed)
        );
        prop_assert_eq!(model.history_states().count(), usize::from(shape.with_note));
        prop_assert!(model.defaulted_initials().is_empty());
    }

    #[test]
    fn nested_initials_stay_in_their_composite(shape in shapes()) {
        let model = parse(&diagram(shape)).unwrap();
        for c in 0..shape.composites {
            let composite = format!("C{}", c);
            let expected = format!("{}/{}", composite, CHILDREN[0]);
            prop_assert_eq!(
                model.initial_of(&ScopedId::new(&composite)).map(|id| id.as_str()),
                Some(expected.as_str())
            );
        }
        let root = if shape.shadowed { CHILDREN[0] } else { "C0" };
        prop_assert_eq!(model.root_initial().as_str(), root);
    }

    #[test]
    fn tree_holds_every_state_once(shape in shapes()) {
        let model = parse(&diagram(shape)).unwrap();
        let mut nested: Vec<&str> = model.nested_ids().iter().map(|id| id.as_str()).collect();
        let mut flat: Vec<&str> = model.states().iter().map(|s| s.scoped_id.as_str()).collect();
        nested.sort_unstable();
        flat.sort_unstable();
        prop_assert_eq!(nested, flat);

        for state in model.states() {
            if let Some(parent) = &state.parent_id {
                prop_assert!(state.scoped_id.is_descendant_of(parent));
            }
        }
    }

    #[test]
    fn label_decomposition_is_total(label in "\\PC{0,40}") {
        let parts = decompose(Some(&label));
        prop_assert_eq!(&parts, &decompose(Some(&label)));
        for part in [&parts.trigger, &parts.guard, &parts.action].into_iter().flatten() {
            prop_assert!(!part.is_empty());
            prop_assert_eq!(part.trim(), part.as_str());
        }
    }
}
