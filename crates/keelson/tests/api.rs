//! Integration tests for the public API

use keelson::prelude::*;
use keelson::{machine_config, parse, parse_with, render_dot};

const PRINTER: &str = "stateDiagram-v2
    [*] --> On
    state On {
        [*] --> Idle
        Idle --> Busy : start [paper > 0] / spin()
        Busy --> Idle : done
    }
    On --> Off : power
    Off --> [*]
";

#[test]
fn test_flat_declarations_and_labelled_transition() {
    let model = parse("state A\nstate B\n[*] --> A\nA --> B : go").unwrap();

    assert_eq!(model.states().len(), 2);
    assert!(model
        .states()
        .iter()
        .all(|state| state.kind == StateKind::Simple));
    assert_eq!(model.root_initial().as_str(), "A");

    assert_eq!(model.transitions().len(), 1);
    let go = &model.transitions()[0];
    assert_eq!(go.trigger.as_deref(), Some("go"));
    assert_eq!(go.source.as_str(), "A");
    assert_eq!(go.dest.as_str(), "B");
    assert_eq!(go.guard, None);
    assert_eq!(go.action, None);
}

#[test]
fn test_nested_scoped_ids_and_parents() {
    let model = parse(PRINTER).unwrap();

    let idle = model.state_by_path("On/Idle").unwrap();
    assert_eq!(idle.bare_name, "Idle");
    assert_eq!(idle.parent_id, Some(ScopedId::new("On")));
    assert_eq!(model.state_by_path("On").unwrap().kind, StateKind::Composite);
    assert_eq!(
        model.initial_of(&ScopedId::new("On")).map(|id| id.as_str()),
        Some("On/Idle")
    );
    assert_eq!(model.final_states(), &[ScopedId::new("Off")]);
}

#[test]
fn test_label_parts_reach_the_model() {
    let model = parse(PRINTER).unwrap();
    let start = &model.transitions()[0];
    assert_eq!(start.source.as_str(), "On/Idle");
    assert_eq!(start.dest.as_str(), "On/Busy");
    assert_eq!(start.trigger.as_deref(), Some("start"));
    assert_eq!(start.guard.as_deref(), Some("paper > 0"));
    assert_eq!(start.action.as_deref(), Some("spin()"));
    assert_eq!(start.label(), "start [paper > 0] / spin()");
}

#[test]
fn test_tree_mirrors_nesting() {
    let model = parse(PRINTER).unwrap();
    let names: Vec<&str> = model.root_states().iter().map(StateNode::name).collect();
    assert_eq!(names, vec!["On", "Off"]);

    match &model.root_states()[0] {
        StateNode::Composite {
            initial, children, ..
        } => {
            assert_eq!(initial.as_ref().map(|id| id.as_str()), Some("On/Idle"));
            let ids: Vec<&str> = children.iter().map(|child| child.id().as_str()).collect();
            assert_eq!(ids, vec!["On/Idle", "On/Busy"]);
        }
        other => panic!("Expected composite, got {:?}", other),
    }
}

#[test]
fn test_same_names_in_sibling_regions_stay_distinct() {
    let model = parse(
        "[*] --> Power\nstate Power {\n  [*] --> Off\n  Off --> Lit : on\n  --\n  [*] --> Off\n  Off --> Dim : dim\n}",
    )
    .unwrap();

    assert_eq!(model.states_named("Off").count(), 2);
    assert_eq!(model.regions().len(), 2);
    let second = &model.regions()[1];
    assert_eq!(second.name, "region2");
    assert_eq!(second.initial.as_str(), "Power/region2/Off");
    assert_eq!(model.transitions()[1].source.as_str(), "Power/region2/Off");
}

#[test]
fn test_outer_state_and_nested_initial_share_a_name() {
    let model = parse("[*] --> Idle\nIdle --> On : go\nstate On {\n  [*] --> Idle\n  Idle --> Busy\n}")
        .unwrap();

    assert_eq!(model.root_initial().as_str(), "Idle");
    assert_eq!(model.states_named("Idle").count(), 2);
    assert_eq!(
        model.initial_of(&ScopedId::new("On")).map(|id| id.as_str()),
        Some("On/Idle")
    );
    assert_eq!(model.transitions()[0].source.as_str(), "Idle");
    assert_eq!(model.transitions()[0].dest.as_str(), "On");
    assert_eq!(model.transitions()[1].source.as_str(), "On/Idle");
    assert_eq!(model.transitions()[1].dest.as_str(), "On/Busy");
    assert!(model.defaulted_initials().is_empty());
}

#[test]
fn test_composite_before_outer_state_of_the_same_name() {
    let model = parse("state On {\n  [*] --> Idle\n  Idle --> Busy\n}\n[*] --> Idle\nIdle --> On : go")
        .unwrap();

    assert_eq!(model.root_initial().as_str(), "Idle");
    assert_eq!(model.state_by_path("Idle").unwrap().parent_id, None);
    assert_eq!(
        model.initial_of(&ScopedId::new("On")).map(|id| id.as_str()),
        Some("On/Idle")
    );
    let go = &model.transitions()[1];
    assert_eq!(go.source.as_str(), "Idle");
    assert_eq!(go.dest.as_str(), "On");
}

#[test]
fn test_outer_state_and_region_initials_share_a_name() {
    let model = parse(
        "[*] --> Off\nOff --> Power\nstate Power {\n  [*] --> Off\n  Off --> Lit\n  --\n  [*] --> Off\n  Off --> Dim\n}",
    )
    .unwrap();

    assert_eq!(model.root_initial().as_str(), "Off");
    assert_eq!(model.states_named("Off").count(), 3);
    assert_eq!(model.regions()[0].initial.as_str(), "Power/region1/Off");
    assert_eq!(model.regions()[1].initial.as_str(), "Power/region2/Off");
    assert_eq!(model.transitions()[0].source.as_str(), "Off");
    assert_eq!(model.transitions()[1].source.as_str(), "Power/region1/Off");
}

#[test]
fn test_initial_target_needs_no_other_mention() {
    let model = parse("[*] --> Lonely").unwrap();
    assert_eq!(model.states().len(), 1);
    assert_eq!(model.root_initial().as_str(), "Lonely");
}

#[test]
fn test_default_initial_is_recorded() {
    let model = parse("[*] --> On\nstate On {\n  Idle --> Busy\n}").unwrap();
    assert_eq!(model.defaulted_initials(), &[ScopedId::new("On")]);
    assert_eq!(
        model.initial_of(&ScopedId::new("On")).map(|id| id.as_str()),
        Some("On/Idle")
    );

    let strict = parse_with(
        "[*] --> On\nstate On {\n  Idle --> Busy\n}",
        &ParseOptions::strict(),
    );
    assert!(matches!(strict, Err(MachineError::Validation { .. })));
}

#[test]
fn test_reparse_is_identical() {
    assert_eq!(parse(PRINTER).unwrap(), parse(PRINTER).unwrap());
}

#[test]
fn test_model_json() {
    let json = parse(PRINTER).unwrap().to_json().unwrap();
    assert!(json.contains("\"On/Idle\""));
    assert!(json.contains("\"root_initial\""));
}

#[test]
fn test_machine_config_export() {
    let config = machine_config(PRINTER).unwrap();
    assert_eq!(config.initial, "On");
    assert_eq!(config.final_states, vec!["Off".to_string()]);
    assert_eq!(config.transitions[0].before.as_deref(), Some("spin()"));
    assert_eq!(
        config.transitions[0].conditions,
        Some(vec!["paper > 0".to_string()])
    );
}

#[test]
fn test_render_dot_convenience() {
    let dot = render_dot(PRINTER).unwrap();
    assert!(dot.starts_with("digraph \"StateMachine\" {"));
    assert!(dot.contains("subgraph \"cluster_On\" {"));
    assert!(dot.contains("\"Off\" [label=\"Off\", peripheries=2];"));
}

#[test]
fn test_pipeline_with_options() {
    let pipeline = Pipeline::with_options(
        ParseOptions::new(),
        RenderConfig::new()
            .with_title("Printer")
            .with_direction(Direction::LeftRight),
    );
    let rendered = pipeline.process(PRINTER).unwrap();
    assert!(rendered.dot.starts_with("digraph \"Printer\" {"));
    assert!(rendered.dot.contains("rankdir=LR;"));
    assert_eq!(rendered.config.initial, "On");
}

#[test]
fn test_transition_table() {
    let model = parse(PRINTER).unwrap();
    let table = TransitionTable::from_model(&model);
    assert_eq!(table.len(), 3);
    assert_eq!(table.rows()[2].from, "On");
    assert_eq!(table.rows()[2].event.as_deref(), Some("power"));
}
