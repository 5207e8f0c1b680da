use fxrack_core::{
    EffectStack, FilterHandle, FilterService, NodeId, ParamValue, UndoEntry, check_consistency,
    fixtures::demo_harness,
};

fn snapshot(stack: &EffectStack) -> Vec<(NodeId, String, FilterHandle)> {
    (0..stack.row_count())
        .filter_map(|row| stack.effect_at_row(row))
        .map(|effect| (effect.id, effect.asset_id.clone(), effect.filter))
        .collect()
}

#[test]
fn append_undo_redo_restores_identical_state() {
    let mut harness = demo_harness(1_000);
    harness.stack.append_effect("sepia").expect("append");
    let original = snapshot(&harness.stack);
    let original_filters = harness.service.borrow().filter_count();

    assert!(harness.undo.borrow_mut().undo(&mut harness.stack));
    assert_eq!(harness.stack.row_count(), 0);
    assert_eq!(harness.service.borrow().filter_count(), 0);
    assert!(check_consistency(&harness.stack));

    assert!(harness.undo.borrow_mut().redo(&mut harness.stack));
    assert_eq!(snapshot(&harness.stack), original);
    assert_eq!(harness.service.borrow().filter_count(), original_filters);
    assert!(check_consistency(&harness.stack));
}

#[test]
fn ids_are_never_reused_after_undo() {
    let mut harness = demo_harness(1_000);
    let first = harness.stack.append_effect("volume").expect("append");

    assert!(harness.undo.borrow_mut().undo(&mut harness.stack));
    let second = harness.stack.append_effect("sepia").expect("append");

    assert_ne!(first, second);
}

#[test]
fn interleaved_history_replays_in_reverse_order() {
    let mut harness = demo_harness(1_000);
    let a = harness.stack.append_effect("volume").expect("append");
    let b = harness.stack.append_effect("sepia").expect("append");
    harness.stack.remove_effect(a).expect("remove");
    harness
        .stack
        .set_parameter(b, "intensity", ParamValue::Double(0.3))
        .expect("parameter write");

    let final_state = snapshot(&harness.stack);

    // Walk the whole history back to the empty stack.
    for _ in 0..4 {
        assert!(harness.undo.borrow_mut().undo(&mut harness.stack));
        assert!(check_consistency(&harness.stack));
    }
    assert_eq!(harness.stack.row_count(), 0);
    assert!(!harness.undo.borrow_mut().undo(&mut harness.stack));

    // And forward again.
    for _ in 0..4 {
        assert!(harness.undo.borrow_mut().redo(&mut harness.stack));
        assert!(check_consistency(&harness.stack));
    }
    assert!(!harness.undo.borrow_mut().redo(&mut harness.stack));

    assert_eq!(snapshot(&harness.stack), final_state);
    let restored = harness.stack.effect_at_row(0).expect("row 0");
    assert_eq!(restored.id, b);
    assert_eq!(
        restored.parameters.get("intensity"),
        Some(&ParamValue::Double(0.3))
    );
}

#[test]
fn parameter_undo_restores_unset_state() {
    let mut harness = demo_harness(1_000);
    let id = harness.stack.append_effect("grain").expect("append");
    harness
        .stack
        .set_parameter(id, "amount", ParamValue::Int(40))
        .expect("parameter write");

    assert!(harness.undo.borrow_mut().undo(&mut harness.stack));
    let effect = harness.stack.effect_at_row(0).expect("row 0");
    assert!(effect.parameters.get("amount").is_none());

    assert!(harness.undo.borrow_mut().redo(&mut harness.stack));
    let effect = harness.stack.effect_at_row(0).expect("row 0");
    assert_eq!(effect.int_parameter("amount"), 40);
}

#[test]
fn undo_descriptions_use_repository_display_names() {
    let mut harness = demo_harness(1_000);
    harness.stack.append_effect("sepia").expect("append");
    harness.stack.append_effect("fadein").expect("append");

    let undo = harness.undo.borrow();
    let descriptions: Vec<&str> = undo
        .entries()
        .iter()
        .map(|entry| entry.description.as_str())
        .collect();
    assert_eq!(descriptions, vec!["Add effect Sepia", "Add effect Fade in"]);
}

#[test]
fn persisted_history_rebuilds_the_stack_on_replay() {
    let mut source = demo_harness(1_000);
    let id = source.stack.append_effect("sepia").expect("append");
    source
        .stack
        .set_parameter(id, "intensity", ParamValue::Double(0.5))
        .expect("parameter write");

    let serialized = serde_json::to_string(source.undo.borrow().entries())
        .expect("history should serialize");
    let entries: Vec<UndoEntry> =
        serde_json::from_str(&serialized).expect("history should deserialize");

    // A fresh stack reaches the same state by replaying the forward actions.
    let mut restored = demo_harness(1_000);
    for entry in &entries {
        restored.stack.apply(&entry.redo).expect("replay");
    }
    assert_eq!(restored.stack.row_count(), 1);
    let effect = restored.stack.effect_at_row(0).expect("row 0");
    assert_eq!(effect.asset_id, "sepia");
    assert_eq!(
        effect.parameters.get("intensity"),
        Some(&ParamValue::Double(0.5))
    );
    assert!(check_consistency(&restored.stack));
}

#[test]
fn stack_enable_toggle_is_undoable() {
    let mut harness = demo_harness(1_000);
    harness.stack.append_effect("volume").expect("append");

    harness.stack.set_enabled(false);
    assert!(harness.undo.borrow_mut().undo(&mut harness.stack));
    assert!(harness.stack.enabled());
    assert!(harness.stack.effect_at_row(0).expect("row 0").enabled);

    assert!(harness.undo.borrow_mut().redo(&mut harness.stack));
    assert!(!harness.stack.enabled());
}
