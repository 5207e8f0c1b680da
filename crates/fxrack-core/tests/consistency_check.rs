use fxrack_core::{
    FilterService, StackError, check_consistency, fixtures::demo_harness,
};

#[test]
fn empty_stack_is_consistent() {
    let harness = demo_harness(1_000);
    assert!(check_consistency(&harness.stack));
}

#[test]
fn out_of_band_service_mutation_is_detected() {
    let mut harness = demo_harness(1_000);
    harness.stack.append_effect("volume").expect("append");
    harness.stack.append_effect("sepia").expect("append");
    assert!(check_consistency(&harness.stack));

    // Someone reaches into the engine behind the model's back.
    harness.service.borrow_mut().remove_filter_at(0);

    assert!(!check_consistency(&harness.stack));
}

#[test]
fn swapped_filter_identity_is_detected() {
    let mut harness = demo_harness(1_000);
    harness.stack.append_effect("volume").expect("append");

    let stray = fxrack_core::FilterHandle::new();
    {
        let mut service = harness.service.borrow_mut();
        service.remove_filter_at(0);
        service.append_filter(stray);
    }

    assert!(!check_consistency(&harness.stack));
}

#[test]
fn group_removal_is_refused_atomically() {
    let mut harness = demo_harness(1_000);
    let volume = harness.stack.append_effect("volume").expect("append");
    harness.stack.append_effect("sepia").expect("append");
    let group = harness.stack.create_group(volume).expect("group");
    assert!(check_consistency(&harness.stack));

    let filters_before = harness.service.borrow().filter_count();
    let undo_before = harness.undo.borrow().len();
    let rows_before = harness.stack.row_count();

    let error = harness
        .stack
        .remove_effect(group)
        .expect_err("group removal must be refused");
    assert!(matches!(error, StackError::InvalidOperation(_)));

    assert_eq!(harness.stack.row_count(), rows_before);
    assert_eq!(harness.service.borrow().filter_count(), filters_before);
    assert_eq!(harness.undo.borrow().len(), undo_before);
    assert!(check_consistency(&harness.stack));
}

#[test]
fn copy_and_move_refuse_groups_too() {
    let mut harness = demo_harness(1_000);
    let volume = harness.stack.append_effect("volume").expect("append");
    let group = harness.stack.create_group(volume).expect("group");

    assert!(matches!(
        harness.stack.copy_effect(group),
        Err(StackError::InvalidOperation(_))
    ));
    assert!(matches!(
        harness.stack.move_effect(0, group),
        Err(StackError::InvalidOperation(_))
    ));
    assert!(check_consistency(&harness.stack));
}

#[test]
fn unknown_nodes_are_rejected() {
    let mut harness = demo_harness(1_000);
    let ghost = fxrack_core::NodeId(999);

    assert!(matches!(
        harness.stack.remove_effect(ghost),
        Err(StackError::UnknownNode(_))
    ));
    assert!(matches!(
        harness.stack.copy_effect(ghost),
        Err(StackError::UnknownNode(_))
    ));
}
