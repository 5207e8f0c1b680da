use fxrack_core::{
    ChangeRole, FADE_IN_AUDIO, FADE_IN_VIDEO, FADE_OUT_VIDEO, check_consistency,
    fixtures::demo_harness,
};

#[test]
fn start_fade_is_created_once_and_mutated_afterwards() {
    let mut harness = demo_harness(1_000);

    assert!(harness.stack.set_fade_length(50, true, true, false));
    assert_eq!(harness.stack.row_count(), 1);
    let fade = harness.stack.effect_at_row(0).expect("row 0").clone();
    assert_eq!(fade.asset_id, FADE_IN_AUDIO);
    assert_eq!(fade.int_parameter("out"), 50);

    // A second call adjusts the same leaf instead of stacking another fade.
    assert!(harness.stack.set_fade_length(80, true, true, false));
    assert_eq!(harness.stack.row_count(), 1);
    let fade_after = harness.stack.effect_at_row(0).expect("row 0");
    assert_eq!(fade_after.id, fade.id);
    assert_eq!(fade_after.int_parameter("out"), 80);
    assert!(check_consistency(&harness.stack));
}

#[test]
fn end_fade_spans_the_tail_of_the_owner() {
    let mut harness = demo_harness(1_000);

    assert!(harness.stack.set_fade_length(120, false, false, true));

    let fade = harness.stack.effect_at_row(0).expect("row 0");
    assert_eq!(fade.asset_id, FADE_OUT_VIDEO);
    assert_eq!(fade.int_parameter("in"), 880);
    assert_eq!(fade.int_parameter("out"), 1_000);
    assert_eq!(harness.stack.get_fade_position(false), 120);
}

#[test]
fn fade_position_reads_zero_when_no_fade_exists() {
    let harness = demo_harness(1_000);
    assert_eq!(harness.stack.get_fade_position(true), 0);
    assert_eq!(harness.stack.get_fade_position(false), 0);
}

#[test]
fn start_fade_position_reads_back_out_bound() {
    let mut harness = demo_harness(1_000);
    assert!(harness.stack.set_fade_length(64, true, false, true));

    let fade = harness.stack.effect_at_row(0).expect("row 0");
    assert_eq!(fade.asset_id, FADE_IN_VIDEO);
    assert_eq!(harness.stack.get_fade_position(true), 64);
}

#[test]
fn dual_channel_fade_notifies_minimal_covering_range() {
    let mut harness = demo_harness(1_000);
    assert!(harness.stack.set_fade_length(60, true, true, true));

    assert_eq!(harness.stack.row_count(), 2);
    assert_eq!(harness.stack.row_of_asset(FADE_IN_AUDIO), Some(0));
    assert_eq!(harness.stack.row_of_asset(FADE_IN_VIDEO), Some(1));

    let parameter_events: Vec<_> = harness
        .notifications
        .try_iter()
        .filter(|event| event.roles.contains(&ChangeRole::Parameters))
        .collect();
    assert_eq!(parameter_events.len(), 1);
    assert_eq!(
        (parameter_events[0].start, parameter_events[0].end),
        (0, 1)
    );
    assert!(check_consistency(&harness.stack));
}

#[test]
fn fade_requests_ignore_unrequested_channels() {
    let mut harness = demo_harness(1_000);
    assert!(!harness.stack.set_fade_length(40, true, false, false));
    assert_eq!(harness.stack.row_count(), 0);
}
