use proptest::prelude::*;

use fxrack_core::{EffectStack, NodeId, ParamValue, check_consistency, fixtures::demo_harness};

const ASSETS: [&str; 4] = ["volume", "brightness", "sepia", "grain"];

#[derive(Debug, Clone)]
enum Edit {
    Append(usize),
    Remove(usize),
    Copy(usize),
    Move(usize, usize),
    SetParameter(usize, i64),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..ASSETS.len()).prop_map(Edit::Append),
        (0usize..12).prop_map(Edit::Remove),
        (0usize..12).prop_map(Edit::Copy),
        ((0usize..12), (0usize..12)).prop_map(|(row, dest)| Edit::Move(row, dest)),
        ((0usize..12), -500i64..500).prop_map(|(row, value)| Edit::SetParameter(row, value)),
    ]
}

fn target_at(stack: &EffectStack, row: usize) -> Option<NodeId> {
    if stack.row_count() == 0 {
        return None;
    }
    stack.row_id(row % stack.row_count())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn random_edit_sequences_keep_tree_and_engine_in_lockstep(
        edits in prop::collection::vec(edit_strategy(), 0..24)
    ) {
        let mut harness = demo_harness(1_000);

        for edit in edits {
            match edit {
                Edit::Append(asset) => {
                    let _ = harness.stack.append_effect(ASSETS[asset]);
                }
                Edit::Remove(row) => {
                    if let Some(id) = target_at(&harness.stack, row) {
                        let _ = harness.stack.remove_effect(id);
                    }
                }
                Edit::Copy(row) => {
                    if let Some(id) = target_at(&harness.stack, row) {
                        let _ = harness.stack.copy_effect(id);
                    }
                }
                Edit::Move(row, dest) => {
                    if let Some(id) = target_at(&harness.stack, row) {
                        let _ = harness.stack.move_effect(dest, id);
                    }
                }
                Edit::SetParameter(row, value) => {
                    if let Some(id) = target_at(&harness.stack, row) {
                        let _ = harness
                            .stack
                            .set_parameter(id, "level", ParamValue::Int(value));
                    }
                }
            }
            prop_assert!(check_consistency(&harness.stack));
        }

        // Replaying the full history in both directions must preserve the
        // lockstep invariant at every step.
        while harness.undo.borrow_mut().undo(&mut harness.stack) {
            prop_assert!(check_consistency(&harness.stack));
        }
        prop_assert_eq!(harness.stack.row_count(), 0);

        while harness.undo.borrow_mut().redo(&mut harness.stack) {
            prop_assert!(check_consistency(&harness.stack));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn fade_lengths_round_trip_through_the_stack(
        duration in 1i64..900,
        from_start in any::<bool>(),
    ) {
        let mut harness = demo_harness(1_000);
        prop_assert!(harness.stack.set_fade_length(duration, from_start, true, false));
        prop_assert_eq!(harness.stack.get_fade_position(from_start), duration);
        prop_assert!(check_consistency(&harness.stack));
    }
}
