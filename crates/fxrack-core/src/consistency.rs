use std::collections::HashSet;

use tracing::{error, instrument};

use crate::model::{NodeId, StackNode};
use crate::stack::EffectStack;

/// Diagnostic pass validating that the stack's tree and the engine's filter
/// chain agree. Opt-in (tests, debug assertions), never part of a hot path:
/// it walks the full tree and queries the full engine state.
///
/// Fails, with an event naming the condition and index, when:
/// - the node index and the tree reachable from the root disagree,
/// - a leaf-tagged node has children,
/// - the engine's filter count differs from the collected leaf count,
/// - the filter identity at any position differs from the leaf's.
#[must_use]
#[instrument(skip(stack), fields(owner = %stack.owner()))]
pub fn check_consistency(stack: &EffectStack) -> bool {
    let mut leaves = Vec::new();
    let mut reachable = HashSet::new();

    // Explicit stack rather than recursion: memory stays bounded and
    // predictable on deep trees.
    let mut pending = vec![NodeId::ROOT];
    while let Some(current) = pending.pop() {
        if !reachable.insert(current) {
            error!(node = %current, "node reachable through two parents");
            return false;
        }
        let Some(node) = stack.node(current) else {
            error!(node = %current, "child link points at a node missing from the index");
            return false;
        };
        let children = stack.children_of(current);
        for child in children {
            if stack.parent_of(*child) != Some(current) {
                error!(node = %child, "parent back-reference disagrees with child list");
                return false;
            }
        }
        match node {
            StackNode::Effect(effect) => {
                if !children.is_empty() {
                    error!(node = %current, "effect node has children");
                    return false;
                }
                leaves.push(effect);
            }
            StackNode::Group(_) => {
                for child in children.iter().rev() {
                    pending.push(*child);
                }
            }
        }
    }

    let indexed: HashSet<NodeId> = stack.node_ids().collect();
    if indexed != reachable {
        error!(
            indexed = indexed.len(),
            reachable = reachable.len(),
            "node index does not match the tree"
        );
        return false;
    }

    let Some(service) = stack.service() else {
        error!("filter service unavailable");
        return false;
    };
    let service = service.borrow();
    if service.filter_count() != leaves.len() {
        error!(
            filters = service.filter_count(),
            leaves = leaves.len(),
            "filter count does not match leaf count"
        );
        return false;
    }

    for (index, leaf) in leaves.iter().enumerate() {
        if service.filter_at(index) != Some(leaf.filter) {
            error!(index, node = %leaf.id, "filter identity differs");
            return false;
        }
        if leaf.planted_index != Some(index) {
            error!(index, node = %leaf.id, planted = ?leaf.planted_index, "stale planted index");
            return false;
        }
    }

    true
}
