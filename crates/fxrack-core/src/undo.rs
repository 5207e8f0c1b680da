use std::cell::RefCell;
use std::rc::Weak;

use serde::{Deserialize, Serialize};

use crate::model::{EffectItem, NodeId, ParamValue};

/// One replayable mutation of an effect stack.
///
/// Actions capture stable ids and owned snapshots, never transient row
/// numbers (except `MoveItem`, whose row is the recorded destination by
/// definition), so replay stays correct after intervening edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackAction {
    /// Re-insert an owned snapshot at a fixed position. Replay reconstructs
    /// the identical node, id included.
    AddItem {
        snapshot: EffectItem,
        parent: NodeId,
        row: usize,
    },
    RemoveItem {
        id: NodeId,
    },
    MoveItem {
        id: NodeId,
        row: usize,
    },
    /// `value: None` restores the parameter to its unset state.
    SetParameter {
        id: NodeId,
        name: String,
        value: Option<ParamValue>,
    },
    SetEnabled {
        enabled: bool,
    },
}

/// A forward/inverse action pair. The forward action has already been applied
/// by the time the entry is pushed; pushing executes nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoEntry {
    pub description: String,
    pub undo: StackAction,
    pub redo: StackAction,
}

/// The host's undo/redo command stack. Entries from several models may be
/// interleaved on the same stack; replay happens through
/// [`EffectStack::apply`](crate::stack::EffectStack::apply).
pub trait UndoStack {
    fn push(&mut self, entry: UndoEntry);
}

pub type WeakUndoBinding = Weak<RefCell<dyn UndoStack>>;
