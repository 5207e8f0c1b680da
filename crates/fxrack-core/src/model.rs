use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the media object (clip or track) an effect stack belongs to.
pub type OwnerId = Uuid;

pub const FADE_IN_AUDIO: &str = "fadein";
pub const FADE_OUT_AUDIO: &str = "fadeout";
pub const FADE_IN_VIDEO: &str = "fade_from_black";
pub const FADE_OUT_VIDEO: &str = "fade_to_black";

/// Stable integer identity of a tree node, unique within the owning stack
/// and never reused while the stack is alive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one filter instance inside the rendering engine's chain.
///
/// The stack only ever compares handles; what the engine attaches behind a
/// handle is its own business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterHandle(pub Uuid);

impl FilterHandle {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FilterHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    Int(i64),
    Double(f64),
    Text(String),
    Bool(bool),
}

impl ParamValue {
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(value) => Some(*value),
            ParamValue::Double(value) => Some(*value as i64),
            ParamValue::Text(_) | ParamValue::Bool(_) => None,
        }
    }
}

/// A leaf of the effect tree: one effect bound to one engine filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectItem {
    pub id: NodeId,
    pub asset_id: String,
    pub parameters: BTreeMap<String, ParamValue>,
    /// Position in the engine's filter list while planted, `None` while the
    /// item is temporarily detached (e.g. mid-reorder).
    pub planted_index: Option<usize>,
    pub is_audio: bool,
    pub enabled: bool,
    pub filter: FilterHandle,
}

impl EffectItem {
    #[must_use]
    pub fn new(id: NodeId, asset_id: impl Into<String>, is_audio: bool) -> Self {
        Self {
            id,
            asset_id: asset_id.into(),
            parameters: BTreeMap::new(),
            planted_index: None,
            is_audio,
            enabled: true,
            filter: FilterHandle::new(),
        }
    }

    pub fn set_parameters(&mut self, parameters: BTreeMap<String, ParamValue>) {
        self.parameters = parameters;
    }

    /// Integer read with a zero default, matching how time-range parameters
    /// (`in`/`out`) behave when they were never set.
    #[must_use]
    pub fn int_parameter(&self, name: &str) -> i64 {
        self.parameters
            .get(name)
            .and_then(ParamValue::as_int)
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_planted(&self) -> bool {
        self.planted_index.is_some()
    }
}

/// An internal node naming a collection of effects. Carries no parameters of
/// its own; its effective state is the aggregate of its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupItem {
    pub id: NodeId,
    pub name: String,
}

impl GroupItem {
    #[must_use]
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Closed union over the two node kinds. Call sites match exhaustively;
/// there is no downcast path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackNode {
    Effect(EffectItem),
    Group(GroupItem),
}

impl StackNode {
    #[must_use]
    pub fn id(&self) -> NodeId {
        match self {
            StackNode::Effect(effect) => effect.id,
            StackNode::Group(group) => group.id,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, StackNode::Effect(_))
    }

    #[must_use]
    pub fn as_effect(&self) -> Option<&EffectItem> {
        match self {
            StackNode::Effect(effect) => Some(effect),
            StackNode::Group(_) => None,
        }
    }

    pub fn as_effect_mut(&mut self) -> Option<&mut EffectItem> {
        match self {
            StackNode::Effect(effect) => Some(effect),
            StackNode::Group(_) => None,
        }
    }
}

/// Canonical fade asset id for one boundary/channel combination.
#[must_use]
pub fn fade_asset(from_start: bool, audio: bool) -> &'static str {
    match (from_start, audio) {
        (true, true) => FADE_IN_AUDIO,
        (true, false) => FADE_IN_VIDEO,
        (false, true) => FADE_OUT_AUDIO,
        (false, false) => FADE_OUT_VIDEO,
    }
}
