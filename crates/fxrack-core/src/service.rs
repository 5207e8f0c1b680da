use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::model::{FilterHandle, OwnerId};

/// Value of a named property on the engine-side service object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Int(i64),
    Text(String),
}

impl PropertyValue {
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(value) => Some(*value),
            PropertyValue::Text(_) => None,
        }
    }
}

/// The rendering engine's ordered filter chain for one media object.
///
/// Order is significant: it must match the stack's leaf traversal order at
/// every operation boundary.
pub trait FilterService {
    fn append_filter(&mut self, filter: FilterHandle) -> usize;
    fn remove_filter_at(&mut self, index: usize) -> Option<FilterHandle>;
    fn filter_at(&self, index: usize) -> Option<FilterHandle>;
    fn filter_count(&self) -> usize;
    fn get_property(&self, name: &str) -> Option<PropertyValue>;
    fn set_property(&mut self, name: &str, value: PropertyValue);
}

/// Metadata repository resolving effect asset ids to display names and
/// channel tagging.
pub trait EffectRepository {
    fn has_effect(&self, asset_id: &str) -> bool;
    fn display_name(&self, asset_id: &str) -> Option<String>;
    /// Audio-only effects never trigger a visual refresh of the owner.
    fn is_audio(&self, asset_id: &str) -> bool;
}

/// Back-channel to the owning media object.
pub trait ProjectContext {
    fn item_duration(&self, owner: OwnerId) -> i64;
    fn refresh_item(&mut self, owner: OwnerId);
}

pub type ServiceBinding = Rc<RefCell<dyn FilterService>>;
pub type WeakServiceBinding = Weak<RefCell<dyn FilterService>>;
pub type ContextBinding = Rc<RefCell<dyn ProjectContext>>;
pub type WeakContextBinding = Weak<RefCell<dyn ProjectContext>>;
