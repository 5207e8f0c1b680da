pub mod consistency;
pub mod diagnostics;
pub mod fixtures;
pub mod model;
pub mod notify;
pub mod service;
pub mod stack;
pub mod undo;

pub use consistency::check_consistency;
pub use diagnostics::{TelemetryGuard, init_tracing, init_tracing_with_options};
pub use model::{
    EffectItem, FADE_IN_AUDIO, FADE_IN_VIDEO, FADE_OUT_AUDIO, FADE_OUT_VIDEO, FilterHandle,
    GroupItem, NodeId, OwnerId, ParamValue, StackNode, fade_asset,
};
pub use notify::{ChangeRole, RowsChanged};
pub use service::{
    ContextBinding, EffectRepository, FilterService, ProjectContext, PropertyValue,
    ServiceBinding, WeakContextBinding, WeakServiceBinding,
};
pub use stack::{ACTIVE_EFFECT_PROPERTY, EffectStack, StackError};
pub use undo::{StackAction, UndoEntry, UndoStack, WeakUndoBinding};
