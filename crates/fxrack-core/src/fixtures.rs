use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crossbeam_channel::{Receiver, unbounded};
use uuid::Uuid;

use crate::model::{
    FADE_IN_AUDIO, FADE_IN_VIDEO, FADE_OUT_AUDIO, FADE_OUT_VIDEO, FilterHandle, OwnerId,
};
use crate::notify::RowsChanged;
use crate::service::{
    ContextBinding, EffectRepository, FilterService, ProjectContext, PropertyValue,
    ServiceBinding,
};
use crate::stack::EffectStack;
use crate::undo::{UndoEntry, UndoStack};

/// Filter chain backed by a plain vector, standing in for the engine.
#[derive(Debug, Default)]
pub struct MemoryFilterService {
    filters: Vec<FilterHandle>,
    properties: BTreeMap<String, PropertyValue>,
}

impl MemoryFilterService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FilterService for MemoryFilterService {
    fn append_filter(&mut self, filter: FilterHandle) -> usize {
        self.filters.push(filter);
        self.filters.len() - 1
    }

    fn remove_filter_at(&mut self, index: usize) -> Option<FilterHandle> {
        if index < self.filters.len() {
            Some(self.filters.remove(index))
        } else {
            None
        }
    }

    fn filter_at(&self, index: usize) -> Option<FilterHandle> {
        self.filters.get(index).copied()
    }

    fn filter_count(&self) -> usize {
        self.filters.len()
    }

    fn get_property(&self, name: &str) -> Option<PropertyValue> {
        self.properties.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) {
        self.properties.insert(name.to_string(), value);
    }
}

struct AssetEntry {
    name: String,
    audio: bool,
}

/// Repository over a fixed asset table.
#[derive(Default)]
pub struct StaticEffectRepository {
    entries: BTreeMap<String, AssetEntry>,
}

impl StaticEffectRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_asset(mut self, asset_id: &str, name: &str, audio: bool) -> Self {
        self.entries.insert(
            asset_id.to_string(),
            AssetEntry {
                name: name.to_string(),
                audio,
            },
        );
        self
    }
}

impl EffectRepository for StaticEffectRepository {
    fn has_effect(&self, asset_id: &str) -> bool {
        self.entries.contains_key(asset_id)
    }

    fn display_name(&self, asset_id: &str) -> Option<String> {
        self.entries.get(asset_id).map(|entry| entry.name.clone())
    }

    fn is_audio(&self, asset_id: &str) -> bool {
        self.entries
            .get(asset_id)
            .is_some_and(|entry| entry.audio)
    }
}

/// Fade assets plus a handful of demo effects with audio/video tagging.
#[must_use]
pub fn demo_repository() -> StaticEffectRepository {
    StaticEffectRepository::new()
        .with_asset(FADE_IN_AUDIO, "Fade in", true)
        .with_asset(FADE_OUT_AUDIO, "Fade out", true)
        .with_asset(FADE_IN_VIDEO, "Fade from black", false)
        .with_asset(FADE_OUT_VIDEO, "Fade to black", false)
        .with_asset("volume", "Volume", true)
        .with_asset("brightness", "Brightness", false)
        .with_asset("sepia", "Sepia", false)
        .with_asset("grain", "Grain", false)
}

/// Owning-object stand-in with a fixed total duration and a refresh log.
#[derive(Debug)]
pub struct FixedProjectContext {
    duration: i64,
    refresh_requests: Vec<OwnerId>,
}

impl FixedProjectContext {
    #[must_use]
    pub fn new(duration: i64) -> Self {
        Self {
            duration,
            refresh_requests: Vec::new(),
        }
    }

    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.refresh_requests.len()
    }
}

impl ProjectContext for FixedProjectContext {
    fn item_duration(&self, _owner: OwnerId) -> i64 {
        self.duration
    }

    fn refresh_item(&mut self, owner: OwnerId) {
        self.refresh_requests.push(owner);
    }
}

/// Linear undo history with a replay cursor. Pushing while undone entries
/// remain discards the redo tail, like any editor history.
#[derive(Default)]
pub struct MemoryUndoStack {
    entries: Vec<UndoEntry>,
    cursor: usize,
}

impl MemoryUndoStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[UndoEntry] {
        &self.entries
    }

    /// Replay the inverse of the entry under the cursor against `stack`.
    pub fn undo(&mut self, stack: &mut EffectStack) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        stack.apply(&self.entries[self.cursor].undo).is_ok()
    }

    /// Replay the forward action of the next undone entry against `stack`.
    pub fn redo(&mut self, stack: &mut EffectStack) -> bool {
        if self.cursor >= self.entries.len() {
            return false;
        }
        let applied = stack.apply(&self.entries[self.cursor].redo).is_ok();
        self.cursor += 1;
        applied
    }
}

impl UndoStack for MemoryUndoStack {
    fn push(&mut self, entry: UndoEntry) {
        self.entries.truncate(self.cursor);
        self.entries.push(entry);
        self.cursor = self.entries.len();
    }
}

/// A fully wired stack over in-memory collaborators. The harness keeps the
/// strong bindings alive; the stack itself only holds weak ones.
pub struct StackHarness {
    pub stack: EffectStack,
    pub service: Rc<RefCell<MemoryFilterService>>,
    pub context: Rc<RefCell<FixedProjectContext>>,
    pub undo: Rc<RefCell<MemoryUndoStack>>,
    pub notifications: Receiver<RowsChanged>,
}

#[must_use]
pub fn demo_harness(duration: i64) -> StackHarness {
    let service = Rc::new(RefCell::new(MemoryFilterService::new()));
    let context = Rc::new(RefCell::new(FixedProjectContext::new(duration)));
    let undo = Rc::new(RefCell::new(MemoryUndoStack::new()));

    let service_binding: ServiceBinding = service.clone();
    let context_binding: ContextBinding = context.clone();
    let undo_binding: Rc<RefCell<dyn UndoStack>> = undo.clone();

    let mut stack = EffectStack::new(
        Uuid::new_v4(),
        Rc::downgrade(&service_binding),
        Rc::downgrade(&context_binding),
        Rc::downgrade(&undo_binding),
        Rc::new(demo_repository()),
    );
    let (notify_tx, notifications) = unbounded();
    stack.set_notifier(notify_tx);

    StackHarness {
        stack,
        service,
        context,
        undo,
        notifications,
    }
}
