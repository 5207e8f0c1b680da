use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crossbeam_channel::Sender;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::model::{
    EffectItem, GroupItem, NodeId, OwnerId, ParamValue, StackNode, fade_asset,
};
use crate::notify::{ChangeRole, RowsChanged};
use crate::service::{
    PropertyValue, EffectRepository, ServiceBinding, WeakContextBinding, WeakServiceBinding,
};
use crate::undo::{StackAction, UndoEntry, WeakUndoBinding};

/// Property key under which the active-effect marker is persisted on the
/// engine-side service object, so it outlives the stack itself.
pub const ACTIVE_EFFECT_PROPERTY: &str = "fxrack:active_effect";

#[derive(Debug, Error)]
pub enum StackError {
    #[error("operation only valid on a leaf effect, node {0} is a group or has children")]
    InvalidOperation(NodeId),
    #[error("unknown effect asset: {0}")]
    AssetConstruction(String),
    #[error("node {0} is not part of this stack")]
    UnknownNode(NodeId),
    #[error("filter service binding is gone")]
    UnboundService,
}

struct NodeEntry {
    node: StackNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The ordered, undoable effect stack of one media object.
///
/// Owns the effect tree and is the single component talking to the filter
/// service, the undo stack and the notification channel. Service, owner and
/// undo bindings are weak: a dead binding degrades every touching operation
/// to a no-op or sentinel result.
pub struct EffectStack {
    owner: OwnerId,
    nodes: HashMap<NodeId, NodeEntry>,
    next_id: u64,
    enabled: bool,
    service: WeakServiceBinding,
    context: WeakContextBinding,
    undo: WeakUndoBinding,
    repository: Rc<dyn EffectRepository>,
    notifier: Option<Sender<RowsChanged>>,
}

impl EffectStack {
    #[must_use]
    pub fn new(
        owner: OwnerId,
        service: WeakServiceBinding,
        context: WeakContextBinding,
        undo: WeakUndoBinding,
        repository: Rc<dyn EffectRepository>,
    ) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            NodeId::ROOT,
            NodeEntry {
                node: StackNode::Group(GroupItem::new(NodeId::ROOT, "root")),
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            owner,
            nodes,
            next_id: NodeId::ROOT.0 + 1,
            enabled: true,
            service,
            context,
            undo,
            repository,
            notifier: None,
        }
    }

    pub fn set_notifier(&mut self, notifier: Sender<RowsChanged>) {
        self.notifier = Some(notifier);
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Number of direct children of the root (the view's row count).
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.children_of(NodeId::ROOT).len()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&StackNode> {
        self.nodes.get(&id).map(|entry| &entry.node)
    }

    #[must_use]
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map_or(&[], |entry| &entry.children)
    }

    #[must_use]
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|entry| entry.parent)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    #[must_use]
    pub fn row_id(&self, row: usize) -> Option<NodeId> {
        self.children_of(NodeId::ROOT).get(row).copied()
    }

    #[must_use]
    pub fn effect_at_row(&self, row: usize) -> Option<&EffectItem> {
        self.row_id(row)
            .and_then(|id| self.node(id))
            .and_then(StackNode::as_effect)
    }

    /// Row of the first direct root child carrying `asset_id`. Children of
    /// groups are not searched.
    #[must_use]
    pub fn row_of_asset(&self, asset_id: &str) -> Option<usize> {
        self.children_of(NodeId::ROOT)
            .iter()
            .position(|id| {
                self.node(*id)
                    .and_then(StackNode::as_effect)
                    .is_some_and(|effect| effect.asset_id == asset_id)
            })
    }

    /// Depth-first leaf order: the order the engine's filter chain must
    /// mirror at every operation boundary.
    #[must_use]
    pub fn leaf_order(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut pending = vec![NodeId::ROOT];
        while let Some(current) = pending.pop() {
            if let Some(entry) = self.nodes.get(&current) {
                if entry.node.is_leaf() {
                    leaves.push(current);
                    continue;
                }
                for child in entry.children.iter().rev() {
                    pending.push(*child);
                }
            }
        }
        leaves
    }

    #[must_use]
    pub fn service(&self) -> Option<ServiceBinding> {
        self.service.upgrade()
    }

    /// Strong service handle, or an explicit error for hosts that need to
    /// distinguish a gone binding from a quiet no-op.
    pub fn require_service(&self) -> Result<ServiceBinding, StackError> {
        self.service.upgrade().ok_or(StackError::UnboundService)
    }

    /// Root row of `id`'s outermost ancestor (the row a view associates with
    /// the node, even when it sits inside a group).
    #[must_use]
    pub fn root_row_of(&self, id: NodeId) -> Option<usize> {
        let mut current = id;
        loop {
            match self.parent_of(current) {
                Some(NodeId::ROOT) => {
                    return self
                        .children_of(NodeId::ROOT)
                        .iter()
                        .position(|child| *child == current);
                }
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    // ------------------------------------------------------------------
    // Structural operations
    // ------------------------------------------------------------------

    /// Append a new effect as last child of the root and plant it at the end
    /// of the engine's filter chain.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub fn append_effect(&mut self, asset_id: &str) -> Result<NodeId, StackError> {
        let id = self.append_leaf(asset_id, BTreeMap::new(), "Add effect")?;
        info!(%id, "effect appended");
        Ok(id)
    }

    /// Clone an existing leaf's asset and full parameter set into a new
    /// effect appended at the root.
    #[instrument(skip(self), fields(owner = %self.owner, source = %source_id))]
    pub fn copy_effect(&mut self, source_id: NodeId) -> Result<NodeId, StackError> {
        let (asset_id, parameters) = {
            let entry = self
                .nodes
                .get(&source_id)
                .ok_or(StackError::UnknownNode(source_id))?;
            let effect = leaf_of(entry).ok_or(StackError::InvalidOperation(source_id))?;
            (effect.asset_id.clone(), effect.parameters.clone())
        };
        let id = self.append_leaf(&asset_id, parameters, "Copy effect")?;
        info!(%id, "effect copied");
        Ok(id)
    }

    /// Unplant, detach and record the inverse. Leaf-only: removing a group
    /// is refused before any mutation happens.
    #[instrument(skip(self), fields(owner = %self.owner, id = %id))]
    pub fn remove_effect(&mut self, id: NodeId) -> Result<(), StackError> {
        let (snapshot, parent, row, root_row, last_row) = {
            let entry = self.nodes.get(&id).ok_or(StackError::UnknownNode(id))?;
            let effect = leaf_of(entry).ok_or(StackError::InvalidOperation(id))?;
            let mut snapshot = effect.clone();
            snapshot.planted_index = None;
            let parent = entry.parent.unwrap_or(NodeId::ROOT);
            let row = self
                .children_of(parent)
                .iter()
                .position(|child| *child == id)
                .ok_or(StackError::UnknownNode(id))?;
            let root_row = self.root_row_of(id).unwrap_or(0);
            let last_row = self.row_count().saturating_sub(1);
            (snapshot, parent, row, root_row, last_row)
        };

        let name = self.display_name(&snapshot.asset_id);
        self.detach_node(id);
        self.notify(root_row, last_row.max(root_row), &[ChangeRole::Structure]);
        self.push_undo(
            StackAction::AddItem {
                snapshot,
                parent,
                row,
            },
            StackAction::RemoveItem { id },
            format!("Delete effect {name}"),
        );
        info!("effect removed");
        Ok(())
    }

    /// Remove the first direct root child carrying `asset_id`, if any.
    pub fn remove_effect_by_asset(&mut self, asset_id: &str) -> bool {
        let Some(id) = self.row_of_asset(asset_id).and_then(|row| self.row_id(row)) else {
            return false;
        };
        self.remove_effect(id).is_ok()
    }

    /// Move a leaf to `dest_row` among the root's children, rebuilding the
    /// filter chain contiguously from the destination onward.
    #[instrument(skip(self), fields(owner = %self.owner, id = %id, dest_row))]
    pub fn move_effect(&mut self, dest_row: usize, id: NodeId) -> Result<(), StackError> {
        let Some((old_row, new_row)) = self.move_internal(dest_row, id)? else {
            debug!("move noop");
            return Ok(());
        };
        let name = self
            .node(id)
            .and_then(StackNode::as_effect)
            .map(|effect| self.display_name(&effect.asset_id))
            .unwrap_or_default();
        self.push_undo(
            StackAction::MoveItem { id, row: old_row },
            StackAction::MoveItem { id, row: new_row },
            format!("Move effect {name}"),
        );
        info!(old_row, new_row, "effect moved");
        Ok(())
    }

    /// Clone every leaf of `source` into this stack. Groups are skipped and
    /// each clone is its own undo unit; a bad asset aborts only that clone.
    #[instrument(skip(self, source), fields(owner = %self.owner, source_owner = %source.owner()))]
    pub fn import_effects(&mut self, source: &EffectStack) -> usize {
        let mut imported = 0;
        for row in 0..source.row_count() {
            let Some(id) = source.row_id(row) else {
                continue;
            };
            match source.node(id) {
                Some(StackNode::Effect(effect)) => {
                    let asset_id = effect.asset_id.clone();
                    let parameters = effect.parameters.clone();
                    match self.append_leaf(&asset_id, parameters, "Import effect") {
                        Ok(_) => imported += 1,
                        Err(error) => {
                            warn!(%error, asset = %asset_id, "skipping effect during import");
                        }
                    }
                }
                Some(StackNode::Group(_)) => debug!(row, "skipping group during import"),
                None => {}
            }
        }
        info!(imported, "effects imported");
        imported
    }

    /// Append a new group at the root and re-parent `child_id` under it.
    /// Baseline extension seam: group-aware move/plant semantics live behind
    /// this boundary, not in the leaf operations.
    #[instrument(skip(self), fields(owner = %self.owner, child = %child_id))]
    pub fn create_group(&mut self, child_id: NodeId) -> Result<NodeId, StackError> {
        {
            let entry = self
                .nodes
                .get(&child_id)
                .ok_or(StackError::UnknownNode(child_id))?;
            if leaf_of(entry).is_none() || entry.parent != Some(NodeId::ROOT) {
                return Err(StackError::InvalidOperation(child_id));
            }
        }
        let old_row = self.root_row_of(child_id).unwrap_or(0);
        let group_id = self.allocate_id();
        let row = self.row_count();
        self.attach_node(
            StackNode::Group(GroupItem::new(group_id, "group")),
            NodeId::ROOT,
            row,
        );
        if let Some((node, _, _)) = self.detach_node(child_id) {
            self.attach_node(node, group_id, 0);
        }
        let group_row = self.row_count().saturating_sub(1);
        self.notify(
            old_row.min(group_row),
            old_row.max(group_row),
            &[ChangeRole::Structure],
        );
        info!(%group_id, "group created");
        Ok(group_id)
    }

    /// Undoable parameter write on a leaf effect.
    #[instrument(skip(self, value), fields(owner = %self.owner, id = %id, name))]
    pub fn set_parameter(
        &mut self,
        id: NodeId,
        name: &str,
        value: ParamValue,
    ) -> Result<(), StackError> {
        let previous = {
            let entry = self.nodes.get_mut(&id).ok_or(StackError::UnknownNode(id))?;
            let effect = entry
                .node
                .as_effect_mut()
                .ok_or(StackError::InvalidOperation(id))?;
            effect.parameters.insert(name.to_string(), value.clone())
        };
        let row = self.root_row_of(id).unwrap_or(0);
        self.notify(row, row, &[ChangeRole::Parameters]);
        self.push_undo(
            StackAction::SetParameter {
                id,
                name: name.to_string(),
                value: previous,
            },
            StackAction::SetParameter {
                id,
                name: name.to_string(),
                value: Some(value),
            },
            format!("Edit parameter {name}"),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fade convenience logic
    // ------------------------------------------------------------------

    /// Locate or create the fade effects for the requested channels and set
    /// their time bounds. Start fades span `[0, duration]`; end fades span
    /// the last `duration` units of the owner's total duration.
    #[instrument(skip(self), fields(owner = %self.owner, duration, from_start))]
    pub fn set_fade_length(
        &mut self,
        duration: i64,
        from_start: bool,
        audio: bool,
        video: bool,
    ) -> bool {
        if !audio && !video {
            return false;
        }

        let out = if from_start {
            duration
        } else {
            let Some(context) = self.context.upgrade() else {
                warn!("owner context gone, cannot resolve total duration");
                return false;
            };
            context.borrow().item_duration(self.owner)
        };

        let mut audio_row = audio
            .then(|| self.row_of_asset(fade_asset(from_start, true)))
            .flatten();
        if audio && audio_row.is_none() && self.append_effect(fade_asset(from_start, true)).is_ok()
        {
            audio_row = Some(self.row_count() - 1);
        }
        let mut video_row = video
            .then(|| self.row_of_asset(fade_asset(from_start, false)))
            .flatten();
        if video && video_row.is_none() && self.append_effect(fade_asset(from_start, false)).is_ok()
        {
            video_row = Some(self.row_count() - 1);
        }

        let mut touched: Vec<usize> = Vec::new();
        for row in [audio_row, video_row].into_iter().flatten() {
            let Some(id) = self.row_id(row) else {
                continue;
            };
            let Some(entry) = self.nodes.get_mut(&id) else {
                continue;
            };
            let Some(effect) = entry.node.as_effect_mut() else {
                continue;
            };
            if from_start {
                effect
                    .parameters
                    .insert("out".to_string(), ParamValue::Int(duration));
            } else {
                effect
                    .parameters
                    .insert("out".to_string(), ParamValue::Int(out));
                effect
                    .parameters
                    .insert("in".to_string(), ParamValue::Int(out - duration));
            }
            touched.push(row);
        }

        if let (Some(first), Some(last)) = (touched.iter().min(), touched.iter().max()) {
            self.notify(*first, *last, &[ChangeRole::Parameters]);
        }
        info!(rows = touched.len(), "fade length set");
        true
    }

    /// Current fade span, read back from whichever matching fade effect
    /// exists; `0` when there is none.
    #[must_use]
    pub fn get_fade_position(&self, from_start: bool) -> i64 {
        let row = self
            .row_of_asset(fade_asset(from_start, true))
            .or_else(|| self.row_of_asset(fade_asset(from_start, false)));
        let Some(effect) = row.and_then(|row| self.effect_at_row(row)) else {
            return 0;
        };
        if from_start {
            effect.int_parameter("out")
        } else {
            effect.int_parameter("out") - effect.int_parameter("in")
        }
    }

    // ------------------------------------------------------------------
    // Global enable, active-effect marker, rebinding
    // ------------------------------------------------------------------

    /// Set the stack-wide bypass flag and propagate it to every direct
    /// child. Group propagation to grandchildren is the group's own
    /// responsibility.
    #[instrument(skip(self), fields(owner = %self.owner, enabled))]
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            debug!("enable noop");
            return;
        }
        let previous = self.enabled;
        self.set_enabled_internal(enabled);
        self.push_undo(
            StackAction::SetEnabled { enabled: previous },
            StackAction::SetEnabled { enabled },
            if enabled {
                "Enable effect stack".to_string()
            } else {
                "Disable effect stack".to_string()
            },
        );
        info!("stack enable flag changed");
    }

    /// Persist the selected-effect marker on the bound service object so it
    /// survives this model's lifetime.
    pub fn set_active_effect(&mut self, index: Option<usize>) {
        let Some(service) = self.service.upgrade() else {
            debug!("service gone, active effect not persisted");
            return;
        };
        let value = index.map_or(-1, |index| index as i64);
        service
            .borrow_mut()
            .set_property(ACTIVE_EFFECT_PROPERTY, PropertyValue::Int(value));
    }

    /// `None` when no binding is available or no marker was ever set.
    #[must_use]
    pub fn active_effect(&self) -> Option<usize> {
        let service = self.service.upgrade()?;
        let value = service
            .borrow()
            .get_property(ACTIVE_EFFECT_PROPERTY)?
            .as_int()?;
        usize::try_from(value).ok()
    }

    /// Rebind to a freshly created service and replant every leaf, in
    /// traversal order, into the new filter chain.
    #[instrument(skip(self, service), fields(owner = %self.owner))]
    pub fn reset_service(&mut self, service: WeakServiceBinding) {
        self.service = service;
        for entry in self.nodes.values_mut() {
            if let Some(effect) = entry.node.as_effect_mut() {
                effect.planted_index = None;
            }
        }
        for id in self.leaf_order() {
            self.plant(id);
        }
        info!("service rebound, effects replanted");
    }

    // ------------------------------------------------------------------
    // Undo replay
    // ------------------------------------------------------------------

    /// Replay a recorded action. Replays run through the same registration
    /// hooks and notifications as first-time operations but record no
    /// further undo entries, and are idempotent.
    pub fn apply(&mut self, action: &StackAction) -> Result<(), StackError> {
        match action {
            StackAction::AddItem {
                snapshot,
                parent,
                row,
            } => {
                if self.nodes.contains_key(&snapshot.id) {
                    return Ok(());
                }
                if !self.nodes.contains_key(parent) {
                    return Err(StackError::UnknownNode(*parent));
                }
                let mut item = snapshot.clone();
                item.planted_index = None;
                let id = item.id;
                self.attach_node(StackNode::Effect(item), *parent, *row);
                let root_row = self.root_row_of(id).unwrap_or(0);
                self.notify(root_row, root_row, &[ChangeRole::Structure]);
                Ok(())
            }
            StackAction::RemoveItem { id } => {
                if !self.nodes.contains_key(id) {
                    return Ok(());
                }
                let root_row = self.root_row_of(*id).unwrap_or(0);
                let last_row = self.row_count().saturating_sub(1);
                self.detach_node(*id);
                self.notify(root_row, last_row.max(root_row), &[ChangeRole::Structure]);
                Ok(())
            }
            StackAction::MoveItem { id, row } => {
                self.move_internal(*row, *id)?;
                Ok(())
            }
            StackAction::SetParameter { id, name, value } => {
                {
                    let entry =
                        self.nodes.get_mut(id).ok_or(StackError::UnknownNode(*id))?;
                    let effect = entry
                        .node
                        .as_effect_mut()
                        .ok_or(StackError::InvalidOperation(*id))?;
                    match value {
                        Some(value) => {
                            effect.parameters.insert(name.clone(), value.clone());
                        }
                        None => {
                            effect.parameters.remove(name);
                        }
                    }
                }
                let row = self.root_row_of(*id).unwrap_or(0);
                self.notify(row, row, &[ChangeRole::Parameters]);
                Ok(())
            }
            StackAction::SetEnabled { enabled } => {
                self.set_enabled_internal(*enabled);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn display_name(&self, asset_id: &str) -> String {
        self.repository
            .display_name(asset_id)
            .unwrap_or_else(|| asset_id.to_string())
    }

    fn append_leaf(
        &mut self,
        asset_id: &str,
        parameters: BTreeMap<String, ParamValue>,
        verb: &str,
    ) -> Result<NodeId, StackError> {
        if !self.repository.has_effect(asset_id) {
            return Err(StackError::AssetConstruction(asset_id.to_string()));
        }
        let id = self.allocate_id();
        let mut item = EffectItem::new(id, asset_id, self.repository.is_audio(asset_id));
        item.set_parameters(parameters);
        let row = self.row_count();
        let snapshot = item.clone();
        self.attach_node(StackNode::Effect(item), NodeId::ROOT, row);
        self.notify(row, row, &[ChangeRole::Structure]);
        let name = self.display_name(asset_id);
        self.push_undo(
            StackAction::RemoveItem { id },
            StackAction::AddItem {
                snapshot,
                parent: NodeId::ROOT,
                row,
            },
            format!("{verb} {name}"),
        );
        Ok(id)
    }

    /// Splice a leaf to `dest_row` and rebuild the filter chain from the
    /// destination onward. Returns `None` when the destination equals the
    /// current row (no observable change).
    fn move_internal(
        &mut self,
        dest_row: usize,
        id: NodeId,
    ) -> Result<Option<(usize, usize)>, StackError> {
        {
            let entry = self.nodes.get(&id).ok_or(StackError::UnknownNode(id))?;
            if leaf_of(entry).is_none() || entry.parent != Some(NodeId::ROOT) {
                return Err(StackError::InvalidOperation(id));
            }
        }
        let old_row = self
            .root_row_of(id)
            .ok_or(StackError::UnknownNode(id))?;
        let dest_row = dest_row.min(self.row_count().saturating_sub(1));
        if dest_row == old_row {
            return Ok(None);
        }

        if let Some(root) = self.nodes.get_mut(&NodeId::ROOT) {
            root.children.remove(old_row);
            root.children.insert(dest_row, id);
        }

        // Rebuild the chain contiguously: detaching from the destination
        // onward shifts the remaining filters into place, then re-appending
        // in tree order restores lockstep without patching indices.
        let tail: Vec<NodeId> = self.children_of(NodeId::ROOT)[dest_row..]
            .iter()
            .copied()
            .filter(|child| self.node(*child).is_some_and(StackNode::is_leaf))
            .collect();
        for leaf in &tail {
            self.unplant(*leaf);
        }
        for leaf in &tail {
            self.plant(*leaf);
        }

        self.refresh_owner(false);
        self.notify(
            old_row.min(dest_row),
            old_row.max(dest_row),
            &[ChangeRole::Structure],
        );
        Ok(Some((old_row, dest_row)))
    }

    fn set_enabled_internal(&mut self, enabled: bool) {
        self.enabled = enabled;
        let children: Vec<NodeId> = self.children_of(NodeId::ROOT).to_vec();
        for child in children {
            if let Some(entry) = self.nodes.get_mut(&child) {
                if let Some(effect) = entry.node.as_effect_mut() {
                    effect.enabled = enabled;
                }
            }
        }
        let rows = self.row_count();
        if rows > 0 {
            self.notify(0, rows - 1, &[ChangeRole::Enabled]);
        }
    }

    /// Registration hook, insert side: the single choke point through which
    /// every node enters the tree. Plants leaves, propagates the stack-wide
    /// enable flag, and asks the owner for a visual refresh unless the
    /// effect is audio-only.
    fn attach_node(&mut self, node: StackNode, parent: NodeId, row: usize) {
        let id = node.id();
        self.next_id = self.next_id.max(id.0 + 1);
        let is_leaf = node.is_leaf();
        let audio_only = node.as_effect().is_some_and(|effect| effect.is_audio);
        self.nodes.insert(
            id,
            NodeEntry {
                node,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        if let Some(entry) = self.nodes.get_mut(&parent) {
            let row = row.min(entry.children.len());
            entry.children.insert(row, id);
        }
        if is_leaf {
            self.plant_in_order(id);
            let enabled = self.enabled;
            if let Some(effect) = self
                .nodes
                .get_mut(&id)
                .and_then(|entry| entry.node.as_effect_mut())
            {
                effect.enabled = enabled;
            }
            self.refresh_owner(audio_only);
        }
    }

    /// Registration hook, remove side: unplants and requests a refresh,
    /// mirroring the insert hook.
    fn detach_node(&mut self, id: NodeId) -> Option<(StackNode, NodeId, usize)> {
        let parent = self.parent_of(id)?;
        let audio_only = self
            .node(id)
            .and_then(StackNode::as_effect)
            .is_some_and(|effect| effect.is_audio);
        self.unplant(id);
        let row = self
            .nodes
            .get_mut(&parent)
            .and_then(|entry| {
                let row = entry.children.iter().position(|child| *child == id)?;
                entry.children.remove(row);
                Some(row)
            })?;
        let entry = self.nodes.remove(&id)?;
        if entry.node.is_leaf() {
            self.refresh_owner(audio_only);
        }
        Some((entry.node, parent, row))
    }

    /// Plant `id` at its position in leaf traversal order. The chain only
    /// supports appending, so every leaf after the insertion point is
    /// unplanted first and re-appended behind it.
    fn plant_in_order(&mut self, id: NodeId) {
        let order = self.leaf_order();
        let Some(position) = order.iter().position(|leaf| *leaf == id) else {
            return;
        };
        let tail: Vec<NodeId> = order[position + 1..].to_vec();
        for leaf in &tail {
            self.unplant(*leaf);
        }
        self.plant(id);
        for leaf in &tail {
            self.plant(*leaf);
        }
    }

    fn plant(&mut self, id: NodeId) {
        let Some(handle) = self
            .node(id)
            .and_then(StackNode::as_effect)
            .map(|effect| effect.filter)
        else {
            return;
        };
        let Some(service) = self.service.upgrade() else {
            debug!(%id, "service gone, effect left unplanted");
            return;
        };
        let index = service.borrow_mut().append_filter(handle);
        if let Some(effect) = self
            .nodes
            .get_mut(&id)
            .and_then(|entry| entry.node.as_effect_mut())
        {
            effect.planted_index = Some(index);
        }
    }

    fn unplant(&mut self, id: NodeId) {
        let Some(index) = self
            .nodes
            .get_mut(&id)
            .and_then(|entry| entry.node.as_effect_mut())
            .and_then(|effect| effect.planted_index.take())
        else {
            return;
        };
        if let Some(service) = self.service.upgrade() {
            service.borrow_mut().remove_filter_at(index);
        } else {
            debug!(%id, "service gone, filter not detached");
        }
        for entry in self.nodes.values_mut() {
            if let Some(effect) = entry.node.as_effect_mut() {
                if let Some(planted) = effect.planted_index {
                    if planted > index {
                        effect.planted_index = Some(planted - 1);
                    }
                }
            }
        }
    }

    fn refresh_owner(&self, audio_only: bool) {
        if audio_only {
            return;
        }
        if let Some(context) = self.context.upgrade() {
            context.borrow_mut().refresh_item(self.owner);
        }
    }

    fn notify(&self, start: usize, end: usize, roles: &[ChangeRole]) {
        if let Some(notifier) = &self.notifier {
            let _ = notifier.send(RowsChanged::new(start, end, roles));
        }
    }

    fn push_undo(&self, undo: StackAction, redo: StackAction, description: String) {
        let Some(stack) = self.undo.upgrade() else {
            debug!("undo stack gone, entry dropped");
            return;
        };
        stack.borrow_mut().push(UndoEntry {
            description,
            undo,
            redo,
        });
    }
}

fn leaf_of(entry: &NodeEntry) -> Option<&EffectItem> {
    if entry.children.is_empty() {
        entry.node.as_effect()
    } else {
        None
    }
}
