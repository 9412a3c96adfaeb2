//! Loro document schema and operations.

use super::convert::{
    KEY_CHILDREN, StoredRecord, child_ref_from_loro, child_ref_to_loro, compact_container, compact_object,
    compact_view, expand_container, expand_object, expand_view, stored_parent, write_parent,
};
use crate::config::DocumentConfig;
use crate::error::{DocError, DocResult};
use crate::ids::{ContainerId, IdSource, ObjectId, RandomIds, TemplateId, ViewId};
use crate::scene::SceneSource;
use crate::shapes::{ChildRef, Container, Object, View};
use crate::transform::ancestor_chain;
use crate::watch::ChangeTracker;
use loro::event::DiffEvent;
use loro::{
    Container as LoroContainer, ExportMode, LoroDoc, LoroList, LoroMap, LoroValue, Subscription, UndoManager,
    ValueOrContainer, VersionVector,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Key for the object records map.
pub const OBJECTS_KEY: &str = "objects";
/// Key for the container records map.
pub const CONTAINERS_KEY: &str = "containers";
/// Key for the root z-order list.
pub const ROOT_KEY: &str = "root";
/// Key for the view records map.
pub const VIEWS_KEY: &str = "views";
/// Key for the presentation order list.
pub const VIEW_ORDER_KEY: &str = "view_order";

/// A CRDT-backed board.
///
/// Wraps a `LoroDoc` laid out as described in the [module docs](super), an
/// `UndoManager` for local undo/redo, and the id source used to mint new ids.
/// Every mutating method is one Loro commit; use [`BoardDocument::transact`]
/// to group several into one.
pub struct BoardDocument {
    doc: LoroDoc,
    undo_manager: UndoManager,
    ids: Box<dyn IdSource + Send>,
}

impl BoardDocument {
    /// Create an empty board with the default configuration.
    pub fn new() -> Self {
        let doc = LoroDoc::new();
        let undo_manager = undo_manager_for(&doc, &DocumentConfig::default());
        Self {
            doc,
            undo_manager,
            ids: Box::new(RandomIds),
        }
    }

    pub fn with_config(config: &DocumentConfig) -> DocResult<Self> {
        Self::with_id_source(config, Box::new(RandomIds))
    }

    pub fn with_id_source(config: &DocumentConfig, ids: Box<dyn IdSource + Send>) -> DocResult<Self> {
        Self::assemble(LoroDoc::new(), config, ids)
    }

    /// Load a board from a snapshot.
    pub fn from_snapshot(bytes: &[u8], config: &DocumentConfig) -> DocResult<Self> {
        let doc = LoroDoc::new();
        if let Some(peer) = config.peer_id {
            doc.set_peer_id(peer)?;
        }
        doc.import(bytes)?;
        let undo_manager = undo_manager_for(&doc, config);
        Ok(Self {
            doc,
            undo_manager,
            ids: Box::new(RandomIds),
        })
    }

    fn assemble(doc: LoroDoc, config: &DocumentConfig, ids: Box<dyn IdSource + Send>) -> DocResult<Self> {
        if let Some(peer) = config.peer_id {
            doc.set_peer_id(peer)?;
        }
        let undo_manager = undo_manager_for(&doc, config);
        Ok(Self { doc, undo_manager, ids })
    }

    /// Replace the id source, e.g. with a deterministic one after loading.
    pub fn set_id_source(&mut self, ids: Box<dyn IdSource + Send>) {
        self.ids = ids;
    }

    /// Get the underlying LoroDoc.
    pub fn loro_doc(&self) -> &LoroDoc {
        &self.doc
    }

    fn objects_map(&self) -> LoroMap {
        self.doc.get_map(OBJECTS_KEY)
    }

    fn containers_map(&self) -> LoroMap {
        self.doc.get_map(CONTAINERS_KEY)
    }

    fn views_map(&self) -> LoroMap {
        self.doc.get_map(VIEWS_KEY)
    }

    fn root_list(&self) -> LoroList {
        self.doc.get_list(ROOT_KEY)
    }

    fn view_order_list(&self) -> LoroList {
        self.doc.get_list(VIEW_ORDER_KEY)
    }

    pub fn object_count(&self) -> usize {
        self.objects_map().len()
    }

    pub fn container_count(&self) -> usize {
        self.containers_map().len()
    }

    pub fn view_count(&self) -> usize {
        self.views_map().len()
    }

    // --- Ids ---

    pub fn new_object_id(&mut self) -> ObjectId {
        ObjectId::generate(self.ids.as_mut())
    }

    pub fn new_container_id(&mut self) -> ContainerId {
        ContainerId::generate(self.ids.as_mut())
    }

    pub fn new_view_id(&mut self) -> ViewId {
        ViewId::generate(self.ids.as_mut())
    }

    pub fn new_template_id(&mut self) -> TemplateId {
        TemplateId::generate(self.ids.as_mut())
    }

    // --- Raw access ---

    /// Compact record of an object as stored, without expanding it.
    pub fn stored_object(&self, id: &ObjectId) -> Option<StoredRecord> {
        record_map(&self.objects_map(), id.as_str()).map(|map| read_record(&map))
    }

    /// The live child list of `parent`, if it has one.
    fn child_list(&self, parent: Option<&ContainerId>) -> Option<LoroList> {
        match parent {
            None => Some(self.root_list()),
            Some(id) => {
                let map = record_map(&self.containers_map(), id.as_str())?;
                match map.get(KEY_CHILDREN) {
                    Some(ValueOrContainer::Container(LoroContainer::List(list))) => Some(list),
                    _ => None,
                }
            }
        }
    }

    /// The child list of `parent`, created if the container has none yet.
    fn child_list_mut(&self, parent: Option<&ContainerId>) -> DocResult<LoroList> {
        match parent {
            None => Ok(self.root_list()),
            Some(id) => {
                let map = record_map(&self.containers_map(), id.as_str())
                    .ok_or_else(|| DocError::NotFound(id.to_string()))?;
                match map.get(KEY_CHILDREN) {
                    Some(ValueOrContainer::Container(LoroContainer::List(list))) => Ok(list),
                    _ => Ok(map.insert_container(KEY_CHILDREN, LoroList::new())?),
                }
            }
        }
    }

    fn node_record(&self, node: &ChildRef) -> Option<LoroMap> {
        match node {
            ChildRef::Object(id) => record_map(&self.objects_map(), id.as_str()),
            ChildRef::Container(id) => record_map(&self.containers_map(), id.as_str()),
        }
    }

    fn stored_parent_of(&self, node: &ChildRef) -> DocResult<Option<ContainerId>> {
        let map = self
            .node_record(node)
            .ok_or_else(|| DocError::NotFound(node.id_str().to_string()))?;
        Ok(stored_parent(&read_record(&map)))
    }

    fn unlink(&self, node: &ChildRef, parent: Option<&ContainerId>) -> DocResult<()> {
        if let Some(list) = self.child_list(parent) {
            if let Some(index) = index_of(&list, node) {
                list.delete(index, 1)?;
            }
        }
        Ok(())
    }

    // --- Transactions ---

    /// Run several mutations as one commit.
    ///
    /// `f` first runs against a fork of the document. If it fails there, the
    /// live document is left untouched and no change event fires; otherwise
    /// it runs again on the live document and commits once. `f` should be
    /// deterministic given the document state.
    pub fn transact<T>(&mut self, mut f: impl FnMut(&mut Transaction<'_>) -> DocResult<T>) -> DocResult<T> {
        let mut rehearsal = self.rehearsal();
        if let Err(err) = f(&mut Transaction { board: &mut rehearsal }) {
            log::debug!("transaction rejected: {}", err);
            return Err(err);
        }
        self.commit_with(f)
    }

    /// Scratch copy of the board for dry runs. Ids minted on it do not
    /// advance this board's id source.
    fn rehearsal(&self) -> BoardDocument {
        let doc = self.doc.fork();
        let undo_manager = UndoManager::new(&doc);
        Self {
            doc,
            undo_manager,
            ids: Box::new(RandomIds),
        }
    }

    /// Apply a single operation as one commit. The operations validate
    /// before their first write, so an error here leaves nothing behind.
    fn commit_with<T>(&mut self, f: impl FnOnce(&mut Transaction<'_>) -> DocResult<T>) -> DocResult<T> {
        let result = f(&mut Transaction { board: self });
        self.doc.commit();
        if let Err(err) = &result {
            log::debug!("operation failed: {}", err);
        }
        result
    }

    /// Add an object at the top of its parent's child list.
    pub fn add_object(&mut self, object: &Object) -> DocResult<()> {
        self.commit_with(|txn| txn.add_object(object))
    }

    /// Add an object at `index` in its parent's child list (clamped).
    pub fn insert_object_at(&mut self, object: &Object, index: usize) -> DocResult<()> {
        self.commit_with(|txn| txn.insert_object_at(object, index))
    }

    pub fn update_object(&mut self, object: &Object) -> DocResult<()> {
        self.commit_with(|txn| txn.update_object(object))
    }

    pub fn patch_object(&mut self, id: &ObjectId, f: impl FnOnce(&mut Object)) -> DocResult<()> {
        self.commit_with(|txn| txn.patch_object(id, f))
    }

    pub fn remove_object(&mut self, id: &ObjectId) -> DocResult<()> {
        self.commit_with(|txn| txn.remove_object(id))
    }

    pub fn add_container(&mut self, container: &Container) -> DocResult<()> {
        self.commit_with(|txn| txn.add_container(container))
    }

    pub fn patch_container(&mut self, id: &ContainerId, f: impl FnOnce(&mut Container)) -> DocResult<()> {
        self.commit_with(|txn| txn.patch_container(id, f))
    }

    pub fn remove_container(&mut self, id: &ContainerId) -> DocResult<()> {
        self.commit_with(|txn| txn.remove_container(id))
    }

    pub fn set_visible(&mut self, node: &ChildRef, visible: bool) -> DocResult<()> {
        self.commit_with(|txn| txn.set_visible(node, visible))
    }

    pub fn move_node(
        &mut self,
        node: &ChildRef,
        parent: Option<&ContainerId>,
        index: Option<usize>,
    ) -> DocResult<()> {
        self.commit_with(|txn| txn.move_node(node, parent, index))
    }

    pub fn bring_to_front(&mut self, node: &ChildRef) -> DocResult<bool> {
        self.commit_with(|txn| txn.bring_to_front(node))
    }

    pub fn send_to_back(&mut self, node: &ChildRef) -> DocResult<bool> {
        self.commit_with(|txn| txn.send_to_back(node))
    }

    pub fn bring_forward(&mut self, node: &ChildRef) -> DocResult<bool> {
        self.commit_with(|txn| txn.bring_forward(node))
    }

    pub fn send_backward(&mut self, node: &ChildRef) -> DocResult<bool> {
        self.commit_with(|txn| txn.send_backward(node))
    }

    pub fn add_view(&mut self, view: &View) -> DocResult<()> {
        self.commit_with(|txn| txn.add_view(view))
    }

    pub fn update_view(&mut self, view: &View) -> DocResult<()> {
        self.commit_with(|txn| txn.update_view(view))
    }

    pub fn remove_view(&mut self, id: &ViewId) -> DocResult<()> {
        self.commit_with(|txn| txn.remove_view(id))
    }

    pub fn move_view_in_order(&mut self, id: &ViewId, index: usize) -> DocResult<()> {
        self.commit_with(|txn| txn.move_view_in_order(id, index))
    }

    // --- Sync ---

    /// Export the document as a snapshot (full state).
    pub fn export_snapshot(&self) -> DocResult<Vec<u8>> {
        self.doc
            .export(ExportMode::Snapshot)
            .map_err(|e| DocError::Export(e.to_string()))
    }

    /// Export incremental updates since a version.
    pub fn export_updates(&self, since: &VersionVector) -> DocResult<Vec<u8>> {
        self.doc
            .export(ExportMode::updates(since))
            .map_err(|e| DocError::Export(e.to_string()))
    }

    /// Import a snapshot or updates from another peer.
    pub fn import(&mut self, bytes: &[u8]) -> DocResult<()> {
        self.doc.import(bytes)?;
        log::debug!("imported {} bytes", bytes.len());
        Ok(())
    }

    /// Get the current version vector.
    pub fn version(&self) -> VersionVector {
        self.doc.oplog_vv()
    }

    pub fn peer_id(&self) -> u64 {
        self.doc.peer_id()
    }

    /// Record one [`ChangeNotice`](crate::ChangeNotice) per committed batch
    /// into `tracker` until the returned subscription is dropped.
    pub fn subscribe(&self, tracker: &ChangeTracker) -> Subscription {
        let tracker = tracker.clone();
        self.doc
            .subscribe_root(Arc::new(move |event: DiffEvent<'_>| tracker.record_event(&event)))
    }

    // --- Undo/Redo API ---

    /// Undo the last change made by this peer.
    /// Returns `true` if undo was performed, `false` if there was nothing to undo.
    pub fn undo(&mut self) -> DocResult<bool> {
        Ok(self.undo_manager.undo()?)
    }

    /// Redo the last undone change.
    pub fn redo(&mut self) -> DocResult<bool> {
        Ok(self.undo_manager.redo()?)
    }

    pub fn can_undo(&self) -> bool {
        self.undo_manager.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_manager.can_redo()
    }

    pub fn clear_undo_history(&self) {
        self.undo_manager.clear();
    }
}

impl Default for BoardDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn undo_manager_for(doc: &LoroDoc, config: &DocumentConfig) -> UndoManager {
    let mut undo_manager = UndoManager::new(doc);
    undo_manager.set_max_undo_steps(config.max_undo_steps);
    undo_manager.set_merge_interval(config.undo_merge_interval_ms);
    undo_manager
}

impl SceneSource for BoardDocument {
    fn object(&self, id: &ObjectId) -> DocResult<Option<Object>> {
        match record_map(&self.objects_map(), id.as_str()) {
            Some(map) => expand_object(id, &read_record(&map)).map(Some),
            None => Ok(None),
        }
    }

    fn container(&self, id: &ContainerId) -> DocResult<Option<Container>> {
        let Some(map) = record_map(&self.containers_map(), id.as_str()) else {
            return Ok(None);
        };
        let record = read_record(&map);
        let children = record
            .get(KEY_CHILDREN)
            .map(|list| decode_child_refs(id.as_str(), list))
            .unwrap_or_default();
        expand_container(id, &record, children).map(Some)
    }

    fn view(&self, id: &ViewId) -> DocResult<Option<View>> {
        match record_map(&self.views_map(), id.as_str()) {
            Some(map) => expand_view(id, &read_record(&map)).map(Some),
            None => Ok(None),
        }
    }

    fn root_children(&self) -> Vec<ChildRef> {
        decode_child_refs(ROOT_KEY, &self.root_list().get_value())
    }

    fn object_ids(&self) -> Vec<ObjectId> {
        map_keys(&self.objects_map()).into_iter().map(ObjectId::new).collect()
    }

    fn container_ids(&self) -> Vec<ContainerId> {
        map_keys(&self.containers_map()).into_iter().map(ContainerId::new).collect()
    }

    fn view_ids(&self) -> Vec<ViewId> {
        map_keys(&self.views_map()).into_iter().map(ViewId::new).collect()
    }

    fn view_order(&self) -> Vec<ViewId> {
        match self.view_order_list().get_value() {
            LoroValue::List(entries) => entries
                .iter()
                .filter_map(|entry| match entry {
                    LoroValue::String(id) => Some(ViewId::new(id.to_string())),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Mutations applied inside one commit. See [`BoardDocument::transact`].
pub struct Transaction<'a> {
    board: &'a mut BoardDocument,
}

impl Transaction<'_> {
    /// Read access to the board, including this transaction's writes so far.
    pub fn document(&self) -> &BoardDocument {
        &*self.board
    }

    pub fn new_object_id(&mut self) -> ObjectId {
        self.board.new_object_id()
    }

    pub fn new_container_id(&mut self) -> ContainerId {
        self.board.new_container_id()
    }

    pub fn add_object(&mut self, object: &Object) -> DocResult<()> {
        self.insert_object(object, None)
    }

    pub fn insert_object_at(&mut self, object: &Object, index: usize) -> DocResult<()> {
        self.insert_object(object, Some(index))
    }

    fn insert_object(&mut self, object: &Object, index: Option<usize>) -> DocResult<()> {
        let objects = self.board.objects_map();
        if objects.get(object.id.as_str()).is_some() {
            return Err(DocError::DuplicateId(object.id.to_string()));
        }
        let list = self.board.child_list_mut(object.parent.as_ref())?;

        let map = objects.insert_container(object.id.as_str(), LoroMap::new())?;
        compact_object(object).write_to(&map)?;
        insert_ref(&list, &ChildRef::Object(object.id.clone()), index)?;
        log::debug!("added object {} ({})", object.id, object.geometry.kind_name());
        Ok(())
    }

    /// Write `object` as a field-level patch over its stored record.
    ///
    /// Changed keys are set, keys that went back to their default are
    /// deleted. A changed `parent` also moves the child ref.
    pub fn update_object(&mut self, object: &Object) -> DocResult<()> {
        let map = record_map(&self.board.objects_map(), object.id.as_str())
            .ok_or_else(|| DocError::NotFound(object.id.to_string()))?;
        let current = read_record(&map);

        let old_parent = stored_parent(&current);
        if old_parent != object.parent {
            let list = self.board.child_list_mut(object.parent.as_ref())?;
            let node = ChildRef::Object(object.id.clone());
            self.board.unlink(&node, old_parent.as_ref())?;
            insert_ref(&list, &node, None)?;
        }

        let patch = current.diff(&compact_object(object));
        patch.apply(&map)?;
        log::debug!(
            "patched object {}: {} set, {} deleted",
            object.id,
            patch.set.len(),
            patch.delete.len()
        );
        Ok(())
    }

    pub fn patch_object(&mut self, id: &ObjectId, f: impl FnOnce(&mut Object)) -> DocResult<()> {
        let mut object = self
            .board
            .object(id)?
            .ok_or_else(|| DocError::NotFound(id.to_string()))?;
        f(&mut object);
        object.id = id.clone();
        self.update_object(&object)
    }

    /// Remove an object's child ref and record together.
    pub fn remove_object(&mut self, id: &ObjectId) -> DocResult<()> {
        let objects = self.board.objects_map();
        let map = record_map(&objects, id.as_str()).ok_or_else(|| DocError::NotFound(id.to_string()))?;
        let parent = stored_parent(&read_record(&map));
        self.board.unlink(&ChildRef::Object(id.clone()), parent.as_ref())?;
        objects.delete(id.as_str())?;
        log::debug!("removed object {}", id);
        Ok(())
    }

    /// Add a container with its own child list. Refs already in
    /// `container.children` are written into that list as given.
    pub fn add_container(&mut self, container: &Container) -> DocResult<()> {
        let containers = self.board.containers_map();
        if containers.get(container.id.as_str()).is_some() {
            return Err(DocError::DuplicateId(container.id.to_string()));
        }
        let list = self.board.child_list_mut(container.parent.as_ref())?;

        let map = containers.insert_container(container.id.as_str(), LoroMap::new())?;
        compact_container(container).write_to(&map)?;
        let children = map.insert_container(KEY_CHILDREN, LoroList::new())?;
        for child in &container.children {
            children.push(child_ref_to_loro(child))?;
        }
        insert_ref(&list, &ChildRef::Container(container.id.clone()), None)?;
        log::debug!("added container {}", container.id);
        Ok(())
    }

    /// Patch a container's own fields. Its child list is managed by the
    /// add, move and remove operations; edits to `children` are ignored.
    pub fn patch_container(&mut self, id: &ContainerId, f: impl FnOnce(&mut Container)) -> DocResult<()> {
        let map = record_map(&self.board.containers_map(), id.as_str())
            .ok_or_else(|| DocError::NotFound(id.to_string()))?;
        let mut container = self
            .board
            .container(id)?
            .ok_or_else(|| DocError::NotFound(id.to_string()))?;
        f(&mut container);
        container.id = id.clone();

        let mut current = read_record(&map);
        current.remove(KEY_CHILDREN);
        let old_parent = stored_parent(&current);
        if old_parent != container.parent {
            self.check_reparent(id, container.parent.as_ref())?;
            let list = self.board.child_list_mut(container.parent.as_ref())?;
            let node = ChildRef::Container(id.clone());
            self.board.unlink(&node, old_parent.as_ref())?;
            insert_ref(&list, &node, None)?;
        }

        current.diff(&compact_container(&container)).apply(&map)?;
        Ok(())
    }

    /// Remove a container, everything below it, and its ref in the parent.
    pub fn remove_container(&mut self, id: &ContainerId) -> DocResult<()> {
        let containers = self.board.containers_map();
        let objects = self.board.objects_map();
        let map = record_map(&containers, id.as_str()).ok_or_else(|| DocError::NotFound(id.to_string()))?;
        let parent = stored_parent(&read_record(&map));

        let mut doomed_objects = Vec::new();
        let mut doomed_containers = vec![id.clone()];
        let mut seen: HashSet<ContainerId> = HashSet::from([id.clone()]);
        let mut stack = self.child_refs_of(id);
        while let Some(child) = stack.pop() {
            match child {
                ChildRef::Object(object) => doomed_objects.push(object),
                ChildRef::Container(container) => {
                    if seen.insert(container.clone()) {
                        stack.extend(self.child_refs_of(&container));
                        doomed_containers.push(container);
                    }
                }
            }
        }

        self.board.unlink(&ChildRef::Container(id.clone()), parent.as_ref())?;
        for object in &doomed_objects {
            if objects.get(object.as_str()).is_some() {
                objects.delete(object.as_str())?;
            }
        }
        for container in &doomed_containers {
            if containers.get(container.as_str()).is_some() {
                containers.delete(container.as_str())?;
            }
        }
        log::debug!(
            "removed container {} with {} objects and {} nested containers",
            id,
            doomed_objects.len(),
            doomed_containers.len() - 1
        );
        Ok(())
    }

    fn child_refs_of(&self, id: &ContainerId) -> Vec<ChildRef> {
        self.board
            .child_list(Some(id))
            .map(|list| decode_child_refs(id.as_str(), &list.get_value()))
            .unwrap_or_default()
    }

    /// Soft hide or show a node.
    pub fn set_visible(&mut self, node: &ChildRef, visible: bool) -> DocResult<()> {
        match node {
            ChildRef::Object(id) => self.patch_object(id, |object| object.visible = visible),
            ChildRef::Container(id) => self.patch_container(id, |container| container.visible = visible),
        }
    }

    /// Refuse to put container `id` under itself or one of its descendants.
    fn check_reparent(&self, id: &ContainerId, new_parent: Option<&ContainerId>) -> DocResult<()> {
        let Some(new_parent) = new_parent else {
            return Ok(());
        };
        if new_parent == id
            || ancestor_chain(&*self.board, Some(new_parent))?
                .iter()
                .any(|container| &container.id == id)
        {
            return Err(DocError::Cycle(id.to_string()));
        }
        Ok(())
    }

    /// Move `node` into `parent`'s child list at `index` (clamped; the top
    /// when `None`).
    pub fn move_node(
        &mut self,
        node: &ChildRef,
        parent: Option<&ContainerId>,
        index: Option<usize>,
    ) -> DocResult<()> {
        let old_parent = self.board.stored_parent_of(node)?;
        if let ChildRef::Container(id) = node {
            self.check_reparent(id, parent)?;
        }
        let list = self.board.child_list_mut(parent)?;

        self.board.unlink(node, old_parent.as_ref())?;
        insert_ref(&list, node, index)?;
        if let Some(map) = self.board.node_record(node) {
            write_parent(&map, parent)?;
        }
        log::debug!("moved {} under {:?}", node.id_str(), parent.map(ContainerId::as_str));
        Ok(())
    }

    fn reorder(&mut self, node: &ChildRef, target: impl FnOnce(usize, usize) -> usize) -> DocResult<bool> {
        let parent = self.board.stored_parent_of(node)?;
        let Some(list) = self.board.child_list(parent.as_ref()) else {
            return Ok(false);
        };
        let Some(from) = index_of(&list, node) else {
            return Ok(false);
        };
        let to = target(from, list.len());
        if to == from {
            return Ok(false);
        }
        list.delete(from, 1)?;
        list.insert(to, child_ref_to_loro(node))?;
        Ok(true)
    }

    /// Move a node to the top of its parent's child list.
    pub fn bring_to_front(&mut self, node: &ChildRef) -> DocResult<bool> {
        self.reorder(node, |_, len| len - 1)
    }

    /// Move a node to the bottom of its parent's child list.
    pub fn send_to_back(&mut self, node: &ChildRef) -> DocResult<bool> {
        self.reorder(node, |_, _| 0)
    }

    /// Swap a node with the one painted just above it.
    pub fn bring_forward(&mut self, node: &ChildRef) -> DocResult<bool> {
        self.reorder(node, |from, len| (from + 1).min(len - 1))
    }

    /// Swap a node with the one painted just below it.
    pub fn send_backward(&mut self, node: &ChildRef) -> DocResult<bool> {
        self.reorder(node, |from, _| from.saturating_sub(1))
    }

    /// Add a view and append it to the presentation order.
    pub fn add_view(&mut self, view: &View) -> DocResult<()> {
        let views = self.board.views_map();
        if views.get(view.id.as_str()).is_some() {
            return Err(DocError::DuplicateId(view.id.to_string()));
        }
        let map = views.insert_container(view.id.as_str(), LoroMap::new())?;
        compact_view(view).write_to(&map)?;
        self.board.view_order_list().push(view_id_value(&view.id))?;
        Ok(())
    }

    pub fn update_view(&mut self, view: &View) -> DocResult<()> {
        let map = record_map(&self.board.views_map(), view.id.as_str())
            .ok_or_else(|| DocError::NotFound(view.id.to_string()))?;
        read_record(&map).diff(&compact_view(view)).apply(&map)?;
        Ok(())
    }

    /// Remove a view and its presentation-order entries. Back-references on
    /// objects are left alone; readers ignore them once dangling.
    pub fn remove_view(&mut self, id: &ViewId) -> DocResult<()> {
        let views = self.board.views_map();
        if views.get(id.as_str()).is_none() {
            return Err(DocError::NotFound(id.to_string()));
        }
        views.delete(id.as_str())?;
        let order = self.board.view_order_list();
        while let Some(index) = view_order_index(&order, id) {
            order.delete(index, 1)?;
        }
        Ok(())
    }

    /// Move a view to `index` in the presentation order (clamped).
    pub fn move_view_in_order(&mut self, id: &ViewId, index: usize) -> DocResult<()> {
        let order = self.board.view_order_list();
        let from = view_order_index(&order, id).ok_or_else(|| DocError::NotFound(id.to_string()))?;
        order.delete(from, 1)?;
        order.insert(index.min(order.len()), view_id_value(id))?;
        Ok(())
    }
}

fn record_map(parent: &LoroMap, key: &str) -> Option<LoroMap> {
    match parent.get(key) {
        Some(ValueOrContainer::Container(LoroContainer::Map(map))) => Some(map),
        _ => None,
    }
}

fn read_record(map: &LoroMap) -> StoredRecord {
    StoredRecord::from_value(&map.get_deep_value())
}

fn map_keys(map: &LoroMap) -> Vec<String> {
    match map.get_value() {
        LoroValue::Map(entries) => entries.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

fn decode_child_refs(owner: &str, value: &LoroValue) -> Vec<ChildRef> {
    let LoroValue::List(entries) = value else {
        log::warn!("child list of {} is not a list", owner);
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let child = child_ref_from_loro(entry);
            if child.is_none() {
                log::warn!("skipping malformed child ref in {}: {:?}", owner, entry);
            }
            child
        })
        .collect()
}

fn index_of(list: &LoroList, node: &ChildRef) -> Option<usize> {
    match list.get_value() {
        LoroValue::List(entries) => entries
            .iter()
            .position(|entry| child_ref_from_loro(entry).as_ref() == Some(node)),
        _ => None,
    }
}

fn insert_ref(list: &LoroList, node: &ChildRef, index: Option<usize>) -> DocResult<()> {
    let len = list.len();
    let at = index.map_or(len, |i| i.min(len));
    list.insert(at, child_ref_to_loro(node))?;
    Ok(())
}

fn view_id_value(id: &ViewId) -> LoroValue {
    LoroValue::String(id.as_str().to_string().into())
}

fn view_order_index(order: &LoroList, id: &ViewId) -> Option<usize> {
    match order.get_value() {
        LoroValue::List(entries) => entries
            .iter()
            .position(|entry| matches!(entry, LoroValue::String(s) if s.as_str() == id.as_str())),
        _ => None,
    }
}
