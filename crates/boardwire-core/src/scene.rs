//! Read access to a board, live or expanded in memory.

use crate::crdt::BoardDocument;
use crate::error::DocResult;
use crate::ids::{ContainerId, ObjectId, ViewId};
use crate::shapes::{ChildRef, Container, Object, View};
use crate::watch::ChangeTracker;
use loro::Subscription;
use std::collections::HashMap;

/// Anything queries can run against.
///
/// Lookups of a missing id return `Ok(None)`. Errors are reserved for
/// records that exist but cannot be expanded.
pub trait SceneSource {
    fn object(&self, id: &ObjectId) -> DocResult<Option<Object>>;

    fn container(&self, id: &ContainerId) -> DocResult<Option<Container>>;

    fn view(&self, id: &ViewId) -> DocResult<Option<View>>;

    /// The root z-order list, back to front.
    fn root_children(&self) -> Vec<ChildRef>;

    fn object_ids(&self) -> Vec<ObjectId>;

    fn container_ids(&self) -> Vec<ContainerId>;

    fn view_ids(&self) -> Vec<ViewId>;

    /// Presentation order. May contain ids with no view record.
    fn view_order(&self) -> Vec<ViewId>;

    /// Child list of `parent`, or of the root when `None`. A missing
    /// container has no children.
    fn children_of(&self, parent: Option<&ContainerId>) -> DocResult<Vec<ChildRef>> {
        match parent {
            None => Ok(self.root_children()),
            Some(id) => Ok(self.container(id)?.map(|c| c.children).unwrap_or_default()),
        }
    }
}

/// A fully expanded copy of a board.
///
/// Built from a [`BoardDocument`] for repeated querying between changes, or
/// assembled by hand in tests.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: HashMap<ObjectId, Object>,
    containers: HashMap<ContainerId, Container>,
    views: HashMap<ViewId, View>,
    root: Vec<ChildRef>,
    view_order: Vec<ViewId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand every record of `source`.
    pub fn from_document(source: &impl SceneSource) -> DocResult<Self> {
        let mut scene = Scene::new();
        for id in source.object_ids() {
            if let Some(object) = source.object(&id)? {
                scene.objects.insert(id, object);
            }
        }
        for id in source.container_ids() {
            if let Some(container) = source.container(&id)? {
                scene.containers.insert(id, container);
            }
        }
        for id in source.view_ids() {
            if let Some(view) = source.view(&id)? {
                scene.views.insert(id, view);
            }
        }
        scene.root = source.root_children();
        scene.view_order = source.view_order();
        Ok(scene)
    }

    /// Insert an object and append it to its parent's child list.
    pub fn add_object(&mut self, object: Object) {
        let node = ChildRef::Object(object.id.clone());
        self.link(node, object.parent.clone());
        self.objects.insert(object.id.clone(), object);
    }

    /// Insert a container and append it to its parent's child list.
    pub fn add_container(&mut self, container: Container) {
        let node = ChildRef::Container(container.id.clone());
        self.link(node, container.parent.clone());
        self.containers.insert(container.id.clone(), container);
    }

    /// Insert a view at the end of the presentation order.
    pub fn add_view(&mut self, view: View) {
        self.view_order.push(view.id.clone());
        self.views.insert(view.id.clone(), view);
    }

    /// Replace the presentation order.
    pub fn set_view_order(&mut self, order: Vec<ViewId>) {
        self.view_order = order;
    }

    fn link(&mut self, node: ChildRef, parent: Option<ContainerId>) {
        match parent {
            None => self.root.push(node),
            Some(parent) => match self.containers.get_mut(&parent) {
                Some(container) => container.children.push(node),
                None => log::debug!("scene: parent {} not present, {} left unlinked", parent, node.id_str()),
            },
        }
    }

    /// Drop an object's record. Child refs to it stay in place, the way a
    /// concurrent delete from a peer leaves them.
    pub fn remove_object(&mut self, id: &ObjectId) -> Option<Object> {
        self.objects.remove(id)
    }

    /// Drop a container's record, leaving refs and descendants in place.
    pub fn remove_container(&mut self, id: &ContainerId) -> Option<Container> {
        self.containers.remove(id)
    }

    /// Soft hide or show a node. Returns `false` when the node is unknown.
    pub fn set_visible(&mut self, node: &ChildRef, visible: bool) -> bool {
        match node {
            ChildRef::Object(id) => self.objects.get_mut(id).map(|o| o.visible = visible).is_some(),
            ChildRef::Container(id) => self.containers.get_mut(id).map(|c| c.visible = visible).is_some(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }
}

impl SceneSource for Scene {
    fn object(&self, id: &ObjectId) -> DocResult<Option<Object>> {
        Ok(self.objects.get(id).cloned())
    }

    fn container(&self, id: &ContainerId) -> DocResult<Option<Container>> {
        Ok(self.containers.get(id).cloned())
    }

    fn view(&self, id: &ViewId) -> DocResult<Option<View>> {
        Ok(self.views.get(id).cloned())
    }

    fn root_children(&self) -> Vec<ChildRef> {
        self.root.clone()
    }

    fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.keys().cloned().collect()
    }

    fn container_ids(&self) -> Vec<ContainerId> {
        self.containers.keys().cloned().collect()
    }

    fn view_ids(&self) -> Vec<ViewId> {
        self.views.keys().cloned().collect()
    }

    fn view_order(&self) -> Vec<ViewId> {
        self.view_order.clone()
    }
}

/// An expanded [`Scene`] that is rebuilt only after the document changes.
pub struct SceneCache {
    tracker: ChangeTracker,
    _subscription: Subscription,
    scene: Option<Scene>,
    rebuilds: usize,
}

impl SceneCache {
    /// Start tracking `doc`. The first call to [`SceneCache::scene`] builds.
    pub fn new(doc: &BoardDocument) -> Self {
        let tracker = ChangeTracker::new();
        let subscription = doc.subscribe(&tracker);
        Self {
            tracker,
            _subscription: subscription,
            scene: None,
            rebuilds: 0,
        }
    }

    /// The current scene, rebuilt first if `doc` committed since the last call.
    pub fn scene(&mut self, doc: &BoardDocument) -> DocResult<&Scene> {
        let changed = !self.tracker.take().is_empty();
        let scene = match self.scene.take() {
            Some(scene) if !changed => scene,
            _ => {
                self.rebuilds += 1;
                log::debug!("rebuilding scene ({} rebuilds)", self.rebuilds);
                Scene::from_document(doc)?
            }
        };
        Ok(self.scene.insert(scene))
    }

    /// Number of times the scene has been expanded.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_builder_links_children() {
        let mut scene = Scene::new();
        let group = ContainerId::new("g");
        scene.add_container(Container::new(group.clone(), Point::ZERO));
        scene.add_object(Object::rectangle(ObjectId::new("a"), Point::ZERO, 1.0, 1.0));
        scene.add_object(Object::rectangle(ObjectId::new("b"), Point::ZERO, 1.0, 1.0).with_parent(group.clone()));

        assert_eq!(
            scene.root_children(),
            vec![ChildRef::Container(group.clone()), ChildRef::Object(ObjectId::new("a"))]
        );
        assert_eq!(
            scene.children_of(Some(&group)).expect("children"),
            vec![ChildRef::Object(ObjectId::new("b"))]
        );
        assert!(scene.children_of(Some(&ContainerId::new("nope"))).expect("children").is_empty());
    }

    #[test]
    fn test_remove_object_leaves_ref() {
        let mut scene = Scene::new();
        let id = ObjectId::new("a");
        scene.add_object(Object::rectangle(id.clone(), Point::ZERO, 1.0, 1.0));
        assert!(scene.remove_object(&id).is_some());
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.root_children(), vec![ChildRef::Object(id.clone())]);
        assert_eq!(scene.object(&id).expect("lookup"), None);
    }

    #[test]
    fn test_set_visible_unknown_node() {
        let mut scene = Scene::new();
        assert!(!scene.set_visible(&ChildRef::Object(ObjectId::new("x")), false));
    }

    #[test]
    fn test_cache_rebuilds_only_after_commit() {
        let mut doc = BoardDocument::new();
        let mut cache = SceneCache::new(&doc);

        assert_eq!(cache.scene(&doc).expect("scene").object_count(), 0);
        assert_eq!(cache.scene(&doc).expect("scene").object_count(), 0);
        assert_eq!(cache.rebuilds(), 1);

        let id = doc.new_object_id();
        doc.add_object(&Object::rectangle(id, Point::ZERO, 5.0, 5.0)).expect("add");
        assert_eq!(cache.scene(&doc).expect("scene").object_count(), 1);
        assert_eq!(cache.rebuilds(), 2);
    }
}
