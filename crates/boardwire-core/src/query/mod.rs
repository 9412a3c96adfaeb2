//! Spatial and hierarchy queries.
//!
//! Every query is total over ids: asking about something that no longer
//! exists (a concurrent peer may have deleted it) yields an empty result or
//! `None`. Only records that exist but cannot be expanded produce errors.

mod hierarchy;
mod spatial;
mod views;

pub use hierarchy::{container_ancestry, descendants, is_ancestor, siblings, z_index_in_parent};
pub use spatial::{
    objects_at_point, objects_contained_in_rect, objects_in_rect, objects_in_view,
    objects_in_view_in_z_order, objects_in_z_order, topmost_object_at_point, z_order,
};
pub use views::{ordered_views, view_at_point, view_for_object};

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::ids::{ContainerId, ObjectId, ViewId};
    use crate::scene::Scene;
    use crate::shapes::{Container, Object, View};
    use kurbo::{Point, Rect};

    pub fn oid(s: &str) -> ObjectId {
        ObjectId::new(s)
    }

    pub fn cid(s: &str) -> ContainerId {
        ContainerId::new(s)
    }

    pub fn vid(s: &str) -> ViewId {
        ViewId::new(s)
    }

    pub fn rect(id: &str, x: f64, y: f64, w: f64, h: f64) -> Object {
        Object::rectangle(oid(id), Point::new(x, y), w, h)
    }

    /// Root: A, B, group G { C, inner H { D } }, E. Views: "left" then "right".
    pub fn board() -> Scene {
        let mut scene = Scene::new();
        scene.add_object(rect("A", 0.0, 0.0, 100.0, 100.0));
        scene.add_object(rect("B", 50.0, 50.0, 100.0, 100.0));
        scene.add_container(Container::new(cid("G"), Point::new(200.0, 0.0)));
        scene.add_object(rect("C", 0.0, 0.0, 50.0, 50.0).with_parent(cid("G")));
        scene.add_container(Container::new(cid("H"), Point::new(0.0, 100.0)).with_parent(cid("G")));
        scene.add_object(rect("D", 10.0, 10.0, 20.0, 20.0).with_parent(cid("H")));
        scene.add_object(rect("E", 400.0, 400.0, 10.0, 10.0));
        scene.add_view(View::new(vid("left"), "Left", Rect::new(0.0, 0.0, 199.0, 500.0)));
        scene.add_view(View::new(vid("right"), "Right", Rect::new(200.0, 0.0, 500.0, 500.0)));
        scene
    }

    pub fn ids(objects: &[Object]) -> Vec<&str> {
        objects.iter().map(|o| o.id.as_str()).collect()
    }
}
