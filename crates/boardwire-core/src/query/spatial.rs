//! Z-order enumeration, hit testing and region queries.

use crate::error::DocResult;
use crate::ids::ViewId;
use crate::scene::SceneSource;
use crate::shapes::{ChildRef, Object};
use crate::transform::{
    PlacedNode, Placement, is_effectively_visible, placement_of, rect_contains, rect_contains_point,
    rects_overlap, walk_subtree,
};
use kurbo::{Point, Rect};

fn visible_tree<S: SceneSource + ?Sized>(source: &S) -> DocResult<Vec<PlacedNode>> {
    walk_subtree(source, &source.root_children(), Placement::IDENTITY, None, false)
}

/// Visible objects in paint order, each with its absolute bounds.
fn placed_objects<S: SceneSource + ?Sized>(source: &S) -> DocResult<Vec<(Object, Option<Rect>)>> {
    Ok(visible_tree(source)?
        .into_iter()
        .filter_map(|node| match node {
            PlacedNode::Object { object, placement } => {
                let bounds = placement.bounds_of(&object);
                Some((object, bounds))
            }
            PlacedNode::Container { .. } => None,
        })
        .collect())
}

/// Visible nodes in paint order (depth-first pre-order, back to front).
pub fn z_order<S: SceneSource + ?Sized>(source: &S) -> DocResult<Vec<ChildRef>> {
    Ok(visible_tree(source)?.iter().map(PlacedNode::child_ref).collect())
}

/// Visible objects in paint order.
pub fn objects_in_z_order<S: SceneSource + ?Sized>(source: &S) -> DocResult<Vec<Object>> {
    Ok(placed_objects(source)?.into_iter().map(|(object, _)| object).collect())
}

/// Objects whose absolute bounds contain `point`, topmost first.
pub fn objects_at_point<S: SceneSource + ?Sized>(source: &S, point: Point) -> DocResult<Vec<Object>> {
    let mut hits: Vec<Object> = placed_objects(source)?
        .into_iter()
        .filter(|(_, bounds)| bounds.is_some_and(|b| rect_contains_point(b, point)))
        .map(|(object, _)| object)
        .collect();
    hits.reverse();
    Ok(hits)
}

pub fn topmost_object_at_point<S: SceneSource + ?Sized>(source: &S, point: Point) -> DocResult<Option<Object>> {
    Ok(objects_at_point(source, point)?.into_iter().next())
}

/// Objects whose bounds touch `rect`, in paint order.
pub fn objects_in_rect<S: SceneSource + ?Sized>(source: &S, rect: Rect) -> DocResult<Vec<Object>> {
    let rect = rect.abs();
    Ok(placed_objects(source)?
        .into_iter()
        .filter(|(_, bounds)| bounds.is_some_and(|b| rects_overlap(b, rect)))
        .map(|(object, _)| object)
        .collect())
}

/// Objects whose bounds lie fully inside `rect`, in paint order.
pub fn objects_contained_in_rect<S: SceneSource + ?Sized>(source: &S, rect: Rect) -> DocResult<Vec<Object>> {
    let rect = rect.abs();
    Ok(placed_objects(source)?
        .into_iter()
        .filter(|(_, bounds)| bounds.is_some_and(|b| rect_contains(rect, b)))
        .map(|(object, _)| object)
        .collect())
}

/// Visible objects intersecting the view, ordered by id.
///
/// Scans the object map directly, so objects that are not linked into any
/// child list are still found.
pub fn objects_in_view<S: SceneSource + ?Sized>(source: &S, view: &ViewId) -> DocResult<Vec<Object>> {
    let Some(view) = source.view(view)? else {
        return Ok(Vec::new());
    };
    let mut ids = source.object_ids();
    ids.sort();

    let mut found = Vec::new();
    for id in ids {
        let Some(object) = source.object(&id)? else {
            continue;
        };
        if !is_effectively_visible(source, &object)? {
            continue;
        }
        let placement = placement_of(source, object.parent.as_ref())?;
        if placement.bounds_of(&object).is_some_and(|b| rects_overlap(b, view.bounds)) {
            found.push(object);
        }
    }
    Ok(found)
}

/// Visible objects intersecting the view, in paint order.
pub fn objects_in_view_in_z_order<S: SceneSource + ?Sized>(source: &S, view: &ViewId) -> DocResult<Vec<Object>> {
    let Some(view) = source.view(view)? else {
        return Ok(Vec::new());
    };
    Ok(placed_objects(source)?
        .into_iter()
        .filter(|(_, bounds)| bounds.is_some_and(|b| rects_overlap(b, view.bounds)))
        .map(|(object, _)| object)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures::{board, cid, ids, oid, rect, vid};
    use crate::scene::Scene;
    use crate::shapes::{Container, Geometry};

    #[test]
    fn test_z_order_is_preorder() {
        let scene = board();
        let order = z_order(&scene).expect("z-order");
        let names: Vec<&str> = order.iter().map(ChildRef::id_str).collect();
        assert_eq!(names, vec!["A", "B", "G", "C", "H", "D", "E"]);
        assert_eq!(ids(&objects_in_z_order(&scene).expect("objects")), vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_hidden_nodes_are_skipped() {
        let mut scene = board();
        scene.set_visible(&ChildRef::Object(oid("B")), false);
        scene.set_visible(&ChildRef::Container(cid("H")), false);
        assert_eq!(ids(&objects_in_z_order(&scene).expect("objects")), vec!["A", "C", "E"]);
        assert!(scene.object(&oid("B")).expect("lookup").is_some());
        assert!(scene.object(&oid("D")).expect("lookup").is_some());
    }

    #[test]
    fn test_topmost_hit_is_last_painted() {
        let scene = board();
        let hits = objects_at_point(&scene, Point::new(75.0, 75.0)).expect("hits");
        assert_eq!(ids(&hits), vec!["B", "A"]);
        let top = topmost_object_at_point(&scene, Point::new(75.0, 75.0)).expect("hit");
        assert_eq!(top.map(|o| o.id), Some(oid("B")));
        assert_eq!(topmost_object_at_point(&scene, Point::new(-5.0, -5.0)).expect("hit"), None);
    }

    #[test]
    fn test_hit_inside_nested_container() {
        let scene = board();
        let top = topmost_object_at_point(&scene, Point::new(220.0, 120.0)).expect("hit");
        assert_eq!(top.map(|o| o.id), Some(oid("D")));
    }

    #[test]
    fn test_straddling_object_intersects_but_is_not_contained() {
        let scene = board();
        let query = Rect::new(-10.0, -10.0, 120.0, 120.0);
        assert_eq!(ids(&objects_in_rect(&scene, query).expect("rect")), vec!["A", "B"]);
        assert_eq!(ids(&objects_contained_in_rect(&scene, query).expect("rect")), vec!["A"]);
    }

    #[test]
    fn test_reversed_query_rect_is_normalized() {
        let scene = board();
        let query = Rect::new(120.0, 120.0, -10.0, -10.0);
        assert_eq!(ids(&objects_contained_in_rect(&scene, query).expect("rect")), vec!["A"]);
    }

    #[test]
    fn test_objects_in_view() {
        let scene = board();
        assert_eq!(ids(&objects_in_view(&scene, &vid("left")).expect("view")), vec!["A", "B"]);
        assert_eq!(ids(&objects_in_view(&scene, &vid("right")).expect("view")), vec!["C", "D", "E"]);
        assert!(objects_in_view(&scene, &vid("missing")).expect("view").is_empty());
    }

    #[test]
    fn test_objects_in_view_orders_by_id_or_paint() {
        let mut scene = Scene::new();
        scene.add_object(rect("z", 0.0, 0.0, 10.0, 10.0));
        scene.add_object(rect("a", 0.0, 0.0, 10.0, 10.0));
        scene.add_view(crate::shapes::View::new(vid("v"), "", Rect::new(0.0, 0.0, 100.0, 100.0)));

        assert_eq!(ids(&objects_in_view(&scene, &vid("v")).expect("view")), vec!["a", "z"]);
        assert_eq!(ids(&objects_in_view_in_z_order(&scene, &vid("v")).expect("view")), vec!["z", "a"]);
    }

    #[test]
    fn test_hidden_ancestor_excludes_from_view() {
        let mut scene = board();
        scene.set_visible(&ChildRef::Container(cid("G")), false);
        assert_eq!(ids(&objects_in_view(&scene, &vid("right")).expect("view")), vec!["E"]);
        assert_eq!(ids(&objects_in_view_in_z_order(&scene, &vid("right")).expect("view")), vec!["E"]);
    }

    #[test]
    fn test_dangling_refs_are_skipped() {
        let mut scene = board();
        scene.remove_object(&oid("B"));
        scene.remove_container(&cid("H"));

        assert_eq!(ids(&objects_in_z_order(&scene).expect("objects")), vec!["A", "C", "E"]);
        assert_eq!(ids(&objects_at_point(&scene, Point::new(75.0, 75.0)).expect("hits")), vec!["A"]);
        assert!(objects_in_rect(&scene, Rect::new(0.0, 0.0, 500.0, 500.0)).is_ok());
        // D survives in the map. Its parent is gone, so it is placed at the root.
        assert_eq!(ids(&objects_in_view(&scene, &vid("right")).expect("view")), vec!["C", "E"]);
        assert_eq!(ids(&objects_in_view(&scene, &vid("left")).expect("view")), vec!["A", "D"]);
    }

    #[test]
    fn test_container_visited_once() {
        let mut scene = Scene::new();
        scene.add_container(Container::new(cid("loop"), Point::ZERO));
        scene.add_object(rect("x", 0.0, 0.0, 1.0, 1.0).with_parent(cid("loop")));
        // A second ref to the same container, as concurrent moves can leave behind.
        let mut looped = scene.container(&cid("loop")).expect("lookup").expect("container");
        looped.children.push(ChildRef::Container(cid("loop")));
        scene.remove_container(&cid("loop"));
        scene.add_container(looped);

        assert_eq!(ids(&objects_in_z_order(&scene).expect("objects")), vec!["x"]);
    }

    #[test]
    fn test_object_is_placed_once_under_its_stored_parent() {
        let mut scene = Scene::new();
        // g1 still lists x after it moved to g2, and g2 lists it twice.
        let mut g1 = Container::new(cid("g1"), Point::ZERO);
        g1.children.push(ChildRef::Object(oid("x")));
        scene.add_container(g1);
        let mut g2 = Container::new(cid("g2"), Point::new(500.0, 0.0));
        g2.children.push(ChildRef::Object(oid("x")));
        scene.add_container(g2);
        scene.add_object(rect("x", 10.0, 10.0, 10.0, 10.0).with_parent(cid("g2")));

        assert_eq!(ids(&objects_in_z_order(&scene).expect("objects")), vec!["x"]);
        assert_eq!(z_order(&scene).expect("z-order").len(), 3);
        assert!(objects_at_point(&scene, Point::new(15.0, 15.0)).expect("hits").is_empty());
        assert_eq!(ids(&objects_at_point(&scene, Point::new(515.0, 15.0)).expect("hits")), vec!["x"]);
    }

    #[test]
    fn test_objects_without_extent_are_never_hit() {
        let mut scene = Scene::new();
        scene.add_object(crate::shapes::Object::new(oid("empty"), Point::ZERO, Geometry::Freehand { points: vec![] }));
        assert!(objects_at_point(&scene, Point::ZERO).expect("hits").is_empty());
        assert_eq!(ids(&objects_in_z_order(&scene).expect("objects")), vec!["empty"]);
    }
}
