//! View (page, slide, frame) lookups.

use crate::error::DocResult;
use crate::ids::{ObjectId, ViewId};
use crate::scene::SceneSource;
use crate::shapes::View;
use crate::transform::{ancestor_chain, placement_of, rect_contains_point};
use kurbo::Point;
use std::collections::HashSet;

/// Views in presentation order, then any views missing from the order list
/// sorted by id. Dangling and repeated order entries are dropped.
pub fn ordered_views<S: SceneSource + ?Sized>(source: &S) -> DocResult<Vec<View>> {
    let mut seen = HashSet::new();
    let mut views = Vec::new();
    for id in source.view_order() {
        if !seen.insert(id.clone()) {
            continue;
        }
        match source.view(&id)? {
            Some(view) => views.push(view),
            None => log::debug!("view order references missing view {}", id),
        }
    }

    let mut unordered: Vec<ViewId> = source
        .view_ids()
        .into_iter()
        .filter(|id| !seen.contains(id))
        .collect();
    unordered.sort();
    for id in unordered {
        if let Some(view) = source.view(&id)? {
            views.push(view);
        }
    }
    Ok(views)
}

/// The first view, in presentation order, containing `point`.
pub fn view_at_point<S: SceneSource + ?Sized>(source: &S, point: Point) -> DocResult<Option<View>> {
    Ok(ordered_views(source)?
        .into_iter()
        .find(|view| rect_contains_point(view.bounds, point)))
}

/// The view an object belongs to.
///
/// Tries the object's own back-reference, then the nearest ancestor
/// container's, then the first view containing the object's absolute
/// centre. Back-references to deleted views are ignored.
pub fn view_for_object<S: SceneSource + ?Sized>(source: &S, id: &ObjectId) -> DocResult<Option<View>> {
    let Some(object) = source.object(id)? else {
        return Ok(None);
    };
    if let Some(view) = &object.view {
        if let Some(view) = source.view(view)? {
            return Ok(Some(view));
        }
    }

    for container in ancestor_chain(source, object.parent.as_ref())? {
        if let Some(view) = &container.view {
            if let Some(view) = source.view(view)? {
                return Ok(Some(view));
            }
        }
    }

    let placement = placement_of(source, object.parent.as_ref())?;
    let centre = placement
        .bounds_of(&object)
        .map(|bounds| bounds.center())
        .unwrap_or_else(|| placement.to_canvas(object.position));
    view_at_point(source, centre)
}
