//! Coordinate composition across nested containers.
//!
//! Each container maps its children's coordinates into its parent's space
//! with `translate(x, y) * scale(sx, sy) * rotate(r)`. Positive rotation is
//! clockwise on the y-down canvas: a child at local `(10, 0)` under a
//! container at `(100, 100)` rotated 90 degrees lands at `(100, 110)`.
//!
//! Bounds are axis-aligned and unrotated: an object's absolute bounds are its
//! local extent moved to its absolute position.

use crate::error::DocResult;
use crate::ids::{ContainerId, ObjectId};
use crate::scene::SceneSource;
use crate::shapes::{ChildRef, Container, Object};
use kurbo::{Affine, Point, Rect, Vec2};
use std::collections::HashSet;

/// Accumulated transform of a parent space, relative to the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub affine: Affine,
    /// Sum of ancestor rotations, degrees.
    pub rotation: f64,
    /// Product of ancestor scales.
    pub scale: Vec2,
}

impl Placement {
    pub const IDENTITY: Placement = Placement {
        affine: Affine::IDENTITY,
        rotation: 0.0,
        scale: Vec2::new(1.0, 1.0),
    };

    /// The placement of `container`'s child space.
    pub fn within(&self, container: &Container) -> Placement {
        Placement {
            affine: self.affine * container.local_affine(),
            rotation: self.rotation + container.rotation,
            scale: Vec2::new(self.scale.x * container.scale.x, self.scale.y * container.scale.y),
        }
    }

    pub fn to_canvas(&self, local: Point) -> Point {
        self.affine * local
    }

    pub fn transform_of(&self, object: &Object) -> AbsoluteTransform {
        AbsoluteTransform {
            position: self.to_canvas(object.position),
            rotation: self.rotation + object.rotation,
            scale: self.scale,
        }
    }

    /// Absolute bounds of an object placed in this space.
    pub fn bounds_of(&self, object: &Object) -> Option<Rect> {
        let extent = object.extent()?;
        Some(extent + self.to_canvas(object.position).to_vec2())
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An object's effective canvas-space position, rotation and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsoluteTransform {
    pub position: Point,
    /// Own rotation plus every ancestor's, degrees.
    pub rotation: f64,
    /// Product of ancestor scales.
    pub scale: Vec2,
}

/// Containers from `start` up to the root, innermost first.
///
/// The walk stops at a missing container and at a container it has already
/// seen, so a reparenting cycle produced by concurrent edits terminates.
pub fn ancestor_chain<S: SceneSource + ?Sized>(
    source: &S,
    start: Option<&ContainerId>,
) -> DocResult<Vec<Container>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = start.cloned();
    while let Some(id) = next {
        if !seen.insert(id.clone()) {
            log::warn!("container cycle detected at {}", id);
            break;
        }
        match source.container(&id)? {
            Some(container) => {
                next = container.parent.clone();
                chain.push(container);
            }
            None => {
                log::debug!("ancestor walk stopped at missing container {}", id);
                break;
            }
        }
    }
    Ok(chain)
}

/// Placement of the child space of `parent` (the canvas when `None`).
pub fn placement_of<S: SceneSource + ?Sized>(
    source: &S,
    parent: Option<&ContainerId>,
) -> DocResult<Placement> {
    let chain = ancestor_chain(source, parent)?;
    Ok(chain
        .iter()
        .rev()
        .fold(Placement::IDENTITY, |placement, container| placement.within(container)))
}

/// Whether `object` and every ancestor container are visible.
pub fn is_effectively_visible<S: SceneSource + ?Sized>(source: &S, object: &Object) -> DocResult<bool> {
    if !object.visible {
        return Ok(false);
    }
    Ok(ancestor_chain(source, object.parent.as_ref())?
        .iter()
        .all(|container| container.visible))
}

pub fn absolute_position<S: SceneSource + ?Sized>(source: &S, id: &ObjectId) -> DocResult<Option<Point>> {
    let Some(object) = source.object(id)? else {
        return Ok(None);
    };
    Ok(Some(placement_of(source, object.parent.as_ref())?.to_canvas(object.position)))
}

pub fn absolute_transform<S: SceneSource + ?Sized>(
    source: &S,
    id: &ObjectId,
) -> DocResult<Option<AbsoluteTransform>> {
    let Some(object) = source.object(id)? else {
        return Ok(None);
    };
    Ok(Some(placement_of(source, object.parent.as_ref())?.transform_of(&object)))
}

/// Absolute position plus the object's own unrotated, unscaled extent.
pub fn absolute_bounds<S: SceneSource + ?Sized>(source: &S, id: &ObjectId) -> DocResult<Option<Rect>> {
    let Some(object) = source.object(id)? else {
        return Ok(None);
    };
    Ok(placement_of(source, object.parent.as_ref())?.bounds_of(&object))
}

/// Union of the absolute bounds of every visible object under `id`.
///
/// `None` when the container is missing, hidden (itself or through an
/// ancestor) or has no visible object with an extent.
pub fn container_bounds<S: SceneSource + ?Sized>(source: &S, id: &ContainerId) -> DocResult<Option<Rect>> {
    let chain = ancestor_chain(source, Some(id))?;
    let Some(container) = chain.first() else {
        return Ok(None);
    };
    if !chain.iter().all(|c| c.visible) {
        return Ok(None);
    }
    let base = chain
        .iter()
        .rev()
        .fold(Placement::IDENTITY, |placement, c| placement.within(c));

    let nodes = walk_subtree(source, &container.children, base, Some(id), false)?;
    Ok(nodes
        .iter()
        .filter_map(|node| match node {
            PlacedNode::Object { object, placement } => placement.bounds_of(object),
            PlacedNode::Container { .. } => None,
        })
        .reduce(|acc, rect| acc.union(rect)))
}

/// A node reached by a tree walk. Objects carry the placement of their
/// parent space.
#[derive(Debug, Clone)]
pub(crate) enum PlacedNode {
    Object { object: Object, placement: Placement },
    Container { container: Container },
}

impl PlacedNode {
    pub(crate) fn child_ref(&self) -> ChildRef {
        match self {
            PlacedNode::Object { object, .. } => ChildRef::Object(object.id.clone()),
            PlacedNode::Container { container } => ChildRef::Container(container.id.clone()),
        }
    }
}

/// Depth-first pre-order walk over `roots` and everything below them.
///
/// `owner` is the container whose children `roots` are. A node is emitted
/// only from the child list of its stored parent, so a ref left in a second
/// list by concurrent moves is skipped, as is a repeated ref within one
/// list. Dangling refs are skipped and `owner` counts as already entered.
/// Hidden nodes and their subtrees are skipped unless `include_hidden` is
/// set.
pub(crate) fn walk_subtree<S: SceneSource + ?Sized>(
    source: &S,
    roots: &[ChildRef],
    base: Placement,
    owner: Option<&ContainerId>,
    include_hidden: bool,
) -> DocResult<Vec<PlacedNode>> {
    let mut entered: HashSet<ContainerId> = owner.into_iter().cloned().collect();
    let mut stack: Vec<(ChildRef, Placement, Option<ContainerId>)> = roots
        .iter()
        .rev()
        .map(|c| (c.clone(), base, owner.cloned()))
        .collect();
    let mut placed: HashSet<ObjectId> = HashSet::new();
    let mut visited = Vec::new();

    while let Some((node, placement, list_owner)) = stack.pop() {
        match node {
            ChildRef::Object(id) => match source.object(&id)? {
                Some(object) if object.parent != list_owner => {
                    log::debug!("skipping stale ref to object {} outside its parent", id);
                }
                Some(_) if !placed.insert(id.clone()) => {
                    log::warn!("object {} listed twice, skipping", id);
                }
                Some(object) if object.visible || include_hidden => {
                    visited.push(PlacedNode::Object { object, placement });
                }
                Some(_) => {}
                None => log::debug!("skipping dangling object ref {}", id),
            },
            ChildRef::Container(id) => {
                let container = match source.container(&id)? {
                    Some(container) => container,
                    None => {
                        log::debug!("skipping dangling container ref {}", id);
                        continue;
                    }
                };
                if container.parent != list_owner {
                    log::debug!("skipping stale ref to container {} outside its parent", id);
                    continue;
                }
                if !entered.insert(id.clone()) {
                    log::warn!("container {} reached twice, skipping", id);
                    continue;
                }
                if container.visible || include_hidden {
                    let inner = placement.within(&container);
                    stack.extend(
                        container
                            .children
                            .iter()
                            .rev()
                            .map(|c| (c.clone(), inner, Some(container.id.clone()))),
                    );
                    visited.push(PlacedNode::Container { container });
                }
            }
        }
    }
    Ok(visited)
}

/// Edge-inclusive overlap test.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    !(a.x0 > b.x1 || a.x1 < b.x0 || a.y0 > b.y1 || a.y1 < b.y0)
}

/// Whether `inner` lies fully inside `outer`, edges included.
pub fn rect_contains(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.x1 <= outer.x1 && inner.y0 >= outer.y0 && inner.y1 <= outer.y1
}

/// Edge-inclusive point test.
pub fn rect_contains_point(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}
