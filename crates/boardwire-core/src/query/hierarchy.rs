//! Container hierarchy queries.

use crate::error::DocResult;
use crate::ids::{ContainerId, ObjectId};
use crate::scene::SceneSource;
use crate::shapes::{ChildRef, Object};
use crate::transform::{PlacedNode, Placement, ancestor_chain, walk_subtree};

/// The chain from the outermost container down to `id` itself.
pub fn container_ancestry<S: SceneSource + ?Sized>(source: &S, id: &ContainerId) -> DocResult<Vec<ContainerId>> {
    let mut chain: Vec<ContainerId> = ancestor_chain(source, Some(id))?
        .into_iter()
        .map(|container| container.id)
        .collect();
    chain.reverse();
    Ok(chain)
}

/// Every object and container below `id`, pre-order, hidden ones included.
pub fn descendants<S: SceneSource + ?Sized>(source: &S, id: &ContainerId) -> DocResult<Vec<ChildRef>> {
    let Some(container) = source.container(id)? else {
        return Ok(Vec::new());
    };
    let nodes = walk_subtree(source, &container.children, Placement::IDENTITY, Some(id), true)?;
    Ok(nodes.iter().map(PlacedNode::child_ref).collect())
}

fn parent_of<S: SceneSource + ?Sized>(source: &S, node: &ChildRef) -> DocResult<Option<Option<ContainerId>>> {
    Ok(match node {
        ChildRef::Object(id) => source.object(id)?.map(|o| o.parent),
        ChildRef::Container(id) => source.container(id)?.map(|c| c.parent),
    })
}

/// Whether `ancestor` appears on `node`'s parent chain.
pub fn is_ancestor<S: SceneSource + ?Sized>(source: &S, ancestor: &ContainerId, node: &ChildRef) -> DocResult<bool> {
    let Some(parent) = parent_of(source, node)? else {
        return Ok(false);
    };
    Ok(ancestor_chain(source, parent.as_ref())?
        .iter()
        .any(|container| &container.id == ancestor))
}

/// Other objects in the same child list as `id`, in list order.
pub fn siblings<S: SceneSource + ?Sized>(source: &S, id: &ObjectId) -> DocResult<Vec<Object>> {
    let Some(object) = source.object(id)? else {
        return Ok(Vec::new());
    };
    let mut found = Vec::new();
    for child in source.children_of(object.parent.as_ref())? {
        let ChildRef::Object(sibling) = child else {
            continue;
        };
        if &sibling == id {
            continue;
        }
        if let Some(sibling) = source.object(&sibling)? {
            found.push(sibling);
        }
    }
    Ok(found)
}

/// Position of `node` in its parent's child list.
///
/// `None` when the node, its parent, or its entry in the parent's list is
/// missing.
pub fn z_index_in_parent<S: SceneSource + ?Sized>(source: &S, node: &ChildRef) -> DocResult<Option<usize>> {
    let Some(parent) = parent_of(source, node)? else {
        return Ok(None);
    };
    if let Some(parent) = &parent {
        if source.container(parent)?.is_none() {
            return Ok(None);
        }
    }
    Ok(source
        .children_of(parent.as_ref())?
        .iter()
        .position(|child| child == node))
}
