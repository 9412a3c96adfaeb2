//! Containers: grouping/layer nodes that own an ordered child list.

use super::Extensions;
use crate::ids::{ContainerId, ObjectId, ViewId};
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// A tagged reference held in a z-order list.
///
/// The tag decides which map the id is resolved against. Later entries in a
/// list paint on top of earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildRef {
    Object(ObjectId),
    Container(ContainerId),
}

impl ChildRef {
    /// Wire tag: `0` for objects, `1` for containers.
    pub fn tag(&self) -> i64 {
        match self {
            ChildRef::Object(_) => 0,
            ChildRef::Container(_) => 1,
        }
    }

    pub fn id_str(&self) -> &str {
        match self {
            ChildRef::Object(id) => id.as_str(),
            ChildRef::Container(id) => id.as_str(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectId> {
        match self {
            ChildRef::Object(id) => Some(id),
            ChildRef::Container(_) => None,
        }
    }

    pub fn as_container(&self) -> Option<&ContainerId> {
        match self {
            ChildRef::Container(id) => Some(id),
            ChildRef::Object(_) => None,
        }
    }
}

impl From<ObjectId> for ChildRef {
    fn from(id: ObjectId) -> Self {
        ChildRef::Object(id)
    }
}

impl From<ContainerId> for ChildRef {
    fn from(id: ContainerId) -> Self {
        ChildRef::Container(id)
    }
}

/// A grouping node. Its transform applies to its children's coordinates,
/// not to its own record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub position: Point,
    /// Rotation in degrees.
    pub rotation: f64,
    pub scale: Vec2,
    /// `false` hides the container and its whole subtree.
    pub visible: bool,
    pub parent: Option<ContainerId>,
    pub view: Option<ViewId>,
    /// Children in z-order (back to front).
    pub children: Vec<ChildRef>,
    #[serde(skip)]
    pub extensions: Extensions,
}

impl Container {
    pub const DEFAULT_SCALE: Vec2 = Vec2::new(1.0, 1.0);

    pub fn new(id: ContainerId, position: Point) -> Self {
        Self {
            id,
            position,
            rotation: 0.0,
            scale: Self::DEFAULT_SCALE,
            visible: true,
            parent: None,
            view: None,
            children: Vec::new(),
            extensions: Extensions::new(),
        }
    }

    pub fn with_parent(mut self, parent: ContainerId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_scale(mut self, sx: f64, sy: f64) -> Self {
        self.scale = Vec2::new(sx, sy);
        self
    }

    /// Map from this container's child space into its parent's space:
    /// rotate, then scale, then translate by the container's position.
    pub fn local_affine(&self) -> Affine {
        Affine::translate(self.position.to_vec2())
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
            * Affine::rotate(self.rotation.to_radians())
    }

    /// Child object ids, in list order.
    pub fn object_children(&self) -> impl Iterator<Item = &ObjectId> {
        self.children.iter().filter_map(ChildRef::as_object)
    }
}
