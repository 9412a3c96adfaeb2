//! BoardWire Core Library
//!
//! CRDT document model and spatial queries shared by the whiteboard and
//! presentation canvases.

pub mod config;
pub mod crdt;
pub mod error;
pub mod ids;
pub mod query;
pub mod scene;
pub mod shapes;
pub mod transform;
pub mod watch;

pub use config::DocumentConfig;
pub use crdt::{BoardDocument, Transaction};
pub use error::{DocError, DocResult};
pub use ids::{ContainerId, IdSource, ObjectId, RandomIds, SequentialIds, TemplateId, ViewId};
pub use scene::{Scene, SceneCache, SceneSource};
pub use shapes::{
    ArrowHead, ChildRef, Container, FontFamily, FontWeight, Geometry, Object, ObjectStyle, SerializableColor,
    StrokeStyle, TextContent, View,
};
pub use transform::{
    AbsoluteTransform, Placement, absolute_bounds, absolute_position, absolute_transform, container_bounds,
};
pub use watch::{ChangeNotice, ChangeOrigin, ChangeTracker};
