//! CRDT integration using Loro for collaborative editing.
//!
//! This module provides the bridge between the runtime object model and
//! Loro's CRDT document.
//!
//! # Schema
//!
//! The Loro document has the following structure:
//! ```text
//! LoroDoc
//! ├── "objects":    LoroMap<ObjectId, LoroMap>      compact object records
//! ├── "containers": LoroMap<ContainerId, LoroMap>   compact container records
//! │                    └── "c": LoroList<ChildRef>  the container's children
//! ├── "root":       LoroList<ChildRef>              root z-order
//! ├── "views":      LoroMap<ViewId, LoroMap>        compact view records
//! └── "view_order": LoroList<String>                presentation order
//! ```
//!
//! A child ref is the list value `[tag, id]`, with tag `0` for an object and
//! `1` for a container. Record maps hold only non-default fields under
//! single- or two-letter keys (see [`convert`]).

pub mod convert;
mod schema;

pub use convert::{
    RecordPatch, StoredRecord, compact_container, compact_object, compact_view, expand_container,
    expand_object, expand_view,
};
pub use schema::{BoardDocument, CONTAINERS_KEY, OBJECTS_KEY, ROOT_KEY, Transaction, VIEW_ORDER_KEY, VIEWS_KEY};

// Re-export Loro types that may be useful for collaboration
pub use loro::{ExportMode, VersionVector};
