//! Views: named rectangular regions (pages, slides, frames).

use super::{Extensions, SerializableColor};
use crate::ids::{TemplateId, ViewId};
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// A named region of canvas space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: ViewId,
    pub name: String,
    /// Region in canvas coordinates.
    pub bounds: Rect,
    /// Template the slide/page was created from.
    pub template: Option<TemplateId>,
    pub background: Option<SerializableColor>,
    #[serde(skip)]
    pub extensions: Extensions,
}

impl View {
    pub fn new(id: ViewId, name: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id,
            name: name.into(),
            bounds,
            template: None,
            background: None,
            extensions: Extensions::new(),
        }
    }

    pub fn with_template(mut self, template: TemplateId) -> Self {
        self.template = Some(template);
        self
    }
}
