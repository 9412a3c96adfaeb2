//! Text content carried by text and sticky-note objects.

use serde::{Deserialize, Serialize};

/// Font family options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontFamily {
    /// Hand-drawn style (default).
    #[default]
    Hand,
    /// Clean sans-serif.
    Sans,
    /// Monospace.
    Mono,
}

impl FontFamily {
    /// Name used by renderers.
    pub fn name(&self) -> &'static str {
        match self {
            FontFamily::Hand => "GelPen",
            FontFamily::Sans => "Noto Sans",
            FontFamily::Mono => "Noto Sans Mono",
        }
    }

    pub(crate) fn code(self) -> i64 {
        match self {
            FontFamily::Hand => 0,
            FontFamily::Sans => 1,
            FontFamily::Mono => 2,
        }
    }

    pub(crate) fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(FontFamily::Hand),
            1 => Some(FontFamily::Sans),
            2 => Some(FontFamily::Mono),
            _ => None,
        }
    }
}

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontWeight {
    Light,
    #[default]
    Regular,
    Heavy,
}

impl FontWeight {
    pub(crate) fn code(self) -> i64 {
        match self {
            FontWeight::Light => 0,
            FontWeight::Regular => 1,
            FontWeight::Heavy => 2,
        }
    }

    pub(crate) fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(FontWeight::Light),
            1 => Some(FontWeight::Regular),
            2 => Some(FontWeight::Heavy),
            _ => None,
        }
    }
}

/// Text and font settings of a text or sticky object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// The text itself.
    pub content: String,
    /// Font size in canvas units.
    pub font_size: f64,
    pub font_family: FontFamily,
    pub font_weight: FontWeight,
}

impl TextContent {
    pub const DEFAULT_FONT_SIZE: f64 = 20.0;

    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_font_family(mut self, family: FontFamily) -> Self {
        self.font_family = family;
        self
    }

    pub fn with_font_weight(mut self, weight: FontWeight) -> Self {
        self.font_weight = weight;
        self
    }
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_size: Self::DEFAULT_FONT_SIZE,
            font_family: FontFamily::default(),
            font_weight: FontWeight::default(),
        }
    }
}
