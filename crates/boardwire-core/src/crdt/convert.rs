//! Conversion between compact wire records and runtime objects.
//!
//! Wire records use short keys and omit every field equal to its default,
//! so absence of a key always means "use the default".

use crate::error::{DocError, DocResult};
use crate::ids::{ContainerId, ObjectId, TemplateId, ViewId};
use crate::shapes::{
    ArrowHead, ChildRef, Container, Extensions, FontFamily, FontWeight, Geometry, Object,
    ObjectStyle, SerializableColor, StrokeStyle, TextContent, View,
};
use kurbo::{Point, Rect, Vec2};
use loro::{LoroMap, LoroMapValue, LoroResult, LoroValue};
use std::collections::BTreeMap;

// Object type codes
const TYPE_FREEHAND: &str = "F";
const TYPE_RECTANGLE: &str = "R";
const TYPE_ELLIPSE: &str = "E";
const TYPE_LINE: &str = "L";
const TYPE_ARROW: &str = "A";
const TYPE_TEXT: &str = "T";
const TYPE_POLYGON: &str = "P";
const TYPE_STICKY: &str = "S";

// Common keys
const KEY_TYPE: &str = "t";
const KEY_X: &str = "x";
const KEY_Y: &str = "y";
const KEY_ROTATION: &str = "r";
const KEY_PIVOT: &str = "o";
const KEY_LOCKED: &str = "l";
const KEY_SNAPPED: &str = "n";
const KEY_VISIBLE: &str = "v";
const KEY_PARENT: &str = "p";
const KEY_VIEW: &str = "g";

// Style keys
const KEY_STROKE_COLOR: &str = "sc";
const KEY_FILL_COLOR: &str = "fc";
const KEY_STROKE_WIDTH: &str = "sw";
const KEY_STROKE_STYLE: &str = "ss";
const KEY_OPACITY: &str = "op";

// Geometry keys
const KEY_WIDTH: &str = "w";
const KEY_HEIGHT: &str = "h";
const KEY_ENDPOINTS: &str = "e";
const KEY_ARROWHEAD: &str = "m";
const KEY_COORDS: &str = "q";

// Text keys
const KEY_CONTENT: &str = "c";
const KEY_FONT_SIZE: &str = "fs";
const KEY_FONT_FAMILY: &str = "ff";
const KEY_FONT_WEIGHT: &str = "fw";

// Container keys
const KEY_SCALE_X: &str = "sx";
const KEY_SCALE_Y: &str = "sy";
/// Key of a container's child list inside its record map.
pub const KEY_CHILDREN: &str = "c";

// View keys
const KEY_NAME: &str = "n";
const KEY_TEMPLATE: &str = "tp";
const KEY_BACKGROUND: &str = "bg";

const COMMON_OBJECT_KEYS: &[&str] = &[
    KEY_TYPE,
    KEY_X,
    KEY_Y,
    KEY_ROTATION,
    KEY_PIVOT,
    KEY_LOCKED,
    KEY_SNAPPED,
    KEY_VISIBLE,
    KEY_PARENT,
    KEY_VIEW,
    KEY_STROKE_COLOR,
    KEY_FILL_COLOR,
    KEY_STROKE_WIDTH,
    KEY_STROKE_STYLE,
    KEY_OPACITY,
];
const BOX_KEYS: &[&str] = &[KEY_WIDTH, KEY_HEIGHT];
const TEXT_BOX_KEYS: &[&str] = &[
    KEY_WIDTH,
    KEY_HEIGHT,
    KEY_CONTENT,
    KEY_FONT_SIZE,
    KEY_FONT_FAMILY,
    KEY_FONT_WEIGHT,
];
const LINE_KEYS: &[&str] = &[KEY_ENDPOINTS];
const ARROW_KEYS: &[&str] = &[KEY_ENDPOINTS, KEY_ARROWHEAD];
const COORD_KEYS: &[&str] = &[KEY_COORDS];
const CONTAINER_KEYS: &[&str] = &[
    KEY_X,
    KEY_Y,
    KEY_ROTATION,
    KEY_SCALE_X,
    KEY_SCALE_Y,
    KEY_VISIBLE,
    KEY_PARENT,
    KEY_VIEW,
    KEY_CHILDREN,
];
const VIEW_KEYS: &[&str] = &[
    KEY_X,
    KEY_Y,
    KEY_WIDTH,
    KEY_HEIGHT,
    KEY_NAME,
    KEY_TEMPLATE,
    KEY_BACKGROUND,
];

/// A compact wire record: short keys mapped to replicated values.
///
/// Keys are kept ordered so two records compare (and print) identically
/// regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredRecord {
    fields: BTreeMap<String, LoroValue>,
}

impl StoredRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a record out of a Loro map value.
    pub fn from_map_value(map: &LoroMapValue) -> Self {
        Self {
            fields: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// Copy a record out of any Loro value; non-maps yield an empty record.
    pub fn from_value(value: &LoroValue) -> Self {
        match value {
            LoroValue::Map(map) => Self::from_map_value(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&LoroValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<LoroValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<LoroValue> {
        self.fields.remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LoroValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Write every field into `map`.
    pub fn write_to(&self, map: &LoroMap) -> LoroResult<()> {
        for (key, value) in &self.fields {
            map.insert(key, value.clone())?;
        }
        Ok(())
    }

    /// Field-level patch turning `self` into `target`: keys to set and keys to delete.
    pub fn diff(&self, target: &StoredRecord) -> RecordPatch {
        let set = target
            .fields
            .iter()
            .filter(|(k, v)| self.fields.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let delete = self
            .fields
            .keys()
            .filter(|k| !target.fields.contains_key(*k))
            .cloned()
            .collect();
        RecordPatch { set, delete }
    }

    /// Render the record as JSON for diagnostics.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), loro_to_json(v)))
                .collect(),
        )
    }
}

/// Changes needed to bring one stored record in line with another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub set: Vec<(String, LoroValue)>,
    pub delete: Vec<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.delete.is_empty()
    }

    /// Apply the patch to a live record map.
    pub fn apply(&self, map: &LoroMap) -> LoroResult<()> {
        for key in &self.delete {
            map.delete(key)?;
        }
        for (key, value) in &self.set {
            map.insert(key, value.clone())?;
        }
        Ok(())
    }
}

/// Render a Loro value as JSON.
pub fn loro_to_json(value: &LoroValue) -> serde_json::Value {
    match value {
        LoroValue::Null => serde_json::Value::Null,
        LoroValue::Bool(b) => serde_json::Value::Bool(*b),
        LoroValue::Double(d) => serde_json::Number::from_f64(*d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        LoroValue::I64(i) => serde_json::Value::from(*i),
        LoroValue::String(s) => serde_json::Value::String(s.to_string()),
        LoroValue::List(list) => serde_json::Value::Array(list.iter().map(loro_to_json).collect()),
        LoroValue::Map(map) => serde_json::Value::Object(
            map.iter().map(|(k, v)| (k.clone(), loro_to_json(v))).collect(),
        ),
        LoroValue::Binary(bytes) => {
            serde_json::Value::Array(bytes.iter().map(|b| serde_json::Value::from(*b)).collect())
        }
        LoroValue::Container(id) => serde_json::Value::String(id.to_string()),
    }
}

// --- Field readers ---

/// Typed access to a record's fields, reporting errors against the record id.
struct Fields<'a> {
    id: &'a str,
    record: &'a StoredRecord,
}

impl<'a> Fields<'a> {
    fn new(id: &'a str, record: &'a StoredRecord) -> Self {
        Self { id, record }
    }

    fn malformed(&self, field: &'static str) -> DocError {
        DocError::MalformedField { id: self.id.to_string(), field }
    }

    fn missing(&self, field: &'static str) -> DocError {
        DocError::MissingField { id: self.id.to_string(), field }
    }

    fn opt_f64(&self, key: &'static str) -> DocResult<Option<f64>> {
        match self.record.get(key) {
            None => Ok(None),
            Some(value) => as_f64(value).map(Some).ok_or_else(|| self.malformed(key)),
        }
    }

    fn f64_or(&self, key: &'static str, default: f64) -> DocResult<f64> {
        Ok(self.opt_f64(key)?.unwrap_or(default))
    }

    fn req_f64(&self, key: &'static str) -> DocResult<f64> {
        self.opt_f64(key)?.ok_or_else(|| self.missing(key))
    }

    fn bool_or(&self, key: &'static str, default: bool) -> DocResult<bool> {
        match self.record.get(key) {
            None => Ok(default),
            Some(LoroValue::Bool(b)) => Ok(*b),
            Some(_) => Err(self.malformed(key)),
        }
    }

    fn opt_string(&self, key: &'static str) -> DocResult<Option<String>> {
        match self.record.get(key) {
            None => Ok(None),
            Some(LoroValue::String(s)) => Ok(Some(s.to_string())),
            Some(_) => Err(self.malformed(key)),
        }
    }

    fn opt_color(&self, key: &'static str) -> DocResult<Option<SerializableColor>> {
        match self.opt_string(key)? {
            None => Ok(None),
            Some(hex) => SerializableColor::from_hex(&hex)
                .map(Some)
                .ok_or_else(|| self.malformed(key)),
        }
    }

    /// Enum code; out-of-range or non-integral values fall back to the default.
    fn code_or<T>(&self, key: &'static str, default: T, decode: fn(i64) -> Option<T>) -> DocResult<T> {
        let Some(code) = self.opt_f64(key)? else {
            return Ok(default);
        };
        let decoded = if code.fract() == 0.0 { decode(code as i64) } else { None };
        Ok(decoded.unwrap_or_else(|| {
            log::warn!("record {}: unknown `{}` code {}, using default", self.id, key, code);
            default
        }))
    }

    fn opt_points(&self, key: &'static str) -> DocResult<Option<Vec<Point>>> {
        let Some(value) = self.record.get(key) else {
            return Ok(None);
        };
        let LoroValue::List(list) = value else {
            return Err(self.malformed(key));
        };
        if list.len() % 2 != 0 {
            return Err(self.malformed(key));
        }
        list.chunks(2)
            .map(|pair| match (as_f64(&pair[0]), as_f64(&pair[1])) {
                (Some(x), Some(y)) => Ok(Point::new(x, y)),
                _ => Err(self.malformed(key)),
            })
            .collect::<DocResult<Vec<_>>>()
            .map(Some)
    }

    fn req_points(&self, key: &'static str) -> DocResult<Vec<Point>> {
        self.opt_points(key)?.ok_or_else(|| self.missing(key))
    }

    /// Keys this schema does not know, kept verbatim.
    fn extensions(&self, known: &[&[&str]]) -> Extensions {
        self.record
            .iter()
            .filter(|(k, _)| !known.iter().any(|set| set.contains(k)))
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Copy extensions into `record`, dropping any that shadow a known key.
fn copy_extensions(record: &mut StoredRecord, extensions: &Extensions, known: &[&[&str]]) {
    for (key, value) in extensions {
        if known.iter().any(|set| set.contains(&key.as_str())) {
            log::debug!("dropping extension `{}` that shadows a known key", key);
            continue;
        }
        record.insert(key.clone(), value.clone());
    }
}

fn as_f64(value: &LoroValue) -> Option<f64> {
    match value {
        LoroValue::Double(d) => Some(*d),
        LoroValue::I64(i) => Some(*i as f64),
        _ => None,
    }
}

fn flatten_points(points: &[Point]) -> LoroValue {
    let coords: Vec<LoroValue> = points
        .iter()
        .flat_map(|p| [LoroValue::Double(p.x), LoroValue::Double(p.y)])
        .collect();
    LoroValue::List(coords.into())
}

fn string_value(s: &str) -> LoroValue {
    LoroValue::String(s.to_string().into())
}

// --- Objects ---

/// Expand a compact object record into its runtime form.
pub fn expand_object(id: &ObjectId, stored: &StoredRecord) -> DocResult<Object> {
    let fields = Fields::new(id.as_str(), stored);
    let type_code = fields
        .opt_string(KEY_TYPE)?
        .ok_or_else(|| fields.missing(KEY_TYPE))?;

    let (geometry, type_keys) = match type_code.as_str() {
        TYPE_FREEHAND => (Geometry::Freehand { points: fields.req_points(KEY_COORDS)? }, COORD_KEYS),
        TYPE_POLYGON => (Geometry::Polygon { vertices: fields.req_points(KEY_COORDS)? }, COORD_KEYS),
        TYPE_RECTANGLE => (
            Geometry::Rectangle {
                width: fields.req_f64(KEY_WIDTH)?,
                height: fields.req_f64(KEY_HEIGHT)?,
            },
            BOX_KEYS,
        ),
        TYPE_ELLIPSE => (
            Geometry::Ellipse {
                width: fields.req_f64(KEY_WIDTH)?,
                height: fields.req_f64(KEY_HEIGHT)?,
            },
            BOX_KEYS,
        ),
        TYPE_LINE => {
            let (start, end) = endpoints(&fields)?;
            (Geometry::Line { start, end }, LINE_KEYS)
        }
        TYPE_ARROW => {
            let (start, end) = endpoints(&fields)?;
            let head = fields.code_or(KEY_ARROWHEAD, ArrowHead::default(), ArrowHead::from_code)?;
            (Geometry::Arrow { start, end, head }, ARROW_KEYS)
        }
        TYPE_TEXT => (
            Geometry::Text {
                width: fields.req_f64(KEY_WIDTH)?,
                height: fields.req_f64(KEY_HEIGHT)?,
                text: text_from_fields(&fields)?,
            },
            TEXT_BOX_KEYS,
        ),
        TYPE_STICKY => (
            Geometry::Sticky {
                width: fields.req_f64(KEY_WIDTH)?,
                height: fields.req_f64(KEY_HEIGHT)?,
                text: text_from_fields(&fields)?,
            },
            TEXT_BOX_KEYS,
        ),
        _ => return Err(DocError::UnknownType(type_code)),
    };

    let pivot = match fields.opt_points(KEY_PIVOT)?.as_deref() {
        None => Object::DEFAULT_PIVOT,
        Some([p]) => *p,
        Some(_) => return Err(fields.malformed(KEY_PIVOT)),
    };

    Ok(Object {
        id: id.clone(),
        position: Point::new(fields.req_f64(KEY_X)?, fields.req_f64(KEY_Y)?),
        rotation: fields.f64_or(KEY_ROTATION, 0.0)?,
        pivot,
        locked: fields.bool_or(KEY_LOCKED, false)?,
        snapped: fields.bool_or(KEY_SNAPPED, false)?,
        visible: fields.bool_or(KEY_VISIBLE, true)?,
        parent: fields.opt_string(KEY_PARENT)?.map(ContainerId::new),
        view: fields.opt_string(KEY_VIEW)?.map(ViewId::new),
        style: style_from_fields(&fields)?,
        geometry,
        extensions: fields.extensions(&[COMMON_OBJECT_KEYS, type_keys]),
    })
}

fn endpoints(fields: &Fields<'_>) -> DocResult<(Point, Point)> {
    match fields.req_points(KEY_ENDPOINTS)?.as_slice() {
        [start, end] => Ok((*start, *end)),
        _ => Err(fields.malformed(KEY_ENDPOINTS)),
    }
}

fn text_from_fields(fields: &Fields<'_>) -> DocResult<TextContent> {
    Ok(TextContent {
        content: fields.opt_string(KEY_CONTENT)?.unwrap_or_default(),
        font_size: fields.f64_or(KEY_FONT_SIZE, TextContent::DEFAULT_FONT_SIZE)?,
        font_family: fields.code_or(KEY_FONT_FAMILY, FontFamily::default(), FontFamily::from_code)?,
        font_weight: fields.code_or(KEY_FONT_WEIGHT, FontWeight::default(), FontWeight::from_code)?,
    })
}

fn style_from_fields(fields: &Fields<'_>) -> DocResult<ObjectStyle> {
    let defaults = ObjectStyle::default();
    Ok(ObjectStyle {
        stroke_color: fields.opt_color(KEY_STROKE_COLOR)?.unwrap_or(defaults.stroke_color),
        fill_color: fields.opt_color(KEY_FILL_COLOR)?,
        stroke_width: fields.f64_or(KEY_STROKE_WIDTH, defaults.stroke_width)?,
        stroke_style: fields.code_or(KEY_STROKE_STYLE, defaults.stroke_style, StrokeStyle::from_code)?,
        opacity: fields.f64_or(KEY_OPACITY, defaults.opacity)?,
    })
}

/// Keys owned by a geometry type, on top of the common object keys.
fn geometry_keys(geometry: &Geometry) -> &'static [&'static str] {
    match geometry {
        Geometry::Freehand { .. } | Geometry::Polygon { .. } => COORD_KEYS,
        Geometry::Rectangle { .. } | Geometry::Ellipse { .. } => BOX_KEYS,
        Geometry::Line { .. } => LINE_KEYS,
        Geometry::Arrow { .. } => ARROW_KEYS,
        Geometry::Text { .. } | Geometry::Sticky { .. } => TEXT_BOX_KEYS,
    }
}

/// Compact a runtime object into its minimal wire record.
pub fn compact_object(obj: &Object) -> StoredRecord {
    let mut record = StoredRecord::new();
    copy_extensions(&mut record, &obj.extensions, &[COMMON_OBJECT_KEYS, geometry_keys(&obj.geometry)]);

    record.insert(KEY_TYPE, string_value(obj.geometry.type_code()));
    record.insert(KEY_X, obj.position.x);
    record.insert(KEY_Y, obj.position.y);
    if obj.rotation != 0.0 {
        record.insert(KEY_ROTATION, obj.rotation);
    }
    if obj.pivot != Object::DEFAULT_PIVOT {
        record.insert(KEY_PIVOT, flatten_points(&[obj.pivot]));
    }
    if obj.locked {
        record.insert(KEY_LOCKED, true);
    }
    if obj.snapped {
        record.insert(KEY_SNAPPED, true);
    }
    if !obj.visible {
        record.insert(KEY_VISIBLE, false);
    }
    if let Some(parent) = &obj.parent {
        record.insert(KEY_PARENT, string_value(parent.as_str()));
    }
    if let Some(view) = &obj.view {
        record.insert(KEY_VIEW, string_value(view.as_str()));
    }
    style_to_record(&obj.style, &mut record);

    match &obj.geometry {
        Geometry::Freehand { points } => record.insert(KEY_COORDS, flatten_points(points)),
        Geometry::Polygon { vertices } => record.insert(KEY_COORDS, flatten_points(vertices)),
        Geometry::Rectangle { width, height } | Geometry::Ellipse { width, height } => {
            record.insert(KEY_WIDTH, *width);
            record.insert(KEY_HEIGHT, *height);
        }
        Geometry::Line { start, end } => record.insert(KEY_ENDPOINTS, flatten_points(&[*start, *end])),
        Geometry::Arrow { start, end, head } => {
            record.insert(KEY_ENDPOINTS, flatten_points(&[*start, *end]));
            if *head != ArrowHead::default() {
                record.insert(KEY_ARROWHEAD, head.code());
            }
        }
        Geometry::Text { width, height, text } | Geometry::Sticky { width, height, text } => {
            record.insert(KEY_WIDTH, *width);
            record.insert(KEY_HEIGHT, *height);
            text_to_record(text, &mut record);
        }
    }

    record
}

fn style_to_record(style: &ObjectStyle, record: &mut StoredRecord) {
    let defaults = ObjectStyle::default();
    if style.stroke_color != defaults.stroke_color {
        record.insert(KEY_STROKE_COLOR, string_value(&style.stroke_color.to_hex()));
    }
    if let Some(fill) = style.fill_color {
        record.insert(KEY_FILL_COLOR, string_value(&fill.to_hex()));
    }
    if style.stroke_width != defaults.stroke_width {
        record.insert(KEY_STROKE_WIDTH, style.stroke_width);
    }
    if style.stroke_style != defaults.stroke_style {
        record.insert(KEY_STROKE_STYLE, style.stroke_style.code());
    }
    if style.opacity != defaults.opacity {
        record.insert(KEY_OPACITY, style.opacity);
    }
}

fn text_to_record(text: &TextContent, record: &mut StoredRecord) {
    if !text.content.is_empty() {
        record.insert(KEY_CONTENT, string_value(&text.content));
    }
    if text.font_size != TextContent::DEFAULT_FONT_SIZE {
        record.insert(KEY_FONT_SIZE, text.font_size);
    }
    if text.font_family != FontFamily::default() {
        record.insert(KEY_FONT_FAMILY, text.font_family.code());
    }
    if text.font_weight != FontWeight::default() {
        record.insert(KEY_FONT_WEIGHT, text.font_weight.code());
    }
}

// --- Containers ---

/// Expand a container record. The child list lives in its own CRDT list and
/// is passed in separately; any `c` entry in `stored` is ignored.
pub fn expand_container(
    id: &ContainerId,
    stored: &StoredRecord,
    children: Vec<ChildRef>,
) -> DocResult<Container> {
    let fields = Fields::new(id.as_str(), stored);
    Ok(Container {
        id: id.clone(),
        position: Point::new(fields.req_f64(KEY_X)?, fields.req_f64(KEY_Y)?),
        rotation: fields.f64_or(KEY_ROTATION, 0.0)?,
        scale: Vec2::new(
            fields.f64_or(KEY_SCALE_X, Container::DEFAULT_SCALE.x)?,
            fields.f64_or(KEY_SCALE_Y, Container::DEFAULT_SCALE.y)?,
        ),
        visible: fields.bool_or(KEY_VISIBLE, true)?,
        parent: fields.opt_string(KEY_PARENT)?.map(ContainerId::new),
        view: fields.opt_string(KEY_VIEW)?.map(ViewId::new),
        children,
        extensions: fields.extensions(&[CONTAINER_KEYS]),
    })
}

/// Compact a container's scalar fields. Children are not included.
pub fn compact_container(container: &Container) -> StoredRecord {
    let mut record = StoredRecord::new();
    copy_extensions(&mut record, &container.extensions, &[CONTAINER_KEYS]);

    record.insert(KEY_X, container.position.x);
    record.insert(KEY_Y, container.position.y);
    if container.rotation != 0.0 {
        record.insert(KEY_ROTATION, container.rotation);
    }
    if container.scale.x != Container::DEFAULT_SCALE.x {
        record.insert(KEY_SCALE_X, container.scale.x);
    }
    if container.scale.y != Container::DEFAULT_SCALE.y {
        record.insert(KEY_SCALE_Y, container.scale.y);
    }
    if !container.visible {
        record.insert(KEY_VISIBLE, false);
    }
    if let Some(parent) = &container.parent {
        record.insert(KEY_PARENT, string_value(parent.as_str()));
    }
    if let Some(view) = &container.view {
        record.insert(KEY_VIEW, string_value(view.as_str()));
    }
    record
}

// --- Views ---

pub fn expand_view(id: &ViewId, stored: &StoredRecord) -> DocResult<View> {
    let fields = Fields::new(id.as_str(), stored);
    let x = fields.req_f64(KEY_X)?;
    let y = fields.req_f64(KEY_Y)?;
    let width = fields.req_f64(KEY_WIDTH)?;
    let height = fields.req_f64(KEY_HEIGHT)?;
    Ok(View {
        id: id.clone(),
        name: fields.opt_string(KEY_NAME)?.unwrap_or_default(),
        bounds: Rect::new(x, y, x + width, y + height),
        template: fields.opt_string(KEY_TEMPLATE)?.map(TemplateId::new),
        background: fields.opt_color(KEY_BACKGROUND)?,
        extensions: fields.extensions(&[VIEW_KEYS]),
    })
}

pub fn compact_view(view: &View) -> StoredRecord {
    let mut record = StoredRecord::new();
    copy_extensions(&mut record, &view.extensions, &[VIEW_KEYS]);

    record.insert(KEY_X, view.bounds.x0);
    record.insert(KEY_Y, view.bounds.y0);
    record.insert(KEY_WIDTH, view.bounds.width());
    record.insert(KEY_HEIGHT, view.bounds.height());
    if !view.name.is_empty() {
        record.insert(KEY_NAME, string_value(&view.name));
    }
    if let Some(template) = &view.template {
        record.insert(KEY_TEMPLATE, string_value(template.as_str()));
    }
    if let Some(background) = view.background {
        record.insert(KEY_BACKGROUND, string_value(&background.to_hex()));
    }
    record
}

/// Parent pointer of an object or container record, read without expanding it.
pub fn stored_parent(stored: &StoredRecord) -> Option<ContainerId> {
    match stored.get(KEY_PARENT) {
        Some(LoroValue::String(s)) => Some(ContainerId::new(s.to_string())),
        _ => None,
    }
}

/// Set or clear the parent pointer on a live record map.
pub fn write_parent(map: &LoroMap, parent: Option<&ContainerId>) -> LoroResult<()> {
    match parent {
        Some(parent) => map.insert(KEY_PARENT, string_value(parent.as_str())),
        None if map.get(KEY_PARENT).is_some() => map.delete(KEY_PARENT),
        None => Ok(()),
    }
}

// --- Child refs ---

/// Encode a child ref as the `[tag, id]` list value stored in z-order lists.
pub fn child_ref_to_loro(child: &ChildRef) -> LoroValue {
    LoroValue::List(vec![LoroValue::I64(child.tag()), string_value(child.id_str())].into())
}

/// Decode a `[tag, id]` entry. Unknown tags and malformed entries yield `None`.
pub fn child_ref_from_loro(value: &LoroValue) -> Option<ChildRef> {
    let LoroValue::List(pair) = value else {
        return None;
    };
    let [tag, LoroValue::String(id)] = pair.as_slice() else {
        return None;
    };
    match as_f64(tag)? as i64 {
        0 => Some(ChildRef::Object(ObjectId::new(id.to_string()))),
        1 => Some(ChildRef::Container(ContainerId::new(id.to_string()))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(s: &str) -> ObjectId {
        ObjectId::new(s)
    }

    fn text() -> TextContent {
        TextContent::new("hello")
            .with_font_size(32.0)
            .with_font_family(FontFamily::Mono)
            .with_font_weight(FontWeight::Heavy)
    }

    fn all_geometries() -> Vec<Geometry> {
        vec![
            Geometry::Freehand { points: vec![Point::new(0.0, 0.0), Point::new(3.5, -2.0), Point::new(7.0, 1.0)] },
            Geometry::Rectangle { width: 150.0, height: 80.0 },
            Geometry::Ellipse { width: 40.0, height: 20.0 },
            Geometry::Line { start: Point::new(0.0, 0.0), end: Point::new(10.0, 5.0) },
            Geometry::Arrow { start: Point::new(1.0, 2.0), end: Point::new(3.0, 4.0), head: ArrowHead::Both },
            Geometry::Text { width: 200.0, height: 40.0, text: text() },
            Geometry::Polygon { vertices: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 8.0)] },
            Geometry::Sticky { width: 120.0, height: 120.0, text: TextContent::new("note") },
        ]
    }

    fn styled(geometry: Geometry) -> Object {
        let mut obj = Object::new(oid("obj1"), Point::new(100.0, 200.0), geometry);
        obj.rotation = 33.0;
        obj.pivot = Point::new(0.0, 1.0);
        obj.locked = true;
        obj.snapped = true;
        obj.visible = false;
        obj.parent = Some(ContainerId::new("group"));
        obj.view = Some(ViewId::new("slide"));
        obj.style = ObjectStyle {
            stroke_color: SerializableColor::new(255, 0, 0, 255),
            fill_color: Some(SerializableColor::new(0, 255, 0, 128)),
            stroke_width: 3.0,
            stroke_style: StrokeStyle::Dotted,
            opacity: 0.5,
        };
        obj
    }

    #[test]
    fn test_roundtrip_all_variants_with_defaults() {
        for geometry in all_geometries() {
            let original = Object::new(oid("obj1"), Point::new(10.0, 20.0), geometry);
            let recovered = expand_object(&original.id, &compact_object(&original)).expect("expand");
            assert_eq!(recovered, original);
        }
    }

    #[test]
    fn test_roundtrip_all_variants_fully_styled() {
        for geometry in all_geometries() {
            let original = styled(geometry);
            let recovered = expand_object(&original.id, &compact_object(&original)).expect("expand");
            assert_eq!(recovered, original);
        }
    }

    #[test]
    fn test_default_fields_are_omitted() {
        let obj = Object::rectangle(oid("r"), Point::new(1.0, 2.0), 3.0, 4.0);
        let record = compact_object(&obj);
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["h", "t", "w", "x", "y"]);
    }

    #[test]
    fn test_default_arrowhead_and_text_omitted() {
        let arrow = Object::new(
            oid("a"),
            Point::ZERO,
            Geometry::Arrow { start: Point::ZERO, end: Point::new(1.0, 1.0), head: ArrowHead::End },
        );
        assert!(!compact_object(&arrow).contains_key(KEY_ARROWHEAD));

        let sticky = Object::new(
            oid("s"),
            Point::ZERO,
            Geometry::Sticky { width: 1.0, height: 1.0, text: TextContent::default() },
        );
        let record = compact_object(&sticky);
        assert!(!record.contains_key(KEY_CONTENT));
        assert!(!record.contains_key(KEY_FONT_SIZE));
    }

    #[test]
    fn test_points_are_flattened() {
        let obj = Object::new(
            oid("f"),
            Point::ZERO,
            Geometry::Freehand { points: vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)] },
        );
        let record = compact_object(&obj);
        let expected = LoroValue::List(
            vec![
                LoroValue::Double(1.0),
                LoroValue::Double(2.0),
                LoroValue::Double(3.0),
                LoroValue::Double(4.0),
            ]
            .into(),
        );
        assert_eq!(record.get(KEY_COORDS), Some(&expected));
    }

    #[test]
    fn test_explicit_defaults_normalize_away() {
        let mut record = StoredRecord::new();
        record.insert(KEY_TYPE, string_value("E"));
        record.insert(KEY_X, 1.0);
        record.insert(KEY_Y, 2.0);
        record.insert(KEY_WIDTH, 3.0);
        record.insert(KEY_HEIGHT, 4.0);
        record.insert(KEY_ROTATION, 0.0);
        record.insert(KEY_LOCKED, false);
        record.insert(KEY_OPACITY, 1.0);
        record.insert(KEY_STROKE_COLOR, string_value("#000"));

        let compacted = compact_object(&expand_object(&oid("e"), &record).expect("expand"));
        assert_eq!(compacted.len(), 5);
        // Compacting a default-free record is a fixed point.
        let again = compact_object(&expand_object(&oid("e"), &compacted).expect("expand"));
        assert_eq!(again, compacted);
    }

    #[test]
    fn test_integer_numbers_accepted() {
        let mut record = StoredRecord::new();
        record.insert(KEY_TYPE, string_value("R"));
        record.insert(KEY_X, LoroValue::I64(5));
        record.insert(KEY_Y, LoroValue::I64(6));
        record.insert(KEY_WIDTH, LoroValue::I64(7));
        record.insert(KEY_HEIGHT, LoroValue::I64(8));
        let obj = expand_object(&oid("r"), &record).expect("expand");
        assert_eq!(obj.position, Point::new(5.0, 6.0));
        assert_eq!(obj.geometry, Geometry::Rectangle { width: 7.0, height: 8.0 });
    }

    #[test]
    fn test_unknown_type_is_error() {
        let mut record = StoredRecord::new();
        record.insert(KEY_TYPE, string_value("Z"));
        record.insert(KEY_X, 0.0);
        record.insert(KEY_Y, 0.0);
        let err = expand_object(&oid("z"), &record).unwrap_err();
        assert!(matches!(err, DocError::UnknownType(code) if code == "Z"));
    }

    #[test]
    fn test_missing_and_malformed_fields() {
        let mut record = StoredRecord::new();
        record.insert(KEY_TYPE, string_value("R"));
        record.insert(KEY_X, 0.0);
        record.insert(KEY_Y, 0.0);
        record.insert(KEY_WIDTH, 1.0);
        let err = expand_object(&oid("r"), &record).unwrap_err();
        assert!(matches!(err, DocError::MissingField { field: "h", .. }));

        record.insert(KEY_HEIGHT, string_value("tall"));
        let err = expand_object(&oid("r"), &record).unwrap_err();
        assert!(matches!(err, DocError::MalformedField { field: "h", .. }));
    }

    #[test]
    fn test_odd_coordinate_list_is_malformed() {
        let mut record = StoredRecord::new();
        record.insert(KEY_TYPE, string_value("P"));
        record.insert(KEY_X, 0.0);
        record.insert(KEY_Y, 0.0);
        record.insert(KEY_COORDS, LoroValue::List(vec![LoroValue::Double(1.0)].into()));
        assert!(matches!(
            expand_object(&oid("p"), &record),
            Err(DocError::MalformedField { field: "q", .. })
        ));
    }

    #[test]
    fn test_unknown_enum_code_falls_back() {
        let mut record = compact_object(&Object::new(
            oid("t"),
            Point::ZERO,
            Geometry::Text { width: 1.0, height: 1.0, text: TextContent::new("x") },
        ));
        record.insert(KEY_FONT_FAMILY, LoroValue::I64(99));
        let obj = expand_object(&oid("t"), &record).expect("expand");
        assert_eq!(obj.geometry.text().map(|t| t.font_family), Some(FontFamily::Hand));
    }

    #[test]
    fn test_fractional_enum_code_falls_back() {
        let mut record = compact_object(&Object::rectangle(oid("r"), Point::ZERO, 1.0, 1.0));
        record.insert(KEY_STROKE_STYLE, 1.7);
        let obj = expand_object(&oid("r"), &record).expect("expand");
        assert_eq!(obj.style.stroke_style, StrokeStyle::Solid);

        record.insert(KEY_STROKE_STYLE, 1.0);
        let obj = expand_object(&oid("r"), &record).expect("expand");
        assert_eq!(obj.style.stroke_style, StrokeStyle::Dashed);
    }

    #[test]
    fn test_extension_fields_survive_roundtrip() {
        let mut record = compact_object(&Object::rectangle(oid("r"), Point::ZERO, 1.0, 1.0));
        record.insert("zz", string_value("from the future"));
        record.insert("blur", 4.0);

        let obj = expand_object(&oid("r"), &record).expect("expand");
        assert_eq!(obj.extensions.len(), 2);
        assert_eq!(compact_object(&obj), record);
    }

    #[test]
    fn test_known_key_wins_over_extension() {
        let mut obj = Object::rectangle(oid("r"), Point::new(1.0, 1.0), 1.0, 1.0);
        obj.extensions.insert(KEY_X.to_string(), LoroValue::Double(99.0));
        let record = compact_object(&obj);
        assert_eq!(record.get(KEY_X), Some(&LoroValue::Double(1.0)));

        // Also when the known field sits at its default and is omitted.
        obj.extensions.insert(KEY_ROTATION.to_string(), LoroValue::Double(45.0));
        obj.extensions.insert(KEY_WIDTH.to_string(), LoroValue::Double(7.0));
        let record = compact_object(&obj);
        assert!(!record.contains_key(KEY_ROTATION));
        assert_eq!(record.get(KEY_WIDTH), Some(&LoroValue::Double(1.0)));
        let recovered = expand_object(&obj.id, &record).expect("expand");
        assert_eq!(recovered.rotation, 0.0);
        assert!(recovered.extensions.is_empty());

        // A key that only another geometry type knows stays an extension.
        let geometry = Geometry::Line { start: Point::ZERO, end: Point::new(1.0, 0.0) };
        let mut line = Object::new(oid("l"), Point::ZERO, geometry);
        line.extensions.insert(KEY_WIDTH.to_string(), LoroValue::Double(7.0));
        assert_eq!(compact_object(&line).get(KEY_WIDTH), Some(&LoroValue::Double(7.0)));
    }

    #[test]
    fn test_known_container_and_view_keys_win_over_extensions() {
        let mut container = Container::new(ContainerId::new("c1"), Point::ZERO);
        container.extensions.insert(KEY_SCALE_X.to_string(), LoroValue::Double(3.0));
        container.extensions.insert(KEY_CHILDREN.to_string(), LoroValue::Double(1.0));
        let record = compact_container(&container);
        assert!(!record.contains_key(KEY_SCALE_X));
        assert!(!record.contains_key(KEY_CHILDREN));
        let recovered = expand_container(&container.id, &record, Vec::new()).expect("expand");
        assert_eq!(recovered.scale.x, 1.0);

        let mut view = View::new(ViewId::new("v1"), "", Rect::new(0.0, 0.0, 10.0, 10.0));
        view.extensions.insert(KEY_NAME.to_string(), string_value("Shadow"));
        let record = compact_view(&view);
        assert!(!record.contains_key(KEY_NAME));
        assert_eq!(expand_view(&view.id, &record).expect("expand").name, "");
    }

    #[test]
    fn test_container_roundtrip() {
        let mut container = Container::new(ContainerId::new("c1"), Point::new(5.0, 6.0))
            .with_rotation(-45.0)
            .with_scale(2.0, 0.5)
            .with_parent(ContainerId::new("outer"));
        container.visible = false;
        container.view = Some(ViewId::new("v"));

        let record = compact_container(&container);
        assert!(!record.contains_key(KEY_CHILDREN));
        let recovered = expand_container(&container.id, &record, Vec::new()).expect("expand");
        assert_eq!(recovered, container);

        let plain = compact_container(&Container::new(ContainerId::new("c2"), Point::ZERO));
        assert_eq!(plain.len(), 2);
    }

    #[test]
    fn test_view_roundtrip() {
        let mut view = View::new(ViewId::new("v1"), "Intro", Rect::new(0.0, 0.0, 1920.0, 1080.0))
            .with_template(TemplateId::new("title"));
        view.background = Some(SerializableColor::white());
        let recovered = expand_view(&view.id, &compact_view(&view)).expect("expand");
        assert_eq!(recovered, view);
    }

    #[test]
    fn test_child_ref_encoding() {
        let object = ChildRef::Object(oid("a"));
        let container = ChildRef::Container(ContainerId::new("b"));
        assert_eq!(child_ref_from_loro(&child_ref_to_loro(&object)), Some(object));
        assert_eq!(child_ref_from_loro(&child_ref_to_loro(&container)), Some(container));

        let bogus = LoroValue::List(vec![LoroValue::I64(7), string_value("x")].into());
        assert_eq!(child_ref_from_loro(&bogus), None);
        assert_eq!(child_ref_from_loro(&string_value("x")), None);
    }

    #[test]
    fn test_stored_parent() {
        let child = Object::rectangle(oid("r"), Point::ZERO, 1.0, 1.0).with_parent(ContainerId::new("g"));
        assert_eq!(stored_parent(&compact_object(&child)), Some(ContainerId::new("g")));
        let root = Object::rectangle(oid("r"), Point::ZERO, 1.0, 1.0);
        assert_eq!(stored_parent(&compact_object(&root)), None);
    }

    #[test]
    fn test_record_diff() {
        let before = compact_object(&Object::rectangle(oid("r"), Point::ZERO, 1.0, 1.0).with_rotation(10.0));
        let after = compact_object(&Object::rectangle(oid("r"), Point::new(5.0, 0.0), 1.0, 1.0));
        let patch = before.diff(&after);
        assert_eq!(patch.set, vec![(KEY_X.to_string(), LoroValue::Double(5.0))]);
        assert_eq!(patch.delete, vec![KEY_ROTATION.to_string()]);
        assert!(after.diff(&after).is_empty());
    }

    #[test]
    fn test_record_to_json() {
        let record = compact_object(&Object::rectangle(oid("r"), Point::ZERO, 2.0, 3.0));
        let json = record.to_json();
        assert_eq!(json["t"], "R");
        assert_eq!(json["w"], 2.0);
    }
}
