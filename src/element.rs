use crate::schema::SchemaCatalog;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Element kind that owns an auxiliary report model (see [`crate::watchpoint`]).
pub const WATCH_TYPE: &str = "watch";
pub const ELLIPSOID_MIRROR_TYPE: &str = "ellipsoidMirror";

/// Identity of a placed element. Unique within a sequence, immutable once
/// assigned, and the only valid cross-reference to an element: array indices
/// go stale at every reorder and at the commit sort.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One placed item in the beamline sequence. Type-specific fields are kept as
/// a generic JSON record; the schema catalog keyed by the same type tag
/// declares which fields exist and how to validate them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// `None` marks a toolbar template that has not been dropped yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ElementId>,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub title: String,
    /// Meters from the source. A total-order key with ties broken by
    /// sequence index; only authoritative after the commit sort.
    #[serde(default)]
    pub position: f64,
    #[serde(default, rename = "isDisabled", skip_serializing_if = "Option::is_none")]
    pub is_disabled: Option<bool>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Element {
    /// Fresh template for a type tag, with schema defaults applied.
    /// Returns `None` for a type the catalog does not know.
    pub fn from_template(catalog: &SchemaCatalog, type_tag: &str) -> Option<Self> {
        let schema = catalog.get(type_tag)?;
        let mut defaults = schema.defaults();
        let title = defaults
            .remove("title")
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| schema.title.clone());
        let position = defaults
            .remove("position")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        Some(Self {
            id: None,
            element_type: type_tag.to_owned(),
            title,
            position,
            is_disabled: None,
            fields: defaults,
        })
    }

    pub fn is_watch(&self) -> bool {
        self.element_type == WATCH_TYPE
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_owned(), value);
    }

    pub fn toggle_disabled(&mut self) {
        self.is_disabled = match self.is_disabled {
            Some(true) => None,
            _ => Some(true),
        };
    }
}
