use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Closed set of field value kinds an element schema can declare.
/// Validation of a concrete value against a kind lives in [`crate::validate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldType {
    Float {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Int {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Bool,
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Enum {
        /// `(stored value, display label)` pairs.
        choices: Vec<(String, String)>,
    },
    InputFile,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(rename = "kind")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Ordered field list for one model (element kind or report kind).
/// Field order is presentation order, so this is Vec-backed, not a map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub title: String,
    #[serde(default, rename = "report", skip_serializing_if = "std::ops::Not::not")]
    pub is_report: bool,
    pub fields: Vec<FieldSpec>,
}

impl ModelSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Schema defaults as a JSON object, `Null` where no default is declared.
    pub fn defaults(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    f.default.clone().unwrap_or(Value::Null),
                )
            })
            .collect()
    }
}

/// Registry of model schemas keyed by type tag. New element kinds are added
/// through [`SchemaCatalog::register_model`] without touching the editing core.
#[derive(Clone, Debug)]
pub struct SchemaCatalog {
    models: HashMap<String, ModelSchema>,
}

impl SchemaCatalog {
    pub fn from_json_str(data: &str) -> Self {
        let models: HashMap<String, ModelSchema> =
            serde_json::from_str(data).expect("Invalid schema JSON");
        Self { models }
    }

    pub fn empty() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    pub fn register_model(&mut self, type_tag: &str, schema: ModelSchema) {
        self.models.insert(type_tag.to_owned(), schema);
    }

    pub fn get(&self, type_tag: &str) -> Option<&ModelSchema> {
        self.models.get(type_tag)
    }

    pub fn fields_for(&self, type_tag: &str) -> Option<&[FieldSpec]> {
        self.models.get(type_tag).map(|m| m.fields.as_slice())
    }

    pub fn title_for(&self, model_name: &str) -> Option<&str> {
        self.models.get(model_name).map(|m| m.title.as_str())
    }

    pub fn model_defaults(&self, model_name: &str) -> Map<String, Value> {
        self.models
            .get(model_name)
            .map(|m| m.defaults())
            .unwrap_or_default()
    }

    /// Type tags usable as beamline elements, sorted for stable display.
    pub fn element_types(&self) -> Vec<String> {
        self.models
            .iter()
            .filter(|(_, m)| !m.is_report)
            .map(|(name, _)| name.clone())
            .sorted()
            .collect()
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::from_json_str(include_str!("../assets/beamline_schema.json"))
    }
}
