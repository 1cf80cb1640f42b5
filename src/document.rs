//! The third-party invoice document that backs every shipment
//!
//! Only `id`, `tags` and `notes` are held as typed fields. Everything else,
//! including `date`, `products` and `customFields`, stays as the raw JSON the
//! store sent so a write never reshapes fields this crate doesn't own. The
//! accessors below read those fields leniently: an entry that doesn't look
//! right is skipped, never an error.
use super::notes::parse_date;
use super::tags::RawTag;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const DATE: &str = "date";
const PRODUCTS: &str = "products";
const CUSTOM_FIELDS: &str = "customFields";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalDocument {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<RawTag>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub notes: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    #[serde(default, deserialize_with = "lenient_key")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_units")]
    pub units: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(default, deserialize_with = "lenient_text")]
    pub field: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub value: String,
}

impl ExternalDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Creation time in unix seconds. Accepts integers, floats and date
    /// strings; anything else reads as absent.
    pub fn date_secs(&self) -> Option<i64> {
        match self.extra.get(DATE)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|secs| secs as i64)),
            Value::String(text) => parse_date(text).map(|date| date.timestamp()),
            _ => None,
        }
    }

    pub fn set_date(&mut self, secs: i64) {
        self.extra.insert(DATE.into(), Value::from(secs));
    }

    /// Product lines that can be read. Entries that are not objects are
    /// skipped.
    pub fn products(&self) -> Vec<ProductLine> {
        array_entries(self.extra.get(PRODUCTS))
    }

    pub fn set_products(&mut self, products: &[ProductLine]) -> serde_json::Result<()> {
        self.extra
            .insert(PRODUCTS.into(), serde_json::to_value(products)?);
        Ok(())
    }

    pub fn custom_fields(&self) -> Vec<CustomField> {
        array_entries(self.extra.get(CUSTOM_FIELDS))
    }

    pub fn custom_field(&self, name: &str) -> Option<String> {
        self.custom_fields()
            .into_iter()
            .find(|field| field.field == name)
            .map(|field| field.value)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl ProductLine {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, units: u64) -> Self {
        Self {
            product_id: Some(product_id.into()),
            name: name.into(),
            units,
            extra: Map::new(),
        }
    }
}

fn array_entries<'a, T: Deserialize<'a>>(value: Option<&'a Value>) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| T::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(de::Error::custom(format!(
            "document id must be a string or number, got {other}"
        ))),
    }
}

fn lenient_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<RawTag>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| RawTag::deserialize(&item).unwrap_or(RawTag::Unrecognized(item)))
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(key) if !key.is_empty() => Some(key),
        Value::Number(key) => Some(key.to_string()),
        _ => None,
    })
}

/// Whole units; fractional counts are floored, anything else is zero.
fn lenient_units<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|units| *units > 0.0).map(|units| units as u64))
            .unwrap_or_default(),
        _ => 0,
    })
}
