//! Shipment records and drafts
use super::document::ProductLine;
use super::error::ShipmentError;
use super::status::ShipmentState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A shipment as projected from an external document. Never stored on its
/// own; rebuilt from tags and notes on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRecord {
    pub id: String,
    pub document_id: String, // id of the backing external document
    pub title: String,
    pub origin: String,
    pub destination: String,
    pub estimated_delivery: DateTime<Utc>,
    pub actual_delivery: Option<DateTime<Utc>>, // set once, on first delivery
    pub issue_description: String,
    pub created_at: DateTime<Utc>,
    pub state: ShipmentState,
    pub order_confirmed: bool,
    pub foreign_tags: Vec<String>, // unrecognized tags seen on the last read
}

impl ShipmentRecord {
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        estimated_delivery: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            title: String::new(),
            origin: String::new(),
            destination: String::new(),
            estimated_delivery,
            actual_delivery: None,
            issue_description: String::new(),
            created_at,
            state: ShipmentState::PendingConfirmation,
            order_confirmed: false,
            foreign_tags: Vec::new(),
        }
    }
}

/// Used by logistics to describe a shipment before it exists anywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentDraft {
    pub title: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub products: Vec<ProductLine>,
    pub tags: Vec<String>, // extra foreign tags to attach on creation
}

impl ShipmentDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_owned());
        self
    }
    pub fn set_origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_owned());
        self
    }
    pub fn set_destination(mut self, destination: &str) -> Self {
        self.destination = Some(destination.to_owned());
        self
    }
    pub fn set_estimated_delivery(mut self, date: DateTime<Utc>) -> Self {
        self.estimated_delivery = Some(date);
        self
    }
    pub fn add_product(mut self, product: ProductLine) -> Self {
        self.products.push(product);
        self
    }
    pub fn add_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_owned());
        self
    }

    /// Checks required fields and returns a record in its initial state.
    ///
    /// Free-text fields may not contain line breaks, since the notes format
    /// would silently cut them on the next read.
    pub fn validate_and_finalise(
        &self,
        id: String,
        document_id: String,
        created_at: DateTime<Utc>,
    ) -> Result<ShipmentRecord, ShipmentError> {
        let title = required_text(self.title.as_deref(), "title is missing")?;
        let origin = required_text(self.origin.as_deref(), "origin is missing")?;
        let destination = required_text(self.destination.as_deref(), "destination is missing")?;
        let estimated_delivery = self
            .estimated_delivery
            .ok_or(ShipmentError::InvalidDraft("estimated delivery is missing"))?;

        if self.products.is_empty() {
            return Err(ShipmentError::InvalidDraft("a shipment needs at least one product"));
        }
        if self.products.iter().any(|product| product.units == 0) {
            return Err(ShipmentError::InvalidDraft("product units must be positive"));
        }
        if self.products.iter().any(|product| product.product_id.is_none()) {
            return Err(ShipmentError::InvalidDraft("every product needs a product id"));
        }

        let mut record = ShipmentRecord::new(id, document_id, estimated_delivery, created_at);
        record.title = title;
        record.origin = origin;
        record.destination = destination;
        record.foreign_tags = self.tags.clone();
        Ok(record)
    }
}

fn required_text(value: Option<&str>, missing: &'static str) -> Result<String, ShipmentError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(ShipmentError::InvalidDraft(missing));
    }
    if value.contains(['\n', '\r']) {
        return Err(ShipmentError::InvalidDraft("text fields must be a single line"));
    }
    Ok(value.to_owned())
}
