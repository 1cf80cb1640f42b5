//! Contract for the question-answering assistant
//!
//! The assistant is an outside service. Only its request and response shapes
//! live here.
use super::document::ProductLine;
use super::notes::format_date;
use super::shipment::ShipmentRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ProductLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub answer: String,
    #[serde(default)]
    pub suggested_actions: Option<String>,
    #[serde(default)]
    pub show_suggested_actions: bool,
}

pub trait Assistant {
    fn ask(&self, request: &AssistantRequest) -> anyhow::Result<AssistantResponse>;
}

impl AssistantRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    /// A request carrying the route and delivery date of `record`.
    pub fn for_shipment(
        question: impl Into<String>,
        record: &ShipmentRecord,
        products: &[ProductLine],
    ) -> Self {
        let non_empty = |text: &str| (!text.is_empty()).then(|| text.to_owned());
        Self {
            question: question.into(),
            delivery_date: Some(format_date(&record.estimated_delivery)),
            origin: non_empty(&record.origin),
            destination: non_empty(&record.destination),
            products: products.to_vec(),
        }
    }
}

impl AssistantResponse {
    /// Suggested actions, only when the assistant asked for them to be shown.
    pub fn visible_actions(&self) -> Option<&str> {
        self.suggested_actions
            .as_deref()
            .filter(|_| self.show_suggested_actions)
    }
}
