//! The `Key: Value` notes micro-format
//!
//! Attributes the external store has no field for are kept in the document's
//! free-text notes, one `Key: Value` line each. The key list below is the
//! single source of truth for both the write order and the read lookup. Labels
//! are independent of struct field names; previously written documents must
//! keep decoding byte for byte.
//!
//! Values are written verbatim. A value holding a newline is cut at the
//! newline on the next read; the external store has no escaping convention.
use super::shipment::ShipmentRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::collections::HashMap;

const SEPARATOR: &str = ": ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteKey {
    ShipmentTitle,
    Origin,
    Destination,
    EstimatedDelivery,
    InternalShipmentId,
    OrderConfirmed,
    ActualDelivery,
    Issue,
}

impl NoteKey {
    /// Write order.
    pub const ORDERED: [NoteKey; 8] = [
        Self::ShipmentTitle,
        Self::Origin,
        Self::Destination,
        Self::EstimatedDelivery,
        Self::InternalShipmentId,
        Self::OrderConfirmed,
        Self::ActualDelivery,
        Self::Issue,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::ShipmentTitle => "Shipment Title",
            Self::Origin => "Origin",
            Self::Destination => "Destination",
            Self::EstimatedDelivery => "Est. Delivery",
            Self::InternalShipmentId => "Internal Shipment ID",
            Self::OrderConfirmed => "Order Confirmed",
            Self::ActualDelivery => "Actual Delivery",
            Self::Issue => "Issue",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ORDERED.into_iter().find(|key| key.label() == label)
    }

    /// The value written for this key, or `None` when the line is omitted.
    fn format(self, record: &ShipmentRecord) -> Option<String> {
        match self {
            Self::ShipmentTitle => Some(record.title.clone()),
            Self::Origin => Some(record.origin.clone()),
            Self::Destination => Some(record.destination.clone()),
            Self::EstimatedDelivery => Some(format_date(&record.estimated_delivery)),
            Self::InternalShipmentId => Some(record.id.clone()),
            Self::OrderConfirmed => Some(record.order_confirmed.to_string()),
            Self::ActualDelivery => record.actual_delivery.as_ref().map(format_timestamp),
            Self::Issue => {
                (!record.issue_description.is_empty()).then(|| record.issue_description.clone())
            }
        }
    }
}

/// Build the notes text for a record.
pub fn encode_notes(record: &ShipmentRecord) -> String {
    NoteKey::ORDERED
        .into_iter()
        .filter_map(|key| {
            key.format(record)
                .map(|value| format!("{}{SEPARATOR}{value}", key.label()))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Notes as read back from a document. Unknown keys are dropped; a repeated
/// key keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedNotes {
    values: HashMap<NoteKey, String>,
}

impl ParsedNotes {
    pub fn get(&self, key: NoteKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn text(&self, key: NoteKey) -> String {
        self.get(key).unwrap_or_default().to_owned()
    }

    pub fn date(&self, key: NoteKey) -> Option<DateTime<Utc>> {
        self.get(key).and_then(parse_date)
    }

    pub fn flag(&self, key: NoteKey) -> bool {
        self.get(key)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }
}

pub fn parse_notes(notes: &str) -> ParsedNotes {
    let values = notes
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter_map(|line| line.split_once(SEPARATOR))
        .filter_map(|(label, value)| {
            NoteKey::from_label(label.trim()).map(|key| (key, value.to_owned()))
        })
        .collect();

    ParsedNotes { values }
}

/// `yyyy-MM-dd`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2024-06-15T10:30:00.000Z`.
pub fn format_timestamp(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Full timestamps are taken as written; date-only values mean UTC midnight.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(date.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}
