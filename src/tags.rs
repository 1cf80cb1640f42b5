//! Tag normalization, partitioning and the merge-on-update rule
//!
//! The external store keeps tags as a loose collection. Some entries arrive as
//! bare strings, some wrapped as `{"name": ...}`, and anything else is treated
//! as noise. Only the five status tags and `order-confirmed` belong to this
//! crate; every other tag is foreign and must survive a merge untouched.
use super::status::{PRIORITY_ORDER, ShipmentState};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ORDER_CONFIRMED: &str = "order-confirmed";

/// A tag exactly as the external store hands it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTag {
    Bare(String),
    Wrapped { name: String },
    Unrecognized(serde_json::Value),
}

/// A normalized tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Status(ShipmentState),
    OrderConfirmed,
    Foreign(String),
}

impl RawTag {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Bare(name) | Self::Wrapped { name } => Some(name),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<&str> for RawTag {
    fn from(value: &str) -> Self {
        Self::Bare(value.to_owned())
    }
}

impl From<String> for RawTag {
    fn from(value: String) -> Self {
        Self::Bare(value)
    }
}

impl Tag {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Foreign(_))
    }

    /// Lowercase, hyphenated form used inside this crate.
    pub fn internal_name(&self) -> &str {
        match self {
            Self::Status(state) => state.as_str(),
            Self::OrderConfirmed => ORDER_CONFIRMED,
            Self::Foreign(name) => name,
        }
    }

    /// The form written back to the external store: recognized tags lose their
    /// hyphens, foreign tags pass through as normalized.
    pub fn external_name(&self) -> String {
        match self {
            Self::Foreign(name) => name.clone(),
            recognized => recognized.internal_name().replace('-', ""),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.internal_name())
    }
}

fn compact(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect()
}

/// Normalize a raw tag. Returns `None` for shapes that carry no usable name.
/// Foreign tags are lowercased and otherwise kept as written.
pub fn normalize_tag(raw: &RawTag) -> Option<Tag> {
    let name = raw.text()?.to_lowercase();
    if name.trim().is_empty() {
        return None;
    }

    let key = compact(&name);
    if key == compact(ORDER_CONFIRMED) {
        return Some(Tag::OrderConfirmed);
    }
    if let Some(state) = ShipmentState::ALL
        .into_iter()
        .find(|state| compact(state.as_str()) == key)
    {
        return Some(Tag::Status(state));
    }

    Some(Tag::Foreign(name))
}

/// The recognized tags that express `state` and the confirmation flag.
pub fn desired_tags(state: ShipmentState, order_confirmed: bool) -> Vec<Tag> {
    let mut tags = vec![Tag::Status(state)];
    if order_confirmed {
        tags.push(Tag::OrderConfirmed);
    }
    tags
}

/// Tags of a document split into what this crate understands and what it
/// must carry along.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedTags {
    pub statuses: Vec<ShipmentState>,
    pub order_confirmed: bool,
    pub foreign: Vec<String>,
}

impl ObservedTags {
    pub fn from_raw(raw: &[RawTag]) -> Self {
        let mut observed = Self::default();
        for tag in raw.iter().filter_map(normalize_tag) {
            match tag {
                Tag::Status(state) => {
                    if !observed.statuses.contains(&state) {
                        observed.statuses.push(state);
                    }
                }
                Tag::OrderConfirmed => observed.order_confirmed = true,
                Tag::Foreign(name) => {
                    if !observed.foreign.contains(&name) {
                        observed.foreign.push(name);
                    }
                }
            }
        }
        observed
    }

    /// The current status: first of [`PRIORITY_ORDER`] present, or `None`
    /// when the document carries no status tag at all.
    pub fn primary_state(&self) -> Option<ShipmentState> {
        PRIORITY_ORDER
            .into_iter()
            .find(|state| self.statuses.contains(state))
    }
}

/// `final = (live - recognized) ∪ desired`, deduplicated and in external
/// form. Foreign tags keep their live order and come first.
pub fn merge_tags(live: &[RawTag], desired: &[Tag]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    let foreign = live
        .iter()
        .filter_map(normalize_tag)
        .filter(|tag| !tag.is_recognized());

    for tag in foreign.chain(desired.iter().cloned()) {
        let name = tag.external_name();
        if !merged.contains(&name) {
            merged.push(name);
        }
    }
    merged
}
