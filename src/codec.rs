//! Translating shipments to and from external documents
//!
//! The read path ([`decode`]) never fails: listings have to render against
//! whatever historical data the external store holds. The write path is split
//! into planning ([`plan_transition`], [`plan_confirmation`]), which validates
//! against the lifecycle and produces tags and notes, and merging
//! ([`crate::tags::merge_tags`]), which reconciles those tags with the live
//! document.
use super::document::ExternalDocument;
use super::error::InvalidTransition;
use super::notes::{NoteKey, encode_notes, parse_notes};
use super::shipment::ShipmentRecord;
use super::status::{Role, ShipmentState};
use super::tags::{ObservedTags, RawTag, Tag, desired_tags, merge_tags};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

pub const DEFAULT_SYNTHETIC_ID_PREFIX: &str = "doc-";

/// Tags and notes to persist for a shipment, together with the record they
/// were produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub record: ShipmentRecord,
    pub tags: Vec<Tag>,
    pub notes: String,
}

/// Decode a document using the current time for any missing dates.
pub fn decode(document: &ExternalDocument) -> ShipmentRecord {
    decode_at(document, Utc::now(), DEFAULT_SYNTHETIC_ID_PREFIX)
}

/// Decode a document. `now` fills in a missing or unreadable estimated
/// delivery and creation date; `synthetic_id_prefix` is prepended to the
/// document id when no shipment id can be found.
pub fn decode_at(
    document: &ExternalDocument,
    now: DateTime<Utc>,
    synthetic_id_prefix: &str,
) -> ShipmentRecord {
    let observed = ObservedTags::from_raw(&document.tags);
    if observed.statuses.len() > 1 {
        warn!(
            document_id = %document.id,
            statuses = ?observed.statuses,
            "document carries more than one status tag"
        );
    }
    let state = observed
        .primary_state()
        .unwrap_or(ShipmentState::PendingConfirmation);

    let notes = parse_notes(&document.notes);

    let id = notes
        .get(NoteKey::InternalShipmentId)
        .map(str::to_owned)
        .into_iter()
        .chain(document.custom_field(NoteKey::InternalShipmentId.label()))
        .map(|id| id.trim().to_owned())
        .find(|id| !id.is_empty())
        .unwrap_or_else(|| {
            debug!(document_id = %document.id, "no shipment id found, using synthetic id");
            format!("{synthetic_id_prefix}{}", document.id)
        });

    let estimated_delivery = notes.date(NoteKey::EstimatedDelivery).unwrap_or_else(|| {
        debug!(document_id = %document.id, "estimated delivery missing or unreadable");
        now
    });

    let created_at = document
        .date_secs()
        .filter(|secs| *secs > 0)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(now);

    ShipmentRecord {
        id,
        document_id: document.id.clone(),
        title: notes.text(NoteKey::ShipmentTitle),
        origin: notes.text(NoteKey::Origin),
        destination: notes.text(NoteKey::Destination),
        estimated_delivery,
        actual_delivery: notes.date(NoteKey::ActualDelivery),
        issue_description: notes.text(NoteKey::Issue),
        created_at,
        state,
        order_confirmed: observed.order_confirmed || notes.flag(NoteKey::OrderConfirmed),
        foreign_tags: observed.foreign,
    }
}

/// The desired recognized tags and notes text for a record as it stands.
pub fn encode(record: &ShipmentRecord) -> (Vec<Tag>, String) {
    (
        desired_tags(record.state, record.order_confirmed),
        encode_notes(record),
    )
}

/// A fresh document for a record that has never been persisted. The record's
/// foreign tags are carried over.
pub fn encode_document(record: &ShipmentRecord) -> ExternalDocument {
    let (desired, notes) = encode(record);
    let foreign: Vec<RawTag> = record
        .foreign_tags
        .iter()
        .map(|tag| RawTag::from(tag.as_str()))
        .collect();

    let mut document = ExternalDocument::new(record.document_id.clone());
    document.tags = merge_tags(&foreign, &desired)
        .into_iter()
        .map(RawTag::from)
        .collect();
    document.notes = notes;
    document.set_date(record.created_at.timestamp());
    document
}

/// Validate a lifecycle move and produce what must be written for it.
///
/// `confirmation` optionally sets the order-confirmed flag alongside the move;
/// only the track-team may change it. `issue` replaces the issue description
/// when moving into `with-issue` and is ignored otherwise. `now` becomes the
/// actual delivery time if this is the shipment's first delivery.
pub fn plan_transition(
    record: &ShipmentRecord,
    target: ShipmentState,
    role: Role,
    confirmation: Option<bool>,
    issue: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, InvalidTransition> {
    record
        .state
        .check_transition(target, role, record.order_confirmed)?;

    let reject = |reason| InvalidTransition {
        from: record.state,
        to: target,
        role,
        reason,
    };

    let mut next = record.clone();
    next.state = target;

    if let Some(confirmed) = confirmation {
        if confirmed != record.order_confirmed && role != Role::TrackTeam {
            return Err(reject("only the track-team may change order confirmation"));
        }
        next.order_confirmed = confirmed;
    }

    match target {
        ShipmentState::InTransit => {
            if confirmation == Some(false) {
                return Err(reject("a shipment in transit is always confirmed"));
            }
            next.order_confirmed = true;
        }
        ShipmentState::Delivered => {
            next.actual_delivery.get_or_insert(now);
        }
        ShipmentState::WithIssue => {
            if let Some(issue) = issue {
                next.issue_description = issue.trim().to_owned();
            }
        }
        ShipmentState::PendingConfirmation | ShipmentState::Cancelled => {}
    }

    debug!(
        shipment_id = %record.id,
        from = %record.state,
        to = %target,
        %role,
        "planned shipment transition"
    );

    Ok(plan_for(next))
}

/// Confirm an order without moving it. Only the track-team may do this, and
/// only while the shipment is still waiting for confirmation.
pub fn plan_confirmation(
    record: &ShipmentRecord,
    role: Role,
) -> Result<TransitionPlan, InvalidTransition> {
    let reject = |reason| InvalidTransition {
        from: record.state,
        to: record.state,
        role,
        reason,
    };

    if role != Role::TrackTeam {
        return Err(reject("only the track-team may confirm an order"));
    }
    if record.state != ShipmentState::PendingConfirmation {
        return Err(reject("only orders pending confirmation can be confirmed"));
    }

    let mut next = record.clone();
    next.order_confirmed = true;
    Ok(plan_for(next))
}

fn plan_for(record: ShipmentRecord) -> TransitionPlan {
    let (tags, notes) = encode(&record);
    TransitionPlan {
        record,
        tags,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap()
    }

    fn record(state: ShipmentState, confirmed: bool) -> ShipmentRecord {
        let mut record = ShipmentRecord::new("ship1xyz", "inv-9", at(20), at(1));
        record.title = "Spring restock".into();
        record.origin = "Valencia".into();
        record.destination = "Porto".into();
        record.state = state;
        record.order_confirmed = confirmed;
        record
    }

    #[test]
    fn notes_are_written_in_fixed_order() {
        let mut record = record(ShipmentState::WithIssue, true);
        record.issue_description = "Box 3 crushed".into();
        record.actual_delivery = Some(at(18) + chrono::Duration::hours(9));

        let (tags, notes) = encode(&record);
        assert_eq!(
            tags,
            vec![Tag::Status(ShipmentState::WithIssue), Tag::OrderConfirmed]
        );
        assert_eq!(
            notes,
            "Shipment Title: Spring restock\n\
             Origin: Valencia\n\
             Destination: Porto\n\
             Est. Delivery: 2024-06-20\n\
             Internal Shipment ID: ship1xyz\n\
             Order Confirmed: true\n\
             Actual Delivery: 2024-06-18T09:00:00.000Z\n\
             Issue: Box 3 crushed"
        );
    }

    #[test]
    fn optional_lines_are_omitted() {
        let (_, notes) = encode(&record(ShipmentState::PendingConfirmation, false));
        assert!(!notes.contains("Actual Delivery"));
        assert!(!notes.contains("Issue"));
        assert!(notes.ends_with("Order Confirmed: false"));
    }

    #[test]
    fn decode_falls_back_to_synthetic_id_and_now() {
        let now = at(5);
        let record = decode_at(&ExternalDocument::new("inv-77"), now, "doc-");

        assert_eq!(record.id, "doc-inv-77");
        assert_eq!(record.state, ShipmentState::PendingConfirmation);
        assert!(!record.order_confirmed);
        assert_eq!(record.estimated_delivery, now);
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn decode_reads_id_from_custom_field_when_notes_lack_it() {
        let mut document = ExternalDocument::new("inv-3");
        document.extra.insert(
            "customFields".into(),
            serde_json::json!([{"field": "Internal Shipment ID", "value": " ship1custom "}]),
        );
        assert_eq!(decode(&document).id, "ship1custom");

        // a blank notes id does not hide the custom field
        document.notes = "Internal Shipment ID:  ".into();
        assert_eq!(decode(&document).id, "ship1custom");

        document.notes = "Internal Shipment ID: ship1notes".into();
        assert_eq!(decode(&document).id, "ship1notes");
    }

    #[test]
    fn fallback_estimate_settles_on_midnight_after_a_rewrite() {
        let first_read = at(5) + chrono::Duration::minutes(10 * 60 + 30);
        let record = decode_at(&ExternalDocument::new("inv-78"), first_read, "doc-");
        assert_eq!(record.estimated_delivery, first_read);

        let rewritten = encode_document(&record);
        assert!(rewritten.notes.contains("Est. Delivery: 2024-06-05"));

        let reread = decode_at(&rewritten, at(9), "doc-");
        assert_eq!(reread.estimated_delivery, at(5));
        assert_eq!(decode_at(&encode_document(&reread), at(12), "doc-"), reread);
    }

    #[test]
    fn confirmation_from_notes_alone_is_enough() {
        let mut document = ExternalDocument::new("inv-4");
        document.notes = "Order Confirmed: true".into();
        assert!(decode(&document).order_confirmed);
    }

    #[test]
    fn in_transit_confirms_the_order() {
        let plan = plan_transition(
            &record(ShipmentState::PendingConfirmation, false),
            ShipmentState::InTransit,
            Role::TrackTeam,
            None,
            None,
            at(3),
        )
        .unwrap();

        assert!(plan.record.order_confirmed);
        assert_eq!(
            plan.tags,
            vec![Tag::Status(ShipmentState::InTransit), Tag::OrderConfirmed]
        );
    }

    #[test]
    fn delivery_time_is_set_only_once() {
        let mut shipped = record(ShipmentState::InTransit, true);
        shipped.actual_delivery = Some(at(2));

        let plan = plan_transition(
            &shipped,
            ShipmentState::Delivered,
            Role::TrackTeam,
            None,
            None,
            at(9),
        )
        .unwrap();
        assert_eq!(plan.record.actual_delivery, Some(at(2)));

        shipped.actual_delivery = None;
        let plan = plan_transition(
            &shipped,
            ShipmentState::Delivered,
            Role::TrackTeam,
            None,
            None,
            at(9),
        )
        .unwrap();
        assert_eq!(plan.record.actual_delivery, Some(at(9)));
    }

    #[test]
    fn resolving_an_issue_keeps_confirmation() {
        let plan = plan_transition(
            &record(ShipmentState::WithIssue, true),
            ShipmentState::PendingConfirmation,
            Role::Logistics,
            None,
            None,
            at(3),
        )
        .unwrap();

        assert_eq!(plan.record.state, ShipmentState::PendingConfirmation);
        assert!(plan.record.order_confirmed);
    }

    #[test]
    fn logistics_cannot_change_confirmation() {
        let err = plan_transition(
            &record(ShipmentState::WithIssue, true),
            ShipmentState::PendingConfirmation,
            Role::Logistics,
            Some(false),
            None,
            at(3),
        )
        .unwrap_err();
        assert_eq!(err.role, Role::Logistics);
    }

    #[test]
    fn confirmation_without_movement() {
        let pending = record(ShipmentState::PendingConfirmation, false);

        let plan = plan_confirmation(&pending, Role::TrackTeam).unwrap();
        assert_eq!(plan.record.state, ShipmentState::PendingConfirmation);
        assert!(plan.record.order_confirmed);

        assert!(plan_confirmation(&pending, Role::Logistics).is_err());
        assert!(plan_confirmation(&record(ShipmentState::InTransit, true), Role::TrackTeam).is_err());
    }

    #[test]
    fn fresh_document_keeps_foreign_tags() {
        let mut record = record(ShipmentState::PendingConfirmation, false);
        record.foreign_tags = vec!["sensor".into()];

        let document = encode_document(&record);
        assert_eq!(
            document.tags,
            vec![RawTag::from("sensor"), RawTag::from("pendingconfirmation")]
        );
        assert_eq!(decode(&document), record);
    }
}
