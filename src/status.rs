//! Shipment lifecycle states, roles and the transition table
use super::error::InvalidTransition;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShipmentState {
    PendingConfirmation,
    InTransit,
    Delivered,
    WithIssue,
    Cancelled,
}

/// The order in which status tags are consulted when a document carries more
/// than one. Problems outrank forward progress.
pub const PRIORITY_ORDER: [ShipmentState; 5] = [
    ShipmentState::WithIssue,
    ShipmentState::Cancelled,
    ShipmentState::Delivered,
    ShipmentState::InTransit,
    ShipmentState::PendingConfirmation,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Logistics,
    TrackTeam,
}

impl ShipmentState {
    pub const ALL: [ShipmentState; 5] = [
        Self::PendingConfirmation,
        Self::InTransit,
        Self::Delivered,
        Self::WithIssue,
        Self::Cancelled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingConfirmation => "pending-confirmation",
            Self::InTransit => "in-transit",
            Self::Delivered => "delivered",
            Self::WithIssue => "with-issue",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == tag)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Validate a move from `self` to `target` performed by `role`.
    ///
    /// `confirmed` is the order-confirmed flag as it stands before the move;
    /// it only matters for cancellation, which is refused once the track-team
    /// has confirmed the order.
    ///
    /// Valid transitions:
    /// - `pending-confirmation -> in-transit` (track-team)
    /// - `pending-confirmation -> with-issue` (track-team)
    /// - `pending-confirmation -> cancelled` (logistics, unconfirmed orders only)
    /// - `in-transit -> delivered` (track-team)
    /// - `in-transit -> with-issue` (track-team)
    /// - `with-issue -> pending-confirmation` (logistics)
    pub fn check_transition(
        self,
        target: ShipmentState,
        role: Role,
        confirmed: bool,
    ) -> Result<(), InvalidTransition> {
        let reject = |reason| InvalidTransition {
            from: self,
            to: target,
            role,
            reason,
        };

        if self.is_terminal() {
            return Err(reject("shipment is in a terminal state"));
        }

        let required = match (self, target) {
            (Self::PendingConfirmation, Self::InTransit)
            | (Self::PendingConfirmation, Self::WithIssue)
            | (Self::InTransit, Self::Delivered)
            | (Self::InTransit, Self::WithIssue) => Role::TrackTeam,
            (Self::PendingConfirmation, Self::Cancelled)
            | (Self::WithIssue, Self::PendingConfirmation) => Role::Logistics,
            _ => return Err(reject("transition not allowed by lifecycle rules")),
        };

        if role != required {
            return Err(reject(match required {
                Role::TrackTeam => "only the track-team may perform this transition",
                Role::Logistics => "only logistics may perform this transition",
            }));
        }

        if target == Self::Cancelled && confirmed {
            return Err(reject("a confirmed order cannot be cancelled"));
        }

        Ok(())
    }
}

impl fmt::Display for ShipmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Logistics => "logistics",
            Self::TrackTeam => "track-team",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
