//! Error types for shipment reconciliation and the service layer
use super::status::{Role, ShipmentState};

/// A state machine or role violation. The record it was raised against is
/// left untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot move shipment from {from} to {to} as {role}: {reason}")]
pub struct InvalidTransition {
    pub from: ShipmentState,
    pub to: ShipmentState,
    pub role: Role,
    pub reason: &'static str,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("document {0} was not found")]
    NotFound(String),
    #[error("document {document_id} could not be read: {reason}")]
    Malformed { document_id: String, reason: String },
    #[error("stock level of product {product_id} could not be read: {reason}")]
    CorruptStock { product_id: String, reason: String },
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: u64,
        available: u64,
    },
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Backend(#[from] sled::Error),
}

/// A single product whose stock could not be restored during compensation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRestore {
    pub product_id: String,
    pub units: u64,
    pub reason: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ShipmentError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("could not fetch live state of document {document_id}; nothing was written")]
    StaleFetchFailure {
        document_id: String,
        #[source]
        source: StoreError,
    },
    #[error("writing document {document_id} failed")]
    WriteFailed {
        document_id: String,
        #[source]
        source: StoreError,
    },
    #[error(
        "document {document_id} was cancelled but {} of {} stock restorations failed; manual intervention needed",
        .failed.len(),
        .failed.len() + .restored.len()
    )]
    PartialCompensationFailure {
        document_id: String,
        restored: Vec<String>,
        failed: Vec<FailedRestore>,
    },
    #[error("stock could not be reserved for product {product_id}")]
    StockReservationFailed {
        product_id: String,
        #[source]
        source: StoreError,
        /// Products whose reservation was released again but failed to restore.
        unreleased: Vec<FailedRestore>,
    },
    #[error("shipment document could not be created")]
    CreateFailed {
        #[source]
        source: StoreError,
        /// Reserved stock that could not be given back.
        unreleased: Vec<FailedRestore>,
    },
    #[error("shipment draft is invalid: {0}")]
    InvalidDraft(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
