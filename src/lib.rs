//! Shipment tracking on top of a third-party invoicing store.
//!
//! The invoicing service owns the documents. A shipment's lifecycle lives in
//! each document's tags and notes, and is re-derived from them on every read.

pub mod assistant;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod notes;
pub mod service;
pub mod shipment;
pub mod status;
pub mod store;
pub mod tags;
pub mod utils;

pub use codec::{TransitionPlan, decode, encode, plan_confirmation, plan_transition};
pub use error::{InvalidTransition, ShipmentError, StoreError};
pub use status::{Role, ShipmentState};
pub use tags::merge_tags;
