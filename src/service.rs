//! Service layer API for shipment workflow operations
use super::assistant::{Assistant, AssistantRequest, AssistantResponse};
use super::codec::{TransitionPlan, decode_at, encode_document, plan_confirmation, plan_transition};
use super::config::Config;
use super::document::{ExternalDocument, ProductLine};
use super::error::{FailedRestore, InvalidTransition, ShipmentError};
use super::shipment::{ShipmentDraft, ShipmentRecord};
use super::status::{Role, ShipmentState};
use super::store::{DocumentStore, StockLedger};
use super::tags::{RawTag, merge_tags};
use super::utils::new_shipment_id;
use chrono::Utc;
use tracing::{info, warn};

pub struct ShipmentService<D, L> {
    documents: D,
    stock: L,
    config: Config,
}

impl<D: DocumentStore, L: StockLedger> ShipmentService<D, L> {
    pub fn new(documents: D, stock: L, config: Config) -> Self {
        Self {
            documents,
            stock,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn decode(&self, document: &ExternalDocument) -> ShipmentRecord {
        decode_at(document, Utc::now(), &self.config.synthetic_id_prefix)
    }

    /// Every shipment the store knows about.
    pub fn list_shipments(&self) -> Result<Vec<ShipmentRecord>, ShipmentError> {
        let documents = self.documents.list()?;
        Ok(documents.iter().map(|doc| self.decode(doc)).collect())
    }

    pub fn get_shipment(&self, document_id: &str) -> Result<ShipmentRecord, ShipmentError> {
        let document = self.documents.fetch(document_id)?;
        Ok(self.decode(&document))
    }

    /// Create a new shipment (logistics).
    ///
    /// Stock is reserved product by product before the document exists. Any
    /// failure along the way gives back what was already reserved.
    pub fn create_shipment(&self, draft: ShipmentDraft) -> Result<ShipmentRecord, ShipmentError> {
        // Validate before touching stock
        let shipment_id = new_shipment_id(&self.config.shipment_id_prefix)?;
        let record = draft.validate_and_finalise(shipment_id, String::new(), Utc::now())?;
        let mut document = encode_document(&record);
        document
            .set_products(&draft.products)
            .map_err(anyhow::Error::from)?;

        // Reserve stock in order, stopping at the first failure
        let mut reserved: Vec<&ProductLine> = Vec::new();
        for product in &draft.products {
            let product_id = product.product_id.as_deref().unwrap_or_default();
            if let Err(source) = self.stock.reserve(product_id, product.units) {
                let unreleased = self.release(&reserved);
                return Err(ShipmentError::StockReservationFailed {
                    product_id: product_id.to_owned(),
                    source,
                    unreleased,
                });
            }
            reserved.push(product);
        }

        let created = match self.documents.create(document) {
            Ok(created) => created,
            Err(source) => {
                let unreleased = self.release(&reserved);
                return Err(ShipmentError::CreateFailed { source, unreleased });
            }
        };

        info!(
            shipment_id = %record.id,
            document_id = %created.id,
            products = draft.products.len(),
            "created shipment"
        );
        Ok(self.decode(&created))
    }

    /// Confirm an order that is still pending (track-team).
    pub fn confirm_order(
        &self,
        document_id: &str,
        role: Role,
    ) -> Result<ShipmentRecord, ShipmentError> {
        let (record, _) = self.reconcile(document_id, |current| plan_confirmation(current, role))?;
        Ok(record)
    }

    /// Move a shipment through its lifecycle.
    ///
    /// The plan is made against the live document, not any copy the caller
    /// holds. On error nothing has been written, except for
    /// [`ShipmentError::PartialCompensationFailure`] which is raised after a
    /// cancellation was stored.
    pub fn update_status(
        &self,
        document_id: &str,
        target: ShipmentState,
        role: Role,
        confirmation: Option<bool>,
        issue: Option<&str>,
    ) -> Result<ShipmentRecord, ShipmentError> {
        let (record, live) = self.reconcile(document_id, |current| {
            plan_transition(current, target, role, confirmation, issue, Utc::now())
        })?;

        if target == ShipmentState::Cancelled && self.config.restore_stock_on_cancel {
            self.compensate_cancellation(&live)?;
        }

        Ok(record)
    }

    /// Ask the assistant a question about one shipment.
    pub fn ask_assistant(
        &self,
        assistant: &dyn Assistant,
        document_id: &str,
        question: &str,
    ) -> anyhow::Result<AssistantResponse> {
        let document = self.documents.fetch(document_id)?;
        let record = self.decode(&document);
        let request = AssistantRequest::for_shipment(question, &record, &document.products());
        assistant.ask(&request)
    }

    /// Fetch, plan, merge, write. Returns the record as persisted along with
    /// the live document the plan was made against.
    fn reconcile<F>(
        &self,
        document_id: &str,
        plan: F,
    ) -> Result<(ShipmentRecord, ExternalDocument), ShipmentError>
    where
        F: FnOnce(&ShipmentRecord) -> Result<TransitionPlan, InvalidTransition>,
    {
        // The merge must run against fresh tags or foreign ones could be lost
        let live = self
            .documents
            .fetch(document_id)
            .map_err(|source| ShipmentError::StaleFetchFailure {
                document_id: document_id.to_owned(),
                source,
            })?;

        let current = self.decode(&live);
        let TransitionPlan { record, tags, notes } = plan(&current)?;
        let merged = merge_tags(&live.tags, &tags);

        self.documents
            .write_tags_and_notes(document_id, merged.clone(), notes.clone())
            .map_err(|source| ShipmentError::WriteFailed {
                document_id: document_id.to_owned(),
                source,
            })?;

        info!(
            document_id,
            shipment_id = %record.id,
            from = %current.state,
            to = %record.state,
            order_confirmed = record.order_confirmed,
            "wrote shipment status"
        );

        // Read back what was actually stored
        let persisted = match self.documents.fetch(document_id) {
            Ok(document) => document,
            Err(e) => {
                warn!(document_id, "re-reading written document failed: {e}");
                ExternalDocument {
                    tags: merged.into_iter().map(RawTag::from).collect(),
                    notes,
                    ..live.clone()
                }
            }
        };

        Ok((self.decode(&persisted), live))
    }

    fn compensate_cancellation(&self, document: &ExternalDocument) -> Result<(), ShipmentError> {
        let mut restored = Vec::new();
        let mut failed = Vec::new();

        for product in document.products() {
            let Some(product_id) = product.product_id.as_deref() else {
                continue;
            };
            match self.stock.restore(product_id, product.units) {
                Ok(_) => restored.push(product_id.to_owned()),
                Err(e) => {
                    warn!(document_id = %document.id, product_id, "stock restoration failed: {e}");
                    failed.push(FailedRestore {
                        product_id: product_id.to_owned(),
                        units: product.units,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if failed.is_empty() {
            info!(document_id = %document.id, products = restored.len(), "restored stock after cancellation");
            return Ok(());
        }

        Err(ShipmentError::PartialCompensationFailure {
            document_id: document.id.clone(),
            restored,
            failed,
        })
    }

    // Give back reservations; returns whatever could not be restored.
    fn release(&self, reserved: &[&ProductLine]) -> Vec<FailedRestore> {
        reserved
            .iter()
            .filter_map(|product| {
                let product_id = product.product_id.as_deref().unwrap_or_default();
                self.stock
                    .restore(product_id, product.units)
                    .err()
                    .map(|e| {
                        warn!(product_id, "releasing reserved stock failed: {e}");
                        FailedRestore {
                            product_id: product_id.to_owned(),
                            units: product.units,
                            reason: e.to_string(),
                        }
                    })
            })
            .collect()
    }
}
