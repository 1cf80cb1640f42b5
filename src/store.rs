//! Storage seams: the external document store and the stock ledger
//!
//! Production deployments talk to the invoicing service over HTTP; that client
//! lives outside this crate and only has to implement [`DocumentStore`]. The
//! sled-backed [`SledStore`] implements both traits and is what tests and
//! local runs use.
use super::config::Config;
use super::document::ExternalDocument;
use super::error::StoreError;
use super::tags::RawTag;
use sled::transaction::{ConflictableTransactionResult, TransactionError, abort};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub trait DocumentStore {
    /// Fetch the current state of a document.
    fn fetch(&self, document_id: &str) -> Result<ExternalDocument, StoreError>;

    fn list(&self) -> Result<Vec<ExternalDocument>, StoreError>;

    /// Persist a new document. The store assigns an id when `document.id` is
    /// empty; the stored document is returned.
    fn create(&self, document: ExternalDocument) -> Result<ExternalDocument, StoreError>;

    /// Replace the tags and notes of an existing document, leaving every other
    /// field as the store has it.
    fn write_tags_and_notes(
        &self,
        document_id: &str,
        tags: Vec<String>,
        notes: String,
    ) -> Result<(), StoreError>;
}

pub trait StockLedger {
    fn available(&self, product_id: &str) -> Result<u64, StoreError>;

    /// Take `units` out of stock, failing without change if not enough remain.
    /// Returns the remaining level.
    fn reserve(&self, product_id: &str, units: u64) -> Result<u64, StoreError>;

    /// Put `units` back into stock. Returns the new level.
    fn restore(&self, product_id: &str, units: u64) -> Result<u64, StoreError>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn fetch(&self, document_id: &str) -> Result<ExternalDocument, StoreError> {
        (**self).fetch(document_id)
    }
    fn list(&self) -> Result<Vec<ExternalDocument>, StoreError> {
        (**self).list()
    }
    fn create(&self, document: ExternalDocument) -> Result<ExternalDocument, StoreError> {
        (**self).create(document)
    }
    fn write_tags_and_notes(
        &self,
        document_id: &str,
        tags: Vec<String>,
        notes: String,
    ) -> Result<(), StoreError> {
        (**self).write_tags_and_notes(document_id, tags, notes)
    }
}

impl<T: StockLedger + ?Sized> StockLedger for Arc<T> {
    fn available(&self, product_id: &str) -> Result<u64, StoreError> {
        (**self).available(product_id)
    }
    fn reserve(&self, product_id: &str, units: u64) -> Result<u64, StoreError> {
        (**self).reserve(product_id, units)
    }
    fn restore(&self, product_id: &str, units: u64) -> Result<u64, StoreError> {
        (**self).restore(product_id, units)
    }
}

const DOCUMENTS_TREE: &str = "documents";
const STOCK_TREE: &str = "stock";

#[derive(Clone)]
pub struct SledStore {
    instance: Arc<sled::Db>,
    documents: sled::Tree,
    stock: sled::Tree,
}

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Result<Self, StoreError> {
        let documents = instance.open_tree(DOCUMENTS_TREE)?;
        let stock = instance.open_tree(STOCK_TREE)?;
        Ok(Self {
            instance,
            documents,
            stock,
        })
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::new(Arc::new(sled::open(path)?))
    }

    /// Open the database at the configured `store-path`.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Self::open(&config.store_path)
    }

    /// Set the stock level of a product outright.
    pub fn set_stock(&self, product_id: &str, units: u64) -> Result<(), StoreError> {
        self.stock.insert(product_id.as_bytes(), &units.to_be_bytes()[..])?;
        Ok(())
    }

    fn load(&self, document_id: &str) -> Result<ExternalDocument, StoreError> {
        let bytes = self
            .documents
            .get(document_id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(document_id.to_owned()))?;
        parse_document(document_id, &bytes)
    }

    fn save(&self, document: &ExternalDocument) -> Result<(), StoreError> {
        let bytes = document.to_json().map_err(|e| StoreError::Malformed {
            document_id: document.id.clone(),
            reason: e.to_string(),
        })?;
        self.documents.insert(document.id.as_bytes(), bytes)?;
        self.instance.flush()?;
        Ok(())
    }

    fn adjust_stock(
        &self,
        product_id: &str,
        adjust: impl Fn(u64) -> Result<u64, StoreError>,
    ) -> Result<u64, StoreError> {
        self.stock
            .transaction(|tx| -> ConflictableTransactionResult<u64, StoreError> {
                let current = match tx.get(product_id.as_bytes())? {
                    Some(bytes) => match read_units(product_id, &bytes) {
                        Ok(units) => units,
                        Err(e) => return abort(e),
                    },
                    None => 0,
                };
                let next = match adjust(current) {
                    Ok(next) => next,
                    Err(e) => return abort(e),
                };
                tx.insert(product_id.as_bytes(), &next.to_be_bytes()[..])?;
                Ok(next)
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => StoreError::Backend(e),
            })
    }
}

fn parse_document(document_id: &str, bytes: &[u8]) -> Result<ExternalDocument, StoreError> {
    ExternalDocument::from_json(bytes).map_err(|e| StoreError::Malformed {
        document_id: document_id.to_owned(),
        reason: e.to_string(),
    })
}

fn read_units(product_id: &str, bytes: &[u8]) -> Result<u64, StoreError> {
    <[u8; 8]>::try_from(bytes)
        .map(u64::from_be_bytes)
        .map_err(|_| StoreError::CorruptStock {
            product_id: product_id.to_owned(),
            reason: format!("stock level is {} bytes, expected 8", bytes.len()),
        })
}

impl DocumentStore for SledStore {
    fn fetch(&self, document_id: &str) -> Result<ExternalDocument, StoreError> {
        self.load(document_id)
    }

    fn list(&self) -> Result<Vec<ExternalDocument>, StoreError> {
        let mut documents = Vec::new();
        for entry in self.documents.iter() {
            let (key, bytes) = entry?;
            let document_id = String::from_utf8_lossy(&key);
            match parse_document(&document_id, &bytes) {
                Ok(document) => documents.push(document),
                Err(e) => warn!("skipping unreadable document: {e}"),
            }
        }
        Ok(documents)
    }

    fn create(&self, mut document: ExternalDocument) -> Result<ExternalDocument, StoreError> {
        if document.id.is_empty() {
            document.id = format!("inv-{}", self.instance.generate_id()?);
        }
        self.save(&document)?;
        Ok(document)
    }

    fn write_tags_and_notes(
        &self,
        document_id: &str,
        tags: Vec<String>,
        notes: String,
    ) -> Result<(), StoreError> {
        let mut document = self.load(document_id)?;
        document.tags = tags.into_iter().map(RawTag::from).collect();
        document.notes = notes;
        self.save(&document)
    }
}

impl StockLedger for SledStore {
    fn available(&self, product_id: &str) -> Result<u64, StoreError> {
        match self.stock.get(product_id.as_bytes())? {
            Some(bytes) => read_units(product_id, &bytes),
            None => Ok(0),
        }
    }

    fn reserve(&self, product_id: &str, units: u64) -> Result<u64, StoreError> {
        self.adjust_stock(product_id, |available| {
            available
                .checked_sub(units)
                .ok_or_else(|| StoreError::InsufficientStock {
                    product_id: product_id.to_owned(),
                    requested: units,
                    available,
                })
        })
    }

    fn restore(&self, product_id: &str, units: u64) -> Result<u64, StoreError> {
        self.adjust_stock(product_id, |available| Ok(available.saturating_add(units)))
    }
}
