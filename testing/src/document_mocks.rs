//! In-memory document store.
//!
//! Implements the full [`DocumentStore`] contract (queries, atomic batches
//! with preconditions) over a `HashMap` of collections, and lets tests inject
//! read/write failures.

use seatbook_core::document::{
    Direction, Document, DocumentId, DocumentStore, DocumentStoreError, Fields, Precondition,
    Query, Result, StoreFuture, Write, WriteBatch,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

type Collections = HashMap<String, BTreeMap<DocumentId, Fields>>;

#[derive(Debug, Default)]
struct FailurePlan {
    reads: Option<String>,
    writes: Option<String>,
}

/// In-memory document store for fast, deterministic testing.
///
/// Clones share the same data, so a test can keep one handle for seeding and
/// assertions while components use another.
///
/// # Example
///
/// ```
/// use seatbook_testing::InMemoryDocumentStore;
/// use seatbook_core::document::{DocumentStore, Fields, Query, Value, WriteBatch};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryDocumentStore::new();
///
/// let mut fields = Fields::new();
/// fields.insert("seatNumber".into(), Value::from("A1"));
/// store.commit(WriteBatch::new().create("seats", fields)).await?;
///
/// let seats = store.query(Query::collection("seats")).await?;
/// assert_eq!(seats.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    failures: Arc<Mutex<FailurePlan>>,
    writes: Arc<AtomicUsize>,
}

fn lock_failed() -> DocumentStoreError {
    DocumentStoreError::Other("Lock poisoned".to_string())
}

impl InMemoryDocumentStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with `message` until [`Self::heal`]
    pub fn fail_reads(&self, message: impl Into<String>) {
        if let Ok(mut plan) = self.failures.lock() {
            plan.reads = Some(message.into());
        }
    }

    /// Make every write fail with `message` until [`Self::heal`]
    pub fn fail_writes(&self, message: impl Into<String>) {
        if let Ok(mut plan) = self.failures.lock() {
            plan.writes = Some(message.into());
        }
    }

    /// Clear injected failures
    pub fn heal(&self) {
        if let Ok(mut plan) = self.failures.lock() {
            *plan = FailurePlan::default();
        }
    }

    /// Seed a document directly, bypassing failure injection and counters
    pub fn insert(&self, collection: &str, id: DocumentId, fields: Fields) {
        if let Ok(mut collections) = self.collections.write() {
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id, fields);
        }
    }

    /// Direct read for assertions
    #[must_use]
    pub fn document(&self, collection: &str, id: &DocumentId) -> Option<Document> {
        let collections = self.collections.read().ok()?;
        collections
            .get(collection)?
            .get(id)
            .map(|fields| Document::new(id.clone(), fields.clone()))
    }

    /// Every document of a collection, for assertions
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .ok()
            .and_then(|collections| {
                collections.get(collection).map(|docs| {
                    docs.iter()
                        .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                        .collect()
                })
            })
            .unwrap_or_default()
    }

    /// Number of documents in a collection
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .ok()
            .and_then(|collections| collections.get(collection).map(BTreeMap::len))
            .unwrap_or(0)
    }

    /// Whether a collection has no documents
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Number of document writes applied so far (seeding excluded)
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    fn check_reads(&self) -> Result<()> {
        let plan = self.failures.lock().map_err(|_| lock_failed())?;
        match &plan.reads {
            Some(message) => Err(DocumentStoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }

    fn check_writes(&self) -> Result<()> {
        let plan = self.failures.lock().map_err(|_| lock_failed())?;
        match &plan.writes {
            Some(message) => Err(DocumentStoreError::PermissionDenied(message.clone())),
            None => Ok(()),
        }
    }

    fn next_id() -> DocumentId {
        DocumentId::new(Uuid::new_v4().simple().to_string())
    }

    fn run_query(&self, query: &Query) -> Result<Vec<Document>> {
        self.check_reads()?;
        let collections = self.collections.read().map_err(|_| lock_failed())?;

        let mut documents: Vec<Document> = collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| query.matches(fields))
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order_by {
            documents.retain(|doc| doc.get(field).is_some());
            documents.sort_by(|a, b| {
                let ordering = a
                    .get(field)
                    .partial_cmp(&b.get(field))
                    .unwrap_or(Ordering::Equal);
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }

        Ok(documents)
    }

    fn apply_batch(&self, batch: WriteBatch) -> Result<Vec<DocumentId>> {
        self.check_writes()?;
        let mut collections = self.collections.write().map_err(|_| lock_failed())?;

        for precondition in &batch.preconditions {
            let Precondition::FieldEquals {
                collection,
                id,
                field,
                value,
            } = precondition;

            let holds = collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .is_some_and(|fields| fields.get(field) == Some(value));

            if !holds {
                return Err(DocumentStoreError::PreconditionFailed {
                    collection: collection.clone(),
                    id: id.clone(),
                    field: field.clone(),
                    expected: value.clone(),
                });
            }
        }

        // Every update target must exist before anything is applied.
        for write in &batch.writes {
            if let Write::Update { collection, id, .. } = write {
                let exists = collections
                    .get(collection)
                    .is_some_and(|docs| docs.contains_key(id));
                if !exists {
                    return Err(DocumentStoreError::NotFound {
                        collection: collection.clone(),
                        id: id.clone(),
                    });
                }
            }
        }

        let mut created = Vec::new();
        for write in batch.writes {
            match write {
                Write::Create { collection, fields } => {
                    let id = Self::next_id();
                    collections
                        .entry(collection)
                        .or_default()
                        .insert(id.clone(), fields);
                    created.push(id);
                },
                Write::Set {
                    collection,
                    id,
                    fields,
                } => {
                    collections.entry(collection).or_default().insert(id, fields);
                },
                Write::Update {
                    collection,
                    id,
                    fields,
                } => {
                    if let Some(existing) = collections
                        .get_mut(&collection)
                        .and_then(|docs| docs.get_mut(&id))
                    {
                        existing.extend(fields);
                    }
                },
            }
            self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        }

        Ok(created)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn query(&self, query: Query) -> StoreFuture<'_, Vec<Document>> {
        Box::pin(async move { self.run_query(&query) })
    }

    fn get(&self, collection: String, id: DocumentId) -> StoreFuture<'_, Option<Document>> {
        Box::pin(async move {
            self.check_reads()?;
            let collections = self.collections.read().map_err(|_| lock_failed())?;
            Ok(collections
                .get(&collection)
                .and_then(|docs| docs.get(&id))
                .map(|fields| Document::new(id.clone(), fields.clone())))
        })
    }

    fn set(&self, collection: String, id: DocumentId, fields: Fields) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.apply_batch(WriteBatch::new().set(collection, id, fields))?;
            Ok(())
        })
    }

    fn update(&self, collection: String, id: DocumentId, fields: Fields) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.apply_batch(WriteBatch::new().update(collection, id, fields))?;
            Ok(())
        })
    }

    fn commit(&self, batch: WriteBatch) -> StoreFuture<'_, Vec<DocumentId>> {
        Box::pin(async move { self.apply_batch(batch) })
    }
}
