//! Document store abstraction for the managed document database.
//!
//! Seatbook keeps no storage engine of its own. Seats, reservations and user
//! profiles live in a hosted document database organised as collections of
//! schemaless documents. This module defines the seam to that database:
//!
//! - [`Value`] / [`Fields`]: document contents, with a native timestamp type
//! - [`Query`]: equality filters, a single order-by and an optional limit
//! - [`WriteBatch`]: several writes applied atomically, guarded by
//!   [`Precondition`]s
//! - [`DocumentStore`]: the trait every backend implements
//!
//! # Implementations
//!
//! - `InMemoryDocumentStore` (in `seatbook-testing`): fast, deterministic,
//!   with failure injection
//!
//! # Example
//!
//! ```no_run
//! use seatbook_core::document::{Direction, DocumentStore, Query, Value};
//!
//! async fn example(store: &dyn DocumentStore) -> Result<(), Box<dyn std::error::Error>> {
//!     let query = Query::collection("reservations")
//!         .where_eq("userId", Value::from("user-1"))
//!         .order_by("createdAt", Direction::Descending);
//!
//!     let documents = store.query(query).await?;
//!     println!("{} reservations", documents.len());
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during document store operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// The addressed document does not exist.
    #[error("Document not found: {collection}/{id}")]
    NotFound {
        /// Collection that was addressed
        collection: String,
        /// Document id that was addressed
        id: DocumentId,
    },

    /// A batch precondition did not hold; nothing was written.
    #[error("Precondition failed on {collection}/{id}: expected {field} = {expected}")]
    PreconditionFailed {
        /// Collection of the guarded document
        collection: String,
        /// Guarded document id
        id: DocumentId,
        /// Field that was checked
        field: String,
        /// Value the batch required
        expected: Value,
    },

    /// The caller is not allowed to perform the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The backend could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure, carrying the backend's message.
    #[error("Document store error: {0}")]
    Other(String),
}

/// Result alias for document store operations.
pub type Result<T> = std::result::Result<T, DocumentStoreError>;

/// Boxed future returned by [`DocumentStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Opaque, store-assigned document identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap an existing identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A single field value.
///
/// `Timestamp` is the store's native instant type; callers convert to and
/// from `DateTime<Utc>` at the boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Explicit null (a cleared field)
    Null,
    /// Boolean
    Bool(bool),
    /// UTF-8 string
    String(String),
    /// Native timestamp
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the string payload, if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the timestamp payload, if this is a timestamp
    #[must_use]
    pub const fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    const fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Timestamp(_) => 2,
            Self::String(_) => 3,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

// Ordering across types follows the rank in `type_rank`, so a query can sort
// any field without failing on mixed content.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::String(a), Self::String(b)) => a.partial_cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.partial_cmp(b),
            _ => self.type_rank().partial_cmp(&other.type_rank()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Document contents, keyed by field name.
pub type Fields = BTreeMap<String, Value>;

/// A document read back from the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Store-assigned identifier
    pub id: DocumentId,
    /// Field values
    pub fields: Fields,
}

impl Document {
    /// Creates a new `Document`
    #[must_use]
    pub const fn new(id: DocumentId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Raw field access
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String field, `None` when missing, null or of another type
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Boolean field, `None` when missing, null or of another type
    #[must_use]
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// Timestamp field, `None` when missing, null or of another type
    #[must_use]
    pub fn get_timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(Value::as_timestamp)
    }
}

/// Sort direction for [`Query::order_by`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// A collection query: equality filters, an optional order-by and limit.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    /// Collection to read
    pub collection: String,
    /// Every filter must match (`field == value`)
    pub filters: Vec<(String, Value)>,
    /// Optional sort key; documents missing the field are excluded
    pub order_by: Option<(String, Direction)>,
    /// Optional maximum number of results
    pub limit: Option<usize>,
}

impl Query {
    /// Query every document of a collection
    #[must_use]
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add an equality filter
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Sort by a field
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Cap the number of results
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document's fields satisfy every filter
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| fields.get(field) == Some(value))
    }
}

/// One write inside a [`WriteBatch`].
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    /// Create a document with a store-assigned id
    Create {
        /// Target collection
        collection: String,
        /// Initial contents
        fields: Fields,
    },
    /// Create or overwrite a document at a known id
    Set {
        /// Target collection
        collection: String,
        /// Target id
        id: DocumentId,
        /// Full contents
        fields: Fields,
    },
    /// Merge fields into an existing document (fails if it does not exist)
    Update {
        /// Target collection
        collection: String,
        /// Target id
        id: DocumentId,
        /// Fields to overwrite; `Value::Null` stores an explicit null
        fields: Fields,
    },
}

/// Condition that must hold for a [`WriteBatch`] to be applied.
#[derive(Clone, Debug, PartialEq)]
pub enum Precondition {
    /// The document exists and `field == value`
    FieldEquals {
        /// Collection of the guarded document
        collection: String,
        /// Guarded document id
        id: DocumentId,
        /// Field to check
        field: String,
        /// Required value
        value: Value,
    },
}

/// Writes applied all-or-nothing, after every precondition has been checked.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    /// Conditions checked before any write
    pub preconditions: Vec<Precondition>,
    /// Writes in application order
    pub writes: Vec<Write>,
}

impl WriteBatch {
    /// Creates an empty batch
    #[must_use]
    pub const fn new() -> Self {
        Self {
            preconditions: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Require `collection/id` to have `field == value`
    #[must_use]
    pub fn require(
        mut self,
        collection: impl Into<String>,
        id: DocumentId,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.preconditions.push(Precondition::FieldEquals {
            collection: collection.into(),
            id,
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Create a document with a store-assigned id
    #[must_use]
    pub fn create(mut self, collection: impl Into<String>, fields: Fields) -> Self {
        self.writes.push(Write::Create {
            collection: collection.into(),
            fields,
        });
        self
    }

    /// Create or overwrite a document at a known id
    #[must_use]
    pub fn set(mut self, collection: impl Into<String>, id: DocumentId, fields: Fields) -> Self {
        self.writes.push(Write::Set {
            collection: collection.into(),
            id,
            fields,
        });
        self
    }

    /// Merge fields into an existing document
    #[must_use]
    pub fn update(mut self, collection: impl Into<String>, id: DocumentId, fields: Fields) -> Self {
        self.writes.push(Write::Update {
            collection: collection.into(),
            id,
            fields,
        });
        self
    }

    /// Whether the batch has no writes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Document database abstraction.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; components share one store behind
/// an `Arc<dyn DocumentStore>`.
///
/// # Dyn Compatibility
///
/// Methods return [`StoreFuture`] (a pinned boxed future) instead of using
/// `async fn`, so the trait can be used as `Arc<dyn DocumentStore>`.
pub trait DocumentStore: Send + Sync {
    /// Run a query.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the query cannot be executed.
    fn query(&self, query: Query) -> StoreFuture<'_, Vec<Document>>;

    /// Read one document by id; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the read fails.
    fn get(&self, collection: String, id: DocumentId) -> StoreFuture<'_, Option<Document>>;

    /// Create or overwrite a document at a known id.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the write is rejected.
    fn set(&self, collection: String, id: DocumentId, fields: Fields) -> StoreFuture<'_, ()>;

    /// Merge fields into an existing document.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::NotFound`] if the document does not exist
    /// - the backend error if the write is rejected
    fn update(&self, collection: String, id: DocumentId, fields: Fields) -> StoreFuture<'_, ()>;

    /// Apply a batch atomically.
    ///
    /// Every precondition is checked first; if any fails nothing is written.
    /// Returns the ids of documents created by [`Write::Create`], in order.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::PreconditionFailed`] if a guard does not hold
    /// - [`DocumentStoreError::NotFound`] if an update targets a missing document
    /// - the backend error if the batch is rejected
    fn commit(&self, batch: WriteBatch) -> StoreFuture<'_, Vec<DocumentId>>;
}
