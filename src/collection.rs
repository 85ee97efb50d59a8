//! # Document collection seam
//!
//! [`AnimalShelter`](crate::shelter::AnimalShelter) never talks to a driver
//! directly. It is generic over [`DocumentCollection`], which exposes the few
//! primitives the shelter needs. [`MongoCollection`](crate::mongo::MongoCollection)
//! backs it with a live server and
//! [`MemoryCollection`](crate::memory::MemoryCollection) keeps everything in
//! process.

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::errors::Result;

/// Outcome of a single insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertAck {
    /// Whether the server confirmed the write. Always `false` under an
    /// unacknowledged (`w: 0`) write concern.
    pub acknowledged: bool,
}

#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// First document matching `filter` when ordered by `sort`.
    async fn find_one(&self, filter: Document, sort: Document) -> Result<Option<Document>>;

    /// Every document matching `filter`, in the store's natural order.
    async fn find(&self, filter: Document) -> Result<Vec<Document>>;

    /// Number of matching documents, capped at `limit` when it is non-zero.
    async fn count_matching(&self, filter: Document, limit: u64) -> Result<u64>;

    async fn insert_one(&self, document: Document) -> Result<InsertAck>;

    /// Applies an update document (e.g. `{ "$set": { .. } }`) to every match.
    /// Returns how many documents actually changed.
    async fn update_many(&self, filter: Document, update: Document) -> Result<u64>;

    /// Returns how many documents were removed.
    async fn delete_many(&self, filter: Document) -> Result<u64>;

    /// Releases the underlying connection. The collection must not be used
    /// afterwards.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}
