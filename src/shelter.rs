//! # Animal records
//!
//! [`AnimalShelter`] is the data-access object for the shelter's animal
//! collection. It validates arguments, hands out sequential `animal_id`s and
//! forwards everything else to its [`DocumentCollection`].
//!
//! Every operation comes in two forms:
//!
//! - `try_*` returns the store's error so callers can tell "no data" apart
//!   from "store unreachable".
//! - the plain form (`create`, `read`, `update`, `delete`, `next_animal_id`)
//!   logs store errors and degrades to `false`, `0`, an empty `Vec` or `"A1"`.
//!   Only a missing argument is returned as an error.
//!
//! ## Known limitation
//!
//! Picking the next id and inserting it are separate round-trips, as are the
//! duplicate check and the insert in [`AnimalShelter::create`]. Two concurrent
//! writers can compute the same id; the duplicate check narrows that window
//! but does not close it. Callers that need a hard guarantee should put a
//! unique index on `animal_id`, in which case the losing insert surfaces as a
//! store error.

use mongodb::bson::{Bson, Document, doc};
use tracing::{debug, error, warn};

use crate::collection::DocumentCollection;
use crate::config::ShelterConfig;
use crate::errors::{Result, ShelterError};
use crate::identifier::{ANIMAL_ID_FIELD, AnimalId};
use crate::mongo::MongoCollection;

/// What happened to a record handed to [`AnimalShelter::try_create`].
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// Stored under the contained `animal_id`.
    Inserted(Bson),
    /// Another record already holds the contained `animal_id`; nothing was written.
    Duplicate(Bson),
    /// The write was sent but the server did not confirm it.
    Unacknowledged(Bson),
}

impl CreateOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, CreateOutcome::Inserted(_))
    }

    pub fn animal_id(&self) -> &Bson {
        match self {
            CreateOutcome::Inserted(id)
            | CreateOutcome::Duplicate(id)
            | CreateOutcome::Unacknowledged(id) => id,
        }
    }
}

pub struct AnimalShelter<C> {
    collection: C,
}

impl AnimalShelter<MongoCollection> {
    /// Opens the MongoDB collection named by `config`.
    ///
    /// Fails with [`ShelterError::Connection`] if the server cannot be reached.
    pub async fn connect(config: &ShelterConfig) -> Result<Self> {
        let collection = MongoCollection::connect(config).await?;

        Ok(Self::new(collection))
    }
}

impl<C: DocumentCollection> AnimalShelter<C> {
    pub fn new(collection: C) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Releases the underlying connection.
    pub async fn close(self) -> Result<()> {
        self.collection.close().await
    }

    /// The id one past the greatest `animal_id` in the collection.
    ///
    /// An empty collection or a malformed greatest id yields `A1`.
    pub async fn try_next_animal_id(&self) -> Result<AnimalId> {
        let last = self
            .collection
            .find_one(doc! {}, doc! { ANIMAL_ID_FIELD: -1 })
            .await?;

        let Some(last) = last else {
            return Ok(AnimalId::FIRST);
        };

        let next = match last.get(ANIMAL_ID_FIELD) {
            Some(Bson::String(raw)) => match raw.parse::<AnimalId>() {
                Ok(id) => id.next(),
                Err(e) => {
                    warn!(error = %e, "greatest animal_id is malformed, restarting at A1");
                    None
                }
            },
            Some(other) => {
                warn!(animal_id = %other, "greatest animal_id is not a string, restarting at A1");
                None
            }
            None => None,
        };

        Ok(next.unwrap_or(AnimalId::FIRST))
    }

    /// Like [`try_next_animal_id`](Self::try_next_animal_id) but never fails:
    /// a store error also yields `"A1"`.
    pub async fn next_animal_id(&self) -> String {
        self.next_id_or_first().await.to_string()
    }

    async fn next_id_or_first(&self) -> AnimalId {
        match self.try_next_animal_id().await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "failed to get next animal_id");
                AnimalId::FIRST
            }
        }
    }

    /// Inserts `record`, assigning an `animal_id` first if it has none.
    ///
    /// A failed id lookup falls back to `A1` and the insert goes ahead; the
    /// duplicate check then decides. A record whose `animal_id` is already
    /// taken is not written.
    pub async fn try_create(&self, mut record: Document) -> Result<CreateOutcome> {
        if !record.contains_key(ANIMAL_ID_FIELD) {
            let id = self.next_id_or_first().await;
            debug!(animal_id = %id, "assigned animal_id");
            record.insert(ANIMAL_ID_FIELD, id.to_string());
        }

        let animal_id = record
            .get(ANIMAL_ID_FIELD)
            .cloned()
            .unwrap_or(Bson::Null);

        let existing = self
            .collection
            .count_matching(doc! { ANIMAL_ID_FIELD: animal_id.clone() }, 1)
            .await?;
        if existing > 0 {
            return Ok(CreateOutcome::Duplicate(animal_id));
        }

        let ack = self.collection.insert_one(record).await?;
        if ack.acknowledged {
            Ok(CreateOutcome::Inserted(animal_id))
        } else {
            Ok(CreateOutcome::Unacknowledged(animal_id))
        }
    }

    /// Returns `true` only when the record was stored and acknowledged.
    ///
    /// Fails with [`ShelterError::InvalidArgument`] when `record` is `None`;
    /// every other failure is logged and reported as `false`.
    pub async fn create(&self, record: Option<Document>) -> Result<bool> {
        let record = record.ok_or(ShelterError::InvalidArgument(
            "Nothing to save, because data parameter is empty",
        ))?;

        match self.try_create(record).await {
            Ok(CreateOutcome::Inserted(animal_id)) => {
                debug!(%animal_id, "inserted animal");
                Ok(true)
            }
            Ok(CreateOutcome::Duplicate(animal_id)) => {
                warn!(%animal_id, "insert failed: animal_id already exists");
                Ok(false)
            }
            Ok(CreateOutcome::Unacknowledged(animal_id)) => {
                warn!(%animal_id, "insert was not acknowledged");
                Ok(false)
            }
            Err(e) => {
                error!(error = %e, "insert failed");
                Ok(false)
            }
        }
    }

    /// Every record matching `query`, in the store's natural order.
    pub async fn try_read(&self, query: &Document) -> Result<Vec<Document>> {
        self.collection.find(query.clone()).await
    }

    /// `None` asks for nothing and gets nothing. Store errors are logged and
    /// read as an empty result.
    pub async fn read(&self, query: Option<&Document>) -> Vec<Document> {
        let Some(query) = query else {
            return Vec::new();
        };

        match self.try_read(query).await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "query failed");
                Vec::new()
            }
        }
    }

    /// Merges `new_values` into every record matching `query`. Returns how
    /// many records changed.
    pub async fn try_update(&self, query: &Document, new_values: &Document) -> Result<u64> {
        self.collection
            .update_many(query.clone(), doc! { "$set": new_values.clone() })
            .await
    }

    pub async fn update(
        &self,
        query: Option<&Document>,
        new_values: Option<&Document>,
    ) -> Result<u64> {
        let (Some(query), Some(new_values)) = (query, new_values) else {
            return Err(ShelterError::InvalidArgument(
                "Both query and new_values parameters are required",
            ));
        };

        match self.try_update(query, new_values).await {
            Ok(modified) => {
                debug!(modified, "updated animals");
                Ok(modified)
            }
            Err(e) => {
                error!(error = %e, "update failed");
                Ok(0)
            }
        }
    }

    /// Removes every record matching `query`. Returns how many were removed.
    pub async fn try_delete(&self, query: &Document) -> Result<u64> {
        self.collection.delete_many(query.clone()).await
    }

    pub async fn delete(&self, query: Option<&Document>) -> Result<u64> {
        let query = query.ok_or(ShelterError::InvalidArgument(
            "Query parameter is required for delete operation",
        ))?;

        match self.try_delete(query).await {
            Ok(deleted) => {
                debug!(deleted, "deleted animals");
                Ok(deleted)
            }
            Err(e) => {
                error!(error = %e, "delete failed");
                Ok(0)
            }
        }
    }
}
