//! # MongoDB collection
//!
//! [`DocumentCollection`] backed by the official async driver. The client is
//! created once in [`MongoCollection::connect`] and reused by every call until
//! [`DocumentCollection::close`] shuts it down.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client, Collection,
    bson::{Document, doc},
    options::{Acknowledgment, ClientOptions, Collation, Credential, ServerAddress},
};
use tracing::info;

use crate::collection::{DocumentCollection, InsertAck};
use crate::config::{AUTH_SOURCE, ShelterConfig};
use crate::errors::{Result, ShelterError};

const APP_NAME: &str = "animal-shelter";

/// MongoDB-backed animal collection.
#[derive(Clone, Debug)]
pub struct MongoCollection {
    client: Client,
    collection: Collection<Document>,
}

impl MongoCollection {
    /// Connects and pings the server.
    ///
    /// The driver connects lazily, so the ping is what turns an unreachable
    /// server or bad credentials into a [`ShelterError::Connection`] here
    /// rather than on the first read.
    pub async fn connect(config: &ShelterConfig) -> Result<Self> {
        let options = client_options(config).await?;
        let client = Client::with_options(options).map_err(connection_error)?;

        client
            .database(&config.database_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connection_error)?;

        info!(
            database = %config.database_name,
            collection = %config.collection_name,
            "connected to MongoDB"
        );

        Ok(Self::from_client(
            client,
            &config.database_name,
            &config.collection_name,
        ))
    }

    /// Wraps an already configured client without checking connectivity.
    pub fn from_client(client: Client, database: &str, collection: &str) -> Self {
        let collection = client.database(database).collection::<Document>(collection);
        Self { client, collection }
    }

    fn acknowledges_writes(&self) -> bool {
        !matches!(
            self.collection.write_concern().and_then(|wc| wc.w.as_ref()),
            Some(Acknowledgment::Nodes(0))
        )
    }
}

async fn client_options(config: &ShelterConfig) -> Result<ClientOptions> {
    let mut options = match &config.uri {
        Some(uri) => ClientOptions::parse(uri).await.map_err(connection_error)?,
        None => {
            let mut options = ClientOptions::default();
            options.hosts = vec![ServerAddress::parse(config.address()).map_err(connection_error)?];

            if let Some(username) = &config.username {
                let mut credential = Credential::default();
                credential.username = Some(username.clone());
                credential.password = config.password.clone();
                credential.source = Some(AUTH_SOURCE.to_string());
                options.credential = Some(credential);
            }

            options
        }
    };

    if options.app_name.is_none() {
        options.app_name = Some(APP_NAME.to_string());
    }

    Ok(options)
}

fn connection_error(err: mongodb::error::Error) -> ShelterError {
    ShelterError::Connection(err.to_string())
}

/// Orders `A9` before `A10` when sorting string ids.
fn numeric_collation() -> Collation {
    Collation::builder()
        .locale("en".to_string())
        .numeric_ordering(true)
        .build()
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    async fn find_one(&self, filter: Document, sort: Document) -> Result<Option<Document>> {
        let found = self
            .collection
            .find_one(filter)
            .sort(sort)
            .collation(numeric_collation())
            .await?;

        Ok(found)
    }

    async fn find(&self, filter: Document) -> Result<Vec<Document>> {
        let cursor = self.collection.find(filter).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        Ok(documents)
    }

    async fn count_matching(&self, filter: Document, limit: u64) -> Result<u64> {
        let mut count = self.collection.count_documents(filter);
        if limit > 0 {
            count = count.limit(limit);
        }

        Ok(count.await?)
    }

    async fn insert_one(&self, document: Document) -> Result<InsertAck> {
        self.collection.insert_one(document).await?;

        Ok(InsertAck {
            acknowledged: self.acknowledges_writes(),
        })
    }

    async fn update_many(&self, filter: Document, update: Document) -> Result<u64> {
        let result = self.collection.update_many(filter, update).await?;

        Ok(result.modified_count)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64> {
        let result = self.collection.delete_many(filter).await?;

        Ok(result.deleted_count)
    }

    async fn close(self) -> Result<()> {
        let name = self.collection.name().to_string();
        drop(self.collection);
        self.client.shutdown().await;
        info!(collection = %name, "closed MongoDB connection");

        Ok(())
    }
}
