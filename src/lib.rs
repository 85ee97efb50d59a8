//! # animal-shelter
//!
//! Data access for a shelter's animal records stored in MongoDB.
//!
//! ```rust,no_run
//! use animal_shelter::{AnimalShelter, ShelterConfig};
//! use mongodb::bson::doc;
//!
//! # async fn run() -> animal_shelter::Result<()> {
//! let shelter = AnimalShelter::connect(&ShelterConfig::new("aacuser", "secret")).await?;
//!
//! shelter.create(Some(doc! { "name": "Rex", "breed": "Beagle" })).await?;
//! let beagles = shelter.read(Some(&doc! { "breed": "Beagle" })).await;
//! shelter.update(Some(&doc! { "name": "Rex" }), Some(&doc! { "outcome_type": "Adoption" })).await?;
//! shelter.delete(Some(&doc! { "name": "Rex" })).await?;
//!
//! shelter.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod collection;
pub mod config;
pub mod errors;
pub mod identifier;
pub mod memory;
pub mod mongo;
pub mod shelter;

pub use collection::{DocumentCollection, InsertAck};
pub use config::ShelterConfig;
pub use errors::{Result, ShelterError};
pub use identifier::{ANIMAL_ID_FIELD, AnimalId};
pub use memory::MemoryCollection;
pub use mongo::MongoCollection;
pub use shelter::{AnimalShelter, CreateOutcome};
