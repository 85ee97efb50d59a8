//! # Connection settings
//!
//! The shelter connects to a single MongoDB collection. Settings can be built
//! by hand or read from the environment (a `.env` file is honoured):
//!
//! - `MONGODB_URL` or `DATABASE_URL`: full connection string, takes precedence
//! - `SHELTER_USERNAME`, `SHELTER_PASSWORD`: credentials, authenticated against `admin`
//! - `SHELTER_HOST`, `SHELTER_PORT`: server address
//! - `SHELTER_DB`, `SHELTER_COLLECTION`: where the animal records live

use serde::Deserialize;

use crate::errors::{Result, ShelterError};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 27017;
pub const DEFAULT_DATABASE: &str = "aac";
pub const DEFAULT_COLLECTION: &str = "animals";
pub const AUTH_SOURCE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShelterConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub collection_name: String,
    /// Overrides `host`, `port` and the credentials when set.
    pub uri: Option<String>,
}

impl Default for ShelterConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_name: DEFAULT_DATABASE.to_string(),
            collection_name: DEFAULT_COLLECTION.to_string(),
            uri: None,
        }
    }
}

impl ShelterConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        config.uri = lookup("MONGODB_URL").or_else(|| lookup("DATABASE_URL"));
        config.username = lookup("SHELTER_USERNAME");
        config.password = lookup("SHELTER_PASSWORD");

        if let Some(host) = lookup("SHELTER_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("SHELTER_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ShelterError::InvalidArgument("SHELTER_PORT must be a port number"))?;
        }
        if let Some(db) = lookup("SHELTER_DB") {
            config.database_name = db;
        }
        if let Some(collection) = lookup("SHELTER_COLLECTION") {
            config.collection_name = collection;
        }

        Ok(config)
    }

    /// `host:port`, as handed to the driver.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = ShelterConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ShelterConfig::default());
        assert_eq!(config.address(), "localhost:27017");
        assert_eq!(config.database_name, "aac");
        assert_eq!(config.collection_name, "animals");
    }

    #[test]
    fn reads_every_field() {
        let config = ShelterConfig::from_lookup(lookup_from(&[
            ("SHELTER_USERNAME", "aacuser"),
            ("SHELTER_PASSWORD", "secret"),
            ("SHELTER_HOST", "db.internal"),
            ("SHELTER_PORT", "27018"),
            ("SHELTER_DB", "shelter"),
            ("SHELTER_COLLECTION", "intake"),
        ]))
        .unwrap();

        assert_eq!(config.username.as_deref(), Some("aacuser"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.address(), "db.internal:27018");
        assert_eq!(config.database_name, "shelter");
        assert_eq!(config.collection_name, "intake");
        assert_eq!(config.uri, None);
    }

    #[test]
    fn mongodb_url_wins_over_database_url() {
        let config = ShelterConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mongodb://other"),
            ("MONGODB_URL", "mongodb://primary"),
        ]))
        .unwrap();
        assert_eq!(config.uri.as_deref(), Some("mongodb://primary"));
    }

    #[test]
    fn bad_port_is_an_invalid_argument() {
        let err = ShelterConfig::from_lookup(lookup_from(&[("SHELTER_PORT", "mongo")])).unwrap_err();
        assert!(matches!(err, ShelterError::InvalidArgument(_)));
    }

    #[test]
    fn deserializes_partial_settings() {
        let config: ShelterConfig =
            serde_json::from_str(r#"{"username": "aacuser", "port": 27100}"#).unwrap();
        assert_eq!(config.username.as_deref(), Some("aacuser"));
        assert_eq!(config.port, 27100);
        assert_eq!(config.host, DEFAULT_HOST);
    }
}
