use std::sync::Arc;

use chrono::Duration;
use log::{error, info};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;
use crate::storage::{MemoryStorage, MongoStorage, Store};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Which storage implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Mongodb,
    Memory,
}

/// Configuration for the storage collaborator.
#[derive(Deserialize)]
struct DbConfig {
    // non-secrets
    storage: StorageKind,
    db_name: String,
    storage_timeout: u64,
    // secrets
    db_uri: String,
}

impl DbConfig {
    /// Upper bound on any single storage call.
    fn storage_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.storage_timeout)
    }
}

/// A fairing that loads the storage config, connects to the database if
/// required, performs any setup necessary, and places a [`Store`] into
/// managed state.
pub struct StorageFairing;

#[rocket::async_trait]
impl Fairing for StorageFairing {
    fn info(&self) -> Info {
        Info {
            name: "Storage",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load storage config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store: Store = match config.storage {
            StorageKind::Memory => {
                info!("Using in-memory storage; nothing will be persisted");
                Arc::new(MemoryStorage::new())
            }
            StorageKind::Mongodb => {
                info!("Loaded database config, connecting...");
                // Construct the connection.
                let client = match MongoClient::with_uri_str(&config.db_uri).await {
                    Ok(client) => client,
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                };
                let db = client.database(&config.db_name);

                // Ensure the required indexes exist.
                if let Err(e) = ensure_indexes_exist(&db).await {
                    error!("Failed to connect to database: {e}");
                    return Err(rocket);
                }
                info!("...database connection online!");

                Arc::new(MongoStorage::new(&db, config.storage_timeout()))
            }
        };

        // Manage the state.
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::*;

    #[test]
    fn config_from_figment() {
        let figment = Figment::new()
            .merge(Serialized::default("jwt_secret", "secret"))
            .merge(Serialized::default("auth_ttl", 60));
        let config: Config = figment.extract().unwrap();

        assert_eq!(config.auth_ttl(), Duration::seconds(60));
        assert_eq!(config.jwt_secret(), b"secret");
    }

    #[test]
    fn storage_kind_is_lowercase() {
        let figment = Figment::new()
            .merge(Serialized::default("storage", "memory"))
            .merge(Serialized::default("db_name", "test"))
            .merge(Serialized::default("storage_timeout", 10))
            .merge(Serialized::default("db_uri", "mongodb://localhost"));
        let config: DbConfig = figment.extract().unwrap();
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(
            config.storage_timeout(),
            std::time::Duration::from_millis(10)
        );
    }
}
