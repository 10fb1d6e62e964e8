#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, StorageFairing};
use crate::logging::RequestLogger;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod storage;
pub mod voting;

/// Build the server, configured from `Rocket.toml` and the environment.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(StorageFairing)
        .attach(RequestLogger)
}

/// Build a server over the given store, with fixed test configuration.
#[cfg(test)]
pub(crate) fn rocket_for_store(store: storage::Store) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("jwt_secret", "test secret"))
        .merge(("auth_ttl", 3600));
    rocket::custom(figment)
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(RequestLogger)
        .manage(store)
}
