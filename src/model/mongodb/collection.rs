use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    election::{Election, NewElection},
    user::{NewUser, User},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// User collections
const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}
impl MongoCollection for NewUser {
    const NAME: &'static str = USERS;
}

// Election collections
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}
impl MongoCollection for NewElection {
    const NAME: &'static str = ELECTIONS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();
    let unique_sparse = IndexOptions::builder().unique(true).sparse(true).build();

    // User collection.
    let email_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique)
        .build();
    let voter_number_index = IndexModel::builder()
        .keys(doc! {"voter_number": 1})
        .options(unique_sparse)
        .build();
    let users = Coll::<User>::from_db(db);
    users.create_index(email_index, None).await?;
    users.create_index(voter_number_index, None).await?;

    // Election collection: status is filtered on by listings and stats.
    let status_index = IndexModel::builder().keys(doc! {"status": 1}).build();
    Coll::<Election>::from_db(db)
        .create_index(status_index, None)
        .await?;

    Ok(())
}
