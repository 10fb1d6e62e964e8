//! The storage collaborator.
//!
//! Everything the application persists goes through [`Storage`]. The
//! production implementation is [`MongoStorage`]; [`MemoryStorage`] keeps
//! everything in process and backs the test suite.

use std::sync::Arc;

use crate::error::Result;
use crate::model::{
    common::{election::ElectionStatus, role::Role},
    db::{
        election::{Ballot, Election, ElectionChanges, NewElection, UpdateGuard},
        user::{NewUser, User},
    },
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStorage;
pub use mongo::MongoStorage;

/// Shared handle to the storage in use, kept in Rocket's managed state.
pub type Store = Arc<dyn Storage>;

/// Durable document storage with atomic per-document updates.
///
/// Elections and their ballot ledgers are one document each. Every method
/// that modifies a ledger is a single atomic operation on that document.
#[rocket::async_trait]
pub trait Storage: Send + Sync {
    /// Load an election by ID.
    async fn election(&self, id: Id) -> Result<Option<Election>>;

    /// List elections, optionally only those with the given status, in
    /// creation order.
    async fn elections(&self, status: Option<ElectionStatus>) -> Result<Vec<Election>>;

    /// Insert a new election, returning it with its assigned ID.
    async fn insert_election(&self, election: NewElection) -> Result<Election>;

    /// Apply `changes` to an election, but only if `guard` still holds.
    ///
    /// Returns the updated election, or `None` if the election is missing or
    /// the guard no longer holds.
    async fn update_election(
        &self,
        id: Id,
        guard: UpdateGuard,
        changes: &ElectionChanges,
    ) -> Result<Option<Election>>;

    /// Delete an election together with its ledger. Returns whether it existed.
    async fn delete_election(&self, id: Id) -> Result<bool>;

    /// Atomically append `ballot` to the ledger of election `id` if and only if
    /// the election is active, names the ballot's candidate, and holds no
    /// ballot from the same voter.
    ///
    /// Returns whether the ballot was appended.
    async fn append_ballot(&self, id: Id, ballot: &Ballot) -> Result<bool>;

    /// Atomically remove any ballot cast by `voter_id` from the ledger of
    /// election `id`, returning the election as it was before the removal.
    async fn pull_ballot(&self, id: Id, voter_id: Id) -> Result<Option<Election>>;

    /// Atomically empty the ledger of election `id`, returning the election
    /// as it was before.
    async fn clear_ballots(&self, id: Id) -> Result<Option<Election>>;

    /// Count elections, optionally only those with the given status.
    async fn count_elections(&self, status: Option<ElectionStatus>) -> Result<u64>;

    /// Total number of ballots across every election's ledger.
    async fn count_ballots(&self) -> Result<u64>;

    /// Load a user by ID.
    async fn user(&self, id: Id) -> Result<Option<User>>;

    /// Load a user by (lowercase) email.
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new user. Returns `None` if the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<Option<User>>;

    /// Change a user's role, returning the updated user.
    async fn set_role(&self, id: Id, role: Role) -> Result<Option<User>>;

    /// Count registered voters, i.e. users with the `user` role.
    async fn count_voters(&self) -> Result<u64>;
}
