use std::{future::Future, time::Duration};

use log::debug;
use mongodb::{
    bson::{doc, to_bson, DateTime as BsonDateTime, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Database,
};
use rocket::{futures::TryStreamExt, http::Status, tokio::time::timeout};

use crate::error::{Error, Result, StorageError};
use crate::model::{
    common::{election::ElectionStatus, role::Role},
    db::{
        election::{Ballot, Election, ElectionChanges, NewElection, UpdateGuard},
        user::{NewUser, User},
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::Storage;

/// Storage backed by a MongoDB database.
///
/// Every call is bounded by `timeout`; an expired call is reported as
/// [`StorageError::Timeout`] and never retried.
pub struct MongoStorage {
    elections: Coll<Election>,
    new_elections: Coll<NewElection>,
    users: Coll<User>,
    new_users: Coll<NewUser>,
    timeout: Duration,
}

impl MongoStorage {
    pub fn new(db: &Database, timeout: Duration) -> Self {
        Self {
            elections: Coll::from_db(db),
            new_elections: Coll::from_db(db),
            users: Coll::from_db(db),
            new_users: Coll::from_db(db),
            timeout,
        }
    }

    async fn bounded<T, E, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        Error: From<E>,
    {
        bounded_by(self.timeout, call).await
    }

    async fn find_and_modify(
        &self,
        filter: Document,
        update: Document,
        returning: ReturnDocument,
    ) -> Result<Option<Election>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(returning)
            .build();
        self.bounded(
            self.elections
                .find_one_and_update(filter, update, options),
        )
        .await
    }
}

/// Run a storage call, failing if it outlives `limit`.
///
/// The call runs at most once. On expiry it is dropped, not restarted.
async fn bounded_by<T, E, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    Error: From<E>,
{
    match timeout(limit, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(StorageError::Timeout(limit).into()),
    }
}

/// Filter matching only elections that may accept `ballot` right now.
fn append_filter(id: Id, ballot: &Ballot) -> Document {
    doc! {
        "_id": id,
        "status": ElectionStatus::Active,
        "candidates._id": ballot.candidate_id,
        "ballots.voter_id": { "$ne": ballot.voter_id },
    }
}

/// Filter matching an election only while `guard` holds.
fn guarded_filter(id: Id, guard: UpdateGuard) -> Document {
    let mut filter = doc! {
        "_id": id,
        "status": guard.status,
    };
    if guard.require_empty_ledger {
        filter.insert("ballots", doc! { "$size": 0 });
    }
    filter
}

/// The `$set` body for `changes`. Empty if nothing changes.
fn changes_doc(changes: &ElectionChanges) -> Result<Document> {
    let mut set = Document::new();
    if let Some(title) = &changes.title {
        set.insert("title", title.clone());
    }
    if let Some(description) = &changes.description {
        set.insert("description", description.clone());
    }
    if let Some(starts_at) = changes.starts_at {
        set.insert("starts_at", BsonDateTime::from_chrono(starts_at));
    }
    if let Some(ends_at) = changes.ends_at {
        set.insert("ends_at", BsonDateTime::from_chrono(ends_at));
    }
    if let Some(status) = changes.status {
        set.insert("status", status);
    }
    if let Some(candidates) = &changes.candidates {
        set.insert("candidates", to_bson(candidates)?);
    }
    Ok(set)
}

/// MongoDB always assigns an `ObjectId` unless the document brings its own.
fn missing_inserted_id(what: &str) -> Error {
    Error::Status(
        Status::InternalServerError,
        format!("Inserted {what} has no ObjectId"),
    )
}

fn status_filter(status: Option<ElectionStatus>) -> Option<Document> {
    status.map(|status| doc! { "status": status })
}

#[rocket::async_trait]
impl Storage for MongoStorage {
    async fn election(&self, id: Id) -> Result<Option<Election>> {
        self.bounded(self.elections.find_one(id.as_doc(), None))
            .await
    }

    async fn elections(&self, status: Option<ElectionStatus>) -> Result<Vec<Election>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        self.bounded(async {
            self.elections
                .find(status_filter(status), options)
                .await?
                .try_collect::<Vec<_>>()
                .await
        })
        .await
    }

    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let result = self
            .bounded(self.new_elections.insert_one(&election, None))
            .await?;
        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| missing_inserted_id("election"))?;
        Ok(Election {
            id: id.into(),
            election,
        })
    }

    async fn update_election(
        &self,
        id: Id,
        guard: UpdateGuard,
        changes: &ElectionChanges,
    ) -> Result<Option<Election>> {
        let filter = guarded_filter(id, guard);
        let set = changes_doc(changes)?;
        if set.is_empty() {
            return self.bounded(self.elections.find_one(filter, None)).await;
        }
        self.find_and_modify(filter, doc! { "$set": set }, ReturnDocument::After)
            .await
    }

    async fn delete_election(&self, id: Id) -> Result<bool> {
        let result = self
            .bounded(self.elections.delete_one(id.as_doc(), None))
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn append_ballot(&self, id: Id, ballot: &Ballot) -> Result<bool> {
        let update = doc! {
            "$push": { "ballots": to_bson(ballot)? },
        };
        let result = self
            .bounded(
                self.elections
                    .update_one(append_filter(id, ballot), update, None),
            )
            .await?;
        debug!(
            "Ballot append on election {id} matched {} document(s)",
            result.matched_count
        );
        Ok(result.modified_count == 1)
    }

    async fn pull_ballot(&self, id: Id, voter_id: Id) -> Result<Option<Election>> {
        let update = doc! {
            "$pull": { "ballots": { "voter_id": voter_id } },
        };
        self.find_and_modify(id.as_doc(), update, ReturnDocument::Before)
            .await
    }

    async fn clear_ballots(&self, id: Id) -> Result<Option<Election>> {
        let update = doc! {
            "$set": { "ballots": [] },
        };
        self.find_and_modify(id.as_doc(), update, ReturnDocument::Before)
            .await
    }

    async fn count_elections(&self, status: Option<ElectionStatus>) -> Result<u64> {
        self.bounded(self.elections.count_documents(status_filter(status), None))
            .await
    }

    async fn count_ballots(&self) -> Result<u64> {
        let pipeline = [
            doc! { "$project": { "n": { "$size": "$ballots" } } },
            doc! { "$group": { "_id": null, "total": { "$sum": "$n" } } },
        ];
        let totals = self
            .bounded(async {
                self.elections
                    .aggregate(pipeline, None)
                    .await?
                    .try_collect::<Vec<Document>>()
                    .await
            })
            .await?;
        // `$sum` yields an Int32 or Int64 depending on magnitude; no elections
        // means no group at all.
        let total = totals.first().map_or(0, |totals| {
            totals
                .get_i64("total")
                .or_else(|_| totals.get_i32("total").map(i64::from))
                .unwrap_or(0)
        });
        Ok(total.max(0) as u64)
    }

    async fn user(&self, id: Id) -> Result<Option<User>> {
        self.bounded(self.users.find_one(id.as_doc(), None)).await
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.bounded(self.users.find_one(doc! { "email": email }, None))
            .await
    }

    async fn insert_user(&self, user: NewUser) -> Result<Option<User>> {
        let inserted = self
            .bounded(async {
                match self.new_users.insert_one(&user, None).await {
                    Ok(result) => Ok(Some(result)),
                    Err(err) if is_duplicate_key_error(&err) => Ok(None),
                    Err(err) => Err(err),
                }
            })
            .await?;
        let Some(inserted) = inserted else {
            return Ok(None);
        };
        let id = inserted
            .inserted_id
            .as_object_id()
            .ok_or_else(|| missing_inserted_id("user"))?;
        Ok(Some(User {
            id: id.into(),
            user,
        }))
    }

    async fn set_role(&self, id: Id, role: Role) -> Result<Option<User>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let update = doc! { "$set": { "role": role } };
        self.bounded(self.users.find_one_and_update(id.as_doc(), update, options))
            .await
    }

    async fn count_voters(&self) -> Result<u64> {
        self.bounded(
            self.users
                .count_documents(doc! { "role": Role::User }, None),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use mongodb::{bson::Bson, error::Error as DbError};

    use super::*;

    use crate::model::db::election::Candidate;

    #[test]
    fn append_filter_checks_every_ledger_invariant() {
        let id = Id::new();
        let ballot = Ballot::new(Id::new(), Id::new(), None);
        let filter = append_filter(id, &ballot);

        assert_eq!(filter.get_object_id("_id").unwrap(), *id);
        assert_eq!(filter.get_str("status").unwrap(), "active");
        assert_eq!(
            filter.get_object_id("candidates._id").unwrap(),
            *ballot.candidate_id
        );
        assert_eq!(
            filter
                .get_document("ballots.voter_id")
                .unwrap()
                .get_object_id("$ne")
                .unwrap(),
            *ballot.voter_id
        );
    }

    #[test]
    fn guarded_filter_optionally_requires_empty_ledger() {
        let id = Id::new();
        let loose = guarded_filter(
            id,
            UpdateGuard {
                status: ElectionStatus::Draft,
                require_empty_ledger: false,
            },
        );
        assert_eq!(loose.get_str("status").unwrap(), "draft");
        assert!(!loose.contains_key("ballots"));

        let strict = guarded_filter(
            id,
            UpdateGuard {
                status: ElectionStatus::Active,
                require_empty_ledger: true,
            },
        );
        assert_eq!(
            strict.get_document("ballots").unwrap().get("$size"),
            Some(&Bson::Int32(0))
        );
    }

    #[test]
    fn changes_doc_only_sets_given_fields() {
        assert!(changes_doc(&ElectionChanges::default()).unwrap().is_empty());

        let now = Utc::now();
        let changes = ElectionChanges {
            title: Some("New title".to_string()),
            ends_at: Some(now),
            status: Some(ElectionStatus::Cancelled),
            candidates: Some(vec![Candidate::example("Dana", "Red Party")]),
            ..Default::default()
        };
        let set = changes_doc(&changes).unwrap();

        assert_eq!(set.len(), 4);
        assert_eq!(set.get_str("title").unwrap(), "New title");
        assert_eq!(set.get_str("status").unwrap(), "cancelled");
        assert_eq!(
            set.get_datetime("ends_at").unwrap(),
            &BsonDateTime::from_chrono(now)
        );
        let candidates = set.get_array("candidates").unwrap();
        assert_eq!(
            candidates[0].as_document().unwrap().get_str("name").unwrap(),
            "Dana"
        );
        assert!(!set.contains_key("description"));
    }

    #[rocket::async_test]
    async fn stalled_call_times_out_without_retry() {
        let attempts = AtomicUsize::new(0);
        let limit = Duration::from_millis(10);

        let result = bounded_by(limit, async {
            attempts.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<std::result::Result<(), DbError>>().await
        })
        .await;

        match result {
            Err(Error::StorageUnavailable(StorageError::Timeout(after))) => {
                assert_eq!(after, limit)
            }
            other => panic!("Expected a timeout, got {other:?}"),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(
            Error::from(StorageError::Timeout(limit)).status(),
            Status::ServiceUnavailable
        );
    }

    #[rocket::async_test]
    async fn prompt_call_passes_through() {
        let result = bounded_by(Duration::from_secs(1), async {
            Ok::<_, DbError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }
}
