use log::{debug, info, warn};
use rocket::http::Status;

use crate::error::{Error, Result};
use crate::model::{
    api::{
        ledger::{BallotRemoval, LedgerReset},
        vote::VoteConfirmation,
    },
    db::election::{Ballot, Election},
    mongodb::Id,
};
use crate::storage::Store;

use super::election_not_found;

/// Would `election` accept a ballot from `voter_id` for `candidate_id`?
///
/// Checks run in a fixed order, so the first failing rule is the one
/// reported.
pub fn check_ballot(election: &Election, voter_id: Id, candidate_id: Id) -> Result<()> {
    if !election.status.accepts_votes() {
        return Err(Error::ElectionNotActive {
            election: election.id,
            status: election.status,
        });
    }
    if election.ballot_of(voter_id).is_some() {
        return Err(Error::DuplicateVote {
            election: election.id,
            voter: voter_id,
        });
    }
    if election.candidate(candidate_id).is_none() {
        return Err(Error::InvalidCandidate {
            election: election.id,
            candidate: candidate_id,
        });
    }
    Ok(())
}

/// Cast a ballot for `candidate_id` in election `election_id` on behalf of
/// `voter_id`.
///
/// The append is conditional on every ledger rule still holding, so two
/// concurrent casts by the same voter can never both succeed.
pub async fn cast_vote(
    store: &Store,
    election_id: Id,
    voter_id: Id,
    candidate_id: Id,
    district: Option<String>,
) -> Result<VoteConfirmation> {
    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| election_not_found(election_id))?;
    check_ballot(&election, voter_id, candidate_id)?;

    let ballot = Ballot::new(candidate_id, voter_id, district);
    if store.append_ballot(election_id, &ballot).await? {
        info!("Voter {voter_id} cast a ballot in election {election_id}");
        return Ok(VoteConfirmation::new(election_id.into(), &ballot));
    }

    // The election changed between the read and the append. Work out why.
    debug!("Conditional ballot append on election {election_id} matched nothing, re-checking");
    let current = store
        .election(election_id)
        .await?
        .ok_or_else(|| election_not_found(election_id))?;
    check_ballot(&current, voter_id, candidate_id)?;
    Err(Error::Status(
        Status::Conflict,
        format!("Ballot for election {election_id} could not be recorded"),
    ))
}

/// Remove the ballot cast by `voter_id`, if there is one.
///
/// Idempotent: removing an absent ballot reports `removed: 0`.
pub async fn remove_ballot(store: &Store, election_id: Id, voter_id: Id) -> Result<BallotRemoval> {
    let before = store
        .pull_ballot(election_id, voter_id)
        .await?
        .ok_or_else(|| election_not_found(election_id))?;
    let removed = before
        .ballots
        .iter()
        .filter(|ballot| ballot.voter_id == voter_id)
        .count() as u64;
    let remaining = before.ballots.len() as u64 - removed;
    if removed > 0 {
        warn!("Removed ballot of voter {voter_id} from election {election_id}");
    }
    Ok(BallotRemoval { removed, remaining })
}

/// Remove every ballot from an election's ledger.
pub async fn clear_ledger(store: &Store, election_id: Id) -> Result<LedgerReset> {
    let before = store
        .clear_ballots(election_id)
        .await?
        .ok_or_else(|| election_not_found(election_id))?;
    let previous = before.ballots.len() as u64;
    warn!("Cleared {previous} ballot(s) from election {election_id}");
    Ok(LedgerReset {
        previous,
        current: 0,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rocket::tokio;

    use super::*;

    use crate::model::{
        common::election::ElectionStatus,
        db::election::{ElectionCore, NewElection},
    };
    use crate::storage::MemoryStorage;
    use crate::voting::tally::compute_results;

    async fn store_with(election: NewElection) -> (Store, Election) {
        let store: Store = Arc::new(MemoryStorage::new());
        let election = store.insert_election(election).await.unwrap();
        (store, election)
    }

    fn votes(results: &[crate::model::api::results::CandidateResult]) -> Vec<u64> {
        results.iter().map(|r| r.votes).collect()
    }

    #[rocket::async_test]
    async fn presidential_scenario() {
        let (store, election) = store_with(ElectionCore::example_active(Id::new())).await;
        let [alice, bob, _carlos] = [0, 1, 2].map(|i| election.candidates[i].id);
        let (v1, v2) = (Id::new(), Id::new());

        cast_vote(&store, election.id, v1, alice, None).await.unwrap();
        let duplicate = cast_vote(&store, election.id, v1, bob, None).await;
        assert!(matches!(duplicate, Err(Error::DuplicateVote { .. })));
        cast_vote(&store, election.id, v2, bob, Some("North".to_string()))
            .await
            .unwrap();

        let results = compute_results(&store, election.id).await.unwrap();
        assert_eq!(votes(&results.results), [1, 1, 0]);
        assert_eq!(results.results[0].name, "Alice Johnson");

        let removal = remove_ballot(&store, election.id, v1).await.unwrap();
        assert_eq!(
            removal,
            BallotRemoval {
                removed: 1,
                remaining: 1
            }
        );
        let results = compute_results(&store, election.id).await.unwrap();
        assert_eq!(votes(&results.results), [0, 1, 0]);

        // Idempotent.
        let again = remove_ballot(&store, election.id, v1).await.unwrap();
        assert_eq!(
            again,
            BallotRemoval {
                removed: 0,
                remaining: 1
            }
        );
    }

    #[rocket::async_test]
    async fn inactive_elections_reject_votes() {
        for status in [
            ElectionStatus::Draft,
            ElectionStatus::Scheduled,
            ElectionStatus::Completed,
            ElectionStatus::Cancelled,
        ] {
            let (store, election) =
                store_with(ElectionCore::example_with_status(Id::new(), status)).await;
            let candidate = election.candidates[0].id;

            let result = cast_vote(&store, election.id, Id::new(), candidate, None).await;
            assert!(matches!(result, Err(Error::ElectionNotActive { .. })));

            let stored = store.election(election.id).await.unwrap().unwrap();
            assert!(stored.ballots.is_empty());
        }
    }

    #[rocket::async_test]
    async fn unknown_election_and_candidate() {
        let (store, election) = store_with(ElectionCore::example_active(Id::new())).await;
        let candidate = election.candidates[0].id;

        let missing = cast_vote(&store, Id::new(), Id::new(), candidate, None).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        let invalid = cast_vote(&store, election.id, Id::new(), Id::new(), None).await;
        assert!(matches!(invalid, Err(Error::InvalidCandidate { .. })));
        assert!(store
            .election(election.id)
            .await
            .unwrap()
            .unwrap()
            .ballots
            .is_empty());
    }

    #[rocket::async_test]
    async fn duplicate_reported_before_bad_candidate() {
        let (store, election) = store_with(ElectionCore::example_active(Id::new())).await;
        let voter = Id::new();
        cast_vote(&store, election.id, voter, election.candidates[0].id, None)
            .await
            .unwrap();

        let result = cast_vote(&store, election.id, voter, Id::new(), None).await;
        assert!(matches!(result, Err(Error::DuplicateVote { .. })));
    }

    #[rocket::async_test]
    async fn concurrent_casts_accept_one() {
        let (store, election) = store_with(ElectionCore::example_active(Id::new())).await;
        let (election_id, voter) = (election.id, Id::new());
        let candidate = election.candidates[2].id;

        let attempts = (0..8).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { cast_vote(&store, election_id, voter, candidate, None).await })
        });
        let mut accepted = 0;
        for attempt in attempts.collect::<Vec<_>>() {
            match attempt.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(Error::DuplicateVote { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(accepted, 1);
        let stored = store.election(election.id).await.unwrap().unwrap();
        assert_eq!(stored.ballots.len(), 1);
    }

    #[rocket::async_test]
    async fn clear_then_tally_is_all_zero() {
        let (store, election) = store_with(ElectionCore::example_active(Id::new())).await;
        for i in 0..3 {
            let candidate = election.candidates[i].id;
            cast_vote(&store, election.id, Id::new(), candidate, None)
                .await
                .unwrap();
        }

        let reset = clear_ledger(&store, election.id).await.unwrap();
        assert_eq!(
            reset,
            LedgerReset {
                previous: 3,
                current: 0
            }
        );
        let results = compute_results(&store, election.id).await.unwrap();
        assert_eq!(votes(&results.results), [0, 0, 0]);

        assert!(matches!(
            clear_ledger(&store, Id::new()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            remove_ballot(&store, Id::new(), Id::new()).await,
            Err(Error::NotFound(_))
        ));
    }
}
