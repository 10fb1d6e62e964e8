use std::collections::HashMap;

use log::info;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{Admin, AuthToken},
        election::{check_schedule, AdminElectionDescription, ElectionSpec, ElectionUpdate},
        ledger::{BallotRemoval, LedgerReset},
        results::ElectionResults,
        stats::AggregateStats,
        turnout::Turnout,
        user::UserProfile,
    },
    common::role::Role,
    db::{
        election::{Election, UpdateGuard},
        user::User,
    },
    mongodb::Id,
};
use crate::storage::Store;
use crate::voting::{ledger, tally};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        elections,
        election,
        update_election,
        delete_election,
        results,
        remove_ballot,
        clear_ballots,
        turnout,
        stats,
        promote_user,
    ]
}

#[post("/api/admin/elections", data = "<spec>", format = "json")]
async fn create_election(
    token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    store: &State<Store>,
) -> Result<Json<AdminElectionDescription>> {
    let new_election = spec.into_inner().into_election(token.id)?;
    let election = store.insert_election(new_election).await?;
    info!("Admin {} created election {}", token.id, election.id);
    Ok(Json(describe(store, &election).await?))
}

#[get("/api/admin/elections")]
async fn elections(
    _token: AuthToken<Admin>,
    store: &State<Store>,
) -> Result<Json<Vec<AdminElectionDescription>>> {
    let elections = store.elections(None).await?;

    // Look each creator up once.
    let mut creators: HashMap<Id, Option<User>> = HashMap::new();
    for election in &elections {
        if !creators.contains_key(&election.created_by) {
            let creator = store.user(election.created_by).await?;
            creators.insert(election.created_by, creator);
        }
    }

    let descriptions = elections
        .iter()
        .map(|election| {
            let creator = creators.get(&election.created_by).and_then(Option::as_ref);
            AdminElectionDescription::new(election, creator)
        })
        .collect();
    Ok(Json(descriptions))
}

#[get("/api/admin/elections/<election_id>")]
async fn election(
    _token: AuthToken<Admin>,
    election_id: Id,
    store: &State<Store>,
) -> Result<Json<AdminElectionDescription>> {
    let election = load(store, election_id).await?;
    Ok(Json(describe(store, &election).await?))
}

#[put("/api/admin/elections/<election_id>", data = "<update>", format = "json")]
async fn update_election(
    token: AuthToken<Admin>,
    election_id: Id,
    update: Json<ElectionUpdate>,
    store: &State<Store>,
) -> Result<Json<AdminElectionDescription>> {
    let election = load(store, election_id).await?;
    let changes = update.into_inner().into_changes()?;

    if let Some(target) = changes.status {
        if !election.status.can_transition_to(target) {
            return Err(Error::IllegalTransition {
                election: election_id,
                from: election.status,
                to: target,
            });
        }
    }
    // Ballots must never reference a removed candidate.
    if changes.candidates.is_some() && !election.ballots.is_empty() {
        return Err(Error::Status(
            Status::BadRequest,
            "Candidates cannot be changed once ballots have been cast".to_string(),
        ));
    }
    check_schedule(
        changes.starts_at.unwrap_or(election.starts_at),
        changes.ends_at.unwrap_or(election.ends_at),
    )?;

    let guard = UpdateGuard {
        status: election.status,
        require_empty_ledger: changes.candidates.is_some(),
    };
    let updated = store
        .update_election(election_id, guard, &changes)
        .await?
        .ok_or_else(|| {
            Error::Status(
                Status::Conflict,
                format!("Election {election_id} changed during the update, try again"),
            )
        })?;
    if updated.status != election.status {
        info!(
            "Admin {} moved election {election_id} from {} to {}",
            token.id, election.status, updated.status
        );
    }

    Ok(Json(describe(store, &updated).await?))
}

#[delete("/api/admin/elections/<election_id>")]
async fn delete_election(
    token: AuthToken<Admin>,
    election_id: Id,
    store: &State<Store>,
) -> Result<()> {
    if !store.delete_election(election_id).await? {
        return Err(Error::not_found(format!("Election {election_id}")));
    }
    info!("Admin {} deleted election {election_id}", token.id);
    Ok(())
}

#[get("/api/admin/elections/<election_id>/results")]
async fn results(
    _token: AuthToken<Admin>,
    election_id: Id,
    store: &State<Store>,
) -> Result<Json<ElectionResults>> {
    Ok(Json(tally::compute_results(store, election_id).await?))
}

#[delete("/api/admin/elections/<election_id>/ballots/<voter_id>")]
async fn remove_ballot(
    _token: AuthToken<Admin>,
    election_id: Id,
    voter_id: Id,
    store: &State<Store>,
) -> Result<Json<BallotRemoval>> {
    Ok(Json(ledger::remove_ballot(store, election_id, voter_id).await?))
}

#[delete("/api/admin/elections/<election_id>/ballots")]
async fn clear_ballots(
    _token: AuthToken<Admin>,
    election_id: Id,
    store: &State<Store>,
) -> Result<Json<LedgerReset>> {
    Ok(Json(ledger::clear_ledger(store, election_id).await?))
}

#[get("/api/admin/turnout/<election_id>")]
async fn turnout(
    _token: AuthToken<Admin>,
    election_id: Id,
    store: &State<Store>,
) -> Result<Json<Turnout>> {
    Ok(Json(tally::compute_turnout(store, election_id).await?))
}

#[get("/api/admin/stats")]
async fn stats(_token: AuthToken<Admin>, store: &State<Store>) -> Result<Json<AggregateStats>> {
    Ok(Json(tally::aggregate_stats(store).await?))
}

#[post("/api/admin/users/<user_id>/promote")]
async fn promote_user(
    token: AuthToken<Admin>,
    user_id: Id,
    store: &State<Store>,
) -> Result<Json<UserProfile>> {
    let user = store
        .set_role(user_id, Role::Admin)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {user_id}")))?;
    info!("Admin {} promoted user {user_id}", token.id);
    Ok(Json(user.into()))
}

async fn load(store: &Store, election_id: Id) -> Result<Election> {
    store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
}

async fn describe(store: &Store, election: &Election) -> Result<AdminElectionDescription> {
    let creator = store.user(election.created_by).await?;
    Ok(AdminElectionDescription::new(election, creator.as_ref()))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::{
        http::ContentType,
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json::json,
    };

    use crate::model::{
        api::{election::CandidateSpec, id::ApiId},
        common::election::ElectionStatus,
        db::{election::ElectionCore, user::NewUser},
    };

    use super::*;

    async fn create(client: &Client, spec: &ElectionSpec) -> AdminElectionDescription {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json().await.unwrap()
    }

    async fn update<'c>(client: &'c Client, id: ApiId, update: &ElectionUpdate) -> LocalResponse<'c> {
        client
            .put(uri!(update_election(*id)))
            .header(ContentType::JSON)
            .body(json!(update).to_string())
            .dispatch()
            .await
    }

    fn status_update(status: ElectionStatus) -> ElectionUpdate {
        ElectionUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Insert an active election with ballots from `voters` fresh voters,
    /// cycling through the candidates.
    async fn active_with_votes(store: &Store, voters: usize) -> Election {
        let election = store
            .insert_election(ElectionCore::example_active(Id::new()))
            .await
            .unwrap();
        for i in 0..voters {
            let candidate = election.candidates[i % election.candidates.len()].id;
            ledger::cast_vote(store, election.id, Id::new(), candidate, None)
                .await
                .unwrap();
        }
        election
    }

    #[backend_test(admin)]
    async fn create_and_get(client: Client, store: Store) {
        let created = create(&client, &ElectionSpec::example()).await;
        assert_eq!(created.status, ElectionStatus::Draft);
        assert!(created.ballots.is_empty());
        let creator = created.created_by.as_ref().unwrap();
        assert_eq!(creator.email, "admin@example.com");

        let response = client.get(uri!(election(*created.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let fetched: AdminElectionDescription = response.into_json().await.unwrap();
        assert_eq!(fetched, created);

        let response = client.get(uri!(elections)).dispatch().await;
        let listed: Vec<AdminElectionDescription> = response.into_json().await.unwrap();
        assert_eq!(listed, vec![created]);

        assert_eq!(store.count_elections(None).await.unwrap(), 1);
    }

    #[backend_test(admin)]
    async fn create_rejects_backwards_schedule(client: Client, store: Store) {
        let mut spec = ElectionSpec::example();
        spec.ends_at = spec.starts_at - Duration::days(1);
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(store.count_elections(None).await.unwrap(), 0);
    }

    #[backend_test(voter)]
    async fn voters_are_not_admins(client: Client) {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(ElectionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        let response = client.get(uri!(stats)).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test(admin)]
    async fn lifecycle(client: Client) {
        let created = create(&client, &ElectionSpec::example()).await;

        for status in [ElectionStatus::Scheduled, ElectionStatus::Active] {
            let response = update(&client, created.id, &status_update(status)).await;
            assert_eq!(Status::Ok, response.status());
            let updated: AdminElectionDescription = response.into_json().await.unwrap();
            assert_eq!(updated.status, status);
        }

        // No going back.
        let response = update(&client, created.id, &status_update(ElectionStatus::Draft)).await;
        assert_eq!(Status::Conflict, response.status());

        let response = update(&client, created.id, &status_update(ElectionStatus::Completed)).await;
        assert_eq!(Status::Ok, response.status());

        // Terminal.
        let response = update(&client, created.id, &status_update(ElectionStatus::Cancelled)).await;
        assert_eq!(Status::Conflict, response.status());
    }

    #[backend_test(admin)]
    async fn update_details(client: Client, store: Store) {
        let created = create(&client, &ElectionSpec::example()).await;

        let rename = ElectionUpdate {
            title: Some("Renamed".to_string()),
            candidates: Some(vec![CandidateSpec::example("Dana White", "Red Party")]),
            ..Default::default()
        };
        let response = update(&client, created.id, &rename).await;
        assert_eq!(Status::Ok, response.status());
        let updated: AdminElectionDescription = response.into_json().await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.candidates.len(), 1);
        assert_eq!(updated.description, created.description);

        let backwards = ElectionUpdate {
            ends_at: Some(created.starts_at - Duration::days(1)),
            ..Default::default()
        };
        let response = update(&client, created.id, &backwards).await;
        assert_eq!(Status::BadRequest, response.status());

        // Candidates are frozen once the ledger is non-empty.
        let election = active_with_votes(&store, 1).await;
        let replace = ElectionUpdate {
            candidates: Some(vec![CandidateSpec::example("Eve", "")]),
            ..Default::default()
        };
        let response = update(&client, election.id.into(), &replace).await;
        assert_eq!(Status::BadRequest, response.status());

        let response = update(&client, Id::new().into(), &rename).await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn delete_removes_ledger(client: Client, store: Store) {
        let election = active_with_votes(&store, 2).await;

        let response = client.delete(uri!(delete_election(election.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert!(store.election(election.id).await.unwrap().is_none());
        assert_eq!(store.count_ballots().await.unwrap(), 0);

        let response = client.delete(uri!(delete_election(election.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn results_and_overrides(client: Client, store: Store) {
        let election = store
            .insert_election(ElectionCore::example_active(Id::new()))
            .await
            .unwrap();
        let [alice, bob] = [0, 1].map(|i| election.candidates[i].id);
        let (v1, v2) = (Id::new(), Id::new());
        ledger::cast_vote(&store, election.id, v1, alice, None)
            .await
            .unwrap();
        ledger::cast_vote(&store, election.id, v2, bob, None)
            .await
            .unwrap();

        let response = client.get(uri!(results(election.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults = response.into_json().await.unwrap();
        assert_eq!(results.title, "Presidential Election 2025");
        let votes: Vec<u64> = results.results.iter().map(|r| r.votes).collect();
        assert_eq!(votes, [1, 1, 0]);

        let response = client
            .delete(uri!(remove_ballot(election.id, v1)))
            .dispatch()
            .await;
        let removal: BallotRemoval = response.into_json().await.unwrap();
        assert_eq!(
            removal,
            BallotRemoval {
                removed: 1,
                remaining: 1
            }
        );

        let response = client.get(uri!(results(election.id))).dispatch().await;
        let results: ElectionResults = response.into_json().await.unwrap();
        let votes: Vec<u64> = results.results.iter().map(|r| r.votes).collect();
        assert_eq!(votes, [0, 1, 0]);

        let response = client.delete(uri!(clear_ballots(election.id))).dispatch().await;
        let reset: LedgerReset = response.into_json().await.unwrap();
        assert_eq!(
            reset,
            LedgerReset {
                previous: 1,
                current: 0
            }
        );

        let response = client.get(uri!(results(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let response = client.delete(uri!(clear_ballots(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn turnout_and_stats(client: Client, store: Store) {
        for n in 0..10 {
            store
                .insert_user(NewUser::example_voter(n))
                .await
                .unwrap()
                .unwrap();
        }
        let election = active_with_votes(&store, 2).await;

        let response = client.get(uri!(turnout(election.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let turnout: Turnout = response.into_json().await.unwrap();
        assert_eq!(turnout.overall.eligible_voters, 10);
        assert_eq!(turnout.overall.votes_cast, 2);
        assert_eq!(turnout.overall.percentage, 20.0);
        assert_eq!(turnout.district_distribution.len(), 1);
        assert_eq!(turnout.district_distribution[0].district, "Unknown");

        let response = client.get(uri!(stats)).dispatch().await;
        let stats: AggregateStats = response.into_json().await.unwrap();
        assert_eq!(stats.total_elections, 1);
        assert_eq!(stats.active_elections, 1);
        assert_eq!(stats.total_voters, 10);
        assert_eq!(stats.total_votes, 2);
        assert_eq!(stats.pending_disputes, 0);
        assert_eq!(stats.system_alerts, 0);
    }

    #[backend_test(admin)]
    async fn promote(client: Client, store: Store) {
        let voter = store
            .insert_user(NewUser::example_voter(7))
            .await
            .unwrap()
            .unwrap();

        let response = client.post(uri!(promote_user(voter.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let promoted: UserProfile = response.into_json().await.unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert_eq!(store.count_voters().await.unwrap(), 0);

        let response = client.post(uri!(promote_user(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }
}
