use rocket::{serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, Elector, Voter},
        election::ElectionDescription,
        user::UserProfile,
        vote::{VoteConfirmation, VoteRequest},
    },
    common::election::ElectionStatus,
    mongodb::Id,
};
use crate::storage::Store;
use crate::voting::ledger;

pub fn routes() -> Vec<Route> {
    routes![elections, election, vote, profile]
}

#[get("/api/user/elections?<active>")]
pub async fn elections(
    token: AuthToken<Voter>,
    active: Option<bool>,
    store: &State<Store>,
) -> Result<Json<Vec<ElectionDescription>>> {
    let status = active.unwrap_or(false).then_some(ElectionStatus::Active);
    let elections = store
        .elections(status)
        .await?
        .iter()
        .filter(|election| election.status != ElectionStatus::Draft)
        .map(|election| ElectionDescription::for_viewer(election, token.id))
        .collect();
    Ok(Json(elections))
}

#[get("/api/user/elections/<election_id>")]
pub async fn election(
    token: AuthToken<Voter>,
    election_id: Id,
    store: &State<Store>,
) -> Result<Json<ElectionDescription>> {
    // Drafts are invisible outside the admin surface.
    let election = store
        .election(election_id)
        .await?
        .filter(|election| election.status != ElectionStatus::Draft)
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    Ok(Json(ElectionDescription::for_viewer(&election, token.id)))
}

#[post("/api/user/vote", data = "<request>", format = "json")]
pub async fn vote(
    token: AuthToken<Elector>,
    request: Json<VoteRequest>,
    store: &State<Store>,
) -> Result<Json<VoteConfirmation>> {
    let request = request.into_inner();
    // A blank district is no district.
    let explicit = request
        .district
        .map(|district| district.trim().to_string())
        .filter(|district| !district.is_empty());
    let district = match explicit {
        Some(district) => Some(district),
        None => store
            .user(token.id)
            .await?
            .and_then(|user| user.user.profile.district),
    };
    let confirmation = ledger::cast_vote(
        store,
        request.election_id.into(),
        token.id,
        request.candidate_id.into(),
        district,
    )
    .await?;
    Ok(Json(confirmation))
}

#[get("/api/user/me")]
pub async fn profile(token: AuthToken<Voter>, store: &State<Store>) -> Result<Json<UserProfile>> {
    let user = store
        .user(token.id)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {}", token.id)))?;
    Ok(Json(user.into()))
}
