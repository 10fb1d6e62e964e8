use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{id::ApiId, user::UserSummary},
    common::election::ElectionStatus,
    db::{
        election::{Ballot, Candidate, Election},
        user::User,
    },
    mongodb::Id,
};

/// A candidate as shown over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub party: String,
}

impl From<&Candidate> for CandidateDescription {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            name: candidate.name.clone(),
            party: candidate.party.clone(),
        }
    }
}

/// Public view of an election. Never exposes who voted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDescription {
    pub id: ApiId,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: ElectionStatus,
    pub candidates: Vec<CandidateDescription>,
    /// Whether the caller has a ballot in this election's ledger.
    pub has_voted: bool,
}

impl ElectionDescription {
    /// Describe `election` from the point of view of `viewer`.
    pub fn for_viewer(election: &Election, viewer: Id) -> Self {
        Self {
            id: election.id.into(),
            title: election.title.clone(),
            description: election.description.clone(),
            starts_at: election.starts_at,
            ends_at: election.ends_at,
            status: election.status,
            candidates: election.candidates.iter().map(Into::into).collect(),
            has_voted: election.ballot_of(viewer).is_some(),
        }
    }
}

/// A ballot as shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotDescription {
    pub candidate_id: ApiId,
    pub voter_id: ApiId,
    pub district: Option<String>,
    pub cast_at: DateTime<Utc>,
}

impl From<&Ballot> for BallotDescription {
    fn from(ballot: &Ballot) -> Self {
        Self {
            candidate_id: ballot.candidate_id.into(),
            voter_id: ballot.voter_id.into(),
            district: ballot.district.clone(),
            cast_at: ballot.cast_at,
        }
    }
}

/// Full view of an election, including its ledger and creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminElectionDescription {
    pub id: ApiId,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: ElectionStatus,
    pub candidates: Vec<CandidateDescription>,
    pub ballots: Vec<BallotDescription>,
    /// `None` if the creating admin no longer exists.
    pub created_by: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl AdminElectionDescription {
    pub fn new(election: &Election, creator: Option<&User>) -> Self {
        Self {
            id: election.id.into(),
            title: election.title.clone(),
            description: election.description.clone(),
            starts_at: election.starts_at,
            ends_at: election.ends_at,
            status: election.status,
            candidates: election.candidates.iter().map(Into::into).collect(),
            ballots: election.ballots.iter().map(Into::into).collect(),
            created_by: creator.map(Into::into),
            created_at: election.created_at,
        }
    }
}
