use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::election::Ballot};

/// A vote, as submitted by a voter. The voter is the caller, never the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    /// Overrides the caller's profile district for this ballot.
    #[serde(default)]
    pub district: Option<String>,
}

/// Confirmation of an accepted ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteConfirmation {
    pub msg: String,
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    pub district: Option<String>,
    pub cast_at: DateTime<Utc>,
}

impl VoteConfirmation {
    pub fn new(election_id: ApiId, ballot: &Ballot) -> Self {
        Self {
            msg: "Vote recorded".to_string(),
            election_id,
            candidate_id: ballot.candidate_id.into(),
            district: ballot.district.clone(),
            cast_at: ballot.cast_at,
        }
    }
}
