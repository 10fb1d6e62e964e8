use serde::{Deserialize, Serialize};

use crate::model::api::id::ApiId;

/// Vote count for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub candidate_id: ApiId,
    pub name: String,
    pub party: String,
    pub votes: u64,
}

/// Results of an election, in candidate order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub election_id: ApiId,
    pub title: String,
    pub results: Vec<CandidateResult>,
}
