use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::api::id::ApiId;

/// Turnout figures for one election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turnout {
    pub overall: OverallTurnout,
    pub candidates: Vec<CandidateTurnout>,
    pub district_distribution: Vec<DistrictTurnout>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallTurnout {
    pub eligible_voters: u64,
    pub votes_cast: u64,
    /// Votes cast over eligible voters, to one decimal place.
    pub percentage: f64,
}

/// A candidate's share of the ballots cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTurnout {
    pub candidate_id: ApiId,
    pub name: String,
    pub party: String,
    pub votes: u64,
    pub percentage: f64,
}

/// Ballots cast in one district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictTurnout {
    pub district: String,
    pub total: u64,
    pub candidates: Vec<DistrictCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictCandidate {
    pub candidate_id: ApiId,
    pub name: String,
    pub votes: u64,
}
