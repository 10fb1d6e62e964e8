use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::election::ElectionStatus, mongodb::Id};

/// Core election data, as stored in the database.
///
/// The ledger of ballots lives inside the election document, so every
/// ballot write is a single-document atomic update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election title. Never empty.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Advertised opening time. Informational only.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub starts_at: DateTime<Utc>,
    /// Advertised closing time. Informational only.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub ends_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: ElectionStatus,
    /// Candidates, in display order.
    pub candidates: Vec<Candidate>,
    /// The ballot ledger.
    pub ballots: Vec<Ballot>,
    /// The admin who created the election.
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ElectionCore {
    /// Find a candidate by ID.
    pub fn candidate(&self, candidate_id: Id) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }

    /// Find the ballot cast by the given voter, if any.
    pub fn ballot_of(&self, voter_id: Id) -> Option<&Ballot> {
        self.ballots.iter().find(|b| b.voter_id == voter_id)
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// A candidate standing in one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique ID, scoped to the owning election.
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub party: String,
}

/// A single cast vote. Ballots are appended and removed, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub candidate_id: Id,
    pub voter_id: Id,
    /// Optional grouping label, fixed at cast time.
    pub district: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl Ballot {
    /// Create a ballot cast now.
    pub fn new(candidate_id: Id, voter_id: Id, district: Option<String>) -> Self {
        Self {
            candidate_id,
            voter_id,
            district,
            cast_at: Utc::now(),
        }
    }
}

/// A partial update to an election's details. `None` fields are untouched.
///
/// The ledger is never part of an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElectionChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: Option<ElectionStatus>,
    pub candidates: Option<Vec<Candidate>>,
}

impl ElectionChanges {
    /// Apply these changes to an in-memory election.
    pub fn apply_to(&self, election: &mut ElectionCore) {
        if let Some(title) = &self.title {
            election.title = title.clone();
        }
        if let Some(description) = &self.description {
            election.description = description.clone();
        }
        if let Some(starts_at) = self.starts_at {
            election.starts_at = starts_at;
        }
        if let Some(ends_at) = self.ends_at {
            election.ends_at = ends_at;
        }
        if let Some(status) = self.status {
            election.status = status;
        }
        if let Some(candidates) = &self.candidates {
            election.candidates = candidates.clone();
        }
    }
}

/// Preconditions that must still hold when an update is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateGuard {
    /// The status the election had when the update was validated.
    pub status: ElectionStatus,
    /// Whether the ledger must still be empty, e.g. when replacing candidates.
    pub require_empty_ledger: bool,
}

impl UpdateGuard {
    /// Does the election still satisfy this guard?
    pub fn holds_for(&self, election: &ElectionCore) -> bool {
        election.status == self.status
            && (!self.require_empty_ledger || election.ballots.is_empty())
    }
}
