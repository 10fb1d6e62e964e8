use chrono::{DateTime, Utc};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::election::ElectionStatus,
    db::election::{Candidate, ElectionChanges, NewElection},
    mongodb::Id,
};

/// An election specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    /// Election title.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Advertised opening time.
    pub starts_at: DateTime<Utc>,
    /// Advertised closing time.
    pub ends_at: DateTime<Utc>,
    /// Candidates, in display order.
    #[serde(default)]
    pub candidates: Vec<CandidateSpec>,
}

impl ElectionSpec {
    /// Convert this spec into a draft election with fresh candidate IDs.
    pub fn into_election(self, created_by: Id) -> Result<NewElection> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::Status(Status::BadRequest, "Title is required".into()));
        }
        check_schedule(self.starts_at, self.ends_at)?;
        Ok(NewElection {
            title: title.to_string(),
            description: self.description,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status: ElectionStatus::Draft,
            candidates: self.candidates.into_iter().map(Candidate::from).collect(),
            ballots: Vec::new(),
            created_by,
            created_at: Utc::now(),
        })
    }
}

/// A candidate specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub party: String,
}

impl From<CandidateSpec> for Candidate {
    fn from(spec: CandidateSpec) -> Self {
        Self {
            id: Id::new(),
            name: spec.name,
            party: spec.party,
        }
    }
}

/// A partial update to an election. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: Option<ElectionStatus>,
    /// Replaces the whole candidate list, with fresh IDs.
    pub candidates: Option<Vec<CandidateSpec>>,
}

impl ElectionUpdate {
    /// Validate the update's own fields and convert it to storage changes.
    ///
    /// Rules that depend on the stored election (status transitions, ledger
    /// emptiness, the combined schedule) are checked by the caller.
    pub fn into_changes(self) -> Result<ElectionChanges> {
        let title = match self.title {
            Some(title) if title.trim().is_empty() => {
                return Err(Error::Status(Status::BadRequest, "Title is required".into()))
            }
            title => title.map(|t| t.trim().to_string()),
        };
        Ok(ElectionChanges {
            title,
            description: self.description,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status: self.status,
            candidates: self
                .candidates
                .map(|candidates| candidates.into_iter().map(Candidate::from).collect()),
        })
    }
}

/// Reject schedules that end before they start.
pub(crate) fn check_schedule(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<()> {
    if ends_at < starts_at {
        return Err(Error::Status(
            Status::BadRequest,
            "Election cannot end before it starts".into(),
        ));
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use chrono::Duration;

    impl ElectionSpec {
        pub fn example() -> Self {
            let starts_at = Utc::now();
            Self {
                title: "Presidential Election 2025".to_string(),
                description: "National election for the next term".to_string(),
                starts_at,
                ends_at: starts_at + Duration::days(7),
                candidates: vec![
                    CandidateSpec::example("Alice Johnson", "Blue Party"),
                    CandidateSpec::example("Bob Smith", "Green Party"),
                    CandidateSpec::example("Carlos Reyes", "Independent"),
                ],
            }
        }
    }

    impl CandidateSpec {
        pub fn example(name: &str, party: &str) -> Self {
            Self {
                name: name.to_string(),
                party: party.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn spec_becomes_draft() {
        let creator = Id::new();
        let election = ElectionSpec::example().into_election(creator).unwrap();

        assert_eq!(election.status, ElectionStatus::Draft);
        assert_eq!(election.created_by, creator);
        assert!(election.ballots.is_empty());
        assert_eq!(election.candidates.len(), 3);
        assert_ne!(election.candidates[0].id, election.candidates[1].id);
    }

    #[test]
    fn spec_rejects_backwards_schedule() {
        let mut spec = ElectionSpec::example();
        spec.ends_at = spec.starts_at - Duration::hours(1);
        let err = spec.into_election(Id::new()).unwrap_err();
        assert_eq!(err.status(), Status::BadRequest);
    }

    #[test]
    fn spec_rejects_blank_title() {
        let spec = ElectionSpec {
            title: " ".to_string(),
            ..ElectionSpec::example()
        };
        assert!(spec.into_election(Id::new()).is_err());
    }

    #[test]
    fn update_rejects_blank_title() {
        let update = ElectionUpdate {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(update.into_changes().is_err());

        let changes = ElectionUpdate {
            title: Some(" Local ".to_string()),
            ..Default::default()
        }
        .into_changes()
        .unwrap();
        assert_eq!(changes.title.as_deref(), Some("Local"));
        assert!(changes.candidates.is_none());
    }
}
