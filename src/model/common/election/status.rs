use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the Election lifecycle.
///
/// The stored status is the single source of truth for whether an election
/// accepts votes; the schedule times are informational only.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    /// Under construction, only visible to admins.
    Draft,
    /// Announced, but not yet open for voting.
    Scheduled,
    /// Open for voting.
    Active,
    /// Voting has closed.
    Completed,
    /// Abandoned before completion.
    Cancelled,
}

impl ElectionStatus {
    /// Does this status accept new ballots?
    pub fn accepts_votes(self) -> bool {
        self == Self::Active
    }

    /// Terminal statuses can never be left.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Position along the forward path; `Cancelled` sits off the path.
    fn rank(self) -> Option<u8> {
        match self {
            Self::Draft => Some(0),
            Self::Scheduled => Some(1),
            Self::Active => Some(2),
            Self::Completed => Some(3),
            Self::Cancelled => None,
        }
    }

    /// Can an election in this status be moved to `target`?
    ///
    /// Moves go forward along draft, scheduled, active, completed (skips are
    /// fine), or to cancelled from any non-terminal status. Re-setting the
    /// current status is always allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        if self == target {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), target.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
