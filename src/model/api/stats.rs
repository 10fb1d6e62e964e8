use serde::{Deserialize, Serialize};

/// Dashboard counters, recomputed on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_elections: u64,
    /// Elections with status `active`.
    pub active_elections: u64,
    /// Users with the `user` role.
    pub total_voters: u64,
    /// Ballots across every ledger.
    pub total_votes: u64,
    /// Not tracked; always 0.
    pub pending_disputes: u64,
    /// Not tracked; always 0.
    pub system_alerts: u64,
}
