use serde::{Deserialize, Serialize};

/// Outcome of removing one voter's ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotRemoval {
    /// Ballots removed: 0 or 1.
    pub removed: u64,
    /// Ballots left in the ledger.
    pub remaining: u64,
}

/// Outcome of clearing a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReset {
    pub previous: u64,
    /// Always 0.
    pub current: u64,
}
