//! The vote-casting and tally core.
//!
//! [`ledger`] is the only code that writes ballots. [`tally`] derives every
//! count from the ledger at query time; nothing it computes is stored.

pub mod ledger;
pub mod tally;

use crate::error::Error;
use crate::model::mongodb::Id;

fn election_not_found(id: Id) -> Error {
    Error::not_found(format!("Election {id}"))
}
