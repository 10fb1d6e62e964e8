mod desc;
mod spec;

pub use desc::{AdminElectionDescription, BallotDescription, CandidateDescription, ElectionDescription};
pub(crate) use spec::check_schedule;
pub use spec::{CandidateSpec, ElectionSpec, ElectionUpdate};
