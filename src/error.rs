use std::time::Duration;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{debug, error};
use mongodb::{bson::ser::Error as BsonError, error::Error as DbError};
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::model::{common::election::ElectionStatus, mongodb::Id};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Election {election} is not accepting votes (status: {status})")]
    ElectionNotActive { election: Id, status: ElectionStatus },
    #[error("Voter {voter} has already voted in election {election}")]
    DuplicateVote { election: Id, voter: Id },
    #[error("Candidate {candidate} is not standing in election {election}")]
    InvalidCandidate { election: Id, candidate: Id },
    #[error("Cannot move election {election} from {from} to {to}")]
    IllegalTransition {
        election: Id,
        from: ElectionStatus,
        to: ElectionStatus,
    },
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] describing the missing thing.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The HTTP status this error should be reported as.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            Self::ElectionNotActive { .. } => Status::Forbidden,
            Self::DuplicateVote { .. } | Self::IllegalTransition { .. } => Status::Conflict,
            Self::InvalidCandidate { .. } => Status::BadRequest,
            Self::StorageUnavailable(_) => Status::ServiceUnavailable,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Argon2(_) => Status::InternalServerError,
            Self::Status(status, _) => *status,
        }
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        Self::StorageUnavailable(err.into())
    }
}

impl From<BsonError> for Error {
    fn from(err: BsonError) -> Self {
        Self::StorageUnavailable(err.into())
    }
}

/// Faults raised by the storage collaborator. None of these are retried.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Bson(#[from] BsonError),
    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        Err(status)
    }
}
