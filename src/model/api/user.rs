use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, common::role::Role, db::user::User};

/// A user as shown over the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: ApiId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub dob: Option<DateTime<Utc>>,
    pub gender: Option<String>,
    pub constituency: Option<String>,
    pub district: Option<String>,
    pub voter_number: Option<String>,
    pub is_eligible: bool,
    pub has_voted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let User { id, user } = user;
        Self {
            id: id.into(),
            name: user.name,
            email: user.email,
            role: user.role,
            phone_number: user.profile.phone_number,
            address: user.profile.address,
            dob: user.profile.dob,
            gender: user.profile.gender,
            constituency: user.profile.constituency,
            district: user.profile.district,
            voter_number: user.voter_number,
            is_eligible: user.is_eligible,
            has_voted: user.has_voted,
            created_at: user.created_at,
        }
    }
}

/// The creator of an election, as shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: ApiId,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.into(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
