use chrono::{NaiveDate, TimeZone, Utc};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::user::UserProfile,
    common::role::Role,
    db::user::{NewUser, Profile},
};

const MIN_PASSWORD_LEN: usize = 6;

/// A request to register a new voter account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Date of birth, as `YYYY-MM-DD`.
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub constituency: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
}

impl RegisterRequest {
    /// Validate the request and build the user to insert.
    ///
    /// Registration always creates an ordinary user.
    pub fn into_user(self) -> Result<NewUser> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(bad_request("Name is required"));
        }
        if !self.email.contains('@') {
            return Err(bad_request("Invalid email"));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(bad_request("Password must be at least 6 characters"));
        }

        let profile = Profile {
            phone_number: self.phone_number,
            address: self.address,
            dob: self
                .dob
                .and_then(|dob| dob.and_hms_opt(0, 0, 0))
                .map(|dob| Utc.from_utc_datetime(&dob)),
            gender: self.gender,
            constituency: self.constituency,
            district: self.district,
        };
        NewUser::new(
            name.to_string(),
            &self.email,
            &self.password,
            Role::User,
            profile,
        )
    }
}

/// Email and password credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned on successful registration or login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

fn bad_request(reason: &str) -> Error {
    Error::Status(Status::BadRequest, reason.to_string())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use crate::model::db::user::EXAMPLE_PASSWORD;

    impl RegisterRequest {
        pub fn example(n: u32) -> Self {
            Self {
                name: format!("Voter {n}"),
                email: format!("Voter{n}@Example.com"),
                password: EXAMPLE_PASSWORD.to_string(),
                phone_number: None,
                address: None,
                dob: NaiveDate::from_ymd_opt(1990, 1, 1),
                gender: None,
                constituency: None,
                district: Some(format!("District {n}")),
            }
        }
    }

    impl LoginRequest {
        pub fn example_voter(n: u32) -> Self {
            Self {
                email: format!("voter{n}@example.com"),
                password: EXAMPLE_PASSWORD.to_string(),
            }
        }

        pub fn example_admin() -> Self {
            Self {
                email: "admin@example.com".to_string(),
                password: crate::model::db::user::EXAMPLE_ADMIN_PASSWORD.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_builds_eligible_user() {
        let user = RegisterRequest::example(3).into_user().unwrap();
        assert_eq!(user.email, "voter3@example.com");
        assert_eq!(user.role, Role::User);
        assert!(user.is_eligible);
        assert!(user.voter_number.is_some());
        assert_eq!(user.profile.district.as_deref(), Some("District 3"));
    }

    #[test]
    fn register_validation() {
        let blank_name = RegisterRequest {
            name: "  ".to_string(),
            ..RegisterRequest::example(1)
        };
        let bad_email = RegisterRequest {
            email: "nobody".to_string(),
            ..RegisterRequest::example(1)
        };
        let short_password = RegisterRequest {
            password: "12345".to_string(),
            ..RegisterRequest::example(1)
        };
        for request in [blank_name, bad_email, short_password] {
            assert_eq!(
                request.into_user().unwrap_err().status(),
                Status::BadRequest
            );
        }
    }
}
