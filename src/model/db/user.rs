use std::ops::{Deref, DerefMut};

use argon2::Config as Argon2Config;
use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{common::role::Role, mongodb::Id};

/// Optional personal details supplied at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub dob: Option<DateTime<Utc>>,
    pub gender: Option<String>,
    pub constituency: Option<String>,
    pub district: Option<String>,
}

/// Core user data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub name: String,
    /// Always lowercase.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(flatten)]
    pub profile: Profile,
    /// Public voter number, only assigned to non-admin users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_number: Option<String>,
    pub is_eligible: bool,
    /// Informational only; the election ledgers decide who has voted.
    pub has_voted: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl UserCore {
    /// Create a new user, hashing the given plaintext password.
    pub fn new(
        name: String,
        email: &str,
        password: &str,
        role: Role,
        profile: Profile,
    ) -> Result<Self> {
        let now = Utc::now();
        let voter_number = (role == Role::User).then(generate_voter_number);
        let is_eligible = profile.dob.map_or(false, |dob| is_adult(dob, now));
        Ok(Self {
            name,
            email: email.trim().to_lowercase(),
            password_hash: hash_password(password)?,
            role,
            profile,
            voter_number,
            is_eligible,
            has_voted: false,
            created_at: now,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed stored hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

fn hash_password(password: &str) -> Result<String> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &Argon2Config::default(),
    )?)
}

/// `VTR` followed by six random digits.
fn generate_voter_number() -> String {
    let digits: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("VTR{digits}")
}

/// Is someone born at `dob` at least 18 years old at `now`?
fn is_adult(dob: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    const SECONDS_PER_YEAR: f64 = 60.0 * 60.0 * 24.0 * 365.25;
    let age = (now - dob).num_seconds() as f64 / SECONDS_PER_YEAR;
    age.floor() >= 18.0
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    pub const EXAMPLE_PASSWORD: &str = "Voter@123";
    pub const EXAMPLE_ADMIN_PASSWORD: &str = "Admin@123";

    impl UserCore {
        pub fn example_voter(n: u32) -> Self {
            let profile = Profile {
                district: Some(format!("District {n}")),
                ..Default::default()
            };
            Self::new(
                format!("Voter {n}"),
                &format!("voter{n}@example.com"),
                EXAMPLE_PASSWORD,
                Role::User,
                profile,
            )
            .unwrap()
        }

        pub fn example_admin() -> Self {
            Self::new(
                "Administrator".to_string(),
                "admin@example.com",
                EXAMPLE_ADMIN_PASSWORD,
                Role::Admin,
                Profile::default(),
            )
            .unwrap()
        }
    }
}

#[cfg(test)]
pub use examples::{EXAMPLE_ADMIN_PASSWORD, EXAMPLE_PASSWORD};
