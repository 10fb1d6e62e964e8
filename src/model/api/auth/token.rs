use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use log::debug;
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{api::id::ApiId, common::role::Role, db::user::User, mongodb::Id};
use crate::storage::Store;

use super::rights::Rights;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

const BEARER_PREFIX: &str = "Bearer ";

/// A verified (user, role) pair, proving the caller holds rights `R`.
pub struct AuthToken<R> {
    pub id: Id,
    pub role: Role,
    phantom: PhantomData<R>,
}

impl<R> AuthToken<R> {
    /// Create a new [`AuthToken`] for the given user.
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            phantom: PhantomData,
        }
    }

    /// Sign this token into a JWT.
    pub fn encode(&self, config: &Config) -> Result<String> {
        let claims = Claims {
            sub: self.id.into(),
            role: self.role,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?)
    }

    /// Verify and decode a JWT.
    pub fn decode(jwt: &str, config: &Config) -> Result<Self> {
        let claims = jsonwebtoken::decode(
            jwt,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims>| data.claims)?;
        Ok(Self {
            id: claims.sub.into(),
            role: claims.role,
            phantom: PhantomData,
        })
    }
}

/// Wrap a signed JWT in the auth cookie.
pub fn auth_cookie(jwt: String, config: &Config) -> Cookie<'static> {
    Cookie::build((AUTH_TOKEN_COOKIE, jwt))
        .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

/// JWT claims.
#[derive(Serialize, Deserialize)]
struct Claims {
    sub: ApiId,
    role: Role,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Every JWT the request carries, cookie first, then `Authorization` header.
fn raw_tokens(req: &Request<'_>) -> Vec<String> {
    let cookie = req
        .cookies()
        .get(AUTH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let bearer = req
        .headers()
        .get_one("Authorization")
        .and_then(|header| header.strip_prefix(BEARER_PREFIX))
        .map(|jwt| jwt.trim().to_string());
    cookie.into_iter().chain(bearer).collect()
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for AuthToken<R>
where
    R: Rights + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the request and verify that its user still
    /// exists and holds rights `R`.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let (config, store) = match (
            req.rocket().state::<Config>(),
            req.rocket().state::<Store>(),
        ) {
            (Some(config), Some(store)) => (config, store),
            _ => {
                let status = Status::InternalServerError;
                return Outcome::Error((status, Error::Status(status, "Unmanaged state".into())));
            }
        };

        // A stale cookie must not shadow a valid bearer token.
        let candidates = raw_tokens(req);
        if candidates.is_empty() {
            return Outcome::Error(unauthorized_error("Missing auth token"));
        }
        let decoded = candidates.iter().find_map(|jwt| match Self::decode(jwt, config) {
            Ok(token) => Some(token),
            Err(e) => {
                debug!("Rejected auth token: {e}");
                None
            }
        });
        let token = match decoded {
            Some(token) => token,
            None => return Outcome::Error(unauthorized_error("Invalid auth token")),
        };

        // Check the user actually exists, and use their current role.
        match store.user(token.id).await {
            Ok(Some(user)) if R::permits(user.role) => Outcome::Success(Self::for_user(&user)),
            Ok(Some(user)) => {
                debug!("User {} lacks {} rights", user.id, R::NAME);
                let status = Status::Forbidden;
                Outcome::Error((status, Error::Status(status, "Insufficient rights".into())))
            }
            Ok(None) => Outcome::Error(unauthorized_error("Unknown user")),
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}

fn unauthorized_error(reason: &str) -> (Status, Error) {
    let status = Status::Unauthorized;
    (status, Error::Status(status, reason.to_string()))
}
