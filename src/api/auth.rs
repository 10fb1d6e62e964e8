use log::info;
use rocket::{
    http::{CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::auth::{
        auth_cookie, AuthResponse, AuthToken, LoginRequest, RegisterRequest, Voter,
        AUTH_TOKEN_COOKIE,
    },
    db::user::User,
};
use crate::storage::Store;

pub fn routes() -> Vec<Route> {
    routes![register, login, logout]
}

#[post("/api/auth/register", data = "<request>", format = "json")]
pub async fn register(
    request: Json<RegisterRequest>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
    store: &State<Store>,
) -> Result<Json<AuthResponse>> {
    let new_user = request.into_inner().into_user()?;
    let user = store.insert_user(new_user).await?.ok_or_else(|| {
        Error::Status(Status::BadRequest, "User already exists".to_string())
    })?;
    info!("Registered user {}", user.id);

    Ok(Json(sign_in(user, cookies, config)?))
}

#[post("/api/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    credentials: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
    store: &State<Store>,
) -> Result<Json<AuthResponse>> {
    let email = credentials.email.trim().to_lowercase();
    let user = store
        .user_by_email(&email)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| Error::Status(Status::BadRequest, "Invalid credentials".to_string()))?;

    Ok(Json(sign_in(user, cookies, config)?))
}

#[delete("/api/auth")]
pub async fn logout(cookies: &CookieJar<'_>) {
    cookies.remove(AUTH_TOKEN_COOKIE);
}

/// Issue a token for `user`, both in the response body and as a cookie.
fn sign_in(user: User, cookies: &CookieJar<'_>, config: &Config) -> Result<AuthResponse> {
    let token = AuthToken::<Voter>::for_user(&user).encode(config)?;
    cookies.add(auth_cookie(token.clone(), config));
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}
