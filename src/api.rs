use rocket::Route;

mod admin;
mod auth;
mod public;
pub(crate) mod user;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(public::routes());
    routes.extend(auth::routes());
    routes.extend(user::routes());
    routes
}
