mod request;
mod rights;
mod token;

pub use request::{AuthResponse, LoginRequest, RegisterRequest};
pub use rights::{Admin, Elector, Rights, Voter};
pub use token::{auth_cookie, AuthToken, AUTH_TOKEN_COOKIE};
