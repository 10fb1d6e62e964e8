use crate::model::common::role::Role;

/// A level of access that a route can demand of its caller.
pub trait Rights {
    /// Human-readable name, for logs.
    const NAME: &'static str;

    /// Does a user with the given role hold these rights?
    fn permits(role: Role) -> bool;
}

/// Any authenticated user, voter or admin.
pub struct Voter;

impl Rights for Voter {
    const NAME: &'static str = "voter";

    fn permits(_role: Role) -> bool {
        true
    }
}

/// Ordinary users only. Admins are not eligible voters, so they may not cast
/// ballots.
pub struct Elector;

impl Rights for Elector {
    const NAME: &'static str = "elector";

    fn permits(role: Role) -> bool {
        role == Role::User
    }
}

/// Administrators only.
pub struct Admin;

impl Rights for Admin {
    const NAME: &'static str = "admin";

    fn permits(role: Role) -> bool {
        role == Role::Admin
    }
}
