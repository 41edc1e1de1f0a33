use axum::http::Method;

use crate::auth::repo::Role;
use crate::error::ApiError;

const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Route-level allow-lists consulted by the access guard. Routes without an
/// entry require a valid session credential but no particular role.
pub fn allowed_roles(method: &Method, matched_path: &str) -> Option<&'static [Role]> {
    match (method.as_str(), matched_path) {
        ("GET", "/user") => Some(ADMIN_ONLY),
        ("GET", "/user/:id") => Some(ADMIN_ONLY),
        _ => None,
    }
}

pub fn authorize(role: Role, method: &Method, matched_path: &str) -> Result<(), ApiError> {
    match allowed_roles(method, matched_path) {
        Some(roles) if !roles.contains(&role) => Err(ApiError::Authorization(
            "account role is not permitted for this operation".into(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_routes_reject_non_admin_roles() {
        assert!(authorize(Role::User, &Method::GET, "/user").is_err());
        assert!(authorize(Role::Manager, &Method::GET, "/user").is_err());
        assert!(authorize(Role::User, &Method::GET, "/user/:id").is_err());
    }

    #[test]
    fn admin_routes_allow_admin() {
        assert!(authorize(Role::Admin, &Method::GET, "/user").is_ok());
        assert!(authorize(Role::Admin, &Method::GET, "/user/:id").is_ok());
    }

    #[test]
    fn unlisted_routes_have_no_role_restriction() {
        assert!(authorize(Role::User, &Method::GET, "/auth/getMe").is_ok());
        assert!(authorize(Role::Manager, &Method::PUT, "/user/:id").is_ok());
    }
}
