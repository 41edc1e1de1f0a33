use serde::{Deserialize, Serialize};

use crate::auth::repo::{Role, User};

fn default_limit() -> i64 {
    10
}
fn default_page() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort_by: Option<String>,
}

impl ListUsersQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0) * self.limit
    }

    pub fn sort_desc(&self) -> bool {
        self.sort_by.as_deref() == Some("desc")
    }
}

/// Listing row: the fields the admin table shows, nothing sensitive.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub phone_number: String,
    pub role: Role,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            phone_number: user.phone_number,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub data: Vec<UserSummary>,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_token: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_one_is_offset_zero() {
        let q: ListUsersQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.limit, 10);
        assert_eq!(q.offset(), 0);
        assert!(!q.sort_desc());
    }

    #[test]
    fn later_pages_offset_by_limit() {
        let q: ListUsersQuery =
            serde_json::from_str(r#"{"page": 3, "limit": 10, "sortBy": "desc"}"#).unwrap();
        assert_eq!(q.offset(), 20);
        assert!(q.sort_desc());
    }

    #[test]
    fn negative_page_clamps_to_zero_offset() {
        let q: ListUsersQuery = serde_json::from_str(r#"{"page": -2}"#).unwrap();
        assert_eq!(q.offset(), 0);
    }
}
