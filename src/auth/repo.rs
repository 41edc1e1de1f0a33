use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};

/// Account role checked against per-route allow-lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
    Admin,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: Role,
    pub is_verified: bool,
    pub facebook_id: Option<String>,
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, \
                            role, is_verified, facebook_id, created_at";

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: &'a str,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND email <> ''"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_facebook_id(db: &PgPool, facebook_id: &str) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE facebook_id = $1"
        ))
        .bind(facebook_id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a password-based account; starts unverified with role `user`.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> sqlx::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, first_name, last_name, phone_number) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.phone_number)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Insert an account created from an OAuth profile; verified from the start.
    pub async fn create_from_oauth(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        facebook_id: Option<&str>,
    ) -> sqlx::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, first_name, last_name, is_verified, facebook_id) \
             VALUES ($1, $2, $3, $4, TRUE, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(facebook_id)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn set_verified(db: &PgPool, email: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE WHERE email = $1")
            .bind(email)
            .execute(db)
            .await?;
        Ok(())
    }

    // OAuth-linked accounts may carry an empty email, so verification by id.
    pub async fn set_verified_by_id(db: &PgPool, id: i64) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn update_password(db: &PgPool, email: &str, password_hash: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE email = $1")
            .bind(email)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Partial profile update; `None` fields keep their current value.
    pub async fn update_profile(
        db: &PgPool,
        id: i64,
        first_name: Option<&str>,
        last_name: Option<&str>,
        phone_number: Option<&str>,
        password_hash: Option<&str>,
    ) -> sqlx::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                 first_name = COALESCE($2, first_name), \
                 last_name = COALESCE($3, last_name), \
                 phone_number = COALESCE($4, phone_number), \
                 password_hash = COALESCE($5, password_hash) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(phone_number)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn list(
        db: &PgPool,
        search: &str,
        sort_desc: bool,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<User>> {
        let order = if sort_desc { "DESC" } else { "ASC" };
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE email LIKE '%' || $1 || '%' \
             ORDER BY role {order} \
             LIMIT $2 OFFSET $3"
        ))
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count(db: &PgPool, search: &str) -> sqlx::Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE email LIKE '%' || $1 || '%'")
                .bind(search)
                .fetch_one(db)
                .await?;
        Ok(count.0)
    }
}

/// Single-use token proving control of an email address.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "token_purpose", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Register,
    Forgot,
}

#[derive(Debug, Clone, FromRow)]
pub struct ActionToken {
    pub id: i64,
    pub email: String,
    pub token: String,
    pub purpose: TokenPurpose,
    pub created_at: OffsetDateTime,
}

impl ActionToken {
    /// 20 random bytes, hex-encoded.
    pub fn generate() -> String {
        let mut bytes = [0u8; 20];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    pub fn is_expired(&self, ttl_hours: i64) -> bool {
        self.created_at + Duration::hours(ttl_hours) < OffsetDateTime::now_utc()
    }

    pub async fn create(
        db: &PgPool,
        email: &str,
        token: &str,
        purpose: TokenPurpose,
    ) -> sqlx::Result<ActionToken> {
        let row = sqlx::query_as::<_, ActionToken>(
            "INSERT INTO action_tokens (email, token, purpose) \
             VALUES ($1, $2, $3) \
             RETURNING id, email, token, purpose, created_at",
        )
        .bind(email)
        .bind(token)
        .bind(purpose)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn find(
        db: &PgPool,
        email: &str,
        token: &str,
        purpose: TokenPurpose,
    ) -> sqlx::Result<Option<ActionToken>> {
        let row = sqlx::query_as::<_, ActionToken>(
            "SELECT id, email, token, purpose, created_at \
             FROM action_tokens \
             WHERE email = $1 AND token = $2 AND purpose = $3",
        )
        .bind(email)
        .bind(token)
        .bind(purpose)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, email: &str, token: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM action_tokens WHERE email = $1 AND token = $2")
            .bind(email)
            .bind(token)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn delete_for_email(db: &PgPool, email: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM action_tokens WHERE email = $1")
            .bind(email)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_is_40_hex_chars() {
        let token = ActionToken::generate();
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(ActionToken::generate(), ActionToken::generate());
    }

    #[test]
    fn token_expiry_window() {
        let fresh = ActionToken {
            id: 1,
            email: "a@b.com".into(),
            token: ActionToken::generate(),
            purpose: TokenPurpose::Register,
            created_at: OffsetDateTime::now_utc(),
        };
        assert!(!fresh.is_expired(24));

        let stale = ActionToken {
            created_at: OffsetDateTime::now_utc() - Duration::hours(25),
            ..fresh
        };
        assert!(stale.is_expired(24));
    }

    #[test]
    fn password_hash_never_serialized() {
        let user = User {
            id: 1,
            email: "a@b.com".into(),
            password_hash: "secret-hash".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            phone_number: "".into(),
            role: Role::User,
            is_verified: false,
            facebook_id: None,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("a@b.com"));
    }
}
