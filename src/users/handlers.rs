use axum::{
    extract::{FromRef, Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        claims::SessionUser,
        extractors::AuthUser,
        jwt::JwtKeys,
        password::hash_password,
        repo::User,
    },
    error::ApiError,
    state::AppState,
};

use super::dto::{ListUsersQuery, ListUsersResponse, UpdateUserRequest, UpdateUserResponse};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_users))
        .route("/user/:id", get(get_user).put(update_user))
}

#[instrument(skip(state, _user))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, ApiError> {
    let count = User::count(&state.db, &query.search).await?;
    let data = if count > 0 {
        User::list(
            &state.db,
            &query.search,
            query.sort_desc(),
            query.limit,
            query.offset(),
        )
        .await?
        .into_iter()
        .map(Into::into)
        .collect()
    } else {
        Vec::new()
    };
    Ok(Json(ListUsersResponse { data, count }))
}

#[instrument(skip(state, _user))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    let found = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::Conflict("no user with that id exists".into()))?;
    Ok(Json(found))
}

/// Profile edit; editing your own record returns a freshly signed session
/// credential reflecting the update.
#[instrument(skip(state, auth_user, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(auth_user): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UpdateUserResponse>, ApiError> {
    let password_hash = match payload.password.as_deref() {
        Some(plain) if plain.len() < 8 => {
            return Err(ApiError::Validation("password too short".into()))
        }
        Some(plain) => Some(hash_password(plain)?),
        None => None,
    };

    let updated = User::update_profile(
        &state.db,
        id,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.phone_number.as_deref(),
        password_hash.as_deref(),
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => ApiError::Conflict("no user with that id exists".into()),
        other => other.into(),
    })?;

    info!(user_id = updated.id, "profile updated");

    if auth_user.id == id {
        let keys = JwtKeys::from_ref(&state);
        let new_token = keys.sign(SessionUser::from(updated))?;
        return Ok(Json(UpdateUserResponse {
            new_token: Some(new_token),
            message: "success".into(),
        }));
    }

    Ok(Json(UpdateUserResponse {
        new_token: None,
        message: "success".into(),
    }))
}
