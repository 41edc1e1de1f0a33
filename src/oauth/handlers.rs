use anyhow::Context;
use axum::{
    extract::{FromRef, Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{claims::SessionUser, jwt::JwtKeys, password::hash_password, repo::User},
    oauth::providers::{self, OAuthProfile, Provider},
    state::AppState,
};

pub fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/withGoogle", get(with_google))
        .route("/auth/withGoogle/callback", get(google_callback))
        .route("/auth/withFacebook", get(with_facebook))
        .route("/auth/withFacebook/callback", get(facebook_callback))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[instrument(skip(state))]
pub async fn with_google(State(state): State<AppState>) -> Redirect {
    let nonce = state.oauth_states.issue();
    Redirect::temporary(&providers::authorize_url(
        Provider::Google,
        &state.config.google,
        &nonce,
    ))
}

#[instrument(skip(state))]
pub async fn with_facebook(State(state): State<AppState>) -> Redirect {
    let nonce = state.oauth_states.issue();
    Redirect::temporary(&providers::authorize_url(
        Provider::Facebook,
        &state.config.facebook,
        &nonce,
    ))
}

#[instrument(skip(state, query))]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let token = complete_login(&state, Provider::Google, query)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "google login failed");
            String::new()
        });
    finish_redirect(&state, token)
}

#[instrument(skip(state, query))]
pub async fn facebook_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let token = complete_login(&state, Provider::Facebook, query)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "facebook login failed");
            String::new()
        });
    finish_redirect(&state, token)
}

/// The handshake always ends on the client; an empty token signals failure.
fn finish_redirect(state: &AppState, token: String) -> Redirect {
    Redirect::temporary(&login_redirect_url(&state.config.client_base_url, &token))
}

fn login_redirect_url(client_base_url: &str, token: &str) -> String {
    format!("{client_base_url}/login-success?token={token}")
}

/// Consume the handshake nonce, exchange the code, map the external profile
/// onto a local user and sign a session credential, all within this request.
async fn complete_login(
    state: &AppState,
    provider: Provider,
    query: CallbackQuery,
) -> anyhow::Result<String> {
    let code = query.code.context("callback missing code")?;
    let nonce = query.state.context("callback missing state")?;
    anyhow::ensure!(
        state.oauth_states.consume(&nonce),
        "unknown or expired oauth state"
    );

    let profile = match provider {
        Provider::Google => providers::fetch_google_profile(&state.config.google, &code).await?,
        Provider::Facebook => {
            providers::fetch_facebook_profile(&state.config.facebook, &code).await?
        }
    };

    let user = bridge_user(state, provider, &profile).await?;
    info!(user_id = user.id, ?provider, "oauth login");

    let keys = JwtKeys::from_ref(state);
    keys.sign(SessionUser::from(user))
}

/// Create-or-update: one local record per external profile.
async fn bridge_user(
    state: &AppState,
    provider: Provider,
    profile: &OAuthProfile,
) -> anyhow::Result<User> {
    let existing = match provider {
        Provider::Google => User::find_by_email(&state.db, &profile.email).await?,
        Provider::Facebook => User::find_by_facebook_id(&state.db, &profile.external_id).await?,
    };

    match existing {
        Some(user) => {
            if marks_verified(provider, user.is_verified) {
                User::set_verified_by_id(&state.db, user.id).await?;
                Ok(User {
                    is_verified: true,
                    ..user
                })
            } else {
                Ok(user)
            }
        }
        None => {
            let hash = hash_password(&state.config.oauth_default_password)?;
            let user = match provider {
                Provider::Google => {
                    User::create_from_oauth(
                        &state.db,
                        &profile.email,
                        &hash,
                        &profile.first_name,
                        &profile.last_name,
                        None,
                    )
                    .await?
                }
                Provider::Facebook => {
                    User::create_from_oauth(
                        &state.db,
                        "",
                        &hash,
                        &profile.first_name,
                        "",
                        Some(&profile.external_id),
                    )
                    .await?
                }
            };
            Ok(user)
        }
    }
}

/// Google re-asserts verification on every login; Facebook only upgrades an
/// unverified record.
fn marks_verified(provider: Provider, already_verified: bool) -> bool {
    match provider {
        Provider::Google => true,
        Provider::Facebook => !already_verified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_always_reasserts_verification() {
        assert!(marks_verified(Provider::Google, false));
        assert!(marks_verified(Provider::Google, true));
    }

    #[test]
    fn facebook_leaves_verified_records_untouched() {
        assert!(marks_verified(Provider::Facebook, false));
        assert!(!marks_verified(Provider::Facebook, true));
    }

    #[test]
    fn failure_redirect_carries_empty_token() {
        let url = login_redirect_url("http://localhost:3000", "");
        assert_eq!(url, "http://localhost:3000/login-success?token=");
    }

    #[test]
    fn success_redirect_carries_credential() {
        let url = login_redirect_url("http://localhost:3000", "jwt-here");
        assert_eq!(url, "http://localhost:3000/login-success?token=jwt-here");
    }
}
