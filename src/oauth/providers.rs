use anyhow::Context;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::config::OAuthProviderConfig;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

const FACEBOOK_AUTHORIZE_URL: &str = "https://www.facebook.com/v19.0/dialog/oauth";
const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/v19.0/oauth/access_token";
const FACEBOOK_PROFILE_URL: &str = "https://graph.facebook.com/me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Facebook,
}

/// Verified external profile handed to the bridge after the code exchange.
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub external_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

pub fn authorize_url(provider: Provider, config: &OAuthProviderConfig, state: &str) -> String {
    let (base, scope) = match provider {
        Provider::Google => (GOOGLE_AUTHORIZE_URL, "openid email profile"),
        Provider::Facebook => (FACEBOOK_AUTHORIZE_URL, "public_profile"),
    };
    let url = Url::parse_with_params(
        base,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scope),
            ("state", state),
        ],
    )
    .expect("static authorize url");
    url.to_string()
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserinfo {
    sub: String,
    email: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
}

#[derive(Debug, Deserialize)]
struct FacebookProfile {
    id: String,
    #[serde(default)]
    name: String,
}

pub async fn fetch_google_profile(
    config: &OAuthProviderConfig,
    code: &str,
) -> anyhow::Result<OAuthProfile> {
    let exchange = Client::new()
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .context("google code exchange")?
        .error_for_status()
        .context("google code exchange rejected")?
        .json::<TokenExchangeResponse>()
        .await
        .context("google token response")?;

    let info = Client::new()
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(&exchange.access_token)
        .send()
        .await
        .context("google userinfo")?
        .error_for_status()
        .context("google userinfo rejected")?
        .json::<GoogleUserinfo>()
        .await
        .context("google userinfo response")?;

    Ok(OAuthProfile {
        external_id: info.sub,
        email: info.email,
        first_name: info.given_name,
        last_name: info.family_name,
    })
}

pub async fn fetch_facebook_profile(
    config: &OAuthProviderConfig,
    code: &str,
) -> anyhow::Result<OAuthProfile> {
    let exchange = Client::new()
        .get(FACEBOOK_TOKEN_URL)
        .query(&[
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
        ])
        .send()
        .await
        .context("facebook code exchange")?
        .error_for_status()
        .context("facebook code exchange rejected")?
        .json::<TokenExchangeResponse>()
        .await
        .context("facebook token response")?;

    let profile = Client::new()
        .get(FACEBOOK_PROFILE_URL)
        .query(&[
            ("fields", "id,name"),
            ("access_token", exchange.access_token.as_str()),
        ])
        .send()
        .await
        .context("facebook profile")?
        .error_for_status()
        .context("facebook profile rejected")?
        .json::<FacebookProfile>()
        .await
        .context("facebook profile response")?;

    Ok(OAuthProfile {
        external_id: profile.id,
        // Facebook grants no email scope here; the account stores the
        // display name and an empty address.
        email: String::new(),
        first_name: profile.name,
        last_name: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthProviderConfig {
        OAuthProviderConfig {
            client_id: "client-123".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:8080/auth/withGoogle/callback".into(),
        }
    }

    #[test]
    fn google_authorize_url_carries_state_and_redirect() {
        let url = authorize_url(Provider::Google, &config(), "nonce-abc");
        assert!(url.starts_with(GOOGLE_AUTHORIZE_URL));
        assert!(url.contains("state=nonce-abc"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080")); // encoded
    }

    #[test]
    fn facebook_authorize_url_uses_facebook_endpoint() {
        let url = authorize_url(Provider::Facebook, &config(), "nonce-abc");
        assert!(url.starts_with(FACEBOOK_AUTHORIZE_URL));
        assert!(url.contains("scope=public_profile"));
    }
}
