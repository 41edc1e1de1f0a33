use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub google: OAuthProviderConfig,
    pub facebook: OAuthProviderConfig,
    /// Frontend base URL embedded in email links and OAuth redirects.
    pub client_base_url: String,
    /// Password assigned to accounts created through an OAuth provider.
    pub oauth_default_password: String,
    pub action_token_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "Booking restaurant <no-reply@tablebook.local>".into()),
        };
        let google = OAuthProviderConfig {
            client_id: std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            client_secret: std::env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri: std::env::var("GOOGLE_REDIRECT_URI").unwrap_or_default(),
        };
        let facebook = OAuthProviderConfig {
            client_id: std::env::var("FACEBOOK_CLIENT_ID").unwrap_or_default(),
            client_secret: std::env::var("FACEBOOK_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri: std::env::var("FACEBOOK_REDIRECT_URI").unwrap_or_default(),
        };
        Ok(Self {
            database_url,
            jwt,
            smtp,
            google,
            facebook,
            client_base_url: std::env::var("CLIENT_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            oauth_default_password: std::env::var("OAUTH_DEFAULT_PASSWORD")
                .unwrap_or_else(|_| "123456a@A".into()),
            action_token_ttl_hours: std::env::var("ACTION_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        })
    }
}
