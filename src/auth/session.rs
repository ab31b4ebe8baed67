//! Signed session tokens carried in the `session` cookie.

use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const SESSION_COOKIE: &str = "session";

/// Lifetime of a session created by email/password login.
pub const USER_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Lifetime of a session created by the shared admin password.
pub const ADMIN_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject: the admin user's id, or "admin" for password sessions.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Identity recorded in a new session.
#[derive(Debug, Clone, Default)]
pub struct SessionSubject {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
}

#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    secure_cookies: bool,
}

impl SessionManager {
    pub fn new(secret: &[u8], secure_cookies: bool) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            secure_cookies,
        }
    }

    /// Issues a token valid for `ttl_secs`.
    pub fn issue(&self, subject: SessionSubject, ttl_secs: i64) -> Result<String> {
        let now = chrono::Utc::now().timestamp();

        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: subject.sub,
            email: subject.email,
            name: subject.name,
            username: subject.username,
            iat: now,
            exp: now + ttl_secs,
        };

        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Validates signature and expiry and returns the claims.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }

    #[must_use]
    pub fn cookie(&self, token: String, ttl_secs: i64) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure_cookies)
            .max_age(time::Duration::seconds(ttl_secs))
            .build()
    }

    /// An expired, empty cookie that replaces the session cookie.
    #[must_use]
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure_cookies)
            .max_age(time::Duration::ZERO)
            .build()
    }
}
