//! Login sessions as signed cookie tokens.
//!
//! Nothing is stored server-side. A session is anonymous until `login`
//! hands out a credential; it becomes anonymous again when the client drops
//! the cookie (`logout`) or the embedded expiry passes. Any number of
//! sessions may exist for one user.

use axum::http::{header, HeaderMap};
use cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::{config::AuthConfig, users::Identifiable};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub token: String,
    pub remember: bool,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct SessionIssuer {
    keys: JwtKeys,
    session_ttl: Duration,
    remember_ttl: Duration,
    cookie_secure: bool,
}

impl SessionIssuer {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            keys: JwtKeys::from_secret(&cfg.secret),
            session_ttl: Duration::minutes(cfg.session_ttl_minutes),
            remember_ttl: Duration::days(cfg.remember_ttl_days),
            cookie_secure: cfg.cookie_secure,
        }
    }

    pub fn login(&self, user: &impl Identifiable, remember: bool) -> anyhow::Result<Session> {
        self.login_at(user, remember, OffsetDateTime::now_utc())
    }

    pub fn login_at(
        &self,
        user: &impl Identifiable,
        remember: bool,
        now: OffsetDateTime,
    ) -> anyhow::Result<Session> {
        let ttl = if remember {
            self.remember_ttl
        } else {
            self.session_ttl
        };
        let (token, claims) = self
            .keys
            .sign_at(user.id(), TokenKind::Session, remember, now, ttl)?;
        Ok(Session {
            user_id: claims.sub,
            token,
            remember,
            expires_at: now + ttl,
        })
    }

    /// Cookie for a fresh session. Without "remember me" it has no
    /// Max-Age, so it lives for the browser session only.
    pub fn cookie(&self, session: &Session) -> Cookie<'static> {
        let mut builder = Cookie::build((SESSION_COOKIE, session.token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure);
        if session.remember {
            builder = builder.max_age(Duration::seconds(self.remember_ttl.whole_seconds()));
        }
        builder.build()
    }

    /// Cookie that drops the session credential.
    pub fn logout(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(Duration::ZERO)
            .build()
    }

    pub fn current_session(&self, credential: Option<&str>) -> Option<Uuid> {
        self.current_session_at(credential, OffsetDateTime::now_utc())
    }

    pub fn current_session_at(&self, credential: Option<&str>, now: OffsetDateTime) -> Option<Uuid> {
        let token = credential.filter(|t| !t.is_empty())?;
        match self.keys.verify_at(token, TokenKind::Session, now) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                tracing::debug!(error = %e, "session credential rejected");
                None
            }
        }
    }
}

/// Session credential from the `session` cookie, or from an
/// `Authorization: Bearer` header for non-browser clients.
pub fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v))
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|auth| {
                auth.strip_prefix("Bearer ")
                    .or_else(|| auth.strip_prefix("bearer "))
            })
            .map(str::to_string)
    })
}
