use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::config::AuthConfig;

pub const DEFAULT_RESET_TTL_SECONDS: i64 = 1800;

/// Stateless password reset tokens. The expiry travels inside the signed
/// payload, so verification never depends on a ttl default matching the
/// one used at issue time. Tokens are not revoked after use.
#[derive(Clone)]
pub struct ResetTokenCodec {
    keys: JwtKeys,
    ttl: Duration,
}

impl ResetTokenCodec {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            keys: JwtKeys::from_secret(&cfg.secret),
            ttl: Duration::seconds(cfg.reset_ttl_seconds),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_at(user_id, self.ttl, OffsetDateTime::now_utc())
    }

    pub fn issue_with_ttl(&self, user_id: Uuid, ttl_seconds: i64) -> anyhow::Result<String> {
        self.issue_at(user_id, Duration::seconds(ttl_seconds), OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let (token, _) = self
            .keys
            .sign_at(user_id, TokenKind::Reset, false, now, ttl)?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Option<Uuid> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// `None` for a bad signature, a malformed or foreign token, or
    /// `now` past the embedded expiry.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Option<Uuid> {
        match self.keys.verify_at(token, TokenKind::Reset, now) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                tracing::debug!(error = %e, "reset token rejected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::session::SessionIssuer, users::Identifiable};

    fn auth_config(secret: &str) -> AuthConfig {
        AuthConfig {
            secret: secret.into(),
            session_ttl_minutes: 60,
            remember_ttl_days: 14,
            reset_ttl_seconds: DEFAULT_RESET_TTL_SECONDS,
            cookie_secure: false,
        }
    }

    #[test]
    fn issue_then_verify_immediately() {
        let codec = ResetTokenCodec::new(&auth_config("s3cret"));
        let user_id = Uuid::new_v4();
        let token = codec.issue(user_id).unwrap();
        assert_eq!(codec.verify(&token), Some(user_id));
    }

    #[test]
    fn expires_after_default_ttl() {
        let codec = ResetTokenCodec::new(&auth_config("s3cret"));
        let user_id = Uuid::new_v4();
        let issued = OffsetDateTime::now_utc();
        let token = codec
            .issue_at(user_id, Duration::seconds(DEFAULT_RESET_TTL_SECONDS), issued)
            .unwrap();

        let just_in_time = issued + Duration::seconds(DEFAULT_RESET_TTL_SECONDS);
        assert_eq!(codec.verify_at(&token, just_in_time), Some(user_id));

        let too_late = issued + Duration::seconds(DEFAULT_RESET_TTL_SECONDS + 1);
        assert_eq!(codec.verify_at(&token, too_late), None);
    }

    #[test]
    fn custom_ttl_is_honoured_by_a_codec_with_a_different_default() {
        let short = ResetTokenCodec::new(&AuthConfig {
            reset_ttl_seconds: 60,
            ..auth_config("s3cret")
        });
        let long = ResetTokenCodec::new(&auth_config("s3cret"));
        let user_id = Uuid::new_v4();
        let issued = OffsetDateTime::now_utc();
        let token = long.issue_at(user_id, Duration::hours(2), issued).unwrap();
        assert_eq!(
            short.verify_at(&token, issued + Duration::minutes(90)),
            Some(user_id)
        );
    }

    #[test]
    fn tampering_with_any_byte_invalidates() {
        let codec = ResetTokenCodec::new(&auth_config("s3cret"));
        let token = codec.issue(Uuid::new_v4()).unwrap();

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            assert_eq!(codec.verify(&tampered), None, "byte {i} was not covered");
        }
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = ResetTokenCodec::new(&auth_config("one"));
        let verifier = ResetTokenCodec::new(&auth_config("two"));
        let token = issuer.issue(Uuid::new_v4()).unwrap();
        assert_eq!(verifier.verify(&token), None);
    }

    #[test]
    fn session_tokens_are_not_reset_tokens() {
        struct Id(Uuid);
        impl Identifiable for Id {
            fn id(&self) -> Uuid {
                self.0
            }
        }
        let cfg = auth_config("s3cret");
        let session = SessionIssuer::new(&cfg).login(&Id(Uuid::new_v4()), true).unwrap();
        let codec = ResetTokenCodec::new(&cfg);
        assert_eq!(codec.verify(&session.token), None);

        let reset = codec.issue(Uuid::new_v4()).unwrap();
        assert_eq!(SessionIssuer::new(&cfg).current_session(Some(&reset)), None);
    }

    #[test]
    fn token_stays_valid_after_use() {
        let codec = ResetTokenCodec::new(&auth_config("s3cret"));
        let user_id = Uuid::new_v4();
        let token = codec.issue_with_ttl(user_id, 600).unwrap();
        assert_eq!(codec.verify(&token), Some(user_id));
        assert_eq!(codec.verify(&token), Some(user_id));
    }
}
