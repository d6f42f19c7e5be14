use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, TokenKind};

/// HS256 keys derived from the server secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn sign_at(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        remember: bool,
        now: OffsetDateTime,
        ttl: Duration,
    ) -> anyhow::Result<(String, Claims)> {
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
            kind,
            remember,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "token signed");
        Ok((token, claims))
    }

    /// Checks signature, kind and expiry against `now`. Expiry is checked here
    /// rather than by `jsonwebtoken` so the clock can be supplied by callers.
    pub fn verify_at(
        &self,
        token: &str,
        kind: TokenKind,
        now: OffsetDateTime,
    ) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        let claims = data.claims;
        if claims.kind != kind {
            anyhow::bail!("expected a {:?} token, got {:?}", kind, claims.kind);
        }
        if now.unix_timestamp() > claims.exp {
            anyhow::bail!("token expired");
        }
        debug!(user_id = %claims.sub, kind = ?claims.kind, "token verified");
        Ok(claims)
    }
}
