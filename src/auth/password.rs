use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::config::Argon2Config;

/// Argon2id hashing. Digests are PHC strings carrying algorithm, params and
/// salt, so verification ignores the params configured here.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new(cfg: &Argon2Config) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow!("invalid argon2 params: {e}"))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// A malformed digest verifies as `false`.
    pub fn verify(&self, plain: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };
        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }

    /// `hash` on the blocking pool; Argon2 is deliberately slow.
    pub async fn hash_blocking(&self, plain: &str) -> anyhow::Result<String> {
        let svc = self.clone();
        let plain = plain.to_string();
        tokio::task::spawn_blocking(move || svc.hash(&plain))
            .await
            .context("argon2 hash task")?
    }

    pub async fn verify_blocking(&self, plain: &str, digest: &str) -> bool {
        let svc = self.clone();
        let (plain, digest) = (plain.to_string(), digest.to_string());
        match tokio::task::spawn_blocking(move || svc.verify(&plain, &digest)).await {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, "argon2 verify task failed");
                false
            }
        }
    }
}
