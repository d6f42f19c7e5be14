use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
    pub session_ttl_minutes: i64,
    pub remember_ttl_days: i64,
    pub reset_ttl_seconds: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        // argon2 crate defaults (OWASP recommended minimum for argon2id)
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub username: String,
    pub password: String,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub base_url: String,
    pub posts_per_page: u64,
    pub auth: AuthConfig,
    pub argon2: Argon2Config,
    /// `None` routes reset mail to the in-process outbox.
    pub smtp: Option<SmtpConfig>,
    /// `None` stores pictures under `static_dir`.
    pub s3: Option<S3Config>,
    pub static_dir: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let auth = AuthConfig {
            secret: std::env::var("SECRET_KEY").context("SECRET_KEY is not set")?,
            session_ttl_minutes: env_or("SESSION_TTL_MINUTES", 60 * 24),
            remember_ttl_days: env_or("REMEMBER_TTL_DAYS", 14),
            reset_ttl_seconds: env_or("RESET_TOKEN_TTL_SECONDS", 1800),
            cookie_secure: env_or("COOKIE_SECURE", false),
        };
        let argon2 = Argon2Config {
            memory_kib: env_or("ARGON2_MEMORY_KIB", Argon2Config::default().memory_kib),
            iterations: env_or("ARGON2_ITERATIONS", Argon2Config::default().iterations),
            parallelism: env_or("ARGON2_PARALLELISM", Argon2Config::default().parallelism),
        };

        let smtp = match (env_opt("EMAIL_USER"), env_opt("EMAIL_PASS")) {
            (Some(username), Some(password)) => Some(SmtpConfig {
                server: env_opt("MAIL_SERVER").unwrap_or_else(|| "smtp.googlemail.com".into()),
                port: env_or("MAIL_PORT", 587),
                use_tls: env_or("MAIL_USE_TLS", true),
                sender: env_opt("MAIL_SENDER").unwrap_or_else(|| username.clone()),
                username,
                password,
            }),
            _ => None,
        };

        let s3 = match (
            env_opt("MINIO_ENDPOINT"),
            env_opt("MINIO_BUCKET"),
            env_opt("MINIO_ACCESS_KEY"),
            env_opt("MINIO_SECRET_KEY"),
        ) {
            (Some(endpoint), Some(bucket), Some(access_key), Some(secret_key)) => Some(S3Config {
                endpoint,
                bucket,
                access_key,
                secret_key,
            }),
            _ => None,
        };

        let port: u16 = env_or("APP_PORT", 8080);
        Ok(Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", 5),
            base_url: env_opt("APP_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
            posts_per_page: env_or("POSTS_PER_PAGE", 3),
            auth,
            argon2,
            smtp,
            s3,
            static_dir: env_opt("PROFILE_PICS_DIR").unwrap_or_else(|| "static".into()),
        })
    }
}
