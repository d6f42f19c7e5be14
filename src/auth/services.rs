use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::dto::{PublicUser, RegisterRequest},
    error::{AppError, AppResult},
    images::services::{profile_image_url, remove_profile_picture, save_profile_picture},
    mail::reset_email,
    state::AppState,
    users::{ProfileUpdate, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(2..=20).contains(&len) {
        return Err(AppError::validation(
            "Username must be between 2 and 20 characters long",
        ));
    }
    Ok(())
}

const MAX_EMAIL_LEN: usize = 120;

fn validate_email(email: &str) -> AppResult<()> {
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(AppError::validation(format!(
            "Email must be at most {MAX_EMAIL_LEN} characters long"
        )));
    }
    if !is_valid_email(email) {
        return Err(AppError::validation("Invalid email address"));
    }
    Ok(())
}

fn validate_new_password(password: &str, confirm: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::validation("Password is required"));
    }
    if password != confirm {
        return Err(AppError::validation("Passwords must match"));
    }
    Ok(())
}

/// Local return path for a post-login redirect. Absolute and
/// protocol-relative URLs are dropped so login cannot bounce off-site.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<User> {
    let username = req.username.trim().to_string();
    let email = normalize_email(&req.email);
    validate_username(&username)?;
    validate_email(&email)?;
    validate_new_password(&req.password, &req.confirm_password)?;

    let hash = state.passwords.hash_blocking(&req.password).await?;
    // uniqueness is decided by the store, not by a lookup here
    let user = state.users.create_user(&username, &email, &hash).await?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Unknown email and wrong password fail the same way.
pub async fn authenticate(state: &AppState, email: &str, password: &str) -> AppResult<User> {
    let email = normalize_email(email);
    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::InvalidCredential);
    };
    if !state.passwords.verify_blocking(password, &user.password_hash).await {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredential);
    }
    Ok(user)
}

pub async fn request_password_reset(state: &AppState, email: &str) -> AppResult<()> {
    let email = normalize_email(email);
    validate_email(&email)?;
    let user = state.users.find_by_email(&email).await?.ok_or_else(|| {
        AppError::validation(format!(
            "No account associated with \"{email}\". Please register first."
        ))
    })?;

    let token = state.reset_tokens.issue(user.id)?;
    let url = format!("{}/reset_password/{}", state.config.base_url, token);
    state.mailer.send(reset_email(&user.email, &url)).await?;
    info!(user_id = %user.id, "password reset requested");
    Ok(())
}

pub async fn user_for_reset_token(state: &AppState, token: &str) -> AppResult<User> {
    let user_id = state
        .reset_tokens
        .verify(token)
        .ok_or(AppError::InvalidOrExpiredToken)?;
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)
}

pub async fn reset_password(
    state: &AppState,
    token: &str,
    password: &str,
    confirm: &str,
) -> AppResult<User> {
    let user = user_for_reset_token(state, token).await?;
    validate_new_password(password, confirm)?;
    let hash = state.passwords.hash_blocking(password).await?;
    state.users.update_password(user.id, &hash).await?;
    info!(user_id = %user.id, "password reset");
    Ok(user)
}

pub struct AccountUpdate {
    pub username: String,
    pub email: String,
    /// Raw upload and its original filename.
    pub picture: Option<(Bytes, String)>,
}

pub async fn update_account(state: &AppState, user: &User, update: AccountUpdate) -> AppResult<User> {
    let username = update.username.trim().to_string();
    let email = normalize_email(&update.email);
    validate_username(&username)?;
    validate_email(&email)?;

    let new_image = match update.picture {
        Some((body, filename)) => {
            Some(save_profile_picture(state.storage.as_ref(), body, &filename).await?)
        }
        None => None,
    };

    let change = ProfileUpdate {
        username: (username != user.username).then_some(username),
        email: (email != user.email).then_some(email),
        image_file: new_image.clone(),
    };
    let updated = match state.users.update_profile(user.id, change).await {
        Ok(u) => u,
        Err(e) => {
            if let Some(image_file) = &new_image {
                remove_profile_picture(state.storage.as_ref(), image_file).await;
            }
            return Err(e.into());
        }
    };

    if new_image.is_some() {
        remove_profile_picture(state.storage.as_ref(), &user.image_file).await;
    }
    info!(user_id = %updated.id, "account updated");
    Ok(updated)
}

pub async fn public_user(state: &AppState, user: &User) -> AppResult<PublicUser> {
    Ok(PublicUser {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        image_url: profile_image_url(state.storage.as_ref(), &user.image_file).await?,
    })
}
