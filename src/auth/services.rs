use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    password,
    repo::UserRepo,
    repo_types::PublicUser,
};
use crate::{
    db::StoreError,
    error::{AppError, AppResult},
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Signs a user up. Inputs are trimmed before any check; the stored hash is
/// dropped from what comes back.
pub async fn create_account(
    users: &dyn UserRepo,
    email: &str,
    password: &str,
) -> AppResult<PublicUser> {
    let email = email.trim();
    let password = password.trim();

    if email.is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required and cannot be empty or just spaces".into(),
        ));
    }
    if !is_valid_email(email) {
        return Err(AppError::InvalidInput("Invalid email address format".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    if users.find_by_email(email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let plain = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .context("password hashing task failed")??;

    let user = match users.create(email, &hash).await {
        Ok(u) => u,
        // lost a race with a concurrent signup
        Err(StoreError::UniqueViolation) => return Err(AppError::DuplicateEmail),
        Err(e) => return Err(AppError::WriteFailed(e.into())),
    };

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user.into())
}

/// `None` both for an unknown email and for a wrong password; callers cannot
/// tell the two apart.
pub async fn verify_credentials(
    users: &dyn UserRepo,
    email: &str,
    password: &str,
) -> AppResult<Option<PublicUser>> {
    let user = users.find_by_email(email).await?;
    let plain = password.to_owned();

    let Some(user) = user else {
        tokio::task::spawn_blocking(move || password::verify_against_dummy(&plain))
            .await
            .context("password verification task failed")?;
        return Ok(None);
    };

    let stored = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored))
        .await
        .context("password verification task failed")??;

    if !ok {
        return Ok(None);
    }
    Ok(Some(user.into()))
}
