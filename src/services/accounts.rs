/// Sign-in and registration flows
///
/// Each flow resolves a profile and makes sure the profile store knows
/// about it. Installing the result into the session is up to the caller.
use uuid::Uuid;

use crate::{
    db::ProfileStore,
    error::{AppError, AppResult},
    models::{normalize_email, UserProfile},
    services::authorization::AuthorizationPolicy,
};

/// Admin sign-in: authorize and upsert the admin profile
pub async fn sign_in_admin(
    policy: &dyn AuthorizationPolicy,
    profiles: &dyn ProfileStore,
    email: &str,
    passcode: &str,
) -> AppResult<UserProfile> {
    let admin = policy.authorize_admin(email, passcode)?;
    profiles.upsert_profile(&admin).await?;

    // The store keeps the first id it saw for this email
    let stored = profiles
        .get_profile_by_email(&admin.email)
        .await?
        .unwrap_or(admin);

    Ok(stored)
}

/// Registers an artist under their email
pub async fn register_artist(
    profiles: &dyn ProfileStore,
    stage_name: &str,
    email: &str,
) -> AppResult<UserProfile> {
    let stage_name = stage_name.trim();
    if stage_name.is_empty() {
        return Err(AppError::InvalidInput("Stage name is required".to_string()));
    }
    let email = normalize_email(email);
    if !email.contains('@') {
        return Err(AppError::InvalidInput("A valid email is required".to_string()));
    }

    let candidate = UserProfile::new(
        format!("artist_{}", Uuid::new_v4().simple()),
        stage_name,
        &email,
        false,
    );
    profiles.upsert_profile(&candidate).await?;

    let stored = profiles
        .get_profile_by_email(&email)
        .await?
        .unwrap_or(candidate);

    tracing::info!(user_id = %stored.id, "Artist registered");

    Ok(stored)
}

/// Looks up an existing artist by email
///
/// Admin profiles are refused here: they only sign in with the passcode.
pub async fn sign_in_artist(profiles: &dyn ProfileStore, email: &str) -> AppResult<UserProfile> {
    let email = normalize_email(email);
    let profile = profiles.get_profile_by_email(&email).await?.ok_or_else(|| {
        AppError::NotFound(format!(
            "No artist registered with {}. Register first to create a profile.",
            email
        ))
    })?;

    if profile.is_admin {
        tracing::warn!(user_id = %profile.id, "Admin profile refused on artist sign-in");
        return Err(AppError::AuthRejected(
            "Admin accounts sign in with their passcode".to_string(),
        ));
    }

    Ok(profile)
}
