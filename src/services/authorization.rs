use crate::{
    error::{AppError, AppResult},
    models::{normalize_email, UserProfile},
};

/// Stable id of the configured administrator's profile
pub const ADMIN_PROFILE_ID: &str = "admin_master";

/// Decides who may manage the catalog
#[cfg_attr(test, mockall::automock)]
pub trait AuthorizationPolicy: Send + Sync {
    /// Checks admin credentials and returns the admin profile on success
    fn authorize_admin(&self, email: &str, passcode: &str) -> AppResult<UserProfile>;

    fn can_manage_catalog(&self, profile: &UserProfile) -> bool;
}

/// One administrator whose credentials come from configuration
pub struct SingleAdminPolicy {
    email: String,
    passcode: String,
    username: String,
}

impl SingleAdminPolicy {
    pub fn new(email: &str, passcode: String, username: String) -> Self {
        Self {
            email: normalize_email(email),
            passcode,
            username,
        }
    }
}

impl AuthorizationPolicy for SingleAdminPolicy {
    fn authorize_admin(&self, email: &str, passcode: &str) -> AppResult<UserProfile> {
        if normalize_email(email) != self.email || passcode != self.passcode {
            tracing::warn!(email = %normalize_email(email), "Rejected admin sign-in");
            return Err(AppError::AuthRejected(
                "Invalid admin credentials".to_string(),
            ));
        }

        Ok(UserProfile::new(
            ADMIN_PROFILE_ID,
            self.username.clone(),
            &self.email,
            true,
        ))
    }

    fn can_manage_catalog(&self, profile: &UserProfile) -> bool {
        profile.is_admin && normalize_email(&profile.email) == self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SingleAdminPolicy {
        SingleAdminPolicy::new("Boss@Beats.io", "s3cret".to_string(), "Catalog Admin".to_string())
    }

    #[test]
    fn test_email_is_case_insensitive() {
        let admin = policy().authorize_admin("  boss@BEATS.io", "s3cret").unwrap();
        assert_eq!(admin.id, ADMIN_PROFILE_ID);
        assert_eq!(admin.email, "boss@beats.io");
        assert!(admin.is_admin);
    }

    #[test]
    fn test_passcode_is_exact() {
        let err = policy().authorize_admin("boss@beats.io", "S3CRET").unwrap_err();
        assert!(matches!(err, AppError::AuthRejected(_)));
    }

    #[test]
    fn test_wrong_email_rejected() {
        assert!(policy().authorize_admin("intruder@beats.io", "s3cret").is_err());
    }

    #[test]
    fn test_only_flagged_admin_manages_catalog() {
        let policy = policy();
        let admin = policy.authorize_admin("boss@beats.io", "s3cret").unwrap();
        assert!(policy.can_manage_catalog(&admin));

        let artist = UserProfile::new("artist_1", "Nova", "nova@example.com", false);
        assert!(!policy.can_manage_catalog(&artist));

        let spoofed = UserProfile::new("artist_2", "Spoof", "nova@example.com", true);
        assert!(!policy.can_manage_catalog(&spoofed));
    }
}
