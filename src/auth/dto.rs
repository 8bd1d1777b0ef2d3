use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::config::ProfileConfig;
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for requesting a password-reset link.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request body for consuming a reset token.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub address: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i32>,
}

impl UpdateProfileRequest {
    /// Trimmed address, or `None` when absent or blank. Rejects addresses
    /// shorter than 5 characters or without a single alphanumeric.
    pub fn normalized_address(&self) -> Result<Option<String>, ApiError> {
        let Some(raw) = self.address.as_deref() else {
            return Ok(None);
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.len() < 5 {
            return Err(ApiError::Validation(
                "Address must be at least 5 characters long".into(),
            ));
        }
        if !trimmed.chars().any(|c| c.is_alphanumeric()) {
            return Err(ApiError::Validation(
                "Address must contain one letter or number".into(),
            ));
        }
        Ok(Some(trimmed.to_string()))
    }

    /// Lowercased gender checked against the configured allow-list.
    pub fn normalized_gender(&self, cfg: &ProfileConfig) -> Result<Option<String>, ApiError> {
        let Some(raw) = self.gender.as_deref() else {
            return Ok(None);
        };
        let gender = raw.trim().to_lowercase();
        if !cfg.allowed_genders.iter().any(|g| g == &gender) {
            return Err(ApiError::Validation(format!(
                "Gender must be one of: {}",
                cfg.allowed_genders.join(", ")
            )));
        }
        Ok(Some(gender))
    }

    /// Age checked against the configured bounds.
    pub fn checked_age(&self, cfg: &ProfileConfig) -> Result<Option<i32>, ApiError> {
        let Some(age) = self.age else {
            return Ok(None);
        };
        if age < cfg.age_min || age > cfg.age_max {
            return Err(ApiError::Validation(format!(
                "Age must be between {} and {}",
                cfg.age_min, cfg.age_max
            )));
        }
        Ok(Some(age))
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i32>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            address: user.address,
            gender: user.gender,
            age: user.age,
        }
    }
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: PublicUser,
}

/// Generic success envelope.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub success: bool,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

/// Success envelope carrying the updated profile.
#[derive(Debug, Serialize)]
pub struct ProfileUpdateResponse {
    pub message: String,
    pub success: bool,
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ProfileConfig {
        ProfileConfig {
            allowed_genders: vec!["male".into(), "female".into(), "other".into()],
            age_min: 13,
            age_max: 100,
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("not an email"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn address_is_trimmed_and_checked() {
        let req = UpdateProfileRequest {
            address: Some("  12 Main Street  ".into()),
            ..Default::default()
        };
        assert_eq!(
            req.normalized_address().unwrap(),
            Some("12 Main Street".to_string())
        );

        let req = UpdateProfileRequest {
            address: Some("abc".into()),
            ..Default::default()
        };
        assert!(req.normalized_address().is_err());

        let req = UpdateProfileRequest {
            address: Some("-----".into()),
            ..Default::default()
        };
        assert!(req.normalized_address().is_err());
    }

    #[test]
    fn blank_address_counts_as_absent() {
        let req = UpdateProfileRequest {
            address: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(req.normalized_address().unwrap(), None);
    }

    #[test]
    fn gender_must_be_allow_listed() {
        let req = UpdateProfileRequest {
            gender: Some("Female".into()),
            ..Default::default()
        };
        assert_eq!(
            req.normalized_gender(&cfg()).unwrap(),
            Some("female".to_string())
        );

        let req = UpdateProfileRequest {
            gender: Some("dragon".into()),
            ..Default::default()
        };
        assert!(req.normalized_gender(&cfg()).is_err());
    }

    #[test]
    fn age_bounds_come_from_config() {
        let req = UpdateProfileRequest {
            age: Some(12),
            ..Default::default()
        };
        assert!(req.checked_age(&cfg()).is_err());

        let req = UpdateProfileRequest {
            age: Some(101),
            ..Default::default()
        };
        assert!(req.checked_age(&cfg()).is_err());

        let req = UpdateProfileRequest {
            age: Some(42),
            ..Default::default()
        };
        assert_eq!(req.checked_age(&cfg()).unwrap(), Some(42));
    }

    #[test]
    fn public_user_drops_the_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            address: None,
            gender: None,
            age: None,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password"));
    }
}
