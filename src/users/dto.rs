use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::password::MIN_PASSWORD_LEN;
use crate::error::ApiError;
use crate::users::repo::User;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Request body for account creation. Credential fields are optional at the
/// serde layer so an absent key surfaces as a field-level 400, not a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Validated account fields, email normalized.
#[derive(Debug)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<NewAccount, ApiError> {
        let Some(email) = self.email else {
            return Err(ApiError::field("email", "This field is required"));
        };
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(ApiError::field("email", "Enter a valid email address"));
        }

        let Some(password) = self.password else {
            return Err(ApiError::field("password", "This field is required"));
        };
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::field(
                "password",
                format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        Ok(NewAccount {
            email,
            password,
            name: self.name,
        })
    }
}

/// Request body for token issuance. Optional fields for the same reason as
/// `CreateUserRequest`; the handler folds every gap into its one uniform
/// rejection.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Response for token issuance: the opaque bearer key, nothing else.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Request body for profile updates; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

impl UpdateMeRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(password) = &self.password {
            if password.len() < MIN_PASSWORD_LEN {
                return Err(ApiError::field(
                    "password",
                    format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters"),
                ));
            }
        }
        Ok(())
    }
}

/// Public part of a user returned to clients. Never carries the password.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: Some(email.into()),
            password: Some(password.into()),
            name: String::new(),
        }
    }

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("test@test.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
    }

    #[test]
    fn rejects_garbage_addresses() {
        assert!(!is_valid_email("one"));
        assert!(!is_valid_email("no at.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn create_normalizes_email() {
        let account = create_request("  Test@Test.COM ", "testpass")
            .validate()
            .expect("valid");
        assert_eq!(account.email, "test@test.com");
    }

    #[test]
    fn create_rejects_short_password() {
        let err = create_request("test@test.com", "pw").validate().unwrap_err();
        match err {
            ApiError::Validation(errors) => assert!(errors.contains_key("password")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_missing_password_is_field_error() {
        let req: CreateUserRequest =
            serde_json::from_str(r#"{"email":"test@test.com"}"#).expect("deserialize");
        let err = req.validate().unwrap_err();
        match err {
            ApiError::Validation(errors) => assert!(errors.contains_key("password")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_missing_email_is_field_error() {
        let req: CreateUserRequest =
            serde_json::from_str(r#"{"password":"testpass"}"#).expect("deserialize");
        let err = req.validate().unwrap_err();
        match err {
            ApiError::Validation(errors) => assert!(errors.contains_key("email")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn name_defaults_to_empty() {
        let req: CreateUserRequest =
            serde_json::from_str(r#"{"email":"test@test.com","password":"testpass"}"#)
                .expect("deserialize");
        assert_eq!(req.name, "");
    }

    #[test]
    fn token_request_tolerates_absent_fields() {
        let req: TokenRequest =
            serde_json::from_str(r#"{"email":"test@test.com"}"#).expect("deserialize");
        assert!(req.password.is_none());

        let req: TokenRequest = serde_json::from_str(r#"{}"#).expect("deserialize");
        assert!(req.email.is_none());
    }

    #[test]
    fn update_allows_partial_body() {
        let req: UpdateMeRequest = serde_json::from_str(r#"{"name":"New name"}"#).expect("parse");
        req.validate().expect("valid");
        assert!(req.password.is_none());
    }

    #[test]
    fn token_response_has_only_token() {
        let json = serde_json::to_value(TokenResponse {
            token: "ab".repeat(20),
        })
        .expect("serialize");
        let obj = json.as_object().expect("object");
        assert_eq!(obj.len(), 1);
        assert!(obj.contains_key("token"));
    }
}
