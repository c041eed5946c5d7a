//! Authentication Models
//! Mission: Define account, token claim and request/response structures

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::error::AuthError;

/// Role given to every account created through signup
pub const ROLE_USER: &str = "user";
/// Role required by the administrative routes
pub const ROLE_ADMIN: &str = "admin";

/// Roles seeded into every credential store
pub const SEEDED_ROLES: [&str; 2] = [ROLE_USER, ROLE_ADMIN];

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: String,
    pub created_at: String,
}

/// Account about to be inserted; the store assigns id and timestamp
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Account response (sanitized)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

impl AccountResponse {
    pub fn from_account(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role.clone(),
            created_at: account.created_at.clone(),
        }
    }
}

/// JWT claims payload, shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub role: String,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

/// Signup request body
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated signup input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignupRequest {
    pub fn validate(self) -> Result<SignupInput, AuthError> {
        Ok(SignupInput {
            name: required("name", self.name)?,
            email: required("email", self.email)?,
            password: required("password", self.password)?,
        })
    }
}

/// Login request body
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated login input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Either field missing yields the same combined error.
    pub fn validate(self) -> Result<LoginInput, AuthError> {
        let present = |v: Option<String>| v.filter(|v| !v.is_empty());
        match (present(self.email), present(self.password)) {
            (Some(email), Some(password)) => Ok(LoginInput { email, password }),
            _ => Err(AuthError::MissingCredentials),
        }
    }
}

/// Refresh request body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Untyped: a non-string token is an invalid token, not a malformed body.
    pub refresh_token: Option<Value>,
}

impl RefreshRequest {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: Some(Value::String(refresh_token.into())),
        }
    }

    /// The token itself; absence is an authorization failure, not a validation one.
    pub fn validate(self) -> Result<String, AuthError> {
        match self.refresh_token {
            None | Some(Value::Null) => Err(AuthError::MissingToken),
            Some(Value::String(token)) if token.is_empty() => Err(AuthError::MissingToken),
            Some(Value::String(token)) => Ok(token),
            Some(_) => Err(AuthError::InvalidRefreshToken),
        }
    }
}

/// Empty strings count as absent. Values are otherwise kept verbatim:
/// emails are matched case-sensitively and passwords are never trimmed.
fn required(field: &'static str, value: Option<String>) -> Result<String, AuthError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingField(field))
}

/// `{user}` envelope returned by signup and `/me`
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: AccountResponse,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$2b$10$secret".to_string(),
            role: ROLE_USER.to_string(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let account = sample_account();

        let raw = serde_json::to_value(&account).unwrap();
        assert!(raw.get("password_hash").is_none());

        let response = serde_json::to_value(AccountResponse::from_account(&account)).unwrap();
        assert!(response.get("password_hash").is_none());
        assert!(response.get("passwordHash").is_none());
        assert_eq!(response["email"], "ada@example.com");
        assert_eq!(response["createdAt"], "2025-01-01T00:00:00Z");
    }

    #[test]
    fn test_claims_wire_names() {
        let claims = Claims {
            user_id: "abc".to_string(),
            role: ROLE_ADMIN.to_string(),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], "abc");
        assert_eq!(json["role"], "admin");

        // iat is optional on tokens minted elsewhere
        let parsed: Claims =
            serde_json::from_str(r#"{"userId":"abc","role":"user","exp":5}"#).unwrap();
        assert_eq!(parsed.iat, 0);
    }

    #[test]
    fn test_signup_validation() {
        let ok = SignupRequest {
            name: Some("A".to_string()),
            email: Some("a@x.com".to_string()),
            password: Some("p".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.email, "a@x.com");

        let missing_email = SignupRequest {
            name: Some("A".to_string()),
            email: None,
            password: Some("p".to_string()),
        }
        .validate();
        assert!(matches!(missing_email, Err(AuthError::MissingField("email"))));

        let empty_password = SignupRequest {
            name: Some("A".to_string()),
            email: Some("a@x.com".to_string()),
            password: Some(String::new()),
        }
        .validate();
        assert!(matches!(
            empty_password,
            Err(AuthError::MissingField("password"))
        ));
    }

    #[test]
    fn test_login_validation_keeps_values_verbatim() {
        let input = LoginRequest {
            email: Some("Mixed@Case.com".to_string()),
            password: Some(" spaced ".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(input.email, "Mixed@Case.com");
        assert_eq!(input.password, " spaced ");

        let missing = LoginRequest::default().validate();
        assert!(matches!(missing, Err(AuthError::MissingCredentials)));

        let empty_password = LoginRequest {
            email: Some("a@x.com".to_string()),
            password: Some(String::new()),
        }
        .validate();
        assert!(matches!(empty_password, Err(AuthError::MissingCredentials)));
    }

    #[test]
    fn test_refresh_request_parsing() {
        let req: RefreshRequest = serde_json::from_str(r#"{"refreshToken":"abc"}"#).unwrap();
        assert_eq!(req.validate().unwrap(), "abc");

        for body in ["{}", r#"{"refreshToken":null}"#, r#"{"refreshToken":""}"#] {
            let req: RefreshRequest = serde_json::from_str(body).unwrap();
            assert!(matches!(req.validate(), Err(AuthError::MissingToken)), "{body}");
        }

        for body in [
            r#"{"refreshToken":42}"#,
            r#"{"refreshToken":{"x":1}}"#,
            r#"{"refreshToken":["abc"]}"#,
        ] {
            let req: RefreshRequest = serde_json::from_str(body).unwrap();
            assert!(
                matches!(req.validate(), Err(AuthError::InvalidRefreshToken)),
                "{body}"
            );
        }
    }
}
