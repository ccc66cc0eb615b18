//! Authentication and authorization models
//!
//! This file defines data structures for customers, staff, roles and JWT tokens

use std::fmt::{Display, Formatter};

use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};

use storefront_persistence::entity::{roles, staff, users};

// Auth configuration keys
pub const TOKEN_SECRET_KEY: &str = "storefront.auth.token.secret.key";
pub const DEFAULT_TOKEN_SECRET_KEY: &str = "";
pub const CUSTOMER_TOKEN_EXPIRE_SECONDS: &str = "storefront.auth.customer.token.expire.seconds";
/// Two weeks
pub const DEFAULT_CUSTOMER_TOKEN_EXPIRE_SECONDS: i64 = 14 * 24 * 60 * 60;
/// Staff tokens live a day; idle sessions end earlier through `last_activity`
pub const STAFF_TOKEN_EXPIRE_SECONDS: i64 = 24 * 60 * 60;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const TOKEN_PREFIX: &str = "Bearer ";
pub const MAX_PASSWORD_LENGTH: usize = 72;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const BCRYPT_COST: u32 = 10;
pub const USER_NOT_FOUND_MESSAGE: &str = "Invalid username or password!";

/// Who a token was issued to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[default]
    Customer,
    Staff,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Customer => "customer",
            TokenKind::Staff => "staff",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtPayload {
    pub sub: String,
    pub exp: i64,
    pub kind: TokenKind,
}

/// Auth context passed through request extensions
#[derive(Debug, Default, Clone)]
pub struct AuthContext {
    pub username: String,
    pub kind: TokenKind,
    pub jwt_error: Option<jsonwebtoken::errors::Error>,
    pub token_provided: bool,
}

impl AuthContext {
    pub fn jwt_error_string(&self) -> String {
        if let Some(e) = &self.jwt_error {
            match e.kind() {
                ErrorKind::ExpiredSignature => "token expired!".to_string(),
                _ => e.to_string(),
            }
        } else {
            String::default()
        }
    }

    /// Username of an authenticated customer, if any
    pub fn customer(&self) -> Option<&str> {
        (self.is_valid() && self.kind == TokenKind::Customer).then_some(self.username.as_str())
    }

    /// Username of an authenticated staff member, if any
    pub fn staff(&self) -> Option<&str> {
        (self.is_valid() && self.kind == TokenKind::Staff).then_some(self.username.as_str())
    }

    fn is_valid(&self) -> bool {
        self.token_provided && self.jwt_error.is_none() && !self.username.is_empty()
    }
}

/// Issued token returned by both login endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginToken {
    pub access_token: String,
    pub token_ttl: i64,
    pub username: String,
}

/// Customer profile as shown to the customer and to staff
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub country: String,
    pub gender: String,
    pub birthday: Option<chrono::NaiveDate>,
    pub email_confirmed: bool,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<users::Model> for Customer {
    fn from(value: users::Model) -> Self {
        Self {
            id: value.id,
            username: value.username,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            address: value.address,
            country: value.country,
            gender: value.gender,
            birthday: value.birthday,
            email_confirmed: value.email_confirmed,
            last_login: value.last_login,
            created_at: value.created_at,
        }
    }
}

/// Profile fields supplied on registration or by staff
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerProfile {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub country: String,
    pub gender: String,
    pub birthday: Option<chrono::NaiveDate>,
}

/// Newly registered customer with the token for the verification link
#[derive(Debug, Clone)]
pub struct Registration {
    pub customer: Customer,
    pub verify_token: String,
}

/// Staff member with role names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
    pub last_activity: Option<chrono::DateTime<chrono::Utc>>,
}

impl StaffMember {
    pub fn from_model(value: staff::Model, roles: Vec<String>) -> Self {
        Self {
            id: value.id,
            username: value.username,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            roles,
            last_login: value.last_login,
            last_activity: value.last_activity,
        }
    }
}

/// Role with its permission names
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub id: i64,
    pub name: String,
    pub permissions: Vec<String>,
}

impl RoleInfo {
    pub fn from_model(value: roles::Model, permissions: Vec<String>) -> Self {
        Self {
            id: value.id,
            name: value.name,
            permissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_serde() {
        assert_eq!(serde_json::to_string(&TokenKind::Staff).unwrap(), "\"staff\"");
        let kind: TokenKind = serde_json::from_str("\"customer\"").unwrap();
        assert_eq!(kind, TokenKind::Customer);
    }

    #[test]
    fn test_auth_context_roles() {
        let ctx = AuthContext {
            username: "jane".to_string(),
            kind: TokenKind::Customer,
            jwt_error: None,
            token_provided: true,
        };
        assert_eq!(ctx.customer(), Some("jane"));
        assert_eq!(ctx.staff(), None);

        let ctx = AuthContext {
            kind: TokenKind::Staff,
            ..ctx
        };
        assert_eq!(ctx.customer(), None);
        assert_eq!(ctx.staff(), Some("jane"));
    }

    #[test]
    fn test_auth_context_without_token() {
        let ctx = AuthContext::default();
        assert_eq!(ctx.customer(), None);
        assert_eq!(ctx.staff(), None);
        assert_eq!(ctx.jwt_error_string(), "");
    }
}
