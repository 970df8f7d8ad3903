//! User model, roles and session claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Account role.
///
/// A closed set: the permission gate matches exhaustively on it, so a new
/// role cannot silently fall through any authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reader,
    Librarian,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Librarian => "librarian",
            Role::Admin => "admin",
        }
    }

    /// Librarians and admins count as staff
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Librarian | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reader" => Ok(Role::Reader),
            "librarian" => Ok(Role::Librarian),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// User account document, keyed by the account identifier assigned by the
/// external authentication collaborator
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Create user request.
///
/// The credential itself lives with the authentication collaborator; this
/// only creates the account document the rules engine consults.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    /// Account identifier from the authentication service
    #[validate(length(min = 1, message = "Account id must not be empty"))]
    pub id: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Display name must not be empty"))]
    pub display_name: String,
    pub role: Role,
}

/// Update role request (admin only, never on one's own account)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRole {
    pub role: Role,
}

/// Verified caller identity for one request.
///
/// Role and identity come from the authentication collaborator and are
/// treated as already-verified input; every service operation re-checks the
/// permission gate against this session regardless of what the client
/// already filtered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Account identifier
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    /// Encode the session as a bearer token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Decode and verify a bearer token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}
