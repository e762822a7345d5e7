//! Identity domain models.
//!
//! An identity is the core user record shared by both roles; each identity
//! owns exactly one profile row of its role.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Immutable partition of the identity space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Seller,
}

/// Returned when a string names neither role.
#[derive(Debug, Clone, Error)]
#[error("unsupported user_type: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    /// Wire and column representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Seller => "seller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "seller" => Ok(Role::Seller),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Core user record.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer extension row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerProfile {
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_birth: Option<NaiveDate>,
    pub address: Option<String>,
}

/// Seller extension row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SellerProfile {
    pub company_name: Option<String>,
    /// Always within `[0, 5]` when present.
    pub rating: Option<f64>,
}

/// Role-specific profile data. Also used as the full replacement written by
/// a profile update.
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Customer(CustomerProfile),
    Seller(SellerProfile),
}

impl Profile {
    /// The role this profile belongs to.
    pub fn role(&self) -> Role {
        match self {
            Profile::Customer(_) => Role::Customer,
            Profile::Seller(_) => Role::Seller,
        }
    }

    /// An empty profile for a freshly registered identity.
    pub fn empty(role: Role) -> Self {
        match role {
            Role::Customer => Profile::Customer(CustomerProfile::default()),
            Role::Seller => Profile::Seller(SellerProfile::default()),
        }
    }
}

/// Single-slot refresh token record; the primary key is the user id.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// JWT payload shared by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub user_type: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Random token id, keeps tokens issued in the same second distinct.
    #[serde(default)]
    pub jti: String,
}

/// Claims after verification, with typed identity fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub role: Role,
    pub issued_at: i64,
    pub expires_at: i64,
}
