//! Identity and session DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::empty_as_none;
use crate::models::{CustomerProfile, Identity, Profile, Role, SellerProfile};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "username must be 3-50 characters"))]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    /// `customer` or `seller`, matched case-insensitively.
    pub user_type: String,
}

/// Exactly one of `username` or `email` identifies the account.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(min = 3, message = "username must be at least 3 characters"))]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    pub user_type: String,
}

/// Partial credential change; absent fields keep their current value.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "old_password_required"))]
pub struct UpdateCredentialsRequest {
    #[validate(length(min = 1, message = "refresh_token is required"))]
    pub refresh_token: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(min = 3, max = 50, message = "username must be 3-50 characters"))]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub old_password: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(min = 8, message = "new_password must be at least 8 characters"))]
    pub new_password: Option<String>,
}

fn old_password_required(req: &UpdateCredentialsRequest) -> Result<(), ValidationError> {
    if req.new_password.is_some() && req.old_password.is_none() {
        return Err(ValidationError::new("old_password_required")
            .with_message("old_password is required to set new_password".into()));
    }
    Ok(())
}

/// `+` followed by up to fifteen digits, the first non-zero.
fn e164(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or("");
    let valid = (2..=15).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !digits.starts_with('0');
    if !valid {
        return Err(ValidationError::new("phone")
            .with_message("phone must be in E.164 format".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CustomerProfileUpdate {
    #[validate(custom(function = "e164"))]
    pub phone: Option<String>,
    #[validate(length(min = 2, max = 50, message = "first_name must be 2-50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50, message = "last_name must be 2-50 characters"))]
    pub last_name: Option<String>,
    pub address: Option<String>,
    /// `YYYY-MM-DD`.
    pub date_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SellerProfileUpdate {
    #[validate(length(min = 2, max = 100, message = "company_name must be 2-100 characters"))]
    pub company_name: Option<String>,
    #[validate(range(min = 0.0, max = 5.0, message = "rating must be between 0 and 5"))]
    pub rating: Option<f64>,
}

/// Role-tagged profile replacement: `{"user_type": "seller", ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "user_type", rename_all = "lowercase")]
pub enum ProfileUpdate {
    Customer(CustomerProfileUpdate),
    Seller(SellerProfileUpdate),
}

impl ProfileUpdate {
    pub fn role(&self) -> Role {
        match self {
            ProfileUpdate::Customer(_) => Role::Customer,
            ProfileUpdate::Seller(_) => Role::Seller,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            ProfileUpdate::Customer(fields) => fields.validate(),
            ProfileUpdate::Seller(fields) => fields.validate(),
        }
    }

    /// Every role field is replaced; absent ones become `None`.
    pub fn into_profile(self) -> Profile {
        match self {
            ProfileUpdate::Customer(c) => Profile::Customer(CustomerProfile {
                phone: c.phone,
                first_name: c.first_name,
                last_name: c.last_name,
                date_birth: c.date_birth,
                address: c.address,
            }),
            ProfileUpdate::Seller(s) => Profile::Seller(SellerProfile {
                company_name: s.company_name,
                rating: s.rating,
            }),
        }
    }
}

/// Freshly issued access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub date_birth: Option<NaiveDate>,
    pub user_type: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellerProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub company_name: Option<String>,
    pub rating: Option<f64>,
    pub user_type: Role,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProfileResponse {
    Customer(CustomerProfileResponse),
    Seller(SellerProfileResponse),
}

impl ProfileResponse {
    pub fn new(identity: &Identity, profile: Profile) -> Self {
        match profile {
            Profile::Customer(c) => ProfileResponse::Customer(CustomerProfileResponse {
                id: identity.id,
                username: identity.username.clone(),
                email: identity.email.clone(),
                phone: c.phone,
                first_name: c.first_name,
                last_name: c.last_name,
                address: c.address,
                date_birth: c.date_birth,
                user_type: Role::Customer,
            }),
            Profile::Seller(s) => ProfileResponse::Seller(SellerProfileResponse {
                id: identity.id,
                username: identity.username.clone(),
                email: identity.email.clone(),
                company_name: s.company_name,
                rating: s.rating,
                user_type: Role::Seller,
            }),
        }
    }
}
