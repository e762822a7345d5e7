//! Request and response shapes exchanged with API clients.
//!
//! Requests derive [`validator::Validate`]; services call `validate()` before
//! touching storage. Responses are plain projections of domain models.

pub mod auth;
pub mod catalog;

use serde::{Deserialize, Deserializer};
use validator::ValidationErrors;

pub use auth::{
    CustomerProfileResponse, CustomerProfileUpdate, LoginRequest, ProfileResponse, ProfileUpdate,
    RegisterRequest, SellerProfileResponse, SellerProfileUpdate, TokenPair,
    UpdateCredentialsRequest,
};
pub use catalog::{
    CategoryRequest, CategoryResponse, CreateImageRequest, CreateProductRequest, ImageResponse,
    ListQuery, ProductResponse, UpdateProductRequest,
};

/// Deserialize an optional string, treating `""` as absent.
pub fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Flatten validator output into `field: reason` pairs. Struct-level
/// failures appear under `__all__`.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let reasons: Vec<String> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            format!("{field}: {}", reasons.join(", "))
        })
        .collect();
    fields.sort();
    if fields.is_empty() {
        return errors.to_string();
    }
    fields.join("; ")
}
