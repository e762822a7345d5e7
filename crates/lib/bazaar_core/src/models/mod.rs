//! Domain models.
//!
//! These are internal domain models, distinct from the request/response
//! shapes in [`crate::dto`].

pub mod catalog;
pub mod identity;

pub use catalog::{Category, Product, ProductImage};
pub use identity::{
    CustomerProfile, Identity, Profile, RefreshTokenRecord, Role, SellerProfile, SessionClaims,
    TokenClaims, UnknownRole,
};
