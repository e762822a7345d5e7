//! Catalog services: products, categories, and product images.
//!
//! Writes whose target matched no row are logged and reported as success;
//! callers cannot tell a no-op update or delete from a real one.

pub mod categories;
pub mod images;
pub mod products;

use thiserror::Error;
use tracing::warn;
use validator::Validate;

use crate::dto::{ListQuery, describe};
use crate::store::StoreError;

pub use categories::CategoryService;
pub use images::ImageService;
pub use products::ProductService;

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} belongs to another seller")]
    Forbidden(&'static str),

    #[error("{0} is still in use")]
    InUse(&'static str),

    #[error("repository error: {0}")]
    Repository(#[from] StoreError),
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Input(_) => "INPUT",
            CatalogError::Validation(_) => "VALIDATION",
            CatalogError::Duplicate(_) => "DUPLICATE",
            CatalogError::NotFound(_) => "NOT_FOUND",
            CatalogError::Forbidden(_) => "FORBIDDEN",
            CatalogError::InUse(_) => "IN_USE",
            CatalogError::Repository(_) => "REPOSITORY",
        }
    }
}

fn validate<T: Validate>(operation: &'static str, req: &T) -> Result<(), CatalogError> {
    req.validate().map_err(|e| {
        let reason = describe(&e);
        warn!(operation, %reason, "request rejected");
        CatalogError::Validation(reason)
    })
}

/// Limit policy for one list endpoint.
#[derive(Debug, Clone, Copy)]
pub struct PageRules {
    /// Used when the caller gives no limit.
    pub default_limit: i64,
    /// Largest limit honoured as given.
    pub max_limit: i64,
    /// Replaces a limit outside `[0, max_limit]`.
    pub fallback_limit: i64,
}

pub const PRODUCT_PAGE: PageRules = PageRules {
    default_limit: 10,
    max_limit: 100,
    fallback_limit: 40,
};

pub const CATEGORY_PAGE: PageRules = PageRules {
    default_limit: 10,
    max_limit: 100,
    fallback_limit: 40,
};

pub const IMAGE_PAGE: PageRules = PageRules {
    default_limit: 20,
    max_limit: 20,
    fallback_limit: 20,
};

/// Clamped limit and offset. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(rules: PageRules, query: ListQuery) -> Self {
        let mut limit = query.limit.unwrap_or(rules.default_limit);
        if !(0..=rules.max_limit).contains(&limit) {
            warn!(limit, fallback = rules.fallback_limit, "limit out of range");
            limit = rules.fallback_limit;
        }
        let mut offset = query.offset.unwrap_or(0);
        if offset < 0 {
            warn!(offset, "negative offset");
            offset = 0;
        }
        Self { limit, offset }
    }
}
