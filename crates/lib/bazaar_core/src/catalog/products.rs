//! Product service.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{CatalogError, PRODUCT_PAGE, Page, validate};
use crate::dto::{CreateProductRequest, ListQuery, ProductResponse, UpdateProductRequest};
use crate::models::Product;
use crate::store::{ProductRepository, StoreError};

pub struct ProductService {
    products: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    /// List `seller_id`'s new product in `category_id`.
    ///
    /// Titles are checked for uniqueness before the insert, so two
    /// concurrent creates with one title can both succeed.
    pub async fn create(
        &self,
        seller_id: Uuid,
        category_id: Uuid,
        req: CreateProductRequest,
    ) -> Result<ProductResponse, CatalogError> {
        validate("create_product", &req)?;
        if self.products.find_by_title(&req.title).await?.is_some() {
            warn!(title = %req.title, "product already exists");
            return Err(CatalogError::Duplicate(format!("product {:?}", req.title)));
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            seller_id,
            category_id,
            title: req.title,
            description: req.description,
            price: req.price,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.products.create(&product).await.map_err(|e| match e {
            StoreError::MissingReference(_) => CatalogError::NotFound("category"),
            other => CatalogError::Repository(other),
        })?;

        info!(product_id = %product.id, %seller_id, %category_id, "product created");
        Ok(product.into())
    }

    pub async fn get_by_title(&self, title: &str) -> Result<ProductResponse, CatalogError> {
        if title.trim().is_empty() {
            warn!("empty product title");
            return Err(CatalogError::Input("empty title".into()));
        }
        let product = self
            .products
            .find_by_title(title)
            .await?
            .ok_or(CatalogError::NotFound("product"))?;
        Ok(product.into())
    }

    /// Replace a product's fields. Only its seller may do so.
    pub async fn update(
        &self,
        seller_id: Uuid,
        product_id: Uuid,
        req: UpdateProductRequest,
    ) -> Result<ProductResponse, CatalogError> {
        validate("update_product", &req)?;
        let mut product = self
            .products
            .find_by_id(product_id)
            .await?
            .ok_or(CatalogError::NotFound("product"))?;
        if product.seller_id != seller_id {
            warn!(%product_id, %seller_id, "product update by non-owner");
            return Err(CatalogError::Forbidden("product"));
        }

        product.title = req.title;
        product.description = req.description;
        product.price = req.price;
        product.is_active = req.is_active.unwrap_or(product.is_active);
        product.updated_at = Utc::now();

        let rows = self.products.update(&product).await?;
        if rows == 0 {
            warn!(%product_id, "product update affected 0 rows");
        } else {
            info!(%product_id, "product updated");
        }
        Ok(product.into())
    }

    /// Delete one of `seller_id`'s products. Other sellers' products are
    /// left alone without an error.
    pub async fn delete(&self, seller_id: Uuid, product_id: Uuid) -> Result<(), CatalogError> {
        let rows = self.products.delete(product_id, seller_id).await?;
        if rows == 0 {
            warn!(%product_id, %seller_id, "product delete affected 0 rows");
        } else {
            info!(%product_id, "product deleted");
        }
        Ok(())
    }

    pub async fn list(
        &self,
        category_id: Uuid,
        query: ListQuery,
    ) -> Result<Vec<ProductResponse>, CatalogError> {
        let page = Page::new(PRODUCT_PAGE, query);
        let products = self
            .products
            .list_by_category(category_id, page.limit, page.offset)
            .await?;
        Ok(products.into_iter().map(Into::into).collect())
    }
}
