//! Product persistence.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, execute_in_tx};
use crate::models::Product;

/// Product repository. Writes report rows affected and leave the
/// zero-rows decision to the caller.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: &Product) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    /// First product carrying `title`; titles are not unique in storage.
    async fn find_by_title(&self, title: &str) -> Result<Option<Product>, StoreError>;

    /// Overwrite the mutable fields of a product owned by `product.seller_id`.
    async fn update(&self, product: &Product) -> Result<u64, StoreError>;

    async fn delete(&self, id: Uuid, seller_id: Uuid) -> Result<u64, StoreError>;

    async fn list_by_category(
        &self,
        category_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, StoreError>;
}

const SELECT_PRODUCT: &str = "SELECT id, seller_id, category_id, title, description, price, \
     is_active, created_at, updated_at FROM products";

/// PostgreSQL-backed [`ProductRepository`].
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, product: &Product) -> Result<(), StoreError> {
        let query = sqlx::query(
            "INSERT INTO products (id, seller_id, category_id, title, description, price, \
             is_active, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(product.id)
        .bind(product.seller_id)
        .bind(product.category_id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at);
        execute_in_tx(&self.pool, query).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let sql = format!("{SELECT_PRODUCT} WHERE id = $1");
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Product>, StoreError> {
        let sql = format!("{SELECT_PRODUCT} WHERE title = $1 ORDER BY created_at LIMIT 1");
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(title)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update(&self, product: &Product) -> Result<u64, StoreError> {
        let query = sqlx::query(
            "UPDATE products SET title = $1, description = $2, price = $3, is_active = $4, \
             updated_at = $5 WHERE id = $6 AND seller_id = $7",
        )
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.is_active)
        .bind(product.updated_at)
        .bind(product.id)
        .bind(product.seller_id);
        execute_in_tx(&self.pool, query).await
    }

    async fn delete(&self, id: Uuid, seller_id: Uuid) -> Result<u64, StoreError> {
        let query = sqlx::query("DELETE FROM products WHERE id = $1 AND seller_id = $2")
            .bind(id)
            .bind(seller_id);
        execute_in_tx(&self.pool, query).await
    }

    async fn list_by_category(
        &self,
        category_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, StoreError> {
        let sql = format!(
            "{SELECT_PRODUCT} WHERE category_id = $1 ORDER BY created_at, id LIMIT $2 OFFSET $3"
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(category_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }
}
