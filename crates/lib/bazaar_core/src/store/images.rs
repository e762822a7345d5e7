//! Product image persistence.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, execute_in_tx};
use crate::models::ProductImage;

#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn create(&self, image: &ProductImage) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProductImage>, StoreError>;

    /// Delete an image whose product belongs to `seller_id`.
    async fn delete(&self, id: Uuid, seller_id: Uuid) -> Result<u64, StoreError>;

    async fn list_by_product(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProductImage>, StoreError>;
}

/// PostgreSQL-backed [`ImageRepository`].
#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn create(&self, image: &ProductImage) -> Result<(), StoreError> {
        let query = sqlx::query(
            "INSERT INTO product_images (id, product_id, url, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(image.id)
        .bind(image.product_id)
        .bind(&image.url)
        .bind(image.created_at);
        execute_in_tx(&self.pool, query).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProductImage>, StoreError> {
        Ok(sqlx::query_as::<_, ProductImage>(
            "SELECT id, product_id, url, created_at FROM product_images WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete(&self, id: Uuid, seller_id: Uuid) -> Result<u64, StoreError> {
        let query = sqlx::query(
            "DELETE FROM product_images i USING products p \
             WHERE i.id = $1 AND i.product_id = p.id AND p.seller_id = $2",
        )
        .bind(id)
        .bind(seller_id);
        execute_in_tx(&self.pool, query).await
    }

    async fn list_by_product(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProductImage>, StoreError> {
        Ok(sqlx::query_as::<_, ProductImage>(
            "SELECT id, product_id, url, created_at FROM product_images \
             WHERE product_id = $1 ORDER BY created_at, id LIMIT $2 OFFSET $3",
        )
        .bind(product_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?)
    }
}
