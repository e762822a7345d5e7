//! Category persistence.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, execute_in_tx};
use crate::models::Category;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, StoreError>;

    /// Rename a category; returns rows affected.
    async fn update(&self, category: &Category) -> Result<u64, StoreError>;

    /// Returns rows affected. [`StoreError::MissingReference`] while products
    /// still belong to the category.
    async fn delete(&self, id: Uuid) -> Result<u64, StoreError>;

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Category>, StoreError>;
}

/// PostgreSQL-backed [`CategoryRepository`].
#[derive(Clone)]
pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create(&self, category: &Category) -> Result<(), StoreError> {
        let query = sqlx::query(
            "INSERT INTO categories (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(category.created_at)
        .bind(category.updated_at);
        execute_in_tx(&self.pool, query).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update(&self, category: &Category) -> Result<u64, StoreError> {
        let query = sqlx::query("UPDATE categories SET name = $1, updated_at = $2 WHERE id = $3")
            .bind(&category.name)
            .bind(category.updated_at)
            .bind(category.id);
        execute_in_tx(&self.pool, query).await
    }

    async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        let query = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id);
        execute_in_tx(&self.pool, query).await
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Category>, StoreError> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at, updated_at FROM categories \
             ORDER BY name, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?)
    }
}
