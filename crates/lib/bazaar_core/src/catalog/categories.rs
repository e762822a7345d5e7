//! Category service.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{CATEGORY_PAGE, CatalogError, Page, validate};
use crate::dto::{CategoryRequest, CategoryResponse, ListQuery};
use crate::models::Category;
use crate::store::{CategoryRepository, StoreError};

pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self { categories }
    }

    pub async fn create(&self, req: CategoryRequest) -> Result<CategoryResponse, CatalogError> {
        validate("create_category", &req)?;
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: req.name,
            created_at: now,
            updated_at: now,
        };
        self.categories.create(&category).await?;
        info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category.into())
    }

    pub async fn get(&self, id: Uuid) -> Result<CategoryResponse, CatalogError> {
        let category = self
            .categories
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound("category"))?;
        Ok(category.into())
    }

    /// Rename a category and return the stored row.
    ///
    /// `None` when no category has that id; the miss is logged, not reported.
    pub async fn update(
        &self,
        id: Uuid,
        req: CategoryRequest,
    ) -> Result<Option<CategoryResponse>, CatalogError> {
        validate("update_category", &req)?;
        let now = Utc::now();
        let category = Category {
            id,
            name: req.name,
            created_at: now,
            updated_at: now,
        };
        let rows = self.categories.update(&category).await?;
        if rows == 0 {
            warn!(category_id = %id, "category update affected 0 rows");
            return Ok(None);
        }
        info!(category_id = %id, "category updated");
        Ok(self.categories.find_by_id(id).await?.map(Into::into))
    }

    /// Delete an empty category. Categories that still hold products are
    /// [`CatalogError::InUse`].
    pub async fn delete(&self, id: Uuid) -> Result<(), CatalogError> {
        let rows = self.categories.delete(id).await.map_err(|e| match e {
            StoreError::MissingReference(_) => {
                warn!(category_id = %id, "category delete rejected: products remain");
                CatalogError::InUse("category")
            }
            other => CatalogError::Repository(other),
        })?;
        if rows == 0 {
            warn!(category_id = %id, "category delete affected 0 rows");
        } else {
            info!(category_id = %id, "category deleted");
        }
        Ok(())
    }

    pub async fn list(&self, query: ListQuery) -> Result<Vec<CategoryResponse>, CatalogError> {
        let page = Page::new(CATEGORY_PAGE, query);
        let categories = self.categories.list(page.limit, page.offset).await?;
        Ok(categories.into_iter().map(Into::into).collect())
    }
}
