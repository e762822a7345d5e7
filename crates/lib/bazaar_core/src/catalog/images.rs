//! Product image service.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{CatalogError, IMAGE_PAGE, Page, validate};
use crate::dto::{CreateImageRequest, ImageResponse, ListQuery};
use crate::models::ProductImage;
use crate::store::{ImageRepository, ProductRepository};

pub struct ImageService {
    images: Arc<dyn ImageRepository>,
    products: Arc<dyn ProductRepository>,
}

impl ImageService {
    pub fn new(images: Arc<dyn ImageRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { images, products }
    }

    /// Attach an image to one of `seller_id`'s products.
    pub async fn create(
        &self,
        seller_id: Uuid,
        product_id: Uuid,
        req: CreateImageRequest,
    ) -> Result<ImageResponse, CatalogError> {
        validate("create_image", &req)?;
        let product = self
            .products
            .find_by_id(product_id)
            .await?
            .ok_or(CatalogError::NotFound("product"))?;
        if product.seller_id != seller_id {
            warn!(%product_id, %seller_id, "image upload by non-owner");
            return Err(CatalogError::Forbidden("product"));
        }

        let image = ProductImage {
            id: Uuid::new_v4(),
            product_id,
            url: req.url,
            created_at: Utc::now(),
        };
        self.images.create(&image).await?;
        info!(image_id = %image.id, %product_id, "image created");
        Ok(image.into())
    }

    pub async fn get(&self, id: Uuid) -> Result<ImageResponse, CatalogError> {
        let image = self
            .images
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound("image"))?;
        Ok(image.into())
    }

    /// Delete an image of one of `seller_id`'s products; anything else is a
    /// logged no-op.
    pub async fn delete(&self, seller_id: Uuid, id: Uuid) -> Result<(), CatalogError> {
        let rows = self.images.delete(id, seller_id).await?;
        if rows == 0 {
            warn!(image_id = %id, %seller_id, "image delete affected 0 rows");
        } else {
            info!(image_id = %id, "image deleted");
        }
        Ok(())
    }

    pub async fn list_by_product(
        &self,
        product_id: Uuid,
        query: ListQuery,
    ) -> Result<Vec<ImageResponse>, CatalogError> {
        let page = Page::new(IMAGE_PAGE, query);
        let images = self
            .images
            .list_by_product(product_id, page.limit, page.offset)
            .await?;
        Ok(images.into_iter().map(Into::into).collect())
    }
}
