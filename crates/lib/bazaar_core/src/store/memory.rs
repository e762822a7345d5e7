//! In-process store implementing every repository trait.
//!
//! Mirrors the PostgreSQL schema closely enough for service and router
//! tests: per-role uniqueness, foreign keys, and delete cascades. A couple
//! of switches inject failures into otherwise healthy operations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    CategoryRepository, IdentityRepository, ImageRepository, ProductRepository, StoreError,
    TokenStore,
};
use crate::models::{Category, Identity, Product, ProductImage, Profile, RefreshTokenRecord, Role};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, Identity>,
    profiles: HashMap<Uuid, Profile>,
    tokens: HashMap<Uuid, RefreshTokenRecord>,
    categories: Vec<Category>,
    products: Vec<Product>,
    images: Vec<ProductImage>,
}

impl Tables {
    fn identity_clash(&self, candidate: &Identity) -> Option<&'static str> {
        self.users
            .values()
            .filter(|u| u.id != candidate.id && u.role == candidate.role)
            .find_map(|u| {
                if u.username == candidate.username {
                    Some("users_user_type_username_key")
                } else if u.email == candidate.email {
                    Some("users_user_type_email_key")
                } else {
                    None
                }
            })
    }
}

/// Shared in-memory tables behind a mutex.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_token_upserts: AtomicBool,
    fail_identity_lookups: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent [`TokenStore::upsert`] fail.
    pub fn fail_token_upserts(&self, fail: bool) {
        self.fail_token_upserts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent username/email lookup fail.
    pub fn fail_identity_lookups(&self, fail: bool) {
        self.fail_identity_lookups.store(fail, Ordering::SeqCst);
    }

    /// Stored password hash, for asserting that failed updates left it alone.
    pub fn password_hash(&self, id: Uuid) -> Option<String> {
        self.lock().users.get(&id).map(|u| u.password_hash.clone())
    }

    /// Drop a user's refresh token row outright.
    pub fn remove_token(&self, user_id: Uuid) {
        self.lock().tokens.remove(&user_id);
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn injected(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<RefreshTokenRecord, StoreError> {
        self.lock()
            .tokens
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn upsert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        self.injected(&self.fail_token_upserts)?;
        let mut tables = self.lock();
        if !tables.users.contains_key(&record.user_id) {
            return Err(StoreError::MissingReference("tokens_user_id_fkey".into()));
        }
        let created_at = tables
            .tokens
            .get(&record.user_id)
            .map_or(record.created_at, |existing| existing.created_at);
        tables.tokens.insert(
            record.user_id,
            RefreshTokenRecord {
                created_at,
                ..record.clone()
            },
        );
        Ok(())
    }

    async fn revoke(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let record = tables.tokens.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        record.revoked = true;
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl IdentityRepository for MemoryStore {
    async fn create(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.users.contains_key(&identity.id) {
            return Err(StoreError::Conflict("users_pkey".into()));
        }
        if let Some(constraint) = tables.identity_clash(identity) {
            return Err(StoreError::Conflict(constraint.into()));
        }
        tables.users.insert(identity.id, identity.clone());
        tables
            .profiles
            .insert(identity.id, Profile::empty(identity.role));
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_username(
        &self,
        role: Role,
        username: &str,
    ) -> Result<Option<Identity>, StoreError> {
        self.injected(&self.fail_identity_lookups)?;
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.role == role && u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<Identity>, StoreError> {
        self.injected(&self.fail_identity_lookups)?;
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.role == role && u.email == email)
            .cloned())
    }

    async fn find_profile(&self, id: Uuid, role: Role) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .lock()
            .profiles
            .get(&id)
            .filter(|p| p.role() == role)
            .cloned())
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let mut updated = tables.users.get(&id).cloned().ok_or(StoreError::NotFound)?;
        updated.username = username.to_string();
        updated.email = email.to_string();
        updated.password_hash = password_hash.to_string();
        updated.updated_at = Utc::now();
        if let Some(constraint) = tables.identity_clash(&updated) {
            return Err(StoreError::Conflict(constraint.into()));
        }
        tables.users.insert(id, updated);
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        profile: &Profile,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(());
        };
        if user.role != profile.role() {
            return Ok(());
        }
        user.updated_at = updated_at;
        tables.profiles.insert(id, profile.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.users.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        tables.profiles.remove(&id);
        tables.tokens.remove(&id);
        let owned: Vec<Uuid> = tables
            .products
            .iter()
            .filter(|p| p.seller_id == id)
            .map(|p| p.id)
            .collect();
        tables.products.retain(|p| p.seller_id != id);
        tables.images.retain(|i| !owned.contains(&i.product_id));
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create(&self, product: &Product) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.users.contains_key(&product.seller_id) {
            return Err(StoreError::MissingReference("products_seller_id_fkey".into()));
        }
        if !tables.categories.iter().any(|c| c.id == product.category_id) {
            return Err(StoreError::MissingReference(
                "products_category_id_fkey".into(),
            ));
        }
        tables.products.push(product.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.lock().products.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Product>, StoreError> {
        Ok(self
            .lock()
            .products
            .iter()
            .find(|p| p.title == title)
            .cloned())
    }

    async fn update(&self, product: &Product) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let Some(stored) = tables
            .products
            .iter_mut()
            .find(|p| p.id == product.id && p.seller_id == product.seller_id)
        else {
            return Ok(0);
        };
        stored.title = product.title.clone();
        stored.description = product.description.clone();
        stored.price = product.price;
        stored.is_active = product.is_active;
        stored.updated_at = product.updated_at;
        Ok(1)
    }

    async fn delete(&self, id: Uuid, seller_id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let before = tables.products.len();
        tables
            .products
            .retain(|p| !(p.id == id && p.seller_id == seller_id));
        let removed = (before - tables.products.len()) as u64;
        if removed > 0 {
            tables.images.retain(|i| i.product_id != id);
        }
        Ok(removed)
    }

    async fn list_by_category(
        &self,
        category_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .lock()
            .products
            .iter()
            .filter(|p| p.category_id == category_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, category: &Category) -> Result<(), StoreError> {
        self.lock().categories.push(category.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(self.lock().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn update(&self, category: &Category) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let Some(stored) = tables.categories.iter_mut().find(|c| c.id == category.id) else {
            return Ok(0);
        };
        stored.name = category.name.clone();
        stored.updated_at = category.updated_at;
        Ok(1)
    }

    async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        if tables.products.iter().any(|p| p.category_id == id) {
            return Err(StoreError::MissingReference(
                "products_category_id_fkey".into(),
            ));
        }
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok((before - tables.categories.len()) as u64)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Category>, StoreError> {
        let mut categories = self.lock().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl ImageRepository for MemoryStore {
    async fn create(&self, image: &ProductImage) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.products.iter().any(|p| p.id == image.product_id) {
            return Err(StoreError::MissingReference(
                "product_images_product_id_fkey".into(),
            ));
        }
        tables.images.push(image.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProductImage>, StoreError> {
        Ok(self.lock().images.iter().find(|i| i.id == id).cloned())
    }

    async fn delete(&self, id: Uuid, seller_id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let owned: Vec<Uuid> = tables
            .products
            .iter()
            .filter(|p| p.seller_id == seller_id)
            .map(|p| p.id)
            .collect();
        let before = tables.images.len();
        tables
            .images
            .retain(|i| !(i.id == id && owned.contains(&i.product_id)));
        Ok((before - tables.images.len()) as u64)
    }

    async fn list_by_product(
        &self,
        product_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProductImage>, StoreError> {
        Ok(self
            .lock()
            .images
            .iter()
            .filter(|i| i.product_id == product_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
