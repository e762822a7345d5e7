//! Identity and profile persistence.
//!
//! Lookups by username or email are scoped to a role by joining the role's
//! profile table, so the same username may exist once per role.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{StoreError, finish};
use crate::models::{CustomerProfile, Identity, Profile, Role, SellerProfile};

/// Identity repository.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Insert the identity and an empty profile row of its role atomically.
    async fn create(&self, identity: &Identity) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    async fn find_by_username(
        &self,
        role: Role,
        username: &str,
    ) -> Result<Option<Identity>, StoreError>;

    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_profile(&self, id: Uuid, role: Role) -> Result<Option<Profile>, StoreError>;

    /// Overwrite username, email and password hash; [`StoreError::NotFound`]
    /// when no identity has that id.
    async fn update_credentials(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), StoreError>;

    /// Replace the profile row and touch the identity's `updated_at` in one
    /// transaction.
    async fn update_profile(
        &self,
        id: Uuid,
        profile: &Profile,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Delete the identity; profile and token rows cascade.
    /// [`StoreError::NotFound`] when nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Raw `users` row.
#[derive(Debug, sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    user_type: String,
    username: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = StoreError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        let role = row
            .user_type
            .parse::<Role>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Identity {
            id: row.id,
            role,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_IDENTITY: &str = "SELECT u.id, u.user_type, u.username, u.email, u.password_hash, \
     u.created_at, u.updated_at FROM users u";

/// Column an identity can be looked up by.
#[derive(Clone, Copy)]
enum LookupColumn {
    Username,
    Email,
}

impl LookupColumn {
    fn as_str(self) -> &'static str {
        match self {
            LookupColumn::Username => "username",
            LookupColumn::Email => "email",
        }
    }
}

fn profile_table(role: Role) -> &'static str {
    match role {
        Role::Customer => "customers",
        Role::Seller => "sellers",
    }
}

/// PostgreSQL-backed [`IdentityRepository`].
#[derive(Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lookup(
        &self,
        role: Role,
        column: LookupColumn,
        value: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let sql = format!(
            "{SELECT_IDENTITY} JOIN {table} p ON p.user_id = u.id WHERE u.{column} = $1",
            table = profile_table(role),
            column = column.as_str(),
        );
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Identity::try_from).transpose()
    }
}

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn create(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result: Result<(), StoreError> = async {
            sqlx::query(
                "INSERT INTO users (id, user_type, username, email, password_hash, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(identity.id)
            .bind(identity.role.as_str())
            .bind(&identity.username)
            .bind(&identity.email)
            .bind(&identity.password_hash)
            .bind(identity.created_at)
            .bind(identity.updated_at)
            .execute(&mut *tx)
            .await?;

            let sql = format!(
                "INSERT INTO {} (user_id) VALUES ($1)",
                profile_table(identity.role)
            );
            sqlx::query(&sql).bind(identity.id).execute(&mut *tx).await?;
            Ok(())
        }
        .await;
        finish(tx, result).await?;

        info!(user_id = %identity.id, role = %identity.role, "identity created");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let sql = format!("{SELECT_IDENTITY} WHERE u.id = $1");
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Identity::try_from).transpose()
    }

    async fn find_by_username(
        &self,
        role: Role,
        username: &str,
    ) -> Result<Option<Identity>, StoreError> {
        self.lookup(role, LookupColumn::Username, username).await
    }

    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<Identity>, StoreError> {
        self.lookup(role, LookupColumn::Email, email).await
    }

    async fn find_profile(&self, id: Uuid, role: Role) -> Result<Option<Profile>, StoreError> {
        match role {
            Role::Customer => {
                let row = sqlx::query_as::<
                    _,
                    (
                        Option<String>,
                        Option<String>,
                        Option<String>,
                        Option<NaiveDate>,
                        Option<String>,
                    ),
                >(
                    "SELECT phone, first_name, last_name, date_birth, address \
                     FROM customers WHERE user_id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
                Ok(row.map(|(phone, first_name, last_name, date_birth, address)| {
                    Profile::Customer(CustomerProfile {
                        phone,
                        first_name,
                        last_name,
                        date_birth,
                        address,
                    })
                }))
            }
            Role::Seller => {
                let row = sqlx::query_as::<_, (Option<String>, Option<f64>)>(
                    "SELECT company_name, rating FROM sellers WHERE user_id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
                Ok(row.map(|(company_name, rating)| {
                    Profile::Seller(SellerProfile {
                        company_name,
                        rating,
                    })
                }))
            }
        }
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET username = $1, email = $2, password_hash = $3, updated_at = now() \
             WHERE id = $4",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(user_id = %id, "credential update affected 0 rows");
            return Err(StoreError::NotFound);
        }
        info!(user_id = %id, "credentials updated");
        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        profile: &Profile,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result: Result<(), StoreError> = async {
            match profile {
                Profile::Customer(c) => {
                    sqlx::query(
                        "UPDATE customers SET phone = $1, first_name = $2, last_name = $3, \
                         date_birth = $4, address = $5 WHERE user_id = $6",
                    )
                    .bind(&c.phone)
                    .bind(&c.first_name)
                    .bind(&c.last_name)
                    .bind(c.date_birth)
                    .bind(&c.address)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
                Profile::Seller(s) => {
                    sqlx::query(
                        "UPDATE sellers SET company_name = $1, rating = $2 WHERE user_id = $3",
                    )
                    .bind(&s.company_name)
                    .bind(s.rating)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            sqlx::query("UPDATE users SET updated_at = $1 WHERE id = $2")
                .bind(updated_at)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Ok(())
        }
        .await;
        finish(tx, result).await?;

        info!(user_id = %id, role = %profile.role(), "profile updated");
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result: Result<(), StoreError> = async {
            let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        }
        .await;
        finish(tx, result).await?;

        info!(user_id = %id, "identity deleted");
        Ok(())
    }
}
