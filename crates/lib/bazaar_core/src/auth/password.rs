//! Password hashing via bcrypt.

use tracing::warn;

use super::AuthError;

/// Lowest and highest cost bcrypt accepts.
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// One-way password hashing with a fixed bcrypt cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Out-of-range costs fall back to [`bcrypt::DEFAULT_COST`].
    pub fn new(cost: u32) -> Self {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            warn!(
                cost,
                default = bcrypt::DEFAULT_COST,
                "bcrypt cost out of range, using default"
            );
            return Self {
                cost: bcrypt::DEFAULT_COST,
            };
        }
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
