use crate::error::AppError;

/// bcrypt hashing at a fixed work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    /// A malformed stored hash is an error, not a mismatch.
    pub fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        Ok(bcrypt::verify(password, password_hash)?)
    }
}
