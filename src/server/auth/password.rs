use anyhow::{Context, Result};
use bcrypt::{hash, verify};

/// Hashes and verifies user passwords with bcrypt. The cost factor comes
/// from server configuration; the salt is embedded in the produced hash.
#[derive(Clone)]
pub struct CredentialStore {
    cost: u32,
}

impl CredentialStore {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    #[cfg(test)]
    pub fn new_test() -> Self {
        // bcrypt's minimum cost (4, private in the crate) keeps hashing fast in tests.
        Self::new(4)
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        hash(password, self.cost).context("hash password")
    }

    /// Returns false for wrong passwords and for hashes bcrypt cannot parse.
    /// The login path treats both the same way.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        verify(password, hash).unwrap_or(false)
    }
}
