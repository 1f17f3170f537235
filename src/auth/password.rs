use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::HashCost;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Argon2id hasher with fixed cost parameters.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Hash of a random throwaway password, built with the same parameters as
    /// real hashes. Verified against when a login names no existing account.
    decoy: String,
}

impl PasswordHasher {
    pub fn new(cost: HashCost) -> Result<Self, String> {
        let params = Params::new(cost.memory_kib, cost.iterations, 1, None)
            .map_err(|e| format!("Invalid params: {e}"))?;
        let mut hasher = Self {
            params,
            decoy: String::new(),
        };
        let throwaway = SaltString::generate(&mut OsRng);
        hasher.decoy = hasher.hash(throwaway.as_str())?;
        Ok(hasher)
    }

    pub fn decoy_hash(&self) -> &str {
        &self.decoy
    }

    /// Spend one full verification on the decoy hash. Always `false`.
    pub fn verify_decoy(&self, password: &str) -> bool {
        std::hint::black_box(self.verify(password, &self.decoy));
        false
    }

    /// Hash a password with a fresh random salt. The result is a PHC string.
    pub fn hash(&self, password: &str) -> Result<String, String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| format!("Hashing failed: {e}"))
    }

    /// Verify a password against a PHC hash string.
    ///
    /// Cost and salt are read from the hash itself, so hashes produced under
    /// older parameters keep verifying. Malformed hashes yield `false`.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("Stored password hash is not a valid PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

pub fn validate_new_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}
