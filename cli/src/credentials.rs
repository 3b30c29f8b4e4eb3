use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};

use kcal_core::credentials::CredentialStore;

/// Argon2id password hashing. Stored as a PHC string (`$argon2id$v=19$...`).
#[derive(Default)]
pub struct Argon2Credentials {
    argon2: Argon2<'static>,
}

impl CredentialStore for Argon2Credentials {
    fn hash(&self, candidate: &str) -> kcal_core::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(candidate.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| kcal_core::Error::Credential(e.to_string()))
    }

    fn verify(&self, stored_hash: &str, candidate: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            tracing::warn!("stored credential is not a valid PHC string");
            return false;
        };
        self.argon2
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }
}
