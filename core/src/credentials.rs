use crate::error::Result;

/// Hashing and verification of account passwords.
///
/// The core stores and compares only the opaque strings this produces; the
/// boundary layer chooses the scheme. A hashing failure should surface as
/// [`Error::Credential`](crate::Error::Credential).
pub trait CredentialStore: Send + Sync {
    fn hash(&self, candidate: &str) -> Result<String>;
    fn verify(&self, stored_hash: &str, candidate: &str) -> bool;
}
