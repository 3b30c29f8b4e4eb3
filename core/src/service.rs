use std::path::Path;

use crate::calories::CalorieLedger;
use crate::credentials::CredentialStore;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{DEFAULT_ADMIN_USERNAME, PublicUser};
use crate::session::Session;
use crate::users::UserDirectory;

pub struct CalorieService {
    db: Database,
    initial_admin: String,
}

impl CalorieService {
    pub fn new(db_path: &Path, initial_admin: impl Into<String>) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self::with_database(db, initial_admin))
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(db, DEFAULT_ADMIN_USERNAME))
    }

    #[must_use]
    pub fn with_database(db: Database, initial_admin: impl Into<String>) -> Self {
        Self {
            db,
            initial_admin: initial_admin.into(),
        }
    }

    #[must_use]
    pub fn initial_admin(&self) -> &str {
        &self.initial_admin
    }

    #[must_use]
    pub fn users(&self) -> UserDirectory<'_> {
        UserDirectory::new(&self.db, &self.initial_admin)
    }

    #[must_use]
    pub fn calories(&self) -> CalorieLedger<'_> {
        CalorieLedger::new(&self.db)
    }

    // --- Sessions ---

    pub fn establish_session(&self, username: &str) -> Result<Session> {
        Session::establish(&self.db, username)
    }

    /// Check `password` against the stored credential and open a session.
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub fn authenticate(
        &self,
        store: &dyn CredentialStore,
        username: &str,
        password: &str,
    ) -> Result<Session> {
        let Some(user) = self.users().non_session_read(username)? else {
            tracing::warn!(username, "login failed: unknown user");
            return Err(Error::InvalidCredentials);
        };
        if !store.verify(&user.hashed_password, password) {
            tracing::warn!(username, "login failed: wrong password");
            return Err(Error::InvalidCredentials);
        }
        self.establish_session(username)
    }

    // --- Accounts outside a session ---

    pub fn register(
        &self,
        store: &dyn CredentialStore,
        username: &str,
        password: &str,
        expected_calories_per_day: i64,
    ) -> Result<PublicUser> {
        if password.is_empty() {
            return Err(Error::InvalidRequest("password must not be empty".to_string()));
        }
        self.users()
            .create(username, &store.hash(password)?, expected_calories_per_day)
    }

    /// Provision the bootstrap admin at process start. A no-op when present.
    pub fn create_initial_admin(
        &self,
        store: &dyn CredentialStore,
        password: &str,
    ) -> Result<Option<PublicUser>> {
        if self.users().non_session_read(&self.initial_admin)?.is_some() {
            return Ok(None);
        }
        self.users().create_initial_admin(&store.hash(password)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalorieQuery, NewCalorieEntry, UserUpdate};
    use crate::role::Role;

    struct MockCredentials;

    impl CredentialStore for MockCredentials {
        fn hash(&self, candidate: &str) -> Result<String> {
            Ok(format!("mock:{candidate}"))
        }

        fn verify(&self, stored_hash: &str, candidate: &str) -> bool {
            stored_hash.strip_prefix("mock:") == Some(candidate)
        }
    }

    fn service() -> CalorieService {
        let svc = CalorieService::new_in_memory().unwrap();
        svc.create_initial_admin(&MockCredentials, "admin-pw").unwrap();
        svc.register(&MockCredentials, "bob", "password", 2000).unwrap();
        svc
    }

    #[test]
    fn test_authenticate() {
        let svc = service();
        let session = svc.authenticate(&MockCredentials, "bob", "password").unwrap();
        assert_eq!(session.username(), "bob");
        assert_eq!(session.role(), Role::Regular);

        assert!(matches!(
            svc.authenticate(&MockCredentials, "bob", "wrong"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            svc.authenticate(&MockCredentials, "nobody", "password"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn test_initial_admin_bootstrap() {
        let svc = service();
        assert!(svc.create_initial_admin(&MockCredentials, "changed").unwrap().is_none());
        let admin = svc.authenticate(&MockCredentials, "admin", "admin-pw").unwrap();
        assert_eq!(admin.role(), Role::Admin);
        assert_eq!(admin.expected_calories_per_day(), 2000);
    }

    #[test]
    fn test_configured_admin_username() {
        let db = Database::open_in_memory().unwrap();
        let svc = CalorieService::with_database(db, "root");
        svc.create_initial_admin(&MockCredentials, "pw").unwrap();
        assert_eq!(svc.initial_admin(), "root");
        let root = svc.authenticate(&MockCredentials, "root", "pw").unwrap();
        assert!(matches!(
            svc.users().remove(&root, "root"),
            Err(Error::InitialAdminRole)
        ));
    }

    #[test]
    fn test_register_rejects_empty_password() {
        let svc = service();
        assert!(matches!(
            svc.register(&MockCredentials, "carol", "", 2000),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_password_change_takes_effect() {
        let svc = service();
        let bob = svc.authenticate(&MockCredentials, "bob", "password").unwrap();
        svc.users()
            .update(&bob, "bob", UserUpdate::Password(MockCredentials.hash("password2").unwrap()))
            .unwrap();
        assert!(svc.authenticate(&MockCredentials, "bob", "password2").is_ok());
        assert!(svc.authenticate(&MockCredentials, "bob", "password").is_err());
    }

    #[test]
    fn test_role_change_seen_by_next_session() {
        let svc = service();
        let admin = svc.establish_session("admin").unwrap();
        let entry = svc
            .calories()
            .create(
                &admin,
                &NewCalorieEntry {
                    username: "admin".to_string(),
                    date: "2020-06-01".to_string(),
                    time: "06:30".to_string(),
                    text: "grapefruit".to_string(),
                    number_of_calories: 42,
                },
            )
            .unwrap();

        let bob = svc.establish_session("bob").unwrap();
        assert!(matches!(
            svc.calories().read(&bob, &CalorieQuery::ById(entry.id)),
            Err(Error::NotAllowed)
        ));

        svc.users().update_role(&admin, "bob", Role::Admin).unwrap();
        // The old session keeps the role it was built with
        assert!(svc.calories().read(&bob, &CalorieQuery::ById(entry.id)).is_err());
        let bob = svc.establish_session("bob").unwrap();
        assert!(svc.calories().read(&bob, &CalorieQuery::ById(entry.id)).is_ok());
    }

    #[test]
    fn test_removed_user_cannot_authenticate() {
        let svc = service();
        let bob = svc.establish_session("bob").unwrap();
        svc.users().remove(&bob, "bob").unwrap();
        assert!(matches!(
            svc.establish_session("bob"),
            Err(Error::UnknownUser)
        ));
        assert!(matches!(
            svc.authenticate(&MockCredentials, "bob", "password"),
            Err(Error::InvalidCredentials)
        ));
    }
}
