use crate::db::Database;
use crate::error::{Error, Result};
use crate::role::Role;

/// The resolved identity of the actor for one operation.
///
/// Built once per operation by [`Session::establish`] and passed by reference
/// into every check. It holds no connection to storage, so a role change made
/// while an operation runs is only observed by the next operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
    role: Role,
    expected_calories_per_day: i64,
}

impl Session {
    pub fn establish(db: &Database, username: &str) -> Result<Self> {
        let user = db.get_user(username)?.ok_or(Error::UnknownUser)?;
        tracing::debug!(username, role = %user.role, "session established");
        Ok(Self {
            username: user.username,
            role: user.role,
            expected_calories_per_day: user.expected_calories_per_day,
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn expected_calories_per_day(&self) -> i64 {
        self.expected_calories_per_day
    }

    #[must_use]
    pub fn is(&self, username: &str) -> bool {
        self.username == username
    }

    /// Owner-or-admin gate used by every calorie entry operation.
    pub(crate) fn require_owner_or_admin(&self, owner: &str) -> Result<()> {
        if self.is(owner) || self.role.is_admin() {
            return Ok(());
        }
        tracing::warn!(
            actor = %self.username,
            owner,
            role = %self.role,
            "denied: entry belongs to another user"
        );
        Err(Error::NotAllowed)
    }

    #[cfg(test)]
    pub(crate) fn for_test(username: &str, role: Role, expected_calories_per_day: i64) -> Self {
        Self {
            username: username.to_string(),
            role,
            expected_calories_per_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    #[test]
    fn test_establish_known_user() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&User {
            username: "bob".to_string(),
            hashed_password: "hash".to_string(),
            role: Role::UserManager,
            expected_calories_per_day: 1800,
        })
        .unwrap();

        let session = Session::establish(&db, "bob").unwrap();
        assert_eq!(session.username(), "bob");
        assert_eq!(session.role(), Role::UserManager);
        assert_eq!(session.expected_calories_per_day(), 1800);
    }

    #[test]
    fn test_establish_unknown_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            Session::establish(&db, "ghost"),
            Err(Error::UnknownUser)
        ));
    }

    #[test]
    fn test_session_is_a_snapshot() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&User {
            username: "bob".to_string(),
            hashed_password: "hash".to_string(),
            role: Role::Regular,
            expected_calories_per_day: 2000,
        })
        .unwrap();
        let before = Session::establish(&db, "bob").unwrap();
        db.update_user_role("bob", Role::Admin).unwrap();
        assert_eq!(before.role(), Role::Regular);
        assert_eq!(Session::establish(&db, "bob").unwrap().role(), Role::Admin);
    }

    #[test]
    fn test_owner_or_admin() {
        let bob = Session::for_test("bob", Role::Regular, 2000);
        assert!(bob.require_owner_or_admin("bob").is_ok());
        assert!(matches!(
            bob.require_owner_or_admin("alice"),
            Err(Error::NotAllowed)
        ));
        let manager = Session::for_test("mgr", Role::UserManager, 2000);
        assert!(manager.require_owner_or_admin("alice").is_err());
        let admin = Session::for_test("root", Role::Admin, 2000);
        assert!(admin.require_owner_or_admin("alice").is_ok());
    }
}
