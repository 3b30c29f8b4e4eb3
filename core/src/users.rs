use std::collections::BTreeMap;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    INITIAL_ADMIN_CALORIES_PER_DAY, PublicUser, User, UserUpdate, validate_expected_calories,
    validate_username,
};
use crate::role::Role;
use crate::session::Session;

/// Account management, gated by the role hierarchy.
///
/// An actor may always act on their own account. Acting on another account
/// requires a role above `Regular` that is at least the target's role. The
/// bootstrap admin named by `initial_admin` can never be removed or have its
/// role changed.
pub struct UserDirectory<'a> {
    db: &'a Database,
    initial_admin: &'a str,
}

impl<'a> UserDirectory<'a> {
    #[must_use]
    pub fn new(db: &'a Database, initial_admin: &'a str) -> Self {
        Self { db, initial_admin }
    }

    // --- Outside a session ---

    /// Register a `Regular` account. Open to unauthenticated callers.
    pub fn create(
        &self,
        username: &str,
        hashed_password: &str,
        expected_calories_per_day: i64,
    ) -> Result<PublicUser> {
        validate_username(username)?;
        validate_expected_calories(expected_calories_per_day)?;
        let user = User {
            username: username.to_string(),
            hashed_password: hashed_password.to_string(),
            role: Role::Regular,
            expected_calories_per_day,
        };
        self.db.insert_user(&user)?;
        tracing::info!(username, "user registered");
        Ok(user.to_public())
    }

    /// Provision the bootstrap admin. Returns `None` when it already exists.
    ///
    /// Only called at process start; never reachable from a session.
    pub fn create_initial_admin(&self, hashed_password: &str) -> Result<Option<PublicUser>> {
        if self.db.get_user(self.initial_admin)?.is_some() {
            return Ok(None);
        }
        let user = User {
            username: self.initial_admin.to_string(),
            hashed_password: hashed_password.to_string(),
            role: Role::Admin,
            expected_calories_per_day: INITIAL_ADMIN_CALORIES_PER_DAY,
        };
        self.db.insert_user(&user)?;
        tracing::info!(username = self.initial_admin, "initial admin provisioned");
        Ok(Some(user.to_public()))
    }

    /// Full record including the credential, for authentication only.
    pub fn non_session_read(&self, username: &str) -> Result<Option<User>> {
        self.db.get_user(username)
    }

    // --- Inside a session ---

    pub fn read(&self, session: &Session, username: &str) -> Result<PublicUser> {
        let user = self.check_access(session, username)?;
        Ok(user.to_public())
    }

    /// Every account keyed by username. Requires a role above `Regular`.
    pub fn read_all(&self, session: &Session) -> Result<BTreeMap<String, PublicUser>> {
        if session.role().is_regular() {
            tracing::warn!(actor = session.username(), "denied: global user listing");
            return Err(Error::NotAllowed);
        }
        let users = self.db.list_users()?;
        Ok(users
            .into_iter()
            .map(|u| (u.username.clone(), u.to_public()))
            .collect())
    }

    pub fn remove(&self, session: &Session, username: &str) -> Result<()> {
        if username == self.initial_admin {
            return Err(Error::InitialAdminRole);
        }
        self.check_access(session, username)?;
        if !self.db.delete_user(username)? {
            return Err(Error::UnknownUser);
        }
        tracing::info!(actor = session.username(), username, "user removed");
        Ok(())
    }

    pub fn update(&self, session: &Session, username: &str, update: UserUpdate) -> Result<PublicUser> {
        match update {
            UserUpdate::Password(hash) => {
                self.update_password(session, username, &hash)?;
                self.reload(username)
            }
            UserUpdate::Role(role) => self.update_role(session, username, role),
            UserUpdate::ExpectedCaloriesPerDay(n) => {
                self.update_expected_calories_per_day(session, username, n)
            }
        }
    }

    pub fn update_password(
        &self,
        session: &Session,
        username: &str,
        hashed_password: &str,
    ) -> Result<()> {
        self.check_access(session, username)?;
        if !self.db.update_user_password(username, hashed_password)? {
            return Err(Error::UnknownUser);
        }
        tracing::info!(actor = session.username(), username, "password changed");
        Ok(())
    }

    /// Change `username`'s role. The new role can never exceed the actor's own.
    pub fn update_role(&self, session: &Session, username: &str, new_role: Role) -> Result<PublicUser> {
        if username == self.initial_admin {
            return Err(Error::InitialAdminRole);
        }
        if !session.role().may_grant(new_role) {
            tracing::warn!(
                actor = session.username(),
                role = %session.role(),
                requested = %new_role,
                "denied: role above actor's own"
            );
            return Err(Error::NotAllowed);
        }
        self.check_access(session, username)?;
        if !self.db.update_user_role(username, new_role)? {
            return Err(Error::UnknownUser);
        }
        tracing::info!(actor = session.username(), username, role = %new_role, "role changed");
        self.reload(username)
    }

    pub fn update_expected_calories_per_day(
        &self,
        session: &Session,
        username: &str,
        expected_calories_per_day: i64,
    ) -> Result<PublicUser> {
        validate_expected_calories(expected_calories_per_day)?;
        self.check_access(session, username)?;
        if !self
            .db
            .update_user_expected_calories(username, expected_calories_per_day)?
        {
            return Err(Error::UnknownUser);
        }
        self.reload(username)
    }

    fn reload(&self, username: &str) -> Result<PublicUser> {
        self.db
            .get_user(username)?
            .map(|u| u.to_public())
            .ok_or(Error::UnknownUser)
    }

    /// Gate for reading or modifying a named account. Returns the target.
    fn check_access(&self, session: &Session, username: &str) -> Result<User> {
        let target = self.db.get_user(username)?.ok_or(Error::UnknownUser)?;
        if !session.is(username) && !session.role().may_manage(target.role) {
            tracing::warn!(
                actor = session.username(),
                role = %session.role(),
                target = username,
                target_role = %target.role,
                "denied: insufficient role for another account"
            );
            return Err(Error::NotAllowed);
        }
        Ok(target)
    }
}
