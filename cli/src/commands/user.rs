use anyhow::Result;

use kcal_core::credentials::CredentialStore;
use kcal_core::models::UserUpdate;
use kcal_core::{CalorieService, Role, Session};

use super::helpers::print_user_table;

pub(crate) fn cmd_register(
    svc: &CalorieService,
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
    target: i64,
    json: bool,
) -> Result<()> {
    let user = svc.register(store, username, password, target)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!(
            "Registered {} ({} kcal/day)",
            user.username, user.expected_calories_per_day
        );
    }
    Ok(())
}

pub(crate) fn cmd_user_show(
    svc: &CalorieService,
    session: &Session,
    username: Option<&str>,
    json: bool,
) -> Result<()> {
    if let Some(username) = username {
        let user = svc.users().read(session, username)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&user)?);
        } else {
            print_user_table(&[&user]);
        }
        return Ok(());
    }

    let users = svc.users().read_all(session)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else if users.is_empty() {
        eprintln!("No users.");
    } else {
        let refs: Vec<_> = users.values().collect();
        print_user_table(&refs);
    }
    Ok(())
}

pub(crate) fn cmd_user_delete(
    svc: &CalorieService,
    session: &Session,
    username: &str,
    json: bool,
) -> Result<()> {
    svc.users().remove(session, username)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": username }));
    } else {
        println!("Deleted user {username}");
    }
    Ok(())
}

/// Turn the optional `user update` flags into a single update, hashing a new password.
fn resolve_update(
    store: &dyn CredentialStore,
    new_password: Option<&str>,
    role: Option<Role>,
    target: Option<i64>,
) -> kcal_core::Result<UserUpdate> {
    if new_password == Some("") {
        return Err(kcal_core::Error::InvalidRequest(
            "password must not be empty".to_string(),
        ));
    }
    let hashed_password = new_password.map(|pw| store.hash(pw)).transpose()?;
    UserUpdate::from_fields(hashed_password, role, target)
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_user_update(
    svc: &CalorieService,
    store: &dyn CredentialStore,
    session: &Session,
    username: &str,
    new_password: Option<&str>,
    role: Option<Role>,
    target: Option<i64>,
    json: bool,
) -> Result<()> {
    let update = resolve_update(store, new_password, role, target)?;
    let user = svc.users().update(session, username, update)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        print_user_table(&[&user]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PlainCredentials;

    impl CredentialStore for PlainCredentials {
        fn hash(&self, candidate: &str) -> kcal_core::Result<String> {
            Ok(format!("plain:{candidate}"))
        }

        fn verify(&self, stored_hash: &str, candidate: &str) -> bool {
            stored_hash.strip_prefix("plain:") == Some(candidate)
        }
    }

    #[test]
    fn test_resolve_update_single_field() {
        assert_eq!(
            resolve_update(&PlainCredentials, Some("pw"), None, None).unwrap(),
            UserUpdate::Password("plain:pw".to_string())
        );
        assert_eq!(
            resolve_update(&PlainCredentials, None, Some(Role::UserManager), None).unwrap(),
            UserUpdate::Role(Role::UserManager)
        );
        assert_eq!(
            resolve_update(&PlainCredentials, None, None, Some(1500)).unwrap(),
            UserUpdate::ExpectedCaloriesPerDay(1500)
        );
    }

    #[test]
    fn test_resolve_update_rejects_zero_or_many() {
        assert!(resolve_update(&PlainCredentials, None, None, None).is_err());
        assert!(resolve_update(&PlainCredentials, Some("pw"), Some(Role::Admin), None).is_err());
        assert!(resolve_update(&PlainCredentials, None, Some(Role::Admin), Some(10)).is_err());
        assert!(resolve_update(&PlainCredentials, Some(""), None, None).is_err());
    }

    #[test]
    fn test_update_through_service() {
        let svc = CalorieService::new_in_memory().unwrap();
        svc.create_initial_admin(&PlainCredentials, "admin").unwrap();
        svc.register(&PlainCredentials, "bob", "pw", 2000).unwrap();
        let admin = svc
            .authenticate(&PlainCredentials, "admin", "admin")
            .unwrap();

        cmd_user_update(
            &svc,
            &PlainCredentials,
            &admin,
            "bob",
            None,
            Some(Role::UserManager),
            None,
            true,
        )
        .unwrap();
        let bob = svc.establish_session("bob").unwrap();
        assert_eq!(bob.role(), Role::UserManager);

        let err = cmd_user_delete(&svc, &admin, "admin", true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<kcal_core::Error>(),
            Some(kcal_core::Error::InitialAdminRole)
        ));
    }
}
