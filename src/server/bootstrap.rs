use anyhow::{Context, Result};
use log::{info, warn};

use crate::now::current_timestamp;
use crate::server::auth::password::CredentialStore;
use crate::server::db::{Database, RoleRecord, UserRecord};

/// Name of the superuser account created at startup.
pub const ADMIN_USER: &str = "admin";

/// Role assigned to the admin user at startup.
pub const ADMIN_ROLE: &str = "admin";

/// Role granted to every account created through register.
pub const DEFAULT_ROLE: &str = "user";

/// Admin password used when the config does not set one.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Rules seeded for role `user` when the policy table is empty.
const DEFAULT_USER_RULES: &[(&str, &str)] = &[
    ("/api/v1/articles", "GET"),
    ("/api/v1/articles", "POST"),
    ("/api/v1/articles/*", "GET"),
    ("/api/v1/articles/*", "PUT"),
    ("/api/v1/articles/*", "DELETE"),
];

/// Extra rules seeded for role `admin`, on top of every rule in
/// [`DEFAULT_USER_RULES`].
const DEFAULT_ADMIN_RULES: &[(&str, &str)] = &[
    ("/api/v1/users", "GET"),
    ("/api/v1/users", "POST"),
    ("/api/v1/users/*", "PUT"),
    ("/api/v1/users/*", "DELETE"),
    ("/api/v1/roles", "GET"),
    ("/api/v1/roles", "POST"),
    ("/api/v1/roles/*", "PUT"),
    ("/api/v1/roles/*", "DELETE"),
];

/// Prepares the database for serving, in one transaction: the `admin` and
/// `user` roles, the admin account and its role assignment always exist
/// afterwards. Default policy rules are seeded only when the policy table
/// is empty, so rules edited or deleted by an operator stay that way across
/// restarts.
pub fn bootstrap(db: &Database, credentials: &CredentialStore, admin_password: &str) -> Result<()> {
    if admin_password == DEFAULT_ADMIN_PASSWORD {
        warn!("Admin user has the DEFAULT password '{DEFAULT_ADMIN_PASSWORD}', please set admin_password in the config file");
    }

    let hash = credentials
        .hash_password(admin_password)
        .context("hash admin password")?;

    db.with_transaction(|tx| {
        let now = current_timestamp();

        for role in [ADMIN_ROLE, DEFAULT_ROLE] {
            if !tx.is_role_exists(role)? {
                info!("Creating role '{role}'");
                tx.create_role(&RoleRecord {
                    name: role.to_string(),
                    create_time: now,
                    update_time: now,
                })?;
            }
        }

        if !tx.is_user_exists(ADMIN_USER)? {
            info!("Creating user '{ADMIN_USER}'");
            tx.create_user(&UserRecord {
                name: ADMIN_USER.to_string(),
                email: String::new(),
                hash,
                create_time: now,
                update_time: now,
            })?;
        }

        if tx.count_policies()? == 0 {
            info!("Policy table is empty, seeding default rules");
            for (path, method) in DEFAULT_USER_RULES {
                tx.create_policy(DEFAULT_ROLE, path, method)?;
                tx.create_policy(ADMIN_ROLE, path, method)?;
            }
            for (path, method) in DEFAULT_ADMIN_RULES {
                tx.create_policy(ADMIN_ROLE, path, method)?;
            }
        }

        tx.create_user_role(ADMIN_USER, ADMIN_ROLE)
    })
    .context("bootstrap database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap() {
        let db = Database::new_test();
        let credentials = CredentialStore::new_test();
        bootstrap(&db, &credentials, "test123").unwrap();

        db.with_transaction(|tx| {
            assert!(tx.is_role_exists(ADMIN_ROLE)?);
            assert!(tx.is_role_exists(DEFAULT_ROLE)?);
            assert!(tx.is_user_exists(ADMIN_USER)?);
            assert_eq!(tx.list_user_roles(ADMIN_USER)?, vec![ADMIN_ROLE]);
            assert_eq!(
                tx.count_policies()?,
                DEFAULT_USER_RULES.len() * 2 + DEFAULT_ADMIN_RULES.len()
            );
            Ok(())
        })
        .unwrap();

        let record = db.with_transaction(|tx| tx.get_user(ADMIN_USER)).unwrap();
        assert!(credentials.verify_password("test123", &record.hash));
        assert!(!credentials.verify_password("other", &record.hash));
    }

    #[test]
    fn test_bootstrap_idempotent() {
        let db = Database::new_test();
        let credentials = CredentialStore::new_test();
        bootstrap(&db, &credentials, "test123").unwrap();
        bootstrap(&db, &credentials, "test123").unwrap();

        db.with_transaction(|tx| {
            assert_eq!(
                tx.count_policies()?,
                DEFAULT_USER_RULES.len() * 2 + DEFAULT_ADMIN_RULES.len()
            );
            assert_eq!(tx.list_user_roles(ADMIN_USER)?, vec![ADMIN_ROLE]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_bootstrap_keeps_operator_edits() {
        let db = Database::new_test();
        let credentials = CredentialStore::new_test();
        bootstrap(&db, &credentials, "test123").unwrap();

        db.with_transaction(|tx| tx.delete_policy(DEFAULT_ROLE, "/api/v1/articles", "POST"))
            .unwrap();

        // The policy table is not empty anymore, so the deleted rule must
        // not come back.
        bootstrap(&db, &credentials, "test123").unwrap();
        db.with_transaction(|tx| {
            assert_eq!(
                tx.count_policies()?,
                DEFAULT_USER_RULES.len() * 2 + DEFAULT_ADMIN_RULES.len() - 1
            );
            Ok(())
        })
        .unwrap();
    }
}
