use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;

use crate::now::current_timestamp;
use crate::server::db::{Database, RoleRecord};
use crate::types::user::PolicyRule;

/// Errors policy operations can fail with. Handlers map these onto HTTP
/// status codes; see [`PolicyError::is_not_found`].
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("role '{0}' not found")]
    RoleNotFound(String),

    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("role '{0}' already exists")]
    RoleExists(String),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl PolicyError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RoleNotFound(_) | Self::UserNotFound(_))
    }
}

/// Durable storage for roles, permission rules and user-role assignments.
///
/// Every operation runs in its own transaction, so concurrent admin calls
/// serialize at the database and compound updates (rename, delete) are
/// all-or-nothing. Rules and assignments are pure relations: adding a
/// duplicate or removing an absent one is a no-op, but the user and role
/// rows an operation names must exist.
#[derive(Clone)]
pub struct PolicyStore {
    db: Arc<Database>,
}

impl PolicyStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Grants `role` the permission to perform `method` on paths matching
    /// `path`. Adding an existing rule is a no-op.
    pub fn add_policy(&self, role: &str, path: &str, method: &str) -> Result<(), PolicyError> {
        let mut denied = None;
        self.db.with_transaction(|tx| {
            if !tx.is_role_exists(role)? {
                denied = Some(PolicyError::RoleNotFound(role.to_string()));
                return Ok(());
            }
            tx.create_policy(role, path, method)
        })?;
        finish(denied)
    }

    /// Revokes a permission from `role`. Removing an absent rule is a no-op.
    pub fn remove_policy(&self, role: &str, path: &str, method: &str) -> Result<(), PolicyError> {
        let mut denied = None;
        self.db.with_transaction(|tx| {
            if !tx.is_role_exists(role)? {
                denied = Some(PolicyError::RoleNotFound(role.to_string()));
                return Ok(());
            }
            tx.delete_policy(role, path, method)
        })?;
        finish(denied)
    }

    /// Assigns `role` to `user`. Assignments are additive: existing roles
    /// are kept, and assigning the same role twice is a no-op.
    pub fn assign_role(&self, user: &str, role: &str) -> Result<(), PolicyError> {
        let mut denied = None;
        self.db.with_transaction(|tx| {
            if !tx.is_user_exists(user)? {
                denied = Some(PolicyError::UserNotFound(user.to_string()));
                return Ok(());
            }
            if !tx.is_role_exists(role)? {
                denied = Some(PolicyError::RoleNotFound(role.to_string()));
                return Ok(());
            }
            tx.create_user_role(user, role)
        })?;
        finish(denied)
    }

    /// Removes `role` from `user`. Removing an absent assignment is a no-op.
    pub fn unassign_role(&self, user: &str, role: &str) -> Result<(), PolicyError> {
        let mut denied = None;
        self.db.with_transaction(|tx| {
            if !tx.is_user_exists(user)? {
                denied = Some(PolicyError::UserNotFound(user.to_string()));
                return Ok(());
            }
            if !tx.is_role_exists(role)? {
                denied = Some(PolicyError::RoleNotFound(role.to_string()));
                return Ok(());
            }
            tx.delete_user_role(user, role)
        })?;
        finish(denied)
    }

    /// Names of the roles assigned to `user`.
    pub fn roles_of(&self, user: &str) -> Result<Vec<String>, PolicyError> {
        let mut denied = None;
        let roles = self.db.with_transaction(|tx| {
            if !tx.is_user_exists(user)? {
                denied = Some(PolicyError::UserNotFound(user.to_string()));
                return Ok(vec![]);
            }
            tx.list_user_roles(user)
        })?;
        finish(denied)?;
        Ok(roles)
    }

    /// Permission rules held by `role`.
    pub fn permissions_of(&self, role: &str) -> Result<Vec<PolicyRule>, PolicyError> {
        let mut denied = None;
        let rules = self.db.with_transaction(|tx| {
            if !tx.is_role_exists(role)? {
                denied = Some(PolicyError::RoleNotFound(role.to_string()));
                return Ok(vec![]);
            }
            tx.list_role_policies(role)
        })?;
        finish(denied)?;
        Ok(rules)
    }

    /// Creates a role along with its initial permission rules.
    pub fn create_role(&self, name: &str, rules: &[PolicyRule]) -> Result<(), PolicyError> {
        let mut denied = None;
        self.db.with_transaction(|tx| {
            if tx.is_role_exists(name)? {
                denied = Some(PolicyError::RoleExists(name.to_string()));
                return Ok(());
            }
            let now = current_timestamp();
            tx.create_role(&RoleRecord {
                name: name.to_string(),
                create_time: now,
                update_time: now,
            })?;
            for rule in rules {
                tx.create_policy(name, &rule.path, &rule.method)?;
            }
            Ok(())
        })?;
        finish(denied)
    }

    /// Replaces the full permission rule set of `role`.
    pub fn replace_permissions(&self, role: &str, rules: &[PolicyRule]) -> Result<(), PolicyError> {
        let mut denied = None;
        self.db.with_transaction(|tx| {
            if !tx.is_role_exists(role)? {
                denied = Some(PolicyError::RoleNotFound(role.to_string()));
                return Ok(());
            }
            tx.delete_role_policies(role)?;
            for rule in rules {
                tx.create_policy(role, &rule.path, &rule.method)?;
            }
            tx.update_role_time(role)
        })?;
        finish(denied)
    }

    /// Renames a role. The role row, all its permission rules and all its
    /// assignments move together or not at all.
    pub fn rename_role(&self, old: &str, new: &str) -> Result<(), PolicyError> {
        if old == new {
            return Ok(());
        }
        let mut denied = None;
        self.db.with_transaction(|tx| {
            if !tx.is_role_exists(old)? {
                denied = Some(PolicyError::RoleNotFound(old.to_string()));
                return Ok(());
            }
            if tx.is_role_exists(new)? {
                denied = Some(PolicyError::RoleExists(new.to_string()));
                return Ok(());
            }
            tx.update_role_name(old, new)?;
            tx.update_policy_role(old, new)?;
            tx.update_assignment_role(old, new)
        })?;
        finish(denied)
    }

    /// Deletes a role, stripping every assignment and every permission rule
    /// referencing it in the same transaction.
    pub fn delete_role(&self, name: &str) -> Result<(), PolicyError> {
        let mut denied = None;
        self.db.with_transaction(|tx| {
            if !tx.is_role_exists(name)? {
                denied = Some(PolicyError::RoleNotFound(name.to_string()));
                return Ok(());
            }
            tx.delete_role_users(name)?;
            tx.delete_role_policies(name)?;
            tx.delete_role(name)
        })?;
        finish(denied)
    }

    /// The union of permission rules across all roles of `user`. Unknown
    /// users simply hold no rules; the enforcement path must never 404.
    pub fn rules_for(&self, user: &str) -> Result<Vec<PolicyRule>> {
        self.db.with_transaction(|tx| tx.list_user_policies(user))
    }
}

fn finish(denied: Option<PolicyError>) -> Result<(), PolicyError> {
    match denied {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(path: &str, method: &str) -> PolicyRule {
        PolicyRule {
            path: path.to_string(),
            method: method.to_string(),
        }
    }

    fn test_store() -> PolicyStore {
        let db = Arc::new(Database::new_test());
        let store = PolicyStore::new(db.clone());
        db.with_transaction(|tx| {
            let now = current_timestamp();
            for user in ["alice", "bob"] {
                tx.create_user(&crate::server::db::UserRecord {
                    name: user.to_string(),
                    email: format!("{user}@example.com"),
                    hash: "hash".to_string(),
                    create_time: now,
                    update_time: now,
                })
                .unwrap();
            }
            Ok(())
        })
        .unwrap();
        store
    }

    #[test]
    fn test_policies() {
        let store = test_store();
        store.create_role("editor", &[rule("/api/v1/articles", "GET")]).unwrap();

        store.add_policy("editor", "/api/v1/articles", "POST").unwrap();
        // Adding the same rule again is a no-op
        store.add_policy("editor", "/api/v1/articles", "POST").unwrap();
        assert_eq!(
            store.permissions_of("editor").unwrap(),
            vec![
                rule("/api/v1/articles", "GET"),
                rule("/api/v1/articles", "POST"),
            ]
        );

        // Removing an absent rule is a no-op
        store.remove_policy("editor", "/api/v1/nothing", "GET").unwrap();
        store.remove_policy("editor", "/api/v1/articles", "POST").unwrap();
        assert_eq!(
            store.permissions_of("editor").unwrap(),
            vec![rule("/api/v1/articles", "GET")]
        );

        let err = store.add_policy("ghost", "/api/v1/articles", "GET").unwrap_err();
        assert!(err.is_not_found());
        let err = store.remove_policy("ghost", "/api/v1/articles", "GET").unwrap_err();
        assert!(err.is_not_found());
        let err = store.permissions_of("ghost").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_assignments() {
        let store = test_store();
        store.create_role("editor", &[]).unwrap();
        store.create_role("viewer", &[]).unwrap();

        store.assign_role("alice", "editor").unwrap();
        // Assignments are additive, the first role survives the second
        store.assign_role("alice", "viewer").unwrap();
        store.assign_role("alice", "viewer").unwrap();
        assert_eq!(
            store.roles_of("alice").unwrap(),
            vec!["editor".to_string(), "viewer".to_string()]
        );
        assert!(store.roles_of("bob").unwrap().is_empty());

        store.unassign_role("alice", "editor").unwrap();
        assert_eq!(store.roles_of("alice").unwrap(), vec!["viewer".to_string()]);
        // Removing an absent assignment is a no-op
        store.unassign_role("alice", "editor").unwrap();

        let err = store.assign_role("ghost", "editor").unwrap_err();
        assert!(err.is_not_found());
        let err = store.assign_role("alice", "ghost").unwrap_err();
        assert!(err.is_not_found());
        let err = store.roles_of("ghost").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_role() {
        let store = test_store();
        let rules = [
            rule("/api/v1/articles", "GET"),
            rule("/api/v1/articles/*", "PUT"),
        ];
        store.create_role("editor", &rules).unwrap();
        assert_eq!(store.permissions_of("editor").unwrap(), rules.to_vec());

        let err = store.create_role("editor", &[]).unwrap_err();
        assert!(matches!(err, PolicyError::RoleExists(_)));
        // The failed create must not touch the existing rules
        assert_eq!(store.permissions_of("editor").unwrap(), rules.to_vec());
    }

    #[test]
    fn test_replace_permissions() {
        let store = test_store();
        store.create_role("editor", &[rule("/api/v1/articles", "GET")]).unwrap();

        let rules = [
            rule("/api/v1/articles", "POST"),
            rule("/api/v1/articles/*", "DELETE"),
        ];
        store.replace_permissions("editor", &rules).unwrap();
        assert_eq!(store.permissions_of("editor").unwrap(), rules.to_vec());

        store.replace_permissions("editor", &[]).unwrap();
        assert!(store.permissions_of("editor").unwrap().is_empty());

        let err = store.replace_permissions("ghost", &rules).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rename_role() {
        let store = test_store();
        let rules = [
            rule("/api/v1/articles", "GET"),
            rule("/api/v1/articles/*", "PUT"),
        ];
        store.create_role("editor", &rules).unwrap();
        store.create_role("viewer", &[]).unwrap();
        store.assign_role("alice", "editor").unwrap();

        store.rename_role("editor", "chief").unwrap();

        // The role moved with the exact rule set and its assignments
        assert_eq!(store.permissions_of("chief").unwrap(), rules.to_vec());
        assert_eq!(store.roles_of("alice").unwrap(), vec!["chief".to_string()]);
        let err = store.permissions_of("editor").unwrap_err();
        assert!(err.is_not_found());

        // Renaming to itself is a no-op
        store.rename_role("chief", "chief").unwrap();

        let err = store.rename_role("ghost", "other").unwrap_err();
        assert!(err.is_not_found());
        let err = store.rename_role("chief", "viewer").unwrap_err();
        assert!(matches!(err, PolicyError::RoleExists(_)));
    }

    #[test]
    fn test_delete_role() {
        let store = test_store();
        store.create_role("editor", &[rule("/api/v1/articles", "GET")]).unwrap();
        store.assign_role("alice", "editor").unwrap();

        store.delete_role("editor").unwrap();
        assert!(store.roles_of("alice").unwrap().is_empty());
        assert!(store.rules_for("alice").unwrap().is_empty());
        let err = store.delete_role("editor").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rules_for() {
        let store = test_store();
        store.create_role("editor", &[rule("/api/v1/articles", "GET")]).unwrap();
        store.create_role("auditor", &[rule("/api/v1/articles", "GET"), rule("/api/v1/users", "GET")]).unwrap();
        store.assign_role("alice", "editor").unwrap();
        store.assign_role("alice", "auditor").unwrap();

        // Union across roles, deduplicated
        assert_eq!(
            store.rules_for("alice").unwrap(),
            vec![rule("/api/v1/articles", "GET"), rule("/api/v1/users", "GET")]
        );

        // Unknown users hold no rules, not an error
        assert!(store.rules_for("nobody").unwrap().is_empty());
    }
}
