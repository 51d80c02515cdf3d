use std::sync::Arc;

use anyhow::Result;
use log::debug;

use crate::server::authz::matcher;
use crate::server::authz::store::PolicyStore;
use crate::server::authz::Decision;

/// Answers "may `user` perform `method` on `path`?" against the rules the
/// user holds through role assignments.
///
/// The engine is default-deny: a request is allowed only when at least one
/// rule matches, and a user without roles (or an unknown user) can match
/// nothing. Paths are compared in full, including any mount prefix, so the
/// stored rules must carry complete paths.
#[derive(Clone)]
pub struct Enforcer {
    store: PolicyStore,
}

impl Enforcer {
    pub fn new(store: PolicyStore) -> Self {
        Self { store }
    }

    pub fn enforce(&self, user: &str, path: &str, method: &str) -> Result<Decision> {
        let rules = self.store.rules_for(user)?;
        for rule in rules {
            if rule.method == method && matcher::matches(&rule.path, path) {
                debug!("Authz: allow {method} {path} for {user:?}, matched rule {rule:?}");
                return Ok(Decision::Allow);
            }
        }
        debug!("Authz: deny {method} {path} for {user:?}");
        Ok(Decision::Deny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::now::current_timestamp;
    use crate::server::db::{Database, UserRecord};
    use crate::types::user::PolicyRule;

    fn rule(path: &str, method: &str) -> PolicyRule {
        PolicyRule {
            path: path.to_string(),
            method: method.to_string(),
        }
    }

    fn test_enforcer() -> (Enforcer, PolicyStore) {
        let db = Arc::new(Database::new_test());
        let store = PolicyStore::new(db.clone());
        db.with_transaction(|tx| {
            let now = current_timestamp();
            for user in ["alice", "bob"] {
                tx.create_user(&UserRecord {
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
        (Enforcer::new(store.clone()), store)
    }

    #[test]
    fn test_enforce() {
        let (enforcer, store) = test_enforcer();
        store
            .create_role(
                "editor",
                &[
                    rule("/api/v1/articles", "GET"),
                    rule("/api/v1/articles/*", "PUT"),
                ],
            )
            .unwrap();
        store.assign_role("alice", "editor").unwrap();

        let cases = [
            ("alice", "/api/v1/articles", "GET", Decision::Allow),
            ("alice", "/api/v1/articles/123", "PUT", Decision::Allow),
            ("alice", "/api/v1/articles/abc", "PUT", Decision::Allow),
            // The wildcard requires something after the slash
            ("alice", "/api/v1/articles", "PUT", Decision::Deny),
            // Verbs match exactly
            ("alice", "/api/v1/articles", "POST", Decision::Deny),
            ("alice", "/api/v1/articles/123", "DELETE", Decision::Deny),
            ("alice", "/api/v1/other/1", "PUT", Decision::Deny),
            // Rules carry full paths, a suffix alone matches nothing
            ("alice", "/articles", "GET", Decision::Deny),
        ];
        for (user, path, method, expect) in cases {
            assert_eq!(
                enforcer.enforce(user, path, method).unwrap(),
                expect,
                "{method} {path} for {user}"
            );
        }
    }

    #[test]
    fn test_enforce_no_roles() {
        let (enforcer, store) = test_enforcer();
        store
            .create_role("editor", &[rule("/api/v1/articles", "GET")])
            .unwrap();

        // bob exists but holds no roles; nobody does not exist at all.
        // Both deny everything.
        assert_eq!(
            enforcer.enforce("bob", "/api/v1/articles", "GET").unwrap(),
            Decision::Deny
        );
        assert_eq!(
            enforcer.enforce("nobody", "/api/v1/articles", "GET").unwrap(),
            Decision::Deny
        );
    }

    #[test]
    fn test_enforce_multiple_roles() {
        let (enforcer, store) = test_enforcer();
        store
            .create_role("reader", &[rule("/api/v1/articles", "GET")])
            .unwrap();
        store
            .create_role("writer", &[rule("/api/v1/articles", "POST")])
            .unwrap();
        store.assign_role("alice", "reader").unwrap();
        store.assign_role("alice", "writer").unwrap();

        // Permissions are the union across all assigned roles
        assert_eq!(
            enforcer.enforce("alice", "/api/v1/articles", "GET").unwrap(),
            Decision::Allow
        );
        assert_eq!(
            enforcer.enforce("alice", "/api/v1/articles", "POST").unwrap(),
            Decision::Allow
        );
        assert_eq!(
            enforcer.enforce("alice", "/api/v1/articles", "DELETE").unwrap(),
            Decision::Deny
        );
    }

    #[test]
    fn test_enforce_after_unassign() {
        let (enforcer, store) = test_enforcer();
        store
            .create_role("editor", &[rule("/api/v1/articles", "GET")])
            .unwrap();
        store.assign_role("alice", "editor").unwrap();
        assert_eq!(
            enforcer.enforce("alice", "/api/v1/articles", "GET").unwrap(),
            Decision::Allow
        );

        // Revocation takes effect on the next request
        store.unassign_role("alice", "editor").unwrap();
        assert_eq!(
            enforcer.enforce("alice", "/api/v1/articles", "GET").unwrap(),
            Decision::Deny
        );
    }
}
