use crate::now::{advance_mock_time, current_timestamp};
use crate::server::db::{Database, RoleRecord};
use crate::types::user::PolicyRule;

pub fn run_role_tests(db: &Database) {
    let now = current_timestamp();
    let roles = [mock_role("publisher", now), mock_role("reporter", now)];

    db.with_transaction(|tx| {
        for role in roles.iter() {
            tx.create_role(role).unwrap();
        }
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        for role in roles.iter() {
            assert!(tx.is_role_exists(&role.name).unwrap());
            let ret = tx.get_role(&role.name).unwrap();
            assert_eq!(ret, *role);
        }
        assert!(!tx.is_role_exists("nothing").unwrap());
        assert!(tx.get_role("nothing").is_err());

        let list = tx.list_roles().unwrap();
        assert_eq!(list.len(), roles.len());
        assert_eq!(list[0].name, "publisher");
        assert_eq!(list[1].name, "reporter");
        Ok(())
    })
    .unwrap();

    advance_mock_time(10);
    db.with_transaction(|tx| {
        tx.update_role_name("reporter", "journalist").unwrap();
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        assert!(!tx.is_role_exists("reporter").unwrap());
        let ret = tx.get_role("journalist").unwrap();
        assert_eq!(ret.create_time, now);
        assert!(ret.update_time >= now + 10);
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        tx.delete_role("publisher").unwrap();
        tx.delete_role("journalist").unwrap();
        assert!(tx.list_roles().unwrap().is_empty());
        Ok(())
    })
    .unwrap();
}

pub fn run_policy_tests(db: &Database) {
    db.with_transaction(|tx| {
        assert_eq!(tx.count_policies().unwrap(), 0);
        tx.create_policy("editor", "/api/v1/articles", "GET").unwrap();
        tx.create_policy("editor", "/api/v1/articles", "POST").unwrap();
        tx.create_policy("editor", "/api/v1/articles/*", "PUT").unwrap();
        tx.create_policy("auditor", "/api/v1/articles", "GET").unwrap();
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        // Duplicate rule is a no-op
        tx.create_policy("editor", "/api/v1/articles", "GET").unwrap();
        assert_eq!(tx.count_policies().unwrap(), 4);

        let rules = tx.list_role_policies("editor").unwrap();
        assert_eq!(
            rules,
            vec![
                mock_rule("/api/v1/articles", "GET"),
                mock_rule("/api/v1/articles", "POST"),
                mock_rule("/api/v1/articles/*", "PUT"),
            ]
        );
        assert!(tx.list_role_policies("nothing").unwrap().is_empty());
        Ok(())
    })
    .unwrap();

    // Union across roles, deduplicated
    db.with_transaction(|tx| {
        tx.create_user_role("erin", "editor").unwrap();
        tx.create_user_role("erin", "auditor").unwrap();
        let rules = tx.list_user_policies("erin").unwrap();
        assert_eq!(
            rules,
            vec![
                mock_rule("/api/v1/articles", "GET"),
                mock_rule("/api/v1/articles", "POST"),
                mock_rule("/api/v1/articles/*", "PUT"),
            ]
        );
        assert!(tx.list_user_policies("nobody").unwrap().is_empty());
        Ok(())
    })
    .unwrap();

    // Renaming a role moves its rules and assignments
    db.with_transaction(|tx| {
        tx.update_policy_role("editor", "chief").unwrap();
        assert!(tx.list_role_policies("editor").unwrap().is_empty());
        assert_eq!(tx.list_role_policies("chief").unwrap().len(), 3);

        tx.update_assignment_role("editor", "chief").unwrap();
        let roles = tx.list_user_roles("erin").unwrap();
        assert_eq!(roles, vec!["auditor".to_string(), "chief".to_string()]);
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        // Removing an absent rule is a no-op
        tx.delete_policy("chief", "/api/v1/nothing", "GET").unwrap();
        assert_eq!(tx.count_policies().unwrap(), 4);

        tx.delete_policy("chief", "/api/v1/articles", "GET").unwrap();
        assert_eq!(tx.count_policies().unwrap(), 3);
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        tx.delete_role_policies("chief").unwrap();
        tx.delete_role_policies("auditor").unwrap();
        tx.delete_user_roles("erin").unwrap();
        assert_eq!(tx.count_policies().unwrap(), 0);
        Ok(())
    })
    .unwrap();
}

fn mock_role(name: &str, now: u64) -> RoleRecord {
    RoleRecord {
        name: name.to_string(),
        create_time: now,
        update_time: now,
    }
}

fn mock_rule(path: &str, method: &str) -> PolicyRule {
    PolicyRule {
        path: path.to_string(),
        method: method.to_string(),
    }
}
