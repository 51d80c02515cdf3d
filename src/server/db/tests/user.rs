use crate::now::{advance_mock_time, current_timestamp};
use crate::server::db::{Database, UserRecord};

pub fn run_user_tests(db: &Database) {
    let now = current_timestamp();
    let users = [mock_user("alice", now), mock_user("bob", now)];

    db.with_transaction(|tx| {
        for user in users.iter() {
            tx.create_user(user).unwrap();
        }
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        for user in users.iter() {
            assert!(tx.is_user_exists(&user.name).unwrap());
            let ret = tx.get_user(&user.name).unwrap();
            assert_eq!(ret, *user);
        }
        assert!(!tx.is_user_exists("nobody").unwrap());
        assert!(tx.get_user("nobody").is_err());

        let list = tx.list_users().unwrap();
        assert_eq!(list.len(), users.len());
        assert_eq!(list[0].name, "alice");
        assert_eq!(list[1].name, "bob");
        Ok(())
    })
    .unwrap();

    let before = db.with_transaction(|tx| tx.get_user("alice")).unwrap();
    advance_mock_time(10);
    db.with_transaction(|tx| {
        tx.update_user_password("alice", "newhash").unwrap();
        tx.update_user_email("alice", "alice@example.com").unwrap();
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        let after = tx.get_user("alice").unwrap();
        assert_eq!(after.hash, "newhash");
        assert_eq!(after.email, "alice@example.com");
        assert_eq!(after.create_time, before.create_time);
        assert!(after.update_time >= before.update_time + 10);
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        tx.delete_user("bob").unwrap();
        assert!(!tx.is_user_exists("bob").unwrap());
        assert!(tx.is_user_exists("alice").unwrap());
        tx.delete_user("alice").unwrap();
        assert!(tx.list_users().unwrap().is_empty());
        Ok(())
    })
    .unwrap();
}

pub fn run_assignment_tests(db: &Database) {
    db.with_transaction(|tx| {
        tx.create_user_role("carol", "editor").unwrap();
        // Duplicate assignment is a no-op
        tx.create_user_role("carol", "editor").unwrap();
        tx.create_user_role("carol", "viewer").unwrap();
        tx.create_user_role("dave", "viewer").unwrap();
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        let roles = tx.list_user_roles("carol").unwrap();
        assert_eq!(roles, vec!["editor".to_string(), "viewer".to_string()]);
        assert_eq!(
            tx.list_user_roles("dave").unwrap(),
            vec!["viewer".to_string()]
        );
        assert!(tx.list_user_roles("nobody").unwrap().is_empty());
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        tx.delete_user_role("carol", "editor").unwrap();
        assert_eq!(
            tx.list_user_roles("carol").unwrap(),
            vec!["viewer".to_string()]
        );
        // Removing an absent assignment is a no-op
        tx.delete_user_role("carol", "editor").unwrap();
        Ok(())
    })
    .unwrap();

    db.with_transaction(|tx| {
        tx.delete_role_users("viewer").unwrap();
        assert!(tx.list_user_roles("carol").unwrap().is_empty());
        assert!(tx.list_user_roles("dave").unwrap().is_empty());
        Ok(())
    })
    .unwrap();
}

fn mock_user(name: &str, now: u64) -> UserRecord {
    UserRecord {
        name: name.to_string(),
        email: format!("{name}@example.com"),
        hash: "hash".to_string(),
        create_time: now,
        update_time: now,
    }
}
