mod policy;
mod user;

use anyhow::{bail, Result};

use crate::now::current_timestamp;

use super::{Database, UserRecord};

fn run_all_tests(db: &Database) {
    user::run_user_tests(db);
    user::run_assignment_tests(db);

    policy::run_role_tests(db);
    policy::run_policy_tests(db);

    article::run_article_tests(db);
}

#[test]
fn test_sqlite() {
    let db = Database::new_test();
    run_all_tests(&db);
}

#[test]
fn test_rollback() {
    let db = Database::new_test();

    let now = current_timestamp();
    let user = UserRecord {
        name: "frank".to_string(),
        email: "frank@example.com".to_string(),
        hash: "hash".to_string(),
        create_time: now,
        update_time: now,
    };

    let result: Result<()> = db.with_transaction(|tx| {
        tx.create_user(&user)?;
        assert!(tx.is_user_exists("frank")?);
        bail!("something went wrong");
    });
    assert!(result.is_err());

    // The failed transaction must not leave the user behind.
    db.with_transaction(|tx| {
        assert!(!tx.is_user_exists("frank").unwrap());
        Ok(())
    })
    .unwrap();
}
