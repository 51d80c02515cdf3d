use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, Transaction};

use crate::types::user::PolicyRule;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS policy_rule (
    role TEXT NOT NULL,
    path TEXT NOT NULL,
    method TEXT NOT NULL,
    PRIMARY KEY (role, path, method)
);

CREATE INDEX IF NOT EXISTS idx_policy_rule_role ON policy_rule(role);
"#;

pub fn create_policy_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

pub fn create_policy(tx: &Transaction, role: &str, path: &str, method: &str) -> Result<()> {
    // OR IGNORE keeps duplicate rules a no-op.
    let sql = "INSERT OR IGNORE INTO policy_rule (role, path, method) VALUES (?, ?, ?)";
    debug!("Database create_policy: {sql}, {role}, {path}, {method}");
    tx.execute(sql, params![role, path, method])?;
    Ok(())
}

pub fn delete_policy(tx: &Transaction, role: &str, path: &str, method: &str) -> Result<()> {
    let sql = "DELETE FROM policy_rule WHERE role = ? AND path = ? AND method = ?";
    debug!("Database delete_policy: {sql}, {role}, {path}, {method}");
    tx.execute(sql, params![role, path, method])?;
    Ok(())
}

pub fn delete_role_policies(tx: &Transaction, role: &str) -> Result<()> {
    let sql = "DELETE FROM policy_rule WHERE role = ?";
    debug!("Database delete_role_policies: {sql}, {role}");
    tx.execute(sql, params![role])?;
    Ok(())
}

pub fn list_role_policies(tx: &Transaction, role: &str) -> Result<Vec<PolicyRule>> {
    let sql = "SELECT path, method FROM policy_rule WHERE role = ? ORDER BY path ASC, method ASC";
    let mut stmt = tx.prepare(sql)?;
    let rules = stmt
        .query_map(params![role], |row| {
            Ok(PolicyRule {
                path: row.get(0)?,
                method: row.get(1)?,
            })
        })?
        .map(|r| r.unwrap())
        .collect::<Vec<_>>();
    Ok(rules)
}

pub fn list_user_policies(tx: &Transaction, user: &str) -> Result<Vec<PolicyRule>> {
    let sql = r#"
    SELECT DISTINCT p.path, p.method FROM policy_rule p
    JOIN role_assignment a ON a.role = p.role
    WHERE a.user = ?
    ORDER BY p.path ASC, p.method ASC
    "#;
    let mut stmt = tx.prepare(sql)?;
    let rules = stmt
        .query_map(params![user], |row| {
            Ok(PolicyRule {
                path: row.get(0)?,
                method: row.get(1)?,
            })
        })?
        .map(|r| r.unwrap())
        .collect::<Vec<_>>();
    Ok(rules)
}

pub fn update_policy_role(tx: &Transaction, old: &str, new: &str) -> Result<()> {
    let sql = "UPDATE policy_rule SET role = ? WHERE role = ?";
    debug!("Database update_policy_role: {sql}, {old} -> {new}");
    tx.execute(sql, params![new, old])?;
    Ok(())
}

pub fn count_policies(tx: &Transaction) -> Result<usize> {
    let sql = "SELECT COUNT(*) FROM policy_rule";
    let mut stmt = tx.prepare(sql)?;
    let count: i64 = stmt.query_row([], |row| row.get(0))?;
    Ok(count as usize)
}
