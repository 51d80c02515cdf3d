use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, Transaction};

use crate::now::current_timestamp;
use crate::server::db::UserRecord;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    name TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL,
    hash TEXT NOT NULL,
    create_time INTEGER NOT NULL,
    update_time INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS role_assignment (
    user TEXT NOT NULL,
    role TEXT NOT NULL,
    PRIMARY KEY (user, role)
);

CREATE INDEX IF NOT EXISTS idx_role_assignment_user ON role_assignment(user);
CREATE INDEX IF NOT EXISTS idx_role_assignment_role ON role_assignment(role);
"#;

pub fn create_user_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

pub fn create_user(tx: &Transaction, user: &UserRecord) -> Result<()> {
    let sql = "INSERT INTO user (name, email, hash, create_time, update_time) VALUES (?, ?, ?, ?, ?)";
    debug!("Database create_user: {sql}, {}", user.name);
    tx.execute(
        sql,
        params![
            user.name,
            user.email,
            user.hash,
            user.create_time,
            user.update_time
        ],
    )?;
    Ok(())
}

pub fn get_user(tx: &Transaction, name: &str) -> Result<UserRecord> {
    let sql = "SELECT name, email, hash, create_time, update_time FROM user WHERE name = ?";
    debug!("Database get_user: {sql}, {name}");
    let mut stmt = tx.prepare(sql)?;
    let user = stmt.query_row(params![name], |row| {
        Ok(UserRecord {
            name: row.get(0)?,
            email: row.get(1)?,
            hash: row.get(2)?,
            create_time: row.get(3)?,
            update_time: row.get(4)?,
        })
    })?;
    Ok(user)
}

pub fn list_users(tx: &Transaction) -> Result<Vec<UserRecord>> {
    let sql = "SELECT name, email, hash, create_time, update_time FROM user ORDER BY name ASC";
    let mut stmt = tx.prepare(sql)?;
    let users = stmt
        .query_map([], |row| {
            Ok(UserRecord {
                name: row.get(0)?,
                email: row.get(1)?,
                hash: row.get(2)?,
                create_time: row.get(3)?,
                update_time: row.get(4)?,
            })
        })?
        .map(|r| r.unwrap())
        .collect::<Vec<_>>();
    Ok(users)
}

pub fn is_user_exists(tx: &Transaction, name: &str) -> Result<bool> {
    let sql = "SELECT COUNT(*) FROM user WHERE name = ?";
    let mut stmt = tx.prepare(sql)?;
    let count: i64 = stmt.query_row(params![name], |row| row.get(0))?;
    Ok(count > 0)
}

pub fn update_user_password(tx: &Transaction, name: &str, hash: &str) -> Result<()> {
    let now = current_timestamp();
    let sql = "UPDATE user SET hash = ?, update_time = ? WHERE name = ?";
    debug!("Database update_user_password: {sql}, {name}");
    tx.execute(sql, params![hash, now, name])?;
    Ok(())
}

pub fn update_user_email(tx: &Transaction, name: &str, email: &str) -> Result<()> {
    let now = current_timestamp();
    let sql = "UPDATE user SET email = ?, update_time = ? WHERE name = ?";
    debug!("Database update_user_email: {sql}, {name}");
    tx.execute(sql, params![email, now, name])?;
    Ok(())
}

pub fn delete_user(tx: &Transaction, name: &str) -> Result<()> {
    let sql = "DELETE FROM user WHERE name = ?";
    debug!("Database delete_user: {sql}, {name}");
    tx.execute(sql, params![name])?;
    Ok(())
}

pub fn create_user_role(tx: &Transaction, user: &str, role: &str) -> Result<()> {
    // OR IGNORE keeps duplicate assignments a no-op.
    let sql = "INSERT OR IGNORE INTO role_assignment (user, role) VALUES (?, ?)";
    debug!("Database create_user_role: {sql}, {user}, {role}");
    tx.execute(sql, params![user, role])?;
    Ok(())
}

pub fn delete_user_role(tx: &Transaction, user: &str, role: &str) -> Result<()> {
    let sql = "DELETE FROM role_assignment WHERE user = ? AND role = ?";
    debug!("Database delete_user_role: {sql}, {user}, {role}");
    tx.execute(sql, params![user, role])?;
    Ok(())
}

pub fn delete_user_roles(tx: &Transaction, user: &str) -> Result<()> {
    let sql = "DELETE FROM role_assignment WHERE user = ?";
    debug!("Database delete_user_roles: {sql}, {user}");
    tx.execute(sql, params![user])?;
    Ok(())
}

pub fn delete_role_users(tx: &Transaction, role: &str) -> Result<()> {
    let sql = "DELETE FROM role_assignment WHERE role = ?";
    debug!("Database delete_role_users: {sql}, {role}");
    tx.execute(sql, params![role])?;
    Ok(())
}

pub fn list_user_roles(tx: &Transaction, user: &str) -> Result<Vec<String>> {
    let sql = "SELECT role FROM role_assignment WHERE user = ? ORDER BY role ASC";
    let mut stmt = tx.prepare(sql)?;
    let roles = stmt
        .query_map(params![user], |row| row.get(0))?
        .map(|r| r.unwrap())
        .collect::<Vec<String>>();
    Ok(roles)
}

pub fn update_assignment_role(tx: &Transaction, old: &str, new: &str) -> Result<()> {
    let sql = "UPDATE role_assignment SET role = ? WHERE role = ?";
    debug!("Database update_assignment_role: {sql}, {old} -> {new}");
    tx.execute(sql, params![new, old])?;
    Ok(())
}
