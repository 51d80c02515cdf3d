use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, Transaction};

use crate::now::current_timestamp;
use crate::server::db::RoleRecord;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS role (
    name TEXT PRIMARY KEY NOT NULL,
    create_time INTEGER NOT NULL,
    update_time INTEGER NOT NULL
);
"#;

pub fn create_role_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

pub fn create_role(tx: &Transaction, role: &RoleRecord) -> Result<()> {
    let sql = "INSERT INTO role (name, create_time, update_time) VALUES (?, ?, ?)";
    debug!("Database create_role: {sql}, {}", role.name);
    tx.execute(sql, params![role.name, role.create_time, role.update_time])?;
    Ok(())
}

pub fn get_role(tx: &Transaction, name: &str) -> Result<RoleRecord> {
    let sql = "SELECT name, create_time, update_time FROM role WHERE name = ?";
    debug!("Database get_role: {sql}, {name}");
    let mut stmt = tx.prepare(sql)?;
    let role = stmt.query_row(params![name], |row| {
        Ok(RoleRecord {
            name: row.get(0)?,
            create_time: row.get(1)?,
            update_time: row.get(2)?,
        })
    })?;
    Ok(role)
}

pub fn list_roles(tx: &Transaction) -> Result<Vec<RoleRecord>> {
    let sql = "SELECT name, create_time, update_time FROM role ORDER BY name ASC";
    let mut stmt = tx.prepare(sql)?;
    let roles = stmt
        .query_map([], |row| {
            Ok(RoleRecord {
                name: row.get(0)?,
                create_time: row.get(1)?,
                update_time: row.get(2)?,
            })
        })?
        .map(|r| r.unwrap())
        .collect::<Vec<_>>();
    Ok(roles)
}

pub fn is_role_exists(tx: &Transaction, name: &str) -> Result<bool> {
    let sql = "SELECT COUNT(*) FROM role WHERE name = ?";
    let mut stmt = tx.prepare(sql)?;
    let count: i64 = stmt.query_row(params![name], |row| row.get(0))?;
    Ok(count > 0)
}

pub fn update_role_name(tx: &Transaction, old: &str, new: &str) -> Result<()> {
    let now = current_timestamp();
    let sql = "UPDATE role SET name = ?, update_time = ? WHERE name = ?";
    debug!("Database update_role_name: {sql}, {old} -> {new}");
    tx.execute(sql, params![new, now, old])?;
    Ok(())
}

pub fn update_role_time(tx: &Transaction, name: &str) -> Result<()> {
    let now = current_timestamp();
    let sql = "UPDATE role SET update_time = ? WHERE name = ?";
    debug!("Database update_role_time: {sql}, {name}");
    tx.execute(sql, params![now, name])?;
    Ok(())
}

pub fn delete_role(tx: &Transaction, name: &str) -> Result<()> {
    let sql = "DELETE FROM role WHERE name = ?";
    debug!("Database delete_role: {sql}, {name}");
    tx.execute(sql, params![name])?;
    Ok(())
}
