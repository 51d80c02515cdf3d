mod article;
mod policy;
mod role;
mod user;

pub mod config;
pub mod factory;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection as RawConnection;
use rusqlite::Transaction as RawTransaction;

use crate::types::request::Query;
use crate::types::user::PolicyRule;

use super::{ArticleRecord, Connection, RoleRecord, Transaction, UserRecord};

/// SQLite-based database implementation. This is the simplest database type,
/// perfect for single-node deployments. Supports both file-based and in-memory
/// database types.
pub struct SqliteConnection {
    conn: RawConnection,
}

/// SQLite transaction for executing database operations
pub struct SqliteTransaction<'a> {
    tx: RawTransaction<'a>,
}

impl SqliteConnection {
    /// Opens a SQLite database file. Creates one if it doesn't exist.
    /// Also initializes all required database tables.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = RawConnection::open(path)?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    /// Creates a new in-memory database. Database content will be lost when
    /// the program exits. This method is recommended for testing only.
    pub fn memory() -> Result<Self> {
        let conn = RawConnection::open_in_memory()?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    fn init_tables(db: &RawConnection) -> Result<()> {
        user::create_user_tables(db)?;
        role::create_role_tables(db)?;
        policy::create_policy_tables(db)?;
        article::create_article_tables(db)?;
        Ok(())
    }
}

impl<'a> Connection<'a, SqliteTransaction<'a>> for SqliteConnection {
    fn transaction(&'a mut self) -> Result<SqliteTransaction<'a>> {
        let tx = self.conn.transaction()?;
        Ok(SqliteTransaction { tx })
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn create_user(&self, user: &UserRecord) -> Result<()> {
        user::create_user(&self.tx, user)
    }

    fn get_user(&self, name: &str) -> Result<UserRecord> {
        user::get_user(&self.tx, name)
    }

    fn list_users(&self) -> Result<Vec<UserRecord>> {
        user::list_users(&self.tx)
    }

    fn is_user_exists(&self, name: &str) -> Result<bool> {
        user::is_user_exists(&self.tx, name)
    }

    fn update_user_password(&self, name: &str, hash: &str) -> Result<()> {
        user::update_user_password(&self.tx, name, hash)
    }

    fn update_user_email(&self, name: &str, email: &str) -> Result<()> {
        user::update_user_email(&self.tx, name, email)
    }

    fn delete_user(&self, name: &str) -> Result<()> {
        user::delete_user(&self.tx, name)
    }

    fn create_user_role(&self, user: &str, role: &str) -> Result<()> {
        user::create_user_role(&self.tx, user, role)
    }

    fn delete_user_role(&self, user: &str, role: &str) -> Result<()> {
        user::delete_user_role(&self.tx, user, role)
    }

    fn delete_user_roles(&self, user: &str) -> Result<()> {
        user::delete_user_roles(&self.tx, user)
    }

    fn delete_role_users(&self, role: &str) -> Result<()> {
        user::delete_role_users(&self.tx, role)
    }

    fn list_user_roles(&self, user: &str) -> Result<Vec<String>> {
        user::list_user_roles(&self.tx, user)
    }

    fn update_assignment_role(&self, old: &str, new: &str) -> Result<()> {
        user::update_assignment_role(&self.tx, old, new)
    }

    fn create_role(&self, role: &RoleRecord) -> Result<()> {
        role::create_role(&self.tx, role)
    }

    fn get_role(&self, name: &str) -> Result<RoleRecord> {
        role::get_role(&self.tx, name)
    }

    fn list_roles(&self) -> Result<Vec<RoleRecord>> {
        role::list_roles(&self.tx)
    }

    fn is_role_exists(&self, name: &str) -> Result<bool> {
        role::is_role_exists(&self.tx, name)
    }

    fn update_role_name(&self, old: &str, new: &str) -> Result<()> {
        role::update_role_name(&self.tx, old, new)
    }

    fn update_role_time(&self, name: &str) -> Result<()> {
        role::update_role_time(&self.tx, name)
    }

    fn delete_role(&self, name: &str) -> Result<()> {
        role::delete_role(&self.tx, name)
    }

    fn create_policy(&self, role: &str, path: &str, method: &str) -> Result<()> {
        policy::create_policy(&self.tx, role, path, method)
    }

    fn delete_policy(&self, role: &str, path: &str, method: &str) -> Result<()> {
        policy::delete_policy(&self.tx, role, path, method)
    }

    fn delete_role_policies(&self, role: &str) -> Result<()> {
        policy::delete_role_policies(&self.tx, role)
    }

    fn list_role_policies(&self, role: &str) -> Result<Vec<PolicyRule>> {
        policy::list_role_policies(&self.tx, role)
    }

    fn list_user_policies(&self, user: &str) -> Result<Vec<PolicyRule>> {
        policy::list_user_policies(&self.tx, user)
    }

    fn update_policy_role(&self, old: &str, new: &str) -> Result<()> {
        policy::update_policy_role(&self.tx, old, new)
    }

    fn count_policies(&self) -> Result<usize> {
        policy::count_policies(&self.tx)
    }

    fn create_article(&self, article: ArticleRecord) -> Result<ArticleRecord> {
        article::create_article(&self.tx, article)
    }

    fn get_article(&self, id: u64) -> Result<ArticleRecord> {
        article::get_article(&self.tx, id)
    }

    fn is_article_exists(&self, id: u64) -> Result<bool> {
        article::is_article_exists(&self.tx, id)
    }

    fn list_articles(&self, query: Query) -> Result<Vec<ArticleRecord>> {
        article::list_articles(&self.tx, query)
    }

    fn count_articles(&self, query: &Query) -> Result<usize> {
        article::count_articles(&self.tx, query)
    }

    fn update_article(&self, article: &ArticleRecord) -> Result<()> {
        article::update_article(&self.tx, article)
    }

    fn delete_article(&self, id: u64) -> Result<()> {
        article::delete_article(&self.tx, id)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}
