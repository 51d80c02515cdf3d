mod sqlite;

#[cfg(test)]
mod tests;

pub mod config;
pub mod factory;

use std::cell::RefCell;
use std::sync::Mutex;

use anyhow::{bail, Result};
use sqlite::{SqliteConnection, SqliteTransaction};

use crate::types::request::Query;
use crate::types::user::PolicyRule;

/// Database connection trait that can create transactions
pub trait Connection<'a, T>
where
    T: Transaction + 'a,
{
    /// Creates a new transaction from the connection
    fn transaction(&'a mut self) -> Result<T>;
}

/// Database transaction trait that defines all database operations
pub trait Transaction {
    // User operations
    /// Creates a new user record
    fn create_user(&self, user: &UserRecord) -> Result<()>;
    /// Retrieves a user by name
    fn get_user(&self, name: &str) -> Result<UserRecord>;
    /// Lists all users, ordered by name
    fn list_users(&self) -> Result<Vec<UserRecord>>;
    /// Checks if a user exists
    fn is_user_exists(&self, name: &str) -> Result<bool>;
    /// Updates user's password hash
    fn update_user_password(&self, name: &str, hash: &str) -> Result<()>;
    /// Updates user's email address
    fn update_user_email(&self, name: &str, email: &str) -> Result<()>;
    /// Deletes a user by name
    fn delete_user(&self, name: &str) -> Result<()>;

    // Role assignment operations
    /// Assigns a role to a user. Assigning the same role twice is a no-op
    fn create_user_role(&self, user: &str, role: &str) -> Result<()>;
    /// Removes a single role from a user
    fn delete_user_role(&self, user: &str, role: &str) -> Result<()>;
    /// Removes all roles from a user
    fn delete_user_roles(&self, user: &str) -> Result<()>;
    /// Removes a role from every user holding it
    fn delete_role_users(&self, role: &str) -> Result<()>;
    /// Lists names of all roles assigned to a user
    fn list_user_roles(&self, user: &str) -> Result<Vec<String>>;
    /// Points every assignment of a role at a new role name
    fn update_assignment_role(&self, old: &str, new: &str) -> Result<()>;

    // Role operations
    /// Creates a new role
    fn create_role(&self, role: &RoleRecord) -> Result<()>;
    /// Retrieves a role by name
    fn get_role(&self, name: &str) -> Result<RoleRecord>;
    /// Lists all roles, ordered by name
    fn list_roles(&self) -> Result<Vec<RoleRecord>>;
    /// Checks if a role exists
    fn is_role_exists(&self, name: &str) -> Result<bool>;
    /// Renames a role row
    fn update_role_name(&self, old: &str, new: &str) -> Result<()>;
    /// Updates role's last update time
    fn update_role_time(&self, name: &str) -> Result<()>;
    /// Deletes a role by name
    fn delete_role(&self, name: &str) -> Result<()>;

    // Policy rule operations
    /// Adds a permission rule to a role. Duplicate rules are a no-op
    fn create_policy(&self, role: &str, path: &str, method: &str) -> Result<()>;
    /// Removes a permission rule. Removing an absent rule is a no-op
    fn delete_policy(&self, role: &str, path: &str, method: &str) -> Result<()>;
    /// Removes all permission rules of a role
    fn delete_role_policies(&self, role: &str) -> Result<()>;
    /// Lists the permission rules of a role
    fn list_role_policies(&self, role: &str) -> Result<Vec<PolicyRule>>;
    /// Lists the union of permission rules across all roles of a user
    fn list_user_policies(&self, user: &str) -> Result<Vec<PolicyRule>>;
    /// Points every rule of a role at a new role name
    fn update_policy_role(&self, old: &str, new: &str) -> Result<()>;
    /// Counts all permission rules
    fn count_policies(&self) -> Result<usize>;

    // Article operations
    /// Creates a new article record, returning it with id and times set
    fn create_article(&self, article: ArticleRecord) -> Result<ArticleRecord>;
    /// Retrieves an article by ID
    fn get_article(&self, id: u64) -> Result<ArticleRecord>;
    /// Checks if an article exists
    fn is_article_exists(&self, id: u64) -> Result<bool>;
    /// Lists articles based on query
    fn list_articles(&self, query: Query) -> Result<Vec<ArticleRecord>>;
    /// Counts articles matching the query filter, ignoring the window
    fn count_articles(&self, query: &Query) -> Result<usize>;
    /// Updates an article's title, content and status
    fn update_article(&self, article: &ArticleRecord) -> Result<()>;
    /// Deletes an article by ID
    fn delete_article(&self, id: u64) -> Result<()>;

    /// Commits the transaction
    fn commit(self) -> Result<()>;
    /// Rolls back the transaction
    fn rollback(self) -> Result<()>;
}

/// Record structure for user information
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    /// User's unique name
    pub name: String,
    /// User's email address
    pub email: String,
    /// Password hash
    pub hash: String,
    /// User creation timestamp
    pub create_time: u64,
    /// Last update timestamp
    pub update_time: u64,
}

/// Record structure for role information
#[derive(Debug, Clone, PartialEq)]
pub struct RoleRecord {
    /// Role's unique name
    pub name: String,
    /// Role creation timestamp
    pub create_time: u64,
    /// Last update timestamp
    pub update_time: u64,
}

/// Record structure for article content
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    /// Unique article ID
    pub id: u64,
    /// Article title
    pub title: String,
    /// Article body
    pub content: String,
    /// Publication status
    pub status: u32,
    /// Creation timestamp
    pub create_time: u64,
    /// Last update timestamp
    pub update_time: u64,
}

/// Main database structure supporting multiple backend implementations
pub struct Database {
    conn: Mutex<RefCell<UnionConnection>>,
}

/// Enum representing different supported database connections
pub enum UnionConnection {
    /// SQLite database connection
    Sqlite(SqliteConnection),
}

enum UnionTransaction<'a> {
    Sqlite(SqliteTransaction<'a>),
}

impl Database {
    pub fn new(conn: UnionConnection) -> Self {
        Self {
            conn: Mutex::new(RefCell::new(conn)),
        }
    }

    #[cfg(test)]
    pub fn new_test() -> Self {
        let conn = SqliteConnection::memory().unwrap();
        Self::new(UnionConnection::Sqlite(conn))
    }

    /// Executes a function within a transaction context.
    ///
    /// - If the function `f` succeeds, the transaction will be committed
    /// - If the function `f` fails (returns an error), the transaction will
    ///   be rolled back
    /// - If the transaction operations (commit/rollback) fail, the error
    ///   will be returned
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Transaction) -> Result<T>,
    {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(e) => bail!("failed to lock connection: {:#}", e),
        };
        let mut conn = conn.borrow_mut();
        let tx = conn.transaction()?;

        let result = f(&tx);

        if result.is_ok() {
            tx.commit()
        } else {
            tx.rollback()
        }?;

        result
    }
}

impl<'a> Connection<'a, UnionTransaction<'a>> for UnionConnection {
    fn transaction(&'a mut self) -> Result<UnionTransaction<'a>> {
        match self {
            UnionConnection::Sqlite(conn) => conn.transaction().map(UnionTransaction::Sqlite),
        }
    }
}

impl Transaction for UnionTransaction<'_> {
    fn create_user(&self, user: &UserRecord) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_user(user),
        }
    }

    fn get_user(&self, name: &str) -> Result<UserRecord> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_user(name),
        }
    }

    fn list_users(&self) -> Result<Vec<UserRecord>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_users(),
        }
    }

    fn is_user_exists(&self, name: &str) -> Result<bool> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.is_user_exists(name),
        }
    }

    fn update_user_password(&self, name: &str, hash: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_user_password(name, hash),
        }
    }

    fn update_user_email(&self, name: &str, email: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_user_email(name, email),
        }
    }

    fn delete_user(&self, name: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_user(name),
        }
    }

    fn create_user_role(&self, user: &str, role: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_user_role(user, role),
        }
    }

    fn delete_user_role(&self, user: &str, role: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_user_role(user, role),
        }
    }

    fn delete_user_roles(&self, user: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_user_roles(user),
        }
    }

    fn delete_role_users(&self, role: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_role_users(role),
        }
    }

    fn list_user_roles(&self, user: &str) -> Result<Vec<String>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_user_roles(user),
        }
    }

    fn update_assignment_role(&self, old: &str, new: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_assignment_role(old, new),
        }
    }

    fn create_role(&self, role: &RoleRecord) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_role(role),
        }
    }

    fn get_role(&self, name: &str) -> Result<RoleRecord> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_role(name),
        }
    }

    fn list_roles(&self) -> Result<Vec<RoleRecord>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_roles(),
        }
    }

    fn is_role_exists(&self, name: &str) -> Result<bool> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.is_role_exists(name),
        }
    }

    fn update_role_name(&self, old: &str, new: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_role_name(old, new),
        }
    }

    fn update_role_time(&self, name: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_role_time(name),
        }
    }

    fn delete_role(&self, name: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_role(name),
        }
    }

    fn create_policy(&self, role: &str, path: &str, method: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_policy(role, path, method),
        }
    }

    fn delete_policy(&self, role: &str, path: &str, method: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_policy(role, path, method),
        }
    }

    fn delete_role_policies(&self, role: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_role_policies(role),
        }
    }

    fn list_role_policies(&self, role: &str) -> Result<Vec<PolicyRule>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_role_policies(role),
        }
    }

    fn list_user_policies(&self, user: &str) -> Result<Vec<PolicyRule>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_user_policies(user),
        }
    }

    fn update_policy_role(&self, old: &str, new: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_policy_role(old, new),
        }
    }

    fn count_policies(&self) -> Result<usize> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.count_policies(),
        }
    }

    fn create_article(&self, article: ArticleRecord) -> Result<ArticleRecord> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_article(article),
        }
    }

    fn get_article(&self, id: u64) -> Result<ArticleRecord> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_article(id),
        }
    }

    fn is_article_exists(&self, id: u64) -> Result<bool> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.is_article_exists(id),
        }
    }

    fn list_articles(&self, query: Query) -> Result<Vec<ArticleRecord>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_articles(query),
        }
    }

    fn count_articles(&self, query: &Query) -> Result<usize> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.count_articles(query),
        }
    }

    fn update_article(&self, article: &ArticleRecord) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_article(article),
        }
    }

    fn delete_article(&self, id: u64) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_article(id),
        }
    }

    fn commit(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.commit(),
        }
    }

    fn rollback(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.rollback(),
        }
    }
}
