use anyhow::Result;
use log::debug;
use rusqlite::{params, params_from_iter, Connection, Transaction};

use crate::now::current_timestamp;
use crate::server::db::ArticleRecord;
use crate::types::request::Query;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS article (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    status INTEGER NOT NULL,
    create_time INTEGER NOT NULL,
    update_time INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_article_title ON article(title);
"#;

pub fn create_article_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

pub fn create_article(tx: &Transaction, mut article: ArticleRecord) -> Result<ArticleRecord> {
    let now = current_timestamp();
    let sql =
        "INSERT INTO article (title, content, status, create_time, update_time) VALUES (?, ?, ?, ?, ?)";
    debug!("Database create_article: {sql}, {}", article.title);
    tx.execute(
        sql,
        params![article.title, article.content, article.status, now, now],
    )?;
    let id = tx.last_insert_rowid() as u64;
    article.id = id;
    article.create_time = now;
    article.update_time = now;
    Ok(article)
}

pub fn get_article(tx: &Transaction, id: u64) -> Result<ArticleRecord> {
    let sql =
        "SELECT id, title, content, status, create_time, update_time FROM article WHERE id = ?";
    debug!("Database get_article: {sql}, {id}");
    let mut stmt = tx.prepare(sql)?;
    let article = stmt.query_row(params![id], |row| {
        Ok(ArticleRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            status: row.get(3)?,
            create_time: row.get(4)?,
            update_time: row.get(5)?,
        })
    })?;
    Ok(article)
}

pub fn is_article_exists(tx: &Transaction, id: u64) -> Result<bool> {
    let sql = "SELECT COUNT(*) FROM article WHERE id = ?";
    let mut stmt = tx.prepare(sql)?;
    let count: i64 = stmt.query_row(params![id], |row| row.get(0))?;
    Ok(count > 0)
}

pub fn list_articles(tx: &Transaction, query: Query) -> Result<Vec<ArticleRecord>> {
    let where_clause = query.generate_where("title");
    let limit_clause = query.generate_limit();
    let params = query.params();

    let sql = format!(
        "SELECT id, title, content, status, create_time, update_time FROM article {where_clause}ORDER BY id DESC {limit_clause}"
    );

    let mut stmt = tx.prepare(&sql)?;
    let articles = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok(ArticleRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                status: row.get(3)?,
                create_time: row.get(4)?,
                update_time: row.get(5)?,
            })
        })?
        .map(|r| r.unwrap())
        .collect::<Vec<_>>();

    Ok(articles)
}

pub fn count_articles(tx: &Transaction, query: &Query) -> Result<usize> {
    let where_clause = query.generate_where("title");
    let params = query.where_params();

    let sql = format!("SELECT COUNT(*) FROM article {where_clause}");

    let mut stmt = tx.prepare(&sql)?;
    let count: i64 = stmt.query_row(params_from_iter(params), |row| row.get(0))?;
    Ok(count as usize)
}

pub fn update_article(tx: &Transaction, article: &ArticleRecord) -> Result<()> {
    let now = current_timestamp();
    let sql = "UPDATE article SET title = ?, content = ?, status = ?, update_time = ? WHERE id = ?";
    debug!("Database update_article: {sql}, {}", article.id);
    tx.execute(
        sql,
        params![
            article.title,
            article.content,
            article.status,
            now,
            article.id
        ],
    )?;
    Ok(())
}

pub fn delete_article(tx: &Transaction, id: u64) -> Result<()> {
    let sql = "DELETE FROM article WHERE id = ?";
    debug!("Database delete_article: {sql}, {id}");
    tx.execute(sql, params![id])?;
    Ok(())
}
