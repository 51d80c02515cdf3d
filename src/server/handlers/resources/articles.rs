use std::sync::Arc;

use log::error;

use crate::expect_json;
use crate::server::db::{ArticleRecord, Database};
use crate::server::response::{self, Response};
use crate::types::article::{Article, PatchArticleRequest};
use crate::types::request::Query;
use crate::types::response::ListResponse;

use super::ResourceHandler;

/// Listing window used when the query does not set a limit.
const DEFAULT_LIST_LIMIT: u64 = 10;

pub struct ArticlesHandler {
    db: Arc<Database>,
}

impl ArticlesHandler {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn parse_id(id: &str) -> Option<u64> {
        id.parse().ok()
    }

    fn convert_record(record: ArticleRecord) -> Article {
        Article {
            id: record.id,
            title: record.title,
            content: record.content,
            status: record.status,
            create_time: record.create_time,
            update_time: record.update_time,
        }
    }
}

impl ResourceHandler for ArticlesHandler {
    fn post(&self, body: String) -> Response {
        let article: Article = expect_json!(body);
        if article.title.is_empty() {
            return Response::bad_request("article title is required");
        }
        if !Article::is_valid_status(article.status) {
            return Response::bad_request("invalid article status");
        }

        let record = ArticleRecord {
            id: 0,
            title: article.title,
            content: article.content,
            status: article.status,
            create_time: 0,
            update_time: 0,
        };
        let result = self.db.with_transaction(|tx| tx.create_article(record));
        match result {
            Ok(record) => Response::json(Self::convert_record(record)),
            Err(err) => {
                error!("Create article database error: {err:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    fn put(&self, id: String, body: Option<String>) -> Response {
        let id = match Self::parse_id(&id) {
            Some(id) => id,
            None => return Response::bad_request("invalid article id"),
        };
        let body = match body {
            Some(body) => body,
            None => return Response::bad_request("request body is required"),
        };

        let patch: PatchArticleRequest = expect_json!(body);
        if patch.title.is_none() && patch.content.is_none() && patch.status.is_none() {
            return Response::bad_request("at least one of title, content, status is required");
        }
        if let Some(ref title) = patch.title {
            if title.is_empty() {
                return Response::bad_request("article title cannot be empty");
            }
        }
        if let Some(status) = patch.status {
            if !Article::is_valid_status(status) {
                return Response::bad_request("invalid article status");
            }
        }

        let mut not_found = false;
        let result = self.db.with_transaction(|tx| {
            if !tx.is_article_exists(id)? {
                not_found = true;
                return Ok(());
            }
            let mut record = tx.get_article(id)?;
            if let Some(title) = patch.title {
                record.title = title;
            }
            if let Some(content) = patch.content {
                record.content = content;
            }
            if let Some(status) = patch.status {
                record.status = status;
            }
            tx.update_article(&record)
        });

        if not_found {
            return Response::not_found();
        }
        match result {
            Ok(()) => Response::ok(),
            Err(err) => {
                error!("Update article database error: {err:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    fn list(&self, mut query: Query) -> Response {
        if query.limit.is_none() {
            query.limit = Some(DEFAULT_LIST_LIMIT);
        }

        let result = self.db.with_transaction(|tx| {
            let total = tx.count_articles(&query)?;
            let records = tx.list_articles(query)?;
            Ok((total, records))
        });

        match result {
            Ok((total, records)) => {
                let items: Vec<Article> = records.into_iter().map(Self::convert_record).collect();
                Response::json(ListResponse { total, items })
            }
            Err(err) => {
                error!("List articles database error: {err:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    fn get(&self, id: String) -> Response {
        let id = match Self::parse_id(&id) {
            Some(id) => id,
            None => return Response::bad_request("invalid article id"),
        };

        let result = self.db.with_transaction(|tx| {
            if !tx.is_article_exists(id)? {
                return Ok(None);
            }
            tx.get_article(id).map(Some)
        });

        match result {
            Ok(Some(record)) => Response::json(Self::convert_record(record)),
            Ok(None) => Response::not_found(),
            Err(err) => {
                error!("Get article database error: {err:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    fn delete(&self, id: String) -> Response {
        let id = match Self::parse_id(&id) {
            Some(id) => id,
            None => return Response::bad_request("invalid article id"),
        };

        let mut not_found = false;
        let result = self.db.with_transaction(|tx| {
            if !tx.is_article_exists(id)? {
                not_found = true;
                return Ok(());
            }
            tx.delete_article(id)
        });

        if not_found {
            return Response::not_found();
        }
        match result {
            Ok(()) => Response::ok(),
            Err(err) => {
                error!("Delete article database error: {err:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }
}
