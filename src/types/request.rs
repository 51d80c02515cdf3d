use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// A parsed resource request, produced by the API gate after
/// authentication and authorization and consumed by resource handlers.
#[derive(Debug)]
pub enum ResourceRequest {
    /// POST with a JSON body.
    Post(String),
    /// PUT to an id. Role-assignment paths carry no body, so the body is
    /// optional here and handlers require it where they need one.
    Put(String, Option<String>),
    Get(String),
    List(Query),
    Delete(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub offset: Option<u64>,
    pub limit: Option<u64>,

    pub search: Option<String>,
}

impl Query {
    pub fn generate_where(&self, search: &str) -> String {
        let mut where_clause = vec![];
        if self.search.is_some() {
            where_clause.push(format!("{search} LIKE ?"));
        }
        if where_clause.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {} ", where_clause.join(" AND "))
        }
    }

    pub fn generate_limit(&self) -> &'static str {
        if self.limit.is_some() {
            if self.offset.is_some() {
                "LIMIT ? OFFSET ?"
            } else {
                "LIMIT ?"
            }
        } else {
            ""
        }
    }

    /// Params for a COUNT query: the WHERE placeholders only.
    pub fn where_params(&self) -> Vec<Value> {
        let mut params = vec![];
        if let Some(ref search) = self.search {
            params.push(Value::Text(format!("%{}%", search)));
        }
        params
    }

    pub fn params(self) -> Vec<Value> {
        let mut params = vec![];
        if let Some(search) = self.search {
            params.push(Value::Text(format!("%{}%", search)));
        }
        if let Some(limit) = self.limit {
            params.push(Value::Integer(limit as i64));
        }
        if let Some(offset) = self.offset {
            params.push(Value::Integer(offset as i64));
        }
        params
    }
}
