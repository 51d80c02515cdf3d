mod articles;
mod roles;
mod union;
mod users;

pub mod dispatch;

use log::error;

use crate::server::authz::store::PolicyError;
use crate::server::response::{self, Response};
use crate::types::request::Query;

/// One resource family under `/api/v1`, keyed by the first path segment.
/// The gate has already authenticated and authorized the request when a
/// handler runs; handlers only validate payloads and talk to storage.
pub trait ResourceHandler: Send + Sync {
    fn post(&self, body: String) -> Response;
    fn put(&self, id: String, body: Option<String>) -> Response;
    fn list(&self, query: Query) -> Response;
    fn get(&self, id: String) -> Response;
    fn delete(&self, id: String) -> Response;
}

/// Parses a JSON body into the expected request type, answering 400 when it
/// does not parse.
#[macro_export]
macro_rules! expect_json {
    ($body:expr) => {
        match serde_json::from_str(&$body) {
            Ok(obj) => obj,
            Err(_) => {
                return $crate::server::response::Response::bad_request("invalid json payload");
            }
        }
    };
}

/// Maps a policy store failure onto the wire: missing role or user is 404,
/// name collision 400, anything else 500.
fn policy_error_response(op: &str, err: PolicyError) -> Response {
    if err.is_not_found() {
        return Response::not_found();
    }
    match err {
        err @ PolicyError::RoleExists(_) => Response::bad_request(err.to_string()),
        err => {
            error!("{op} policy store error: {err:#}");
            Response::error(response::DATABASE_ERROR)
        }
    }
}
