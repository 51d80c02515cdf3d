pub mod api;
pub mod healthz;
pub mod login;
pub mod register;
pub mod resources;


use actix_web::HttpRequest;

use crate::server::response::Response;

/// A top-level route target. `path` is the request path relative to the
/// route prefix; the full path stays available on the request itself.
pub trait Handler {
    fn handle(&self, path: &str, req: HttpRequest, body: Option<Vec<u8>>) -> Response;
}
