use std::sync::Arc;

use actix_web::web::Query as WebQuery;
use actix_web::HttpRequest;
use log::{error, warn};
use serde::Deserialize;

use crate::now::current_timestamp;
use crate::server::auth::password::CredentialStore;
use crate::server::auth::token::TokenService;
use crate::server::authz::enforcer::Enforcer;
use crate::server::authz::store::PolicyStore;
use crate::server::authz::Decision;
use crate::server::db::Database;
use crate::server::response::{self, Response};
use crate::types::request::{Query, ResourceRequest};
use crate::types::user::{CaniResponse, WhoamiResponse};

use super::resources::dispatch::Dispatcher;
use super::Handler;

/// Query parameters for `GET /api/v1/cani`.
#[derive(Debug, Deserialize)]
struct CaniQuery {
    method: String,
    path: String,
}

/// The gate in front of every protected route. It authenticates the bearer
/// token, answers `whoami`/`cani` introspection directly, authorizes the
/// full request path against the policy store and only then dispatches to a
/// resource handler. Handlers never check permissions themselves.
pub struct ApiHandler {
    tokens: TokenService,
    enforcer: Enforcer,

    dispatcher: Dispatcher,
}

impl ApiHandler {
    pub fn new(
        tokens: TokenService,
        db: Arc<Database>,
        store: PolicyStore,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            tokens,
            enforcer: Enforcer::new(store.clone()),
            dispatcher: Dispatcher::new(db, store, credentials),
        }
    }

    /// Resolves the bearer token to a user name. The precise token error is
    /// logged but never sent to the client.
    fn authenticate(&self, req: &HttpRequest) -> Result<String, Response> {
        let header = match req.headers().get("Authorization") {
            Some(header) => header,
            None => {
                return Err(Response::unauthenticated(
                    "authorization header is required",
                ));
            }
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "));
        let token = match token {
            Some(token) => token,
            None => {
                return Err(Response::unauthenticated(
                    "invalid authorization header format",
                ));
            }
        };

        match self.tokens.validate(token, current_timestamp()) {
            Ok(user) => Ok(user),
            Err(err) => {
                warn!("Rejected token from {:?}: {err}", req.peer_addr());
                Err(Response::unauthenticated("invalid or expired token"))
            }
        }
    }

    /// Splits a path relative to `/api/v1` into the resource name and the
    /// rest. Sub-resource paths like `users/{name}/roles/{role}` keep
    /// everything after the resource as the id.
    fn split_api_path(path: &str) -> (String, Option<String>) {
        let path = path.trim_matches('/');
        match path.split_once('/') {
            Some((resource, id)) => (resource.to_string(), Some(id.to_string())),
            None => (path.to_string(), None),
        }
    }

    fn handle_cani(&self, req: &HttpRequest, user: &str) -> Response {
        let query = match WebQuery::<CaniQuery>::from_query(req.query_string()) {
            Ok(query) => query.into_inner(),
            Err(_) => {
                return Response::bad_request("method and path query parameters are required");
            }
        };

        let method = query.method.to_uppercase();
        match method.as_str() {
            "GET" | "POST" | "PUT" | "DELETE" => {}
            _ => return Response::bad_request("invalid method"),
        }
        if query.path.is_empty() {
            return Response::bad_request("path cannot be empty");
        }

        match self.enforcer.enforce(user, &query.path, &method) {
            Ok(decision) => Response::json(CaniResponse {
                allow: matches!(decision, Decision::Allow),
            }),
            Err(err) => {
                error!("Authorization for cani request failed: {err:#}");
                Response::error(response::AUTHZ_ERROR)
            }
        }
    }
}

impl Handler for ApiHandler {
    fn handle(&self, path: &str, req: HttpRequest, body: Option<Vec<u8>>) -> Response {
        let user = match self.authenticate(&req) {
            Ok(user) => user,
            Err(resp) => return resp,
        };

        let method = req.method().as_str().to_string();
        let (resource, id) = Self::split_api_path(path);

        // Introspection answers right after authentication; neither is ever
        // subject to a policy check.
        if resource == "whoami" {
            if id.is_some() {
                return Response::not_found();
            }
            if method != "GET" {
                return Response::method_not_allowed();
            }
            return Response::json(WhoamiResponse { name: user });
        }
        if resource == "cani" {
            if id.is_some() {
                return Response::not_found();
            }
            if method != "GET" {
                return Response::method_not_allowed();
            }
            return self.handle_cani(&req, &user);
        }

        match self.enforcer.enforce(&user, req.uri().path(), &method) {
            Ok(Decision::Allow) => {}
            Ok(Decision::Deny) => return Response::unauthorized("access denied"),
            Err(err) => {
                error!("Authorization failed: {err:#}");
                return Response::error(response::AUTHZ_ERROR);
            }
        }

        let body = match body {
            Some(data) => match String::from_utf8(data) {
                Ok(json) => Some(json),
                Err(_) => return Response::bad_request("request body must be utf-8"),
            },
            None => None,
        };

        let rsc_req = match method.as_str() {
            "POST" => {
                if id.is_some() {
                    return Response::method_not_allowed();
                }
                match body {
                    Some(body) => ResourceRequest::Post(body),
                    None => return Response::bad_request("request body is required"),
                }
            }
            "GET" => match id {
                Some(id) => ResourceRequest::Get(id),
                None => {
                    let query = match WebQuery::<Query>::from_query(req.query_string()) {
                        Ok(query) => query.into_inner(),
                        Err(_) => return Response::bad_request("invalid query parameters"),
                    };
                    ResourceRequest::List(query)
                }
            },
            "PUT" => match id {
                Some(id) => ResourceRequest::Put(id, body),
                None => return Response::method_not_allowed(),
            },
            "DELETE" => match id {
                Some(id) => ResourceRequest::Delete(id),
                None => return Response::method_not_allowed(),
            },
            _ => return Response::method_not_allowed(),
        };

        self.dispatcher.dispatch(rsc_req, &resource)
    }
}
