use crate::server::response::Response;
use crate::types::request::Query;

use super::articles::ArticlesHandler;
use super::roles::RolesHandler;
use super::users::UsersHandler;
use super::ResourceHandler;

pub enum UnionResourceHandler {
    Articles(ArticlesHandler),
    Roles(RolesHandler),
    Users(UsersHandler),
}

impl ResourceHandler for UnionResourceHandler {
    fn post(&self, body: String) -> Response {
        match self {
            UnionResourceHandler::Articles(handler) => handler.post(body),
            UnionResourceHandler::Roles(handler) => handler.post(body),
            UnionResourceHandler::Users(handler) => handler.post(body),
        }
    }

    fn put(&self, id: String, body: Option<String>) -> Response {
        match self {
            UnionResourceHandler::Articles(handler) => handler.put(id, body),
            UnionResourceHandler::Roles(handler) => handler.put(id, body),
            UnionResourceHandler::Users(handler) => handler.put(id, body),
        }
    }

    fn list(&self, query: Query) -> Response {
        match self {
            UnionResourceHandler::Articles(handler) => handler.list(query),
            UnionResourceHandler::Roles(handler) => handler.list(query),
            UnionResourceHandler::Users(handler) => handler.list(query),
        }
    }

    fn get(&self, id: String) -> Response {
        match self {
            UnionResourceHandler::Articles(handler) => handler.get(id),
            UnionResourceHandler::Roles(handler) => handler.get(id),
            UnionResourceHandler::Users(handler) => handler.get(id),
        }
    }

    fn delete(&self, id: String) -> Response {
        match self {
            UnionResourceHandler::Articles(handler) => handler.delete(id),
            UnionResourceHandler::Roles(handler) => handler.delete(id),
            UnionResourceHandler::Users(handler) => handler.delete(id),
        }
    }
}
