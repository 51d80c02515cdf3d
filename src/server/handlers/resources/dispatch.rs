use std::collections::HashMap;
use std::sync::Arc;

use crate::server::auth::password::CredentialStore;
use crate::server::authz::store::PolicyStore;
use crate::server::db::Database;
use crate::server::response::Response;
use crate::types::request::ResourceRequest;

use super::articles::ArticlesHandler;
use super::roles::RolesHandler;
use super::union::UnionResourceHandler;
use super::users::UsersHandler;
use super::ResourceHandler;

/// Routes an authorized resource request to the handler registered for its
/// first path segment. Unknown resources are a 404.
pub struct Dispatcher {
    handlers: HashMap<&'static str, Arc<UnionResourceHandler>>,
}

impl Dispatcher {
    pub fn new(db: Arc<Database>, store: PolicyStore, credentials: CredentialStore) -> Self {
        let mut handlers = HashMap::new();

        // articles
        let handler = ArticlesHandler::new(db.clone());
        let handler = Arc::new(UnionResourceHandler::Articles(handler));
        handlers.insert("articles", handler);

        // users
        let handler = UsersHandler::new(db.clone(), store.clone(), credentials);
        let handler = Arc::new(UnionResourceHandler::Users(handler));
        handlers.insert("users", handler);

        // roles
        let handler = RolesHandler::new(db, store);
        let handler = Arc::new(UnionResourceHandler::Roles(handler));
        handlers.insert("roles", handler);

        Self { handlers }
    }

    pub fn dispatch(&self, rsc_req: ResourceRequest, resource: &str) -> Response {
        let handler = match self.handlers.get(resource) {
            Some(handler) => handler,
            None => return Response::not_found(),
        };

        match rsc_req {
            ResourceRequest::Post(body) => handler.post(body),
            ResourceRequest::Put(id, body) => handler.put(id, body),
            ResourceRequest::List(query) => handler.list(query),
            ResourceRequest::Get(id) => handler.get(id),
            ResourceRequest::Delete(id) => handler.delete(id),
        }
    }
}
