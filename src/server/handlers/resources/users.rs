use std::sync::Arc;

use anyhow::Result;
use log::error;

use crate::expect_json;
use crate::server::auth::password::CredentialStore;
use crate::server::authz::store::PolicyStore;
use crate::server::bootstrap::ADMIN_USER;
use crate::server::db::Database;
use crate::server::response::{self, Response};
use crate::types::request::Query;
use crate::types::user::{PatchUserRequest, User};

use super::{policy_error_response, ResourceHandler};

/// Either a plain user name or a `{name}/roles/{role}` assignment path.
enum UserPath {
    Name(String),
    Assignment(String, String),
}

pub struct UsersHandler {
    db: Arc<Database>,
    store: PolicyStore,
    credentials: CredentialStore,
}

impl UsersHandler {
    pub fn new(db: Arc<Database>, store: PolicyStore, credentials: CredentialStore) -> Self {
        Self {
            db,
            store,
            credentials,
        }
    }

    fn parse_path(id: &str) -> Option<UserPath> {
        let parts: Vec<&str> = id.split('/').collect();
        match parts.as_slice() {
            [name] => Some(UserPath::Name(name.to_string())),
            [name, "roles", role] => {
                Some(UserPath::Assignment(name.to_string(), role.to_string()))
            }
            _ => None,
        }
    }

    fn update_user(&self, name: String, body: Option<String>) -> Response {
        if name == ADMIN_USER {
            return Response::unauthorized("cannot modify the admin user");
        }
        let body = match body {
            Some(body) => body,
            None => return Response::bad_request("request body is required"),
        };

        let patch: PatchUserRequest = expect_json!(body);
        if patch.email.is_none() && patch.password.is_none() {
            return Response::bad_request("at least one of email, password is required");
        }
        let hash = match patch.password {
            Some(ref password) => {
                if password.is_empty() {
                    return Response::bad_request("password cannot be empty");
                }
                match self.credentials.hash_password(password) {
                    Ok(hash) => Some(hash),
                    Err(err) => {
                        error!("Update user hash error: {err:#}");
                        return Response::error(response::HASH_ERROR);
                    }
                }
            }
            None => None,
        };

        let mut not_found = false;
        let result: Result<()> = self.db.with_transaction(|tx| {
            if !tx.is_user_exists(&name)? {
                not_found = true;
                return Ok(());
            }
            if let Some(email) = patch.email {
                tx.update_user_email(&name, &email)?;
            }
            if let Some(hash) = hash {
                tx.update_user_password(&name, &hash)?;
            }
            Ok(())
        });

        if not_found {
            return Response::not_found();
        }
        match result {
            Ok(()) => Response::ok(),
            Err(err) => {
                error!("Update user database error: {err:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    fn assign_role(&self, user: &str, role: &str) -> Response {
        match self.store.assign_role(user, role) {
            Ok(()) => Response::ok(),
            Err(err) => policy_error_response("Assign role", err),
        }
    }

    fn unassign_role(&self, user: &str, role: &str) -> Response {
        match self.store.unassign_role(user, role) {
            Ok(()) => Response::ok(),
            Err(err) => policy_error_response("Unassign role", err),
        }
    }
}

impl ResourceHandler for UsersHandler {
    /// Accounts are created through `POST /api/v1/users/register`, never
    /// through the protected resource route.
    fn post(&self, _body: String) -> Response {
        Response::method_not_allowed()
    }

    fn put(&self, id: String, body: Option<String>) -> Response {
        match Self::parse_path(&id) {
            Some(UserPath::Name(name)) => self.update_user(name, body),
            Some(UserPath::Assignment(user, role)) => self.assign_role(&user, &role),
            None => Response::bad_request("invalid users path"),
        }
    }

    fn list(&self, _query: Query) -> Response {
        let records = match self.db.with_transaction(|tx| tx.list_users()) {
            Ok(records) => records,
            Err(err) => {
                error!("List users database error: {err:#}");
                return Response::error(response::DATABASE_ERROR);
            }
        };

        let users: Vec<User> = records
            .into_iter()
            .map(|record| User {
                name: record.name,
                email: record.email,
                create_time: record.create_time,
                update_time: record.update_time,
                roles: Vec::new(),
            })
            .collect();
        Response::json(users)
    }

    fn get(&self, id: String) -> Response {
        let name = id;
        let result: Result<Option<User>> = self.db.with_transaction(|tx| {
            if !tx.is_user_exists(&name)? {
                return Ok(None);
            }
            let record = tx.get_user(&name)?;
            let roles = tx.list_user_roles(&name)?;
            Ok(Some(User {
                name: record.name,
                email: record.email,
                create_time: record.create_time,
                update_time: record.update_time,
                roles,
            }))
        });

        match result {
            Ok(Some(user)) => Response::json(user),
            Ok(None) => Response::not_found(),
            Err(err) => {
                error!("Get user database error: {err:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }

    fn delete(&self, id: String) -> Response {
        let name = match Self::parse_path(&id) {
            Some(UserPath::Name(name)) => name,
            Some(UserPath::Assignment(user, role)) => return self.unassign_role(&user, &role),
            None => return Response::bad_request("invalid users path"),
        };
        if name == ADMIN_USER {
            return Response::unauthorized("cannot delete the admin user");
        }

        let mut not_found = false;
        let result: Result<()> = self.db.with_transaction(|tx| {
            if !tx.is_user_exists(&name)? {
                not_found = true;
                return Ok(());
            }
            tx.delete_user_roles(&name)?;
            tx.delete_user(&name)
        });

        if not_found {
            return Response::not_found();
        }
        match result {
            Ok(()) => Response::ok(),
            Err(err) => {
                error!("Delete user database error: {err:#}");
                Response::error(response::DATABASE_ERROR)
            }
        }
    }
}
