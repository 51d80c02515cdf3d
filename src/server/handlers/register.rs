use std::sync::Arc;

use actix_web::HttpRequest;
use log::{error, info};

use crate::expect_json;
use crate::now::current_timestamp;
use crate::server::auth::password::CredentialStore;
use crate::server::bootstrap::DEFAULT_ROLE;
use crate::server::db::{Database, UserRecord};
use crate::server::response::{self, Response};
use crate::types::auth::RegisterRequest;
use crate::types::user::User;

use super::Handler;

/// Creates a new account and grants it the default role, both in one
/// transaction. Anyone may register; permissions beyond the default role
/// are granted by an admin afterwards.
pub struct RegisterHandler {
    db: Arc<Database>,
    credentials: CredentialStore,
}

impl RegisterHandler {
    pub fn new(db: Arc<Database>, credentials: CredentialStore) -> Self {
        Self { db, credentials }
    }
}

impl Handler for RegisterHandler {
    fn handle(&self, _path: &str, req: HttpRequest, body: Option<Vec<u8>>) -> Response {
        let body = match body {
            Some(data) => match String::from_utf8(data) {
                Ok(json) => json,
                Err(_) => return Response::bad_request("request body must be utf-8"),
            },
            None => return Response::bad_request("request body is required"),
        };

        let register: RegisterRequest = expect_json!(body);
        if register.name.is_empty() {
            return Response::bad_request("user name is required");
        }
        // Names become path segments in policy rules and assignment URLs.
        if register.name.contains('/') {
            return Response::bad_request("user name cannot contain '/'");
        }
        if register.password.is_empty() {
            return Response::bad_request("password is required");
        }

        let hash = match self.credentials.hash_password(&register.password) {
            Ok(hash) => hash,
            Err(err) => {
                error!("Hash password for register failed: {err:#}");
                return Response::error(response::HASH_ERROR);
            }
        };

        let now = current_timestamp();
        let mut duplicate = false;
        let result = self.db.with_transaction(|tx| {
            if tx.is_user_exists(&register.name)? {
                duplicate = true;
                return Ok(());
            }

            tx.create_user(&UserRecord {
                name: register.name.clone(),
                email: register.email.clone(),
                hash: hash.clone(),
                create_time: now,
                update_time: now,
            })?;
            tx.create_user_role(&register.name, DEFAULT_ROLE)?;
            Ok(())
        });
        if let Err(err) = result {
            error!("Register user failed: {err:#}");
            return Response::error(response::DATABASE_ERROR);
        }
        if duplicate {
            return Response::bad_request(format!("user '{}' already exists", register.name));
        }

        info!(
            "Registered user '{}' from {:?}",
            register.name,
            req.peer_addr()
        );
        Response::json(User {
            name: register.name,
            email: register.email,
            create_time: now,
            update_time: now,
            roles: vec![DEFAULT_ROLE.to_string()],
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use crate::server::authz::store::PolicyStore;
    use crate::server::handlers::tests::{parse_data, parse_message, status};

    use super::*;

    fn new_handler() -> (RegisterHandler, Arc<Database>) {
        let db = Arc::new(Database::new_test());
        (
            RegisterHandler::new(db.clone(), CredentialStore::new_test()),
            db,
        )
    }

    fn register(handler: &RegisterHandler, body: Option<&str>) -> Response {
        let req = TestRequest::post()
            .uri("/api/v1/users/register")
            .to_http_request();
        handler.handle("", req, body.map(|b| b.as_bytes().to_vec()))
    }

    #[actix_web::test]
    async fn test_register() {
        let (handler, db) = new_handler();

        let resp = register(
            &handler,
            Some(r#"{"name": "alice", "password": "secret", "email": "alice@example.com"}"#),
        );
        let user: User = parse_data(resp).await;
        assert_eq!(user.name, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.roles, vec![DEFAULT_ROLE.to_string()]);

        let record = db.with_transaction(|tx| tx.get_user("alice")).unwrap();
        assert_eq!(record.email, "alice@example.com");
        // The password is stored hashed.
        assert_ne!(record.hash, "secret");

        let store = PolicyStore::new(db);
        assert_eq!(store.roles_of("alice").unwrap(), vec![DEFAULT_ROLE]);
    }

    #[actix_web::test]
    async fn test_duplicate() {
        let (handler, _) = new_handler();

        let body = r#"{"name": "alice", "password": "secret"}"#;
        assert_eq!(status(register(&handler, Some(body))), 200);

        let (code, message) = parse_message(register(&handler, Some(body))).await;
        assert_eq!(code, 400);
        assert_eq!(message, "Bad request: user 'alice' already exists");
    }

    #[actix_web::test]
    async fn test_invalid_requests() {
        let (handler, _) = new_handler();

        assert_eq!(status(register(&handler, None)), 400);
        assert_eq!(status(register(&handler, Some("{"))), 400);
        assert_eq!(
            status(register(&handler, Some(r#"{"name": "", "password": "x"}"#))),
            400
        );
        assert_eq!(
            status(register(
                &handler,
                Some(r#"{"name": "a/b", "password": "x"}"#)
            )),
            400
        );
        assert_eq!(
            status(register(&handler, Some(r#"{"name": "bob", "password": ""}"#))),
            400
        );
    }
}
