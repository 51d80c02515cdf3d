use std::sync::Arc;

use actix_web::HttpRequest;
use log::{error, info};

use crate::expect_json;
use crate::now::current_timestamp;
use crate::server::auth::password::CredentialStore;
use crate::server::auth::token::TokenService;
use crate::server::db::Database;
use crate::server::response::{self, Response};
use crate::types::auth::LoginRequest;

use super::Handler;

/// Exchanges a name and password for a bearer token. Whether the name or
/// the password was wrong is never revealed to the client.
pub struct LoginHandler {
    db: Arc<Database>,
    credentials: CredentialStore,
    tokens: TokenService,
}

impl LoginHandler {
    pub fn new(db: Arc<Database>, credentials: CredentialStore, tokens: TokenService) -> Self {
        Self {
            db,
            credentials,
            tokens,
        }
    }
}

impl Handler for LoginHandler {
    fn handle(&self, _path: &str, req: HttpRequest, body: Option<Vec<u8>>) -> Response {
        let body = match body {
            Some(data) => match String::from_utf8(data) {
                Ok(json) => json,
                Err(_) => return Response::bad_request("request body must be utf-8"),
            },
            None => return Response::bad_request("request body is required"),
        };

        let login: LoginRequest = expect_json!(body);
        if login.name.is_empty() || login.password.is_empty() {
            return Response::bad_request("name and password are required");
        }

        let result = self.db.with_transaction(|tx| {
            if !tx.is_user_exists(&login.name)? {
                return Ok(None);
            }
            Ok(Some(tx.get_user(&login.name)?))
        });
        let record = match result {
            Ok(Some(record)) => record,
            Ok(None) => return Response::unauthenticated("invalid name or password"),
            Err(err) => {
                error!("Get user for login failed: {err:#}");
                return Response::error(response::DATABASE_ERROR);
            }
        };

        if !self.credentials.verify_password(&login.password, &record.hash) {
            return Response::unauthenticated("invalid name or password");
        }

        let token = match self.tokens.issue(&login.name, current_timestamp()) {
            Ok(token) => token,
            Err(err) => {
                error!("Issue token failed: {err:#}");
                return Response::error(response::TOKEN_ERROR);
            }
        };

        info!(
            "User '{}' logged in from {:?}",
            login.name,
            req.peer_addr()
        );
        Response::json(token)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use crate::server::db::UserRecord;
    use crate::server::handlers::tests::{parse_data, parse_message, status};
    use crate::types::token::TokenResponse;

    use super::*;

    fn new_handler() -> (LoginHandler, TokenService) {
        let db = Arc::new(Database::new_test());
        let credentials = CredentialStore::new_test();
        let tokens = TokenService::new_test();

        let now = current_timestamp();
        let hash = credentials.hash_password("open-sesame").unwrap();
        db.with_transaction(|tx| {
            tx.create_user(&UserRecord {
                name: String::from("alice"),
                email: String::new(),
                hash,
                create_time: now,
                update_time: now,
            })
        })
        .unwrap();

        (LoginHandler::new(db, credentials, tokens.clone()), tokens)
    }

    fn login(handler: &LoginHandler, body: Option<&str>) -> Response {
        let req = TestRequest::post()
            .uri("/api/v1/users/login")
            .to_http_request();
        handler.handle("", req, body.map(|b| b.as_bytes().to_vec()))
    }

    #[actix_web::test]
    async fn test_login() {
        let (handler, tokens) = new_handler();

        let resp = login(
            &handler,
            Some(r#"{"name": "alice", "password": "open-sesame"}"#),
        );
        let token: TokenResponse = parse_data(resp).await;
        assert_eq!(token.user, "alice");
        assert_eq!(token.expire_in, 60);

        let name = tokens
            .validate(&token.token, current_timestamp())
            .unwrap();
        assert_eq!(name, "alice");
    }

    #[actix_web::test]
    async fn test_bad_credentials() {
        let (handler, _) = new_handler();

        // Wrong password and unknown user read exactly the same.
        for body in [
            r#"{"name": "alice", "password": "wrong"}"#,
            r#"{"name": "nobody", "password": "open-sesame"}"#,
        ] {
            let (code, message) = parse_message(login(&handler, Some(body))).await;
            assert_eq!(code, 401);
            assert_eq!(message, "Unauthenticated: invalid name or password");
        }
    }

    #[actix_web::test]
    async fn test_invalid_requests() {
        let (handler, _) = new_handler();

        assert_eq!(status(login(&handler, None)), 400);
        assert_eq!(status(login(&handler, Some("not json"))), 400);
        assert_eq!(
            status(login(&handler, Some(r#"{"name": "", "password": "x"}"#))),
            400
        );
        assert_eq!(
            status(login(&handler, Some(r#"{"name": "alice", "password": ""}"#))),
            400
        );
    }
}
