use actix_web::HttpRequest;
use chrono::Local;

use crate::server::response::Response;
use crate::types::healthz::HealthzResponse;

use super::Handler;

/// Liveness probe. Requires no token and is never rate limited.
pub struct HealthzHandler;

impl HealthzHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Handler for HealthzHandler {
    fn handle(&self, _path: &str, req: HttpRequest, _body: Option<Vec<u8>>) -> Response {
        let local = Local::now();
        let offset = format!("{}", local.offset());
        let response = HealthzResponse {
            now: local.timestamp() as u64,
            time_zone: offset,
            client_ip: req.connection_info().peer_addr().map(|a| a.to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        Response::json(response)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use crate::server::handlers::tests::parse_data;

    use super::*;

    #[actix_web::test]
    async fn test_healthz() {
        let handler = HealthzHandler::new();
        let req = TestRequest::get()
            .uri("/healthz")
            .peer_addr("10.1.2.3:4567".parse().unwrap())
            .to_http_request();

        let data: HealthzResponse = parse_data(handler.handle("", req, None)).await;
        assert!(data.now > 0);
        assert_eq!(data.client_ip.unwrap(), "10.1.2.3:4567");
        assert_eq!(data.version, env!("CARGO_PKG_VERSION"));
    }
}
