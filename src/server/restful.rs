use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::web::{self, Bytes, Data, PayloadConfig};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use log::{info, warn};
use openssl::ssl::SslAcceptorBuilder;
use sd_notify::NotifyState;

use crate::types::response::CommonResponse;

use super::handlers::api::ApiHandler;
use super::handlers::healthz::HealthzHandler;
use super::handlers::login::LoginHandler;
use super::handlers::register::RegisterHandler;
use super::handlers::Handler;
use super::limiter::RateLimiter;
use super::response::Response;

pub struct RestfulServer {
    ssl: Option<SslAcceptorBuilder>,
    ctx: Arc<RestfulContext>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,

    bind: String,

    payload_limit_mib: Option<u64>,
    shutdown_timeout_secs: u64,
}

pub struct RestfulContext {
    pub api_handler: ApiHandler,
    pub healthz_handler: HealthzHandler,
    pub login_handler: LoginHandler,
    pub register_handler: RegisterHandler,

    /// Guards every route under the api scope. `None` when rate limiting is
    /// disabled in config.
    pub limiter: Option<RateLimiter>,
}

impl RestfulContext {
    fn acquire(&self) -> bool {
        match self.limiter {
            Some(ref limiter) => limiter.try_acquire(),
            None => true,
        }
    }
}

impl RestfulServer {
    const API_PATH: &str = "/api/v1";
    const HEALTHZ_PATH: &str = "/healthz";

    const REGISTER_PATH: &str = "/users/register";
    const LOGIN_PATH: &str = "/users/login";

    pub fn new(
        bind: String,
        ssl: Option<SslAcceptorBuilder>,
        ctx: Arc<RestfulContext>,
        shutdown_timeout_secs: u64,
    ) -> Self {
        Self {
            ssl,
            ctx,
            keep_alive_secs: None,
            workers: None,
            bind,
            payload_limit_mib: None,
            shutdown_timeout_secs,
        }
    }

    pub fn set_keep_alive_secs(&mut self, keep_alive_secs: u64) {
        self.keep_alive_secs = Some(keep_alive_secs);
    }

    pub fn set_workers(&mut self, workers: u64) {
        self.workers = Some(workers);
    }

    pub fn set_payload_limit_mib(&mut self, payload_limit_mib: u64) {
        self.payload_limit_mib = Some(payload_limit_mib);
    }

    pub async fn run(mut self) -> Result<()> {
        let ctx = self.ctx.clone();
        let payload_limit_mib = self.payload_limit_mib;
        let mut srv = HttpServer::new(move || {
            let mut app = App::new().app_data(Data::new(ctx.clone()));
            if let Some(limit) = payload_limit_mib {
                app = app.app_data(PayloadConfig::new((limit * 1024 * 1024) as usize));
            }
            // The register and login routes come before the catch-alls, so
            // they win the match and skip the token gate.
            app.service(
                web::scope(Self::API_PATH)
                    .route(Self::REGISTER_PATH, web::post().to(Self::handle_register))
                    .route(Self::LOGIN_PATH, web::post().to(Self::handle_login))
                    .route("/{path:.*}", web::get().to(Self::handle_api))
                    .route("/{path:.*}", web::post().to(Self::handle_api))
                    .route("/{path:.*}", web::put().to(Self::handle_api))
                    .route("/{path:.*}", web::delete().to(Self::handle_api)),
            )
            .service(web::resource(Self::HEALTHZ_PATH).route(web::get().to(Self::handle_healthz)))
            .default_service(web::route().to(Self::default_handler))
        });

        if let Some(ssl) = self.ssl.take() {
            info!("Binding to https://{}", self.bind);
            srv = srv.bind_openssl(&self.bind, ssl).context("bind with ssl")?
        } else {
            warn!("Using HTTP (without SSL). THIS IS DANGEROUS, DO NOT USE IN PRODUCTION");
            info!("Binding to http://{}", self.bind);
            srv = srv.bind(&self.bind).context("bind without ssl")?
        };

        if let Some(keep_alive) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(keep_alive));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }
        srv = srv.shutdown_timeout(self.shutdown_timeout_secs);

        sd_notify::notify(true, &[NotifyState::Ready]).context("notify systemd")?;
        info!("Starting restful server");
        srv.run().await.context("run server")?;

        info!("Server stopped by user");
        Ok(())
    }

    async fn handle_api(
        req: HttpRequest,
        body: Option<Bytes>,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        if !ctx.acquire() {
            return Response::too_many_requests().into();
        }

        let path = match Self::parse_path(Self::API_PATH, &req) {
            Some(path) => path,
            None => return Response::not_found().into(),
        };
        let body = Self::parse_body(body);

        ctx.api_handler.handle(&path, req, body).into()
    }

    async fn handle_healthz(
        req: HttpRequest,
        body: Option<Bytes>,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        let body = Self::parse_body(body);

        ctx.healthz_handler.handle("", req, body).into()
    }

    async fn handle_login(
        req: HttpRequest,
        body: Option<Bytes>,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        if !ctx.acquire() {
            return Response::too_many_requests().into();
        }

        let body = Self::parse_body(body);

        ctx.login_handler.handle("", req, body).into()
    }

    async fn handle_register(
        req: HttpRequest,
        body: Option<Bytes>,
        ctx: Data<Arc<RestfulContext>>,
    ) -> HttpResponse {
        if !ctx.acquire() {
            return Response::too_many_requests().into();
        }

        let body = Self::parse_body(body);

        ctx.register_handler.handle("", req, body).into()
    }

    async fn default_handler(req: HttpRequest) -> HttpResponse {
        let path = req.uri().path().to_string();
        let method = req.method().as_str().to_string();
        let message = format!("No route to {method} {path}");
        let ret = CommonResponse {
            code: StatusCode::NOT_FOUND.into(),
            message: Some(message),
        };
        HttpResponse::NotFound().json(ret)
    }

    fn parse_path(route: &str, req: &HttpRequest) -> Option<String> {
        let path = req.uri().path().to_string();
        let path = path.strip_prefix(route)?;
        let path = path.trim_matches('/');
        if path.is_empty() {
            return None;
        }

        Some(String::from(path))
    }

    fn parse_body(body: Option<Bytes>) -> Option<Vec<u8>> {
        body.map(|b| b.to_vec())
    }
}
