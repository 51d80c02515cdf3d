use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use openssl::ssl::{SslAcceptor, SslAcceptorBuilder, SslMethod};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

use super::auth::password::CredentialStore;
use super::auth::token::TokenService;
use super::authz::store::PolicyStore;
use super::bootstrap;
use super::db::config::DbConfig;
use super::db::factory::DbFactory;
use super::handlers::api::ApiHandler;
use super::handlers::healthz::HealthzHandler;
use super::handlers::login::LoginHandler;
use super::handlers::register::RegisterHandler;
use super::limiter::RateLimiter;
use super::restful::{RestfulContext, RestfulServer};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,

    #[serde(default)]
    pub ssl: bool,

    /// PEM certificate chain, defaults to `<config>/pki/cert.pem` when ssl
    /// is on.
    #[serde(default)]
    pub cert_file: String,

    /// PEM private key, defaults to `<config>/pki/key.pem` when ssl is on.
    #[serde(default)]
    pub key_file: String,

    /// HMAC secret for signing bearer tokens. The server refuses to start
    /// without one.
    #[serde(default)]
    pub secret: String,

    #[serde(default = "ServerConfig::default_token_expiration_secs")]
    pub token_expiration_secs: u64,

    #[serde(default = "ServerConfig::default_admin_password")]
    pub admin_password: String,

    #[serde(default = "ServerConfig::default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    #[serde(default = "DbConfig::default")]
    pub db: DbConfig,

    pub keep_alive_secs: Option<u64>,

    pub workers: Option<u64>,

    pub payload_limit_mib: Option<u64>,

    #[serde(default = "ServerConfig::default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "RateLimitConfig::default")]
    pub rate_limit: RateLimitConfig,

    #[serde(default = "ServerConfig::default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "RateLimitConfig::default_capacity")]
    pub capacity: u64,

    #[serde(default = "RateLimitConfig::default_fill_interval_millis")]
    pub fill_interval_millis: u64,

    #[serde(default = "RateLimitConfig::default_enable")]
    pub enable: bool,
}

impl CommonConfig for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            ssl: false,
            cert_file: String::new(),
            key_file: String::new(),
            secret: String::new(),
            token_expiration_secs: Self::default_token_expiration_secs(),
            admin_password: Self::default_admin_password(),
            bcrypt_cost: Self::default_bcrypt_cost(),
            db: DbConfig::default(),
            keep_alive_secs: None,
            workers: None,
            payload_limit_mib: None,
            shutdown_timeout_secs: Self::default_shutdown_timeout_secs(),
            rate_limit: RateLimitConfig::default(),
            log_level: Self::default_log_level(),
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.bind = expandenv("bind", &self.bind)?;
        if self.bind.is_empty() {
            bail!("bind cannot be empty");
        }

        self.cert_file = expandenv("cert_file", &self.cert_file)?;
        if self.cert_file.is_empty() {
            let path = ps.pki_path.join("cert.pem");
            self.cert_file = format!("{}", path.display());
        }

        self.key_file = expandenv("key_file", &self.key_file)?;
        if self.key_file.is_empty() {
            let path = ps.pki_path.join("key.pem");
            self.key_file = format!("{}", path.display());
        }

        self.secret = expandenv("secret", &self.secret)?;
        if self.secret.is_empty() {
            bail!("secret is required, refusing to start without one");
        }

        if self.token_expiration_secs < Self::MIN_TOKEN_EXPIRATION_SECS
            || self.token_expiration_secs > Self::MAX_TOKEN_EXPIRATION_SECS
        {
            bail!(
                "token_expiration_secs must be in range [{}, {}]",
                Self::MIN_TOKEN_EXPIRATION_SECS,
                Self::MAX_TOKEN_EXPIRATION_SECS
            );
        }

        if self.admin_password.is_empty() {
            bail!("admin_password cannot be empty");
        }

        if self.bcrypt_cost < Self::MIN_BCRYPT_COST || self.bcrypt_cost > Self::MAX_BCRYPT_COST {
            bail!(
                "bcrypt_cost must be in range [{}, {}]",
                Self::MIN_BCRYPT_COST,
                Self::MAX_BCRYPT_COST
            );
        }

        self.db.complete(ps).context("db")?;

        if let Some(keep_alive_secs) = self.keep_alive_secs {
            if keep_alive_secs == 0 {
                bail!("keep_alive_secs must be greater than 0");
            }
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                bail!("workers must be greater than 0");
            }
        }

        if let Some(payload_limit_mib) = self.payload_limit_mib {
            if payload_limit_mib == 0 {
                bail!("payload_limit_mib must be greater than 0");
            }
        }

        self.rate_limit.complete(ps).context("rate_limit")?;

        Ok(())
    }
}

impl ServerConfig {
    const MIN_TOKEN_EXPIRATION_SECS: u64 = 60;
    const MAX_TOKEN_EXPIRATION_SECS: u64 = 60 * 60 * 24 * 365;

    // Bounds imposed by the bcrypt algorithm itself.
    const MIN_BCRYPT_COST: u32 = 4;
    const MAX_BCRYPT_COST: u32 = 31;

    pub fn build_ctx(&self) -> Result<Arc<RestfulContext>> {
        let factory = DbFactory::new();
        let db = factory.build_db(&self.db).context("init database")?;

        let credentials = CredentialStore::new(self.bcrypt_cost);
        let tokens = TokenService::new(&self.secret, self.token_expiration_secs)
            .context("init token service")?;
        let store = PolicyStore::new(db.clone());

        bootstrap::bootstrap(&db, &credentials, &self.admin_password)?;

        let limiter = if self.rate_limit.enable {
            Some(RateLimiter::new(
                self.rate_limit.capacity,
                Duration::from_millis(self.rate_limit.fill_interval_millis),
            ))
        } else {
            None
        };

        let ctx = RestfulContext {
            api_handler: ApiHandler::new(
                tokens.clone(),
                db.clone(),
                store.clone(),
                credentials.clone(),
            ),
            healthz_handler: HealthzHandler::new(),
            login_handler: LoginHandler::new(db.clone(), credentials.clone(), tokens),
            register_handler: RegisterHandler::new(db, credentials),
            limiter,
        };
        Ok(Arc::new(ctx))
    }

    pub fn build_restful_server(&self, ctx: Arc<RestfulContext>) -> Result<RestfulServer> {
        let ssl = if self.ssl { Some(self.build_ssl()?) } else { None };

        let mut srv = RestfulServer::new(self.bind.clone(), ssl, ctx, self.shutdown_timeout_secs);

        if let Some(keep_alive_secs) = self.keep_alive_secs {
            srv.set_keep_alive_secs(keep_alive_secs);
        }

        if let Some(workers) = self.workers {
            srv.set_workers(workers);
        }

        if let Some(payload_limit_mib) = self.payload_limit_mib {
            srv.set_payload_limit_mib(payload_limit_mib);
        }

        Ok(srv)
    }

    fn build_ssl(&self) -> Result<SslAcceptorBuilder> {
        let key_path = PathBuf::from(&self.key_file);
        if !key_path.exists() {
            bail!("ssl key file not exists: {:?}", key_path);
        }

        let cert_path = PathBuf::from(&self.cert_file);
        if !cert_path.exists() {
            bail!("ssl cert file not exists: {:?}", cert_path);
        }

        let mut builder =
            SslAcceptor::mozilla_intermediate(SslMethod::tls()).context("init ssl acceptor")?;

        builder
            .set_private_key_file(&key_path, openssl::ssl::SslFiletype::PEM)
            .context("load ssl key file")?;
        builder
            .set_certificate_chain_file(&cert_path)
            .context("load ssl cert file")?;

        Ok(builder)
    }

    fn default_bind() -> String {
        String::from("127.0.0.1:8080")
    }

    fn default_token_expiration_secs() -> u64 {
        60 * 60 // 1 hour
    }

    fn default_admin_password() -> String {
        String::from(bootstrap::DEFAULT_ADMIN_PASSWORD)
    }

    fn default_bcrypt_cost() -> u32 {
        12
    }

    fn default_shutdown_timeout_secs() -> u64 {
        5
    }

    fn default_log_level() -> String {
        String::from("info")
    }
}

impl CommonConfig for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
            fill_interval_millis: Self::default_fill_interval_millis(),
            enable: Self::default_enable(),
        }
    }

    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        if !self.enable {
            return Ok(());
        }

        if self.capacity == 0 {
            bail!("capacity must be greater than 0");
        }
        if self.fill_interval_millis == 0 {
            bail!("fill_interval_millis must be greater than 0");
        }

        Ok(())
    }
}

impl RateLimitConfig {
    fn default_capacity() -> u64 {
        100
    }

    fn default_fill_interval_millis() -> u64 {
        1000
    }

    fn default_enable() -> bool {
        true
    }
}
