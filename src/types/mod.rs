pub mod article;
pub mod auth;
pub mod healthz;
pub mod request;
pub mod response;
pub mod token;
pub mod user;
