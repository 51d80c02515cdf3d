mod auth;
mod authz;
mod bootstrap;
mod db;
mod handlers;
mod limiter;
mod response;

pub mod config;
pub mod restful;
