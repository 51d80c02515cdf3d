use serde::{Deserialize, Serialize};

/// Payload for `GET /healthz`: server time, timezone offset, the caller's
/// address as the server sees it, and the build version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthzResponse {
    pub now: u64,
    pub time_zone: String,
    pub client_ip: Option<String>,
    pub version: String,
}
