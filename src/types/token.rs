use serde::{Deserialize, Serialize};

/// Issued by `POST /api/v1/users/login`. `expire_in` is the token lifetime
/// in seconds, not an absolute timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub user: String,
    pub token: String,
    pub expire_in: usize,
}
