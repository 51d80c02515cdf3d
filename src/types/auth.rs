use serde::{Deserialize, Serialize};

/// Body for `POST /api/v1/users/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

/// Body for `POST /api/v1/users/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub password: String,

    #[serde(default = "default_string")]
    pub email: String,
}

fn default_string() -> String {
    String::new()
}
