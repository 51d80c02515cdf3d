use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default = "default_string")]
    pub name: String,

    #[serde(default = "default_string")]
    pub email: String,

    #[serde(default = "default_time")]
    pub create_time: u64,

    #[serde(default = "default_time")]
    pub update_time: u64,

    /// Names of the roles assigned to this user. Only populated when a
    /// single user is fetched.
    #[serde(default = "default_vec")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    #[serde(default = "default_string")]
    pub name: String,

    #[serde(default = "default_vec")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<PolicyRule>,

    #[serde(default = "default_time")]
    pub create_time: u64,

    #[serde(default = "default_time")]
    pub update_time: u64,
}

/// A single permission: the role holding this rule may perform `method` on
/// any request path matched by `path`. The path may end with a `*` wildcard
/// covering the rest of the request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub path: String,
    pub method: String,
}

/// Body for `PUT /api/v1/users/{name}`. Empty fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Body for `PUT /api/v1/roles/{name}`. At least one field must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRoleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<PolicyRule>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhoamiResponse {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaniResponse {
    pub allow: bool,
}

fn default_time() -> u64 {
    0
}

fn default_vec<T>() -> Vec<T> {
    Vec::new()
}

fn default_string() -> String {
    String::new()
}
