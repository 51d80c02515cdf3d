use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    #[serde(default = "default_id")]
    pub id: u64,

    #[serde(default = "default_string")]
    pub title: String,

    #[serde(default = "default_string")]
    pub content: String,

    #[serde(default = "default_status")]
    pub status: u32,

    #[serde(default = "default_time")]
    pub create_time: u64,

    #[serde(default = "default_time")]
    pub update_time: u64,
}

impl Article {
    pub const STATUS_DRAFT: u32 = 1;
    pub const STATUS_PUBLISHED: u32 = 2;

    pub fn is_valid_status(status: u32) -> bool {
        status == Self::STATUS_DRAFT || status == Self::STATUS_PUBLISHED
    }
}

/// Body for `PUT /api/v1/articles/{id}`. Empty fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u32>,
}

fn default_id() -> u64 {
    0
}

fn default_status() -> u32 {
    Article::STATUS_DRAFT
}

fn default_time() -> u64 {
    0
}

fn default_string() -> String {
    String::new()
}
