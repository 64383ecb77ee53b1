use serde::Deserialize;

use crate::domain::PostData;

/// Response envelope shared by every Stack Exchange API method.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub items: Vec<ApiItem>,
    pub backoff: Option<u64>,
    pub quota_remaining: Option<i64>,
    pub error_id: Option<i64>,
    pub error_name: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiItem {
    pub title: Option<String>,
    #[serde(default)]
    pub body_markdown: String,
    pub owner: Option<ApiOwner>,
    pub link: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiOwner {
    pub reputation: Option<i64>,
}

impl ApiItem {
    pub fn into_post(self) -> PostData {
        let reputation = self
            .owner
            .and_then(|owner| owner.reputation)
            .unwrap_or_default();
        PostData::new(self.title.as_deref(), &self.body_markdown, reputation, self.link)
    }
}
