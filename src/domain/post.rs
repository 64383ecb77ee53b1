use serde::Serialize;

/// Normalized content of one fetched post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostData {
    /// Title (empty for answers), a newline, then the markdown body with LF line endings.
    pub body: String,
    pub author_reputation: i64,
    pub permalink: String,
}

impl PostData {
    pub fn new(title: Option<&str>, body_markdown: &str, author_reputation: i64, permalink: String) -> Self {
        let mut body = String::with_capacity(body_markdown.len() + 64);
        body.push_str(title.unwrap_or_default());
        body.push('\n');
        body.push_str(&body_markdown.replace("\r\n", "\n"));
        Self {
            body,
            author_reputation,
            permalink,
        }
    }

    /// First line of the body; empty for answers.
    pub fn title(&self) -> &str {
        self.body.split('\n').next().unwrap_or_default()
    }
}
