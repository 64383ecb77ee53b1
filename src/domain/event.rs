use chrono::{DateTime, Utc};
use url::Url;

const QUESTION_FILTER: &str = "!Fcb8.OvNI39f8LgxZws3-f1LPA";
const ANSWER_FILTER: &str = "!1zNUM5.sthPdOGr(ULDb2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    NewQuestion,
    NewAnswer,
    Other,
}

impl ActionKind {
    /// Classifies the text that follows the "started-link" anchor of an activity fragment.
    pub fn from_verb(text: &str) -> Self {
        if text.starts_with("asked") {
            ActionKind::NewQuestion
        } else if text.starts_with("answered") {
            ActionKind::NewAnswer
        } else {
            ActionKind::Other
        }
    }

    pub fn post_kind(self) -> Option<PostKind> {
        match self {
            ActionKind::NewQuestion => Some(PostKind::Question),
            ActionKind::NewAnswer => Some(PostKind::Answer),
            ActionKind::Other => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Question,
    Answer,
}

impl PostKind {
    pub fn label(self) -> &'static str {
        match self {
            PostKind::Question => "question",
            PostKind::Answer => "answer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub site_id: i64,
    pub post_id: u64,
    pub action: ActionKind,
}

/// A queued API request for the content behind one feed event.
#[derive(Debug, Clone)]
pub struct FetchDescriptor {
    pub url: Url,
    pub site: String,
    pub post_id: u64,
    pub kind: PostKind,
    pub queued_at: DateTime<Utc>,
}

impl FetchDescriptor {
    /// Builds the request URL for `kind`. The API key is not part of the descriptor; the
    /// fetcher appends it per request.
    pub fn new(api_base: &str, site: &str, post_id: u64, kind: PostKind) -> Result<Self, url::ParseError> {
        let raw = match kind {
            PostKind::Question => format!(
                "{api_base}/questions/{post_id}?order=desc&site={site}&filter={QUESTION_FILTER}"
            ),
            PostKind::Answer => format!(
                "{api_base}/questions/{post_id}/answers?pagesize=1&order=desc&sort=creation&site={site}&filter={ANSWER_FILTER}"
            ),
        };
        Ok(Self {
            url: Url::parse(&raw)?,
            site: site.to_string(),
            post_id,
            kind,
            queued_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.stackexchange.com/2.2";

    #[test]
    fn verbs_map_to_actions() {
        assert_eq!(ActionKind::from_verb("asked <span>"), ActionKind::NewQuestion);
        assert_eq!(ActionKind::from_verb("answered</a>"), ActionKind::NewAnswer);
        assert_eq!(ActionKind::from_verb("edited 3 mins ago"), ActionKind::Other);
        assert_eq!(ActionKind::from_verb(""), ActionKind::Other);
        assert_eq!(ActionKind::Other.post_kind(), None);
    }

    #[test]
    fn question_descriptor_encodes_post_and_site_once() {
        let event = Event {
            site_id: 1,
            post_id: 42,
            action: ActionKind::NewQuestion,
        };
        let kind = event.action.post_kind().unwrap();
        let descriptor = FetchDescriptor::new(BASE, "stackoverflow", event.post_id, kind).unwrap();
        let url = descriptor.url.as_str();

        assert_eq!(url.matches("42").count(), 1);
        assert_eq!(url.matches("stackoverflow").count(), 1);
        assert_eq!(descriptor.url.path(), "/2.2/questions/42");
        assert!(descriptor
            .url
            .query_pairs()
            .any(|(k, v)| k == "site" && v == "stackoverflow"));
    }

    #[test]
    fn answer_descriptor_targets_latest_answer() {
        let descriptor = FetchDescriptor::new(BASE, "superuser", 7, PostKind::Answer).unwrap();
        assert_eq!(descriptor.url.path(), "/2.2/questions/7/answers");
        let pairs: Vec<(String, String)> = descriptor
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("pagesize".into(), "1".into())));
        assert!(pairs.contains(&("sort".into(), "creation".into())));
        assert!(pairs.contains(&("site".into(), "superuser".into())));
    }
}
