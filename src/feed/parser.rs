use serde::Deserialize;
use thiserror::Error;

use crate::domain::{ActionKind, Event};

const VERB_ANCHOR: &str = r#"class="started-link">"#;
const HEARTBEAT_ACTION: &str = "hb";

/// A decoded feed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Heartbeat,
    Activity(Event),
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not a feed envelope")]
    Envelope(#[source] serde_json::Error),
    #[error("envelope data is not an activity payload")]
    Payload(#[source] serde_json::Error),
    #[error("post id {0:?} is not numeric")]
    PostId(String),
    #[error("activity body has no verb anchor")]
    MissingAnchor,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    action: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ActivityPayload {
    siteid: i64,
    id: PostIdRepr,
    body: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PostIdRepr {
    Number(u64),
    Text(String),
}

impl PostIdRepr {
    fn into_id(self) -> Result<u64, FrameError> {
        match self {
            PostIdRepr::Number(id) => Ok(id),
            PostIdRepr::Text(raw) => raw.trim().parse().map_err(|_| FrameError::PostId(raw)),
        }
    }
}

/// Decodes one text frame. Activity frames carry a JSON document encoded as a string inside
/// the `data` field of the envelope.
pub fn parse_frame(text: &str) -> Result<Inbound, FrameError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(FrameError::Envelope)?;
    if envelope.action == HEARTBEAT_ACTION {
        return Ok(Inbound::Heartbeat);
    }

    let payload: ActivityPayload =
        serde_json::from_str(&envelope.data).map_err(FrameError::Payload)?;
    let anchor = payload
        .body
        .find(VERB_ANCHOR)
        .ok_or(FrameError::MissingAnchor)?;
    let verb = &payload.body[anchor + VERB_ANCHOR.len()..];

    Ok(Inbound::Activity(Event {
        site_id: payload.siteid,
        post_id: payload.id.into_id()?,
        action: ActionKind::from_verb(verb),
    }))
}
