use std::{sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::{
    config::FeedConfig,
    domain::{Event, FetchDescriptor, SiteDirectory},
    infrastructure::shutdown::ShutdownListener,
    tasks::processor::QueueProcessor,
};

use super::parser::{parse_frame, Inbound};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("websocket failure")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection not established within {0:?}")]
    ConnectTimeout(Duration),
    #[error("feed closed by the server")]
    Closed,
    #[error("no frames received for {0:?}")]
    Idle(Duration),
}

enum SessionEnd {
    Shutdown,
    Closed,
}

/// What became of one text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Heartbeat,
    Queued,
    Ignored,
}

/// Keeps the realtime connection open and turns new-post activity into queued fetches.
pub struct FeedSubscriber {
    config: FeedConfig,
    sites: Arc<SiteDirectory>,
    api_base: String,
    processor: Arc<QueueProcessor>,
}

impl FeedSubscriber {
    pub fn new(
        config: FeedConfig,
        sites: Arc<SiteDirectory>,
        api_base: String,
        processor: Arc<QueueProcessor>,
    ) -> Self {
        Self {
            config,
            sites,
            api_base,
            processor,
        }
    }

    /// Runs until shutdown. When reconnecting is disabled, the first lost connection ends the
    /// run and is reported as an error.
    pub async fn run(&self, mut shutdown: ShutdownListener) -> Result<(), FeedError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.session(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => return Ok(()),
                Ok(SessionEnd::Closed) => {
                    tracing::warn!(target: "feed", url = %self.config.url, "feed connection closed");
                    FeedError::Closed
                }
                Err(err) => {
                    tracing::error!(target: "feed", error = %err, attempt, "feed connection failed");
                    err
                }
            };

            if !self.config.reconnect {
                return Err(err);
            }
            tracing::info!(
                target: "feed",
                delay_secs = self.config.reconnect_delay.as_secs(),
                "reconnecting"
            );
            tokio::select! {
                _ = sleep(self.config.reconnect_delay) => {}
                _ = shutdown.cancelled() => return Ok(()),
            }
        }
    }

    async fn session(&self, shutdown: &mut ShutdownListener) -> Result<SessionEnd, FeedError> {
        let connect = tokio::select! {
            res = timeout(self.config.connect_timeout, connect_async(self.config.url.as_str())) => res,
            _ = shutdown.cancelled() => return Ok(SessionEnd::Shutdown),
        };
        let (socket, _) = connect.map_err(|_| FeedError::ConnectTimeout(self.config.connect_timeout))??;
        tracing::info!(target: "feed", url = %self.config.url, "feed connected");

        let (mut sink, mut stream) = socket.split();
        let site_ids = self.sites.site_ids();
        for site_id in &site_ids {
            sink.send(Message::Text(format!("{site_id}-home-active"))).await?;
        }
        tracing::info!(target: "feed", sites = site_ids.len(), "subscribed to site activity");

        loop {
            let frame = tokio::select! {
                frame = timeout(self.config.idle_timeout, stream.next()) => {
                    frame.map_err(|_| FeedError::Idle(self.config.idle_timeout))?
                }
                _ = shutdown.cancelled() => {
                    if let Err(err) = sink.send(Message::Close(None)).await {
                        tracing::debug!(target: "feed", error = %err, "close frame not sent");
                    }
                    return Ok(SessionEnd::Shutdown);
                }
            };
            let Some(frame) = frame else {
                return Ok(SessionEnd::Closed);
            };

            match frame? {
                Message::Text(text) => {
                    if self.handle_text(&text) == Routed::Heartbeat {
                        sink.send(Message::Text("hb".to_string())).await?;
                    }
                }
                Message::Close(close) => {
                    tracing::info!(target: "feed", ?close, "server sent close");
                    return Ok(SessionEnd::Closed);
                }
                _ => {}
            }
        }
    }

    /// Parses a text frame and queues a fetch for new questions and answers.
    pub fn handle_text(&self, text: &str) -> Routed {
        match parse_frame(text) {
            Ok(Inbound::Heartbeat) => Routed::Heartbeat,
            Ok(Inbound::Activity(event)) => match self.descriptor_for(&event) {
                Some(descriptor) => {
                    self.processor.submit(descriptor);
                    Routed::Queued
                }
                None => Routed::Ignored,
            },
            Err(err) => {
                tracing::warn!(target: "feed", error = %err, frame = %truncate(text, 200), "dropping malformed frame");
                Routed::Ignored
            }
        }
    }

    fn descriptor_for(&self, event: &Event) -> Option<FetchDescriptor> {
        let Some(kind) = event.action.post_kind() else {
            tracing::trace!(target: "feed", site_id = event.site_id, post_id = event.post_id, "ignoring non-creation activity");
            return None;
        };
        let Some(slug) = self.sites.slug(event.site_id) else {
            tracing::warn!(
                target: "feed",
                site_id = event.site_id,
                post_id = event.post_id,
                "activity for a site missing from the directory"
            );
            return None;
        };
        match FetchDescriptor::new(&self.api_base, slug, event.post_id, kind) {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                tracing::warn!(target: "feed", error = %err, site = slug, "cannot build API url");
                None
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
