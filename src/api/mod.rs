mod client;
pub mod retry;
pub mod wire;

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{FetchDescriptor, PostData};

pub use client::ApiFetcher;

#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// `None` when every attempt came back empty or failed.
    pub post: Option<PostData>,
    /// Server-advertised delay to honour before the next request.
    pub backoff: Option<Duration>,
}

#[async_trait]
pub trait PostFetcher: Send + Sync {
    async fn fetch(&self, descriptor: &FetchDescriptor) -> FetchOutcome;
}
