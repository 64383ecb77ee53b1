use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::time::timeout;

use crate::{
    api::ApiFetcher,
    classifier::Classifier,
    config::AppConfig,
    domain::SiteDirectory,
    feed::FeedSubscriber,
    infrastructure::{directories::ResolvedPaths, notifier::build_notifier, shutdown::Shutdown},
    tasks::processor::QueueProcessor,
};

pub struct FirefighterApp {
    config: Arc<AppConfig>,
    subscriber: FeedSubscriber,
    processor: Arc<QueueProcessor>,
    shutdown: Shutdown,
}

impl FirefighterApp {
    /// Loads the site directory and rule set and wires the pipeline. Every configuration
    /// problem surfaces here, before the feed connects.
    pub fn initialize(config: AppConfig, paths: ResolvedPaths, shutdown: Shutdown) -> Result<Self> {
        let config = Arc::new(config);

        let sites = SiteDirectory::load(&paths.sites_file)
            .with_context(|| format!("loading site directory {}", paths.sites_file.display()))?;
        tracing::info!(target: "lifecycle", sites = sites.len(), "site directory loaded");

        let classifier = Classifier::load(paths.rules_file.as_deref()).context("loading rule set")?;

        let http_client = Client::builder()
            .user_agent(format!("firefighter/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()?;
        let fetcher = Arc::new(ApiFetcher::new(http_client, config.api.clone()));
        if config.api.api_key.is_none() {
            tracing::warn!(target: "lifecycle", "SE_API_KEY not set; requests use the anonymous quota");
        }

        let notifier = Arc::from(build_notifier(&config.alerts));
        let processor = QueueProcessor::new(
            fetcher,
            Arc::new(classifier),
            notifier,
            shutdown.subscribe(),
        );

        let subscriber = FeedSubscriber::new(
            config.feed.clone(),
            Arc::new(sites),
            config.api.base_url.clone(),
            processor.clone(),
        );

        Ok(Self {
            config,
            subscriber,
            processor,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let FirefighterApp {
            config,
            subscriber,
            processor,
            shutdown,
        } = self;

        tracing::info!(target: "lifecycle", feed = %config.feed.url, "firefighter started");

        let feed_result = subscriber.run(shutdown.subscribe()).await;
        if let Err(err) = &feed_result {
            tracing::error!(target: "lifecycle", error = %err, "event feed ended");
        }
        shutdown.trigger("event feed stopped");

        let grace = config.shutdown_grace;
        let pending = processor.snapshot();
        if pending.draining {
            tracing::info!(
                target: "lifecycle",
                grace_secs = grace.as_secs(),
                "waiting for the in-flight post to finish"
            );
        }
        if timeout(grace, processor.wait_idle()).await.is_err() {
            tracing::warn!(
                target: "lifecycle",
                "queue drain did not finish within {:?}; exiting anyway",
                grace
            );
        }

        tracing::info!(
            target: "lifecycle",
            abandoned = processor.snapshot().pending,
            "firefighter stopped"
        );
        feed_result.map_err(Into::into)
    }
}
