use async_trait::async_trait;
use teloxide::prelude::*;

use crate::config::AlertConfig;

/// Receives spam alerts. Delivery failures are logged here; callers never retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, reason: &str, permalink: &str);
}

pub fn format_alert(reason: &str, permalink: &str) -> String {
    format!("{reason}: {permalink}")
}

/// Posts alerts to a Telegram chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, reason: &str, permalink: &str) {
        if let Err(err) = self
            .bot
            .send_message(self.chat_id, format_alert(reason, permalink))
            .await
        {
            tracing::warn!(
                target: "notifier",
                error = %err,
                chat_id = self.chat_id.0,
                permalink,
                "failed to send spam alert"
            );
        }
    }
}

/// Writes alerts to the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, reason: &str, permalink: &str) {
        tracing::warn!(target: "notifier", reason, permalink, "spam alert");
    }
}

/// Picks Telegram when both the bot token and chat id are configured.
pub fn build_notifier(config: &AlertConfig) -> Box<dyn Notifier> {
    match (&config.telegram_bot_token, config.chat_id) {
        (Some(token), Some(chat_id)) if chat_id != 0 => {
            tracing::info!(target: "notifier", chat_id, "alerts go to Telegram");
            Box::new(TelegramNotifier::new(Bot::new(token), chat_id))
        }
        (Some(_), None) => {
            tracing::warn!(
                target: "notifier",
                "TELEGRAM_BOT_TOKEN set without ALERT_CHAT_ID; alerts go to the log"
            );
            Box::new(LogNotifier)
        }
        _ => {
            tracing::info!(target: "notifier", "alerts go to the log");
            Box::new(LogNotifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_text_is_reason_then_link() {
        assert_eq!(
            format_alert("Bad keyword", "https://stackoverflow.com/q/42"),
            "Bad keyword: https://stackoverflow.com/q/42"
        );
    }
}
