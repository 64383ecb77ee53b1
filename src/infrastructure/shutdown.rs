use tokio::sync::watch;

/// Process-wide stop signal. Cloning shares the same signal.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownListener) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, ShutdownListener { receiver })
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// Idempotent; only the first call is logged.
    pub fn trigger(&self, reason: &'static str) {
        let changed = self.sender.send_if_modified(|stopped| {
            let first = !*stopped;
            *stopped = true;
            first
        });
        if changed {
            tracing::info!(target: "lifecycle", reason, "shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }
}

impl ShutdownListener {
    /// Resolves once shutdown has been triggered, immediately if it already was.
    pub async fn cancelled(&mut self) {
        // an Err means every sender is gone, which can only happen at process exit
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}

pub fn install_signal_handlers(shutdown: Shutdown) {
    let ctrlc = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrlc.trigger("ctrl-c");
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    shutdown.trigger("SIGTERM");
                }
                Err(err) => {
                    tracing::warn!(target: "lifecycle", error = %err, "cannot listen for SIGTERM");
                }
            }
        });
    }
}
