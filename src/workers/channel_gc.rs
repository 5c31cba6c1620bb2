use crate::storage::pg::PgChatStore;
use std::time::Duration;
use tokio::sync::watch;
use tracing::Instrument;

/// Periodically reclaims conversation broadcast channels whose subscribers
/// have all disconnected.
#[derive(Debug)]
pub struct ChannelGcWorker {
    store: PgChatStore,
    gc_interval_secs: u64,
}

impl ChannelGcWorker {
    #[must_use]
    pub const fn new(store: PgChatStore, gc_interval_secs: u64) -> Self {
        Self { store, gc_interval_secs }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut gc_interval = tokio::time::interval(Duration::from_secs(self.gc_interval_secs));

        tracing::info!("Channel GC worker started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,

                _ = gc_interval.tick() => {
                    async {
                        self.store.perform_channel_gc();
                    }
                    .instrument(tracing::debug_span!("channel_gc_iteration"))
                    .await;
                }
            }
        }

        tracing::info!("Channel GC worker shutting down...");
    }
}
