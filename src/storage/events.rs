use crate::domain::message::Message;
use dashmap::DashMap;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, UpDownCounter},
};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    published_total: Counter<u64>,
    unrouted_total: Counter<u64>,
    active_channels: UpDownCounter<i64>,
    gc_duration_seconds: Histogram<f64>,
    gc_reclaimed_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("revenda-chat");
        Self {
            published_total: meter
                .u64_counter("revenda_chat_inserts_published_total")
                .with_description("Total message inserts published to conversation channels")
                .build(),
            unrouted_total: meter
                .u64_counter("revenda_chat_inserts_unrouted_total")
                .with_description("Inserts published with no live subscriber for the conversation")
                .build(),
            active_channels: meter
                .i64_up_down_counter("revenda_chat_conversation_channels")
                .with_description("Number of active per-conversation broadcast channels")
                .build(),
            gc_duration_seconds: meter
                .f64_histogram("revenda_chat_channel_gc_duration_seconds")
                .with_description("Time taken to perform a single channel GC iteration")
                .build(),
            gc_reclaimed_total: meter
                .u64_counter("revenda_chat_channels_reclaimed_total")
                .with_description("Total number of stale conversation channels reclaimed by GC")
                .build(),
        }
    }
}

/// Per-conversation fanout of freshly inserted messages. Channels are
/// created lazily on first subscribe or publish and reclaimed by
/// [`InsertBroadcaster::perform_gc`] once all receivers are gone.
#[derive(Clone, Debug)]
pub struct InsertBroadcaster {
    channels: Arc<DashMap<Uuid, broadcast::Sender<Message>>>,
    channel_capacity: usize,
    metrics: Metrics,
}

impl InsertBroadcaster {
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        Self { channels: Arc::new(DashMap::new()), channel_capacity, metrics: Metrics::new() }
    }

    /// Publishes an inserted message to local subscribers of its
    /// conversation. Delivery is best effort toward each receiver; a lagged
    /// receiver observes `RecvError::Lagged` and must re-fetch history.
    pub fn publish(&self, message: &Message) {
        self.metrics.published_total.add(1, &[]);

        if let Some(tx) = self.channels.get(&message.conversation_id) {
            let delivered = tx.send(message.clone()).unwrap_or(0);
            tracing::trace!(
                conversation_id = %message.conversation_id,
                message_id = %message.id,
                receivers = delivered,
                "Published insert to conversation channel"
            );
            if delivered == 0 {
                self.metrics.unrouted_total.add(1, &[KeyValue::new("reason", "no_receivers")]);
            }
        } else {
            tracing::debug!(conversation_id = %message.conversation_id, "No channel for conversation insert");
            self.metrics.unrouted_total.add(1, &[KeyValue::new("reason", "no_channel")]);
        }
    }

    pub fn subscribe(&self, conversation_id: Uuid) -> broadcast::Receiver<Message> {
        let entry = self.channels.entry(conversation_id).or_insert_with(|| {
            self.metrics.active_channels.add(1, &[]);
            broadcast::channel(self.channel_capacity).0
        });
        entry.subscribe()
    }

    /// Reclaims channels whose receivers have all disconnected.
    pub fn perform_gc(&self) {
        let start = std::time::Instant::now();
        let mut reclaimed_this_cycle = 0;

        self.channels.retain(|_, sender| {
            let active = sender.receiver_count() > 0;
            if !active {
                self.metrics.active_channels.add(-1, &[]);
                reclaimed_this_cycle += 1;
            }
            active
        });

        let duration = start.elapsed().as_secs_f64();
        self.metrics.gc_duration_seconds.record(duration, &[]);

        if reclaimed_this_cycle > 0 {
            self.metrics.gc_reclaimed_total.add(reclaimed_this_cycle, &[]);
            tracing::info!(reclaimed = reclaimed_this_cycle, "Channel GC reclaimed stale conversation channels");
        }
        tracing::debug!(duration_secs = %duration, "Channel GC cycle completed");
    }
}
