use crate::config::ChatConfig;
use crate::domain::conversation::Conversation;
use crate::domain::message::{Message, NewMessage};
use crate::error::{AppError, Result};
use crate::redaction;
use crate::storage::ChatStore;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) sent_total: Counter<u64>,
    pub(crate) redacted_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("revenda-chat");
        Self {
            sent_total: meter
                .u64_counter("revenda_chat_messages_sent_total")
                .with_description("Total message send attempts")
                .build(),
            redacted_total: meter
                .u64_counter("revenda_chat_messages_redacted_total")
                .with_description("Messages in which contact info was redacted")
                .build(),
        }
    }
}

/// Outcome of a successful send. `was_filtered` drives the client-side
/// "contact details were hidden" warning.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message: Message,
    pub was_filtered: bool,
}

#[derive(Clone, Debug)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    config: ChatConfig,
    metrics: Metrics,
}

impl ChatService {
    #[must_use]
    pub fn new(store: Arc<dyn ChatStore>, config: ChatConfig) -> Self {
        Self { store, config, metrics: Metrics::new() }
    }

    /// Opens the chat for a listing as `buyer_id`, reusing the existing
    /// conversation when the buyer has opened it before.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the buyer is the seller.
    /// Returns `AppError::Database` on persistence failure.
    #[tracing::instrument(err(level = "warn"), skip(self), fields(listing_id = %listing_id, buyer_id = %buyer_id))]
    pub async fn open_conversation(&self, listing_id: Uuid, buyer_id: Uuid, seller_id: Uuid) -> Result<Conversation> {
        if buyer_id == seller_id {
            return Err(AppError::BadRequest("Cannot open a conversation about your own listing".to_string()));
        }
        self.store.get_or_create_conversation(listing_id, buyer_id, seller_id).await
    }

    /// # Errors
    /// Returns `AppError::Database` on persistence failure.
    pub async fn conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        self.store.conversations_for(user_id).await
    }

    /// Sends a message: validates, redacts contact info, persists the
    /// original alongside the redacted variant, and publishes the insert.
    /// Single attempt; a failed persist leaves no trace and the caller keeps
    /// its composer text.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for empty or oversized content.
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::Forbidden` if the sender is not a participant.
    /// Returns `AppError::Database` if the message cannot be stored.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, content),
        fields(conversation_id = %conversation_id, sender_id = %sender_id)
    )]
    pub async fn send_message(&self, conversation_id: Uuid, sender_id: Uuid, content: &str) -> Result<SendReceipt> {
        if content.trim().is_empty() {
            return Err(AppError::BadRequest("Message must not be empty".to_string()));
        }
        if content.chars().count() > self.config.max_message_chars {
            return Err(AppError::BadRequest(format!(
                "Message exceeds {} characters",
                self.config.max_message_chars
            )));
        }

        self.participant_conversation(conversation_id, sender_id).await?;

        let redaction::Redaction { filtered, is_filtered } = redaction::redact(content);

        let new = NewMessage {
            conversation_id,
            sender_id,
            content: content.to_string(),
            filtered_content: is_filtered.then_some(filtered),
            is_filtered,
        };

        match self.store.create_message(new).await {
            Ok(message) => {
                tracing::debug!(message_id = %message.id, is_filtered, "Message stored");
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "success")]);
                if is_filtered {
                    self.metrics.redacted_total.add(1, &[]);
                }
                Ok(SendReceipt { message, was_filtered: is_filtered })
            }
            Err(e) => {
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "failure")]);
                Err(e)
            }
        }
    }

    /// Conversation history in `created_at` order, restricted to
    /// participants.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` / `AppError::Forbidden` like
    /// [`ChatService::send_message`].
    #[tracing::instrument(err(level = "warn"), skip(self), fields(conversation_id = %conversation_id))]
    pub async fn messages(&self, conversation_id: Uuid, viewer_id: Uuid) -> Result<Vec<Message>> {
        self.participant_conversation(conversation_id, viewer_id).await?;
        self.store.list_messages(conversation_id).await
    }

    /// Subscribes a participant to inserts of a conversation.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` / `AppError::Forbidden` like
    /// [`ChatService::send_message`].
    pub async fn subscribe(&self, conversation_id: Uuid, viewer_id: Uuid) -> Result<broadcast::Receiver<Message>> {
        self.participant_conversation(conversation_id, viewer_id).await?;
        Ok(self.store.subscribe_inserts(conversation_id))
    }

    async fn participant_conversation(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Conversation> {
        let conversation = self.store.conversation(conversation_id).await?.ok_or(AppError::NotFound)?;
        if !conversation.is_participant(user_id) {
            return Err(AppError::Forbidden);
        }
        Ok(conversation)
    }
}
