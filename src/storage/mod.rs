use crate::domain::conversation::Conversation;
use crate::domain::message::{Message, NewMessage};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod conversation_repo;
pub mod events;
pub mod message_repo;
pub mod pg;
pub mod records;

pub type DbPool = Pool<Postgres>;

/// Initializes the database connection pool.
///
/// # Errors
/// Returns `AppError::Database` if the connection fails.
pub async fn init_pool(database_url: &str) -> Result<DbPool> {
    Ok(PgPoolOptions::new().max_connections(20).connect(database_url).await?)
}

/// The single authoritative persistence and notification boundary for chat
/// data. Every call site goes through this trait; [`pg::PgChatStore`] is the
/// production implementation and tests provide an in-memory one.
#[async_trait]
pub trait ChatStore: Send + Sync + std::fmt::Debug {
    /// Returns the conversation for `(listing, buyer)`, creating it on first
    /// open. Idempotent: repeated calls with the same triple return the same
    /// conversation.
    async fn get_or_create_conversation(
        &self,
        listing_id: Uuid,
        buyer_id: Uuid,
        seller_id: Uuid,
    ) -> Result<Conversation>;

    async fn conversation(&self, id: Uuid) -> Result<Option<Conversation>>;

    /// Conversations in which `user_id` is buyer or seller.
    async fn conversations_for(&self, user_id: Uuid) -> Result<Vec<Conversation>>;

    /// Persists a message and publishes it to insert subscribers.
    async fn create_message(&self, new: NewMessage) -> Result<Message>;

    /// Messages of a conversation ordered ascending by `created_at`, ties
    /// broken by id assignment order.
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>>;

    /// Subscribes to messages inserted into a conversation. Delivery toward
    /// a subscriber is at-least-once from the caller's perspective; a lagged
    /// receiver must re-fetch via [`ChatStore::list_messages`].
    fn subscribe_inserts(&self, conversation_id: Uuid) -> broadcast::Receiver<Message>;

    /// Connectivity check for readiness probing.
    async fn ping(&self) -> Result<()>;
}
