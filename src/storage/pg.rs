use crate::domain::conversation::Conversation;
use crate::domain::message::{Message, NewMessage};
use crate::error::Result;
use crate::storage::conversation_repo::ConversationRepository;
use crate::storage::events::InsertBroadcaster;
use crate::storage::message_repo::MessageRepository;
use crate::storage::{ChatStore, DbPool};
use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Postgres-backed [`ChatStore`]. Inserts are fanned out in-process through
/// an [`InsertBroadcaster`]; the database remains the ordering arbiter.
#[derive(Clone, Debug)]
pub struct PgChatStore {
    pool: DbPool,
    messages: MessageRepository,
    conversations: ConversationRepository,
    events: InsertBroadcaster,
}

impl PgChatStore {
    #[must_use]
    pub fn new(pool: DbPool, channel_capacity: usize) -> Self {
        Self {
            messages: MessageRepository::new(pool.clone()),
            conversations: ConversationRepository::new(pool.clone()),
            events: InsertBroadcaster::new(channel_capacity),
            pool,
        }
    }

    /// Reclaims subscriber-less conversation channels; driven by the
    /// channel GC worker.
    pub fn perform_channel_gc(&self) {
        self.events.perform_gc();
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn get_or_create_conversation(
        &self,
        listing_id: Uuid,
        buyer_id: Uuid,
        seller_id: Uuid,
    ) -> Result<Conversation> {
        self.conversations.get_or_create(listing_id, buyer_id, seller_id).await
    }

    async fn conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        self.conversations.find(id).await
    }

    async fn conversations_for(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        self.conversations.list_for_user(user_id).await
    }

    async fn create_message(&self, new: NewMessage) -> Result<Message> {
        let message = self.messages.create(&new).await?;
        self.events.publish(&message);
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        self.messages.list(conversation_id).await
    }

    fn subscribe_inserts(&self, conversation_id: Uuid) -> broadcast::Receiver<Message> {
        self.events.subscribe(conversation_id)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
