use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct ConversationRecord {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub created_at: OffsetDateTime,
}

impl From<ConversationRecord> for crate::domain::conversation::Conversation {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: record.id,
            listing_id: record.listing_id,
            buyer_id: record.buyer_id,
            seller_id: record.seller_id,
            created_at: record.created_at,
        }
    }
}
