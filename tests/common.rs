use async_trait::async_trait;
use revenda_chat::api::{self, MgmtState};
use revenda_chat::config::{AuthConfig, ChatConfig, Config, LogFormat, RateLimitConfig, ServerConfig, TelemetryConfig};
use revenda_chat::domain::conversation::Conversation;
use revenda_chat::domain::message::{Message, NewMessage};
use revenda_chat::domain::session::Claims;
use revenda_chat::error::Result;
use revenda_chat::services::chat_service::ChatService;
use revenda_chat::services::health_service::HealthService;
use revenda_chat::storage::ChatStore;
use revenda_chat::storage::events::InsertBroadcaster;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("revenda_chat=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap())
            .add_directive("tungstenite=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

pub fn get_test_config() -> Config {
    Config {
        database_url: "postgres://unused-in-tests".to_string(),
        server: ServerConfig { host: "127.0.0.1".to_string(), port: 0, mgmt_port: 0, shutdown_timeout_secs: 1 },
        auth: AuthConfig { jwt_secret: "test_secret".to_string() },
        rate_limit: RateLimitConfig { per_second: 10000, burst: 10000 },
        chat: ChatConfig { max_message_chars: 2000, channel_capacity: 16, channel_gc_interval_secs: 60 },
        telemetry: TelemetryConfig { log_format: LogFormat::Text, otlp_endpoint: None },
    }
}

/// In-memory `ChatStore` so the whole HTTP/WS stack runs without Postgres.
#[derive(Debug)]
pub struct InMemoryStore {
    conversations: Mutex<HashMap<(Uuid, Uuid), Conversation>>,
    messages: Mutex<Vec<Message>>,
    events: InsertBroadcaster,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
            events: InsertBroadcaster::new(16),
        }
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn get_or_create_conversation(
        &self,
        listing_id: Uuid,
        buyer_id: Uuid,
        seller_id: Uuid,
    ) -> Result<Conversation> {
        let mut conversations = self.conversations.lock().unwrap();
        let conversation = conversations.entry((listing_id, buyer_id)).or_insert_with(|| Conversation {
            id: Uuid::now_v7(),
            listing_id,
            buyer_id,
            seller_id,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(conversation.clone())
    }

    async fn conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.conversations.lock().unwrap().values().find(|c| c.id == id).cloned())
    }

    async fn conversations_for(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.is_participant(user_id))
            .cloned()
            .collect())
    }

    async fn create_message(&self, new: NewMessage) -> Result<Message> {
        let message = Message {
            id: Uuid::now_v7(),
            conversation_id: new.conversation_id,
            sender_id: new.sender_id,
            content: new.content,
            filtered_content: new.filtered_content,
            is_filtered: new.is_filtered,
            created_at: OffsetDateTime::now_utc(),
        };
        self.messages.lock().unwrap().push(message.clone());
        self.events.publish(&message);
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        Ok(messages)
    }

    fn subscribe_inserts(&self, conversation_id: Uuid) -> broadcast::Receiver<Message> {
        self.events.subscribe(conversation_id)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub mgmt_addr: SocketAddr,
    pub client: reqwest::Client,
    pub jwt_secret: String,
    _shutdown_tx: watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        setup_tracing();
        let config = get_test_config();

        let store = Arc::new(InMemoryStore::new());
        let chat_service = ChatService::new(Arc::clone(&store) as Arc<dyn ChatStore>, config.chat.clone());
        let health_service = HealthService::new(store);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let app = api::app_router(config.clone(), chat_service, shutdown_rx);
        let mgmt = api::mgmt_router(MgmtState { health_service });

        let api_listener = TcpListener::bind("127.0.0.1:0").await.expect("bind api listener");
        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mgmt listener");
        let addr = api_listener.local_addr().expect("api addr");
        let mgmt_addr = mgmt_listener.local_addr().expect("mgmt addr");

        tokio::spawn(async move {
            axum::serve(api_listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .expect("api server");
        });
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .expect("mgmt server");
        });

        Self {
            addr,
            mgmt_addr,
            client: reqwest::Client::new(),
            jwt_secret: config.auth.jwt_secret,
            _shutdown_tx: shutdown_tx,
        }
    }

    #[allow(dead_code)]
    pub fn token_for(&self, user_id: Uuid) -> String {
        Claims::new(user_id, 3600).encode(&self.jwt_secret).expect("encode token")
    }

    #[allow(dead_code)]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    #[allow(dead_code)]
    pub fn mgmt_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.mgmt_addr)
    }

    #[allow(dead_code)]
    pub fn ws_events_url(&self, conversation_id: Uuid, token: &str) -> String {
        format!("ws://{}/v1/conversations/{conversation_id}/events?token={token}", self.addr)
    }

    #[allow(dead_code)]
    pub async fn open_conversation(&self, token: &str, listing_id: Uuid, seller_id: Uuid) -> Value {
        let response = self
            .client
            .post(self.url("/v1/conversations"))
            .bearer_auth(token)
            .json(&json!({ "listingId": listing_id, "sellerId": seller_id }))
            .send()
            .await
            .expect("open conversation request");
        assert!(response.status().is_success(), "open conversation failed: {}", response.status());
        response.json().await.expect("conversation body")
    }

    #[allow(dead_code)]
    pub async fn send_message(&self, token: &str, conversation_id: Uuid, content: &str) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/v1/conversations/{conversation_id}/messages")))
            .bearer_auth(token)
            .json(&json!({ "content": content }))
            .send()
            .await
            .expect("send message request")
    }

    #[allow(dead_code)]
    pub async fn list_messages(&self, token: &str, conversation_id: Uuid) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/v1/conversations/{conversation_id}/messages")))
            .bearer_auth(token)
            .send()
            .await
            .expect("list messages request")
    }
}
