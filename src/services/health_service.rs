use crate::error::Result;
use crate::storage::ChatStore;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Clone, Debug)]
struct Metrics {
    status: Gauge<i64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("revenda-chat");
        Self {
            status: meter
                .i64_gauge("revenda_chat_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    store: Arc<dyn ChatStore>,
    check_timeout: Duration,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store, check_timeout: Duration::from_secs(2), metrics: Metrics::new() }
    }

    /// # Errors
    /// Returns the underlying error, or `AppError::Internal` on timeout.
    pub async fn check_store(&self) -> Result<()> {
        let result = match timeout(self.check_timeout, self.store.ping()).await {
            Ok(inner) => inner,
            Err(_) => Err(crate::error::AppError::Internal),
        };

        let value = i64::from(result.is_ok());
        self.metrics.status.record(value, &[KeyValue::new("component", "store")]);
        result
    }
}
