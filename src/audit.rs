use crate::provider::adapter::ProviderCall;
use crate::request::RequestInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// One record per adapter invocation, for diagnostics and callback replay.
///
/// Opened before the adapter runs, closed in all cases - including on
/// errors, which are captured in `error_raw` and re-raised to the caller.
/// Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCallLog {
    pub order_id: i64,
    pub method_name: String,
    pub provider_name: String,
    pub call: ProviderCall,
    pub request_raw: String,
    pub response_raw: Option<String>,
    pub error_raw: Option<String>,
    /// Free-text diagnostics appended by the engine or adapter.
    pub log_text: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ProviderCallLog {
    pub fn open(
        order_id: i64,
        method_name: impl Into<String>,
        provider_name: impl Into<String>,
        call: ProviderCall,
        request: &RequestInfo,
    ) -> Self {
        Self {
            order_id,
            method_name: method_name.into(),
            provider_name: provider_name.into(),
            call,
            request_raw: request.to_raw(),
            response_raw: None,
            error_raw: None,
            log_text: String::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    pub fn append(&mut self, message: &str) {
        self.log_text.push_str(message);
        self.log_text.push('\n');
    }

    pub fn close(&mut self) {
        self.end_time = Some(Utc::now());
    }
}

#[async_trait]
pub trait CallLogStore: Send + Sync {
    async fn record(&self, entry: ProviderCallLog);

    async fn for_order(&self, order_id: i64) -> Vec<ProviderCallLog>;
}

#[derive(Default)]
pub struct InMemoryCallLogStore {
    entries: Mutex<Vec<ProviderCallLog>>,
}

impl InMemoryCallLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<ProviderCallLog> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl CallLogStore for InMemoryCallLogStore {
    async fn record(&self, entry: ProviderCallLog) {
        self.entries.lock().await.push(entry);
    }

    async fn for_order(&self, order_id: i64) -> Vec<ProviderCallLog> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_are_closed_with_an_end_timestamp() {
        let store = InMemoryCallLogStore::new();
        let request = RequestInfo::default();
        let mut entry =
            ProviderCallLog::open(1, "card_usd", "formgate", ProviderCall::Start, &request);
        entry.append("initiating payment");
        entry.response_raw = Some("ok".to_string());
        entry.close();
        store.record(entry).await;

        let logged = store.for_order(1).await;
        assert_eq!(logged.len(), 1);
        assert!(logged[0].end_time.is_some());
        assert_eq!(logged[0].log_text, "initiating payment\n");
        assert!(store.for_order(2).await.is_empty());
    }
}
