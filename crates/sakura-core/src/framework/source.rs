//! The update source: one `getUpdates` call per fetch.

use std::collections::BTreeSet;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::foundation::{BoxedTransport, SourceError, SourceResult, Update};

/// Method name of the long-polling endpoint.
pub const GET_UPDATES: &str = "getUpdates";

/// Fixed options sent with every fetch. Unset options are omitted from the
/// request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOptions {
    /// Update tags to receive. `None` keeps the server-side setting.
    pub allowed_updates: Option<BTreeSet<String>>,
    /// Long-poll timeout, sent in whole seconds.
    pub timeout: Option<Duration>,
    /// Maximum batch size.
    pub limit: Option<u32>,
}

impl PollOptions {
    /// Builds the `getUpdates` parameter object for `offset`.
    pub fn to_params(&self, offset: i64) -> Value {
        let mut params = Map::new();
        params.insert("offset".to_string(), Value::from(offset));
        if let Some(allowed) = &self.allowed_updates {
            params.insert(
                "allowed_updates".to_string(),
                Value::from(allowed.iter().cloned().collect::<Vec<_>>()),
            );
        }
        if let Some(timeout) = self.timeout {
            params.insert("timeout".to_string(), Value::from(timeout.as_secs()));
        }
        if let Some(limit) = self.limit {
            params.insert("limit".to_string(), Value::from(limit));
        }
        Value::Object(params)
    }
}

/// Fetches batches of updates through a transport.
#[derive(Clone)]
pub struct UpdateSource {
    transport: BoxedTransport,
    options: PollOptions,
}

impl UpdateSource {
    /// Creates a source with fixed `options`.
    pub fn new(transport: BoxedTransport, options: PollOptions) -> Self {
        Self { transport, options }
    }

    /// The options sent with every fetch.
    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Requests the updates with id `>= offset`.
    ///
    /// The returned batch is ordered by increasing `update_id`. May suspend
    /// for up to the configured timeout.
    pub async fn fetch(&self, offset: i64) -> SourceResult<Vec<Update>> {
        let params = self.options.to_params(offset);
        debug!(offset, "Fetching updates");

        let response = self.transport.call(GET_UPDATES, params).await?;
        let result = response.into_result(GET_UPDATES)?;

        let mut batch: Vec<Update> = serde_json::from_value(result)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        if !batch.is_sorted_by_key(Update::id) {
            warn!(offset, "Received out-of-order batch, sorting");
            batch.sort_by_key(Update::id);
        }

        debug!(offset, count = batch.len(), "Fetched updates");
        Ok(batch)
    }
}

impl std::fmt::Debug for UpdateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateSource")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::{ApiResponse, Transport, TransportError, TransportResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    struct Recorder {
        response: TransportResult<ApiResponse<Value>>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl Recorder {
        fn new(response: TransportResult<ApiResponse<Value>>) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn call(&self, method: &str, params: Value) -> TransportResult<ApiResponse<Value>> {
            self.calls.lock().push((method.to_string(), params));
            self.response.clone()
        }
    }

    #[test]
    fn test_unset_options_are_omitted() {
        assert_eq!(PollOptions::default().to_params(-1), json!({ "offset": -1 }));

        let options = PollOptions {
            allowed_updates: Some(["message".to_string(), "callback_query".to_string()].into()),
            timeout: Some(Duration::from_millis(30_900)),
            limit: Some(50),
        };
        assert_eq!(
            options.to_params(7),
            json!({
                "offset": 7,
                "allowed_updates": ["callback_query", "message"],
                "timeout": 30,
                "limit": 50
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_returns_sorted_batch() {
        let transport = Recorder::new(Ok(ApiResponse::success(json!([
            { "update_id": 12, "message": {} },
            { "update_id": 10, "message": {} },
            { "update_id": 11, "edited_message": {} }
        ]))));
        let source = UpdateSource::new(transport.clone(), PollOptions::default());

        let batch = source.fetch(10).await.unwrap();
        let ids: Vec<i64> = batch.iter().map(Update::id).collect();
        assert_eq!(ids, vec![10, 11, 12]);

        let calls = transport.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, GET_UPDATES);
        assert_eq!(calls[0].1["offset"], 10);
    }

    #[tokio::test]
    async fn test_fetch_failures_become_source_errors() {
        let refused = Recorder::new(Err(TransportError::Timeout));
        let err = UpdateSource::new(refused, PollOptions::default())
            .fetch(0)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Transport(TransportError::Timeout)));

        let conflict = Recorder::new(Ok(ApiResponse::failure(409, "Conflict")));
        let err = UpdateSource::new(conflict, PollOptions::default())
            .fetch(0)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Remote { code: Some(409), .. }));
        assert!(err.to_string().contains("Conflict"));

        let garbage = Recorder::new(Ok(ApiResponse::success(json!({ "not": "a list" }))));
        let err = UpdateSource::new(garbage, PollOptions::default())
            .fetch(0)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }
}
