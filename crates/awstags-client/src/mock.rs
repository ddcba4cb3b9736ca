//! # Recording Tagging Backend
//!
//! In-memory [`TaggingApi`] for tests and dry runs. Every call made through
//! any client produced by one [`RecordingFactory`] lands in a single shared,
//! ordered log.
//!
//! Failures can be injected per region, either at connect time
//! ([`RecordingFactory::refuse_connect`]) or per call
//! ([`RecordingFactory::fail_region`]). A failed call is still recorded.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::api::{TagOperation, TaggingApi, TaggingApiFactory};
use crate::error::TaggingApiError;

/// One call seen by the recording backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub region: String,
    pub operation: TagOperation,
    pub arns: Vec<String>,
    /// Tags set, for [`TagOperation::TagResources`].
    pub tags: BTreeMap<String, String>,
    /// Keys removed, for [`TagOperation::UntagResources`].
    pub tag_keys: Vec<String>,
    /// When the call was dispatched.
    pub at: Instant,
}

#[derive(Debug, Default)]
struct Shared {
    calls: Mutex<Vec<RecordedCall>>,
    failing: Mutex<HashSet<String>>,
}

/// Hands out [`RecordingTaggingApi`] clients sharing one call log.
#[derive(Debug, Default)]
pub struct RecordingFactory {
    shared: Arc<Shared>,
    refused: Mutex<HashSet<String>>,
    connections: AtomicUsize,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, in dispatch order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.shared.calls.lock().clone()
    }

    /// Calls of one operation, in dispatch order.
    pub fn calls_of(&self, operation: TagOperation) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation == operation)
            .collect()
    }

    /// Make every subsequent call routed to `region` fail.
    pub fn fail_region(&self, region: &str) {
        self.shared.failing.lock().insert(region.to_string());
    }

    /// Make connecting to `region` fail.
    pub fn refuse_connect(&self, region: &str) {
        self.refused.lock().insert(region.to_string());
    }

    /// Number of clients created.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl TaggingApiFactory for RecordingFactory {
    fn connect(&self, region: &str) -> Result<Arc<dyn TaggingApi>, TaggingApiError> {
        if self.refused.lock().contains(region) {
            return Err(TaggingApiError::Rejected {
                endpoint: format!("connect@{region}"),
                reason: "connection refused by recording backend".into(),
            });
        }
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(RecordingTaggingApi {
            region: region.to_string(),
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Recording client bound to one region.
#[derive(Debug)]
pub struct RecordingTaggingApi {
    region: String,
    shared: Arc<Shared>,
}

impl RecordingTaggingApi {
    fn record(&self, call: RecordedCall) -> Result<(), TaggingApiError> {
        let operation = call.operation;
        self.shared.calls.lock().push(call);
        if self.shared.failing.lock().contains(&self.region) {
            return Err(TaggingApiError::Rejected {
                endpoint: format!("{operation}@{}", self.region),
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaggingApi for RecordingTaggingApi {
    fn region(&self) -> &str {
        &self.region
    }

    async fn tag_resources(
        &self,
        arns: &[String],
        tags: &BTreeMap<String, String>,
    ) -> Result<(), TaggingApiError> {
        self.record(RecordedCall {
            region: self.region.clone(),
            operation: TagOperation::TagResources,
            arns: arns.to_vec(),
            tags: tags.clone(),
            tag_keys: Vec::new(),
            at: Instant::now(),
        })
    }

    async fn untag_resources(&self, arns: &[String], tag_keys: &[String]) -> Result<(), TaggingApiError> {
        self.record(RecordedCall {
            region: self.region.clone(),
            operation: TagOperation::UntagResources,
            arns: arns.to_vec(),
            tags: BTreeMap::new(),
            tag_keys: tag_keys.to_vec(),
            at: Instant::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clients_share_one_log() {
        let factory = RecordingFactory::new();
        let east = factory.connect("us-east-1").unwrap();
        let west = factory.connect("us-west-2").unwrap();

        east.untag_resources(&["a".into()], &["k".into()]).await.unwrap();
        west.tag_resources(&["b".into()], &BTreeMap::from([("k".into(), "v".into())]))
            .await
            .unwrap();

        let calls = factory.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].operation, TagOperation::UntagResources);
        assert_eq!(calls[0].tag_keys, vec!["k".to_string()]);
        assert_eq!(calls[1].region, "us-west-2");
        assert_eq!(factory.calls_of(TagOperation::TagResources).len(), 1);
    }

    #[tokio::test]
    async fn injected_failure_is_recorded_and_reported() {
        let factory = RecordingFactory::new();
        factory.fail_region("eu-west-1");
        let client = factory.connect("eu-west-1").unwrap();

        let err = client
            .untag_resources(&["a".into()], &["k".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, TaggingApiError::Rejected { .. }));
        assert_eq!(factory.calls().len(), 1);
    }
}
