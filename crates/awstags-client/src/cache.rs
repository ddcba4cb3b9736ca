//! Per-region client cache.
//!
//! Regions form a small, bounded key space, so clients are created on first
//! use and never evicted.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::{TaggingApi, TaggingApiFactory};
use crate::error::TaggingApiError;

#[derive(Debug)]
pub struct ClientCache {
    factory: Arc<dyn TaggingApiFactory>,
    clients: Mutex<HashMap<String, Arc<dyn TaggingApi>>>,
}

impl ClientCache {
    pub fn new(factory: Arc<dyn TaggingApiFactory>) -> Self {
        Self {
            factory,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// The client for `region`, connecting on first use.
    pub fn get(&self, region: &str) -> Result<Arc<dyn TaggingApi>, TaggingApiError> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(region) {
            return Ok(Arc::clone(client));
        }

        let client = self.factory.connect(region)?;
        clients.insert(region.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Number of regions connected so far.
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingFactory;

    #[test]
    fn connects_once_per_region() {
        let factory = Arc::new(RecordingFactory::new());
        let cache = ClientCache::new(factory.clone());

        let a = cache.get("us-east-1").unwrap();
        let b = cache.get("us-east-1").unwrap();
        cache.get("eu-west-1").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.region(), "us-east-1");
        assert_eq!(cache.len(), 2);
        assert_eq!(factory.connections(), 2);
    }

    #[test]
    fn failed_connect_is_not_cached() {
        let factory = Arc::new(RecordingFactory::new());
        factory.refuse_connect("ap-south-1");
        let cache = ClientCache::new(factory.clone());

        assert!(cache.get("ap-south-1").is_err());
        assert!(cache.is_empty());
    }
}
