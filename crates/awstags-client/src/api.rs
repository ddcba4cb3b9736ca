//! The remote tagging service as seen by the reconciler.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TaggingApiError;

/// Service prefix of every `X-Amz-Target` header.
const TARGET_PREFIX: &str = "ResourceGroupsTaggingAPI_20170126";

/// The two mutations the reconciler issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagOperation {
    TagResources,
    UntagResources,
}

impl TagOperation {
    /// Value of the `X-Amz-Target` header for this operation.
    pub fn target(&self) -> String {
        format!("{TARGET_PREFIX}.{self}")
    }
}

impl fmt::Display for TagOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TagResources => "TagResources",
            Self::UntagResources => "UntagResources",
        })
    }
}

/// A tagging client bound to one region.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// across concurrent reconciler tasks behind an `Arc`.
#[async_trait]
pub trait TaggingApi: Send + Sync + fmt::Debug {
    /// Region this client routes to.
    fn region(&self) -> &str;

    /// Set `tags` on every resource in `arns`.
    async fn tag_resources(
        &self,
        arns: &[String],
        tags: &BTreeMap<String, String>,
    ) -> Result<(), TaggingApiError>;

    /// Remove `tag_keys` from every resource in `arns`.
    async fn untag_resources(&self, arns: &[String], tag_keys: &[String]) -> Result<(), TaggingApiError>;
}

/// Builds the client for a region. Called at most once per region by
/// [`ClientCache`](crate::ClientCache).
pub trait TaggingApiFactory: Send + Sync + fmt::Debug {
    fn connect(&self, region: &str) -> Result<Arc<dyn TaggingApi>, TaggingApiError>;
}
