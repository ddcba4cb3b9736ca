//! # awstags-client: Resource Groups Tagging API Boundary
//!
//! Everything the reconciler needs from the remote tagging service, behind
//! one object-safe trait:
//!
//! - [`TaggingApi`]: `tag_resources` / `untag_resources` against one region.
//! - [`HttpTaggingClient`]: speaks the service's JSON 1.1 protocol over
//!   `reqwest`.
//! - [`RecordingTaggingApi`]: in-memory backend that records every call, for
//!   tests and dry runs.
//! - [`ClientCache`]: one client per region, created on first use and kept
//!   for the life of the process.
//! - [`RateLimiter`]: token bucket shared by every region and every
//!   concurrent operation.
//!
//! ## Protocol
//!
//! ```text
//! POST {endpoint}
//! X-Amz-Target: ResourceGroupsTaggingAPI_20170126.TagResources
//! Content-Type: application/x-amz-json-1.1
//!
//! {"ResourceARNList": [...], "Tags": {...}}
//! ```
//!
//! A 2xx response may still carry a non-empty `FailedResourcesMap`; that is
//! reported as [`TaggingApiError::FailedResources`].
//!
//! Calls are never retried here. The only pacing is the rate limiter.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod rate_limit;

pub use api::{TagOperation, TaggingApi, TaggingApiFactory};
pub use cache::ClientCache;
pub use config::{ConfigError, TaggingConfig};
pub use error::{FailedResource, TaggingApiError};
pub use http::{HttpTaggingClient, HttpTaggingFactory};
pub use mock::{RecordedCall, RecordingFactory, RecordingTaggingApi};
pub use rate_limit::{RateLimitConfig, RateLimitError, RateLimiter};
