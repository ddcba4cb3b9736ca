//! Reconciler error types.

use awstags_client::{RateLimitError, TagOperation, TaggingApiError};
use awstags_core::ArnError;
use awstags_lease::LeaseError;

/// Errors surfaced by a lifecycle operation.
///
/// Every variant is fatal to the operation that raised it. Deletes never see
/// [`LeaseContention`](Self::LeaseContention): a claimed pair is deferred
/// there instead.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Another operation already claimed a write for a pair this one must
    /// write.
    #[error("lease contention: {0}")]
    LeaseContention(#[from] LeaseError),

    /// An identifier could not be routed to a region.
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] ArnError),

    /// A tagging call failed. Calls already made stay applied.
    #[error("{operation} in {region} failed: {source}")]
    RemoteCallFailure {
        region: String,
        operation: TagOperation,
        #[source]
        source: TaggingApiError,
    },

    /// The caller cancelled while waiting for the rate limiter.
    #[error("cancelled while waiting for the rate limiter")]
    RateLimitWaitCancelled,

    /// A state blob did not match its resource kind.
    #[error("invalid {kind} state: {reason}")]
    InvalidState { kind: String, reason: String },
}

impl From<RateLimitError> for ReconcileError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Cancelled => Self::RateLimitWaitCancelled,
        }
    }
}
