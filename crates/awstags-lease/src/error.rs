//! Lease acquisition errors.

use thiserror::Error;

/// Why a lease was not granted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaseError {
    /// A previous holder released the pair with a write claim.
    #[error("a write operation has already been registered for tag {tag_key:?} on ARN {identifier:?}")]
    WriteAlreadyClaimed {
        /// ARN of the contended pair.
        identifier: String,
        /// Tag key of the contended pair.
        tag_key: String,
    },
}
