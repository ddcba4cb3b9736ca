//! # awstags-lease: Tag Lease Registry
//!
//! Serializes concurrent lifecycle operations that touch the same
//! `(ARN, tag key)` pair, and remembers whether the last holder of a pair
//! committed to writing it.
//!
//! ## Model
//!
//! Each [`LeaseKey`] owns a fair async mutex whose payload is the
//! *claimed-for-write* flag. Holding the mutex is holding the lease.
//!
//! - [`LeaseRegistry::acquire`] waits for the pair, then refuses the lease
//!   with [`LeaseError::WriteAlreadyClaimed`] if the flag is set. The mutex
//!   is released before the error is returned, so later callers never block
//!   on a refused lease.
//! - [`Lease::release`] stores the holder's `claim_write` decision into the
//!   flag and unlocks, waking the next waiter in arrival order.
//!
//! Entries are never removed. A key can be leased any number of times over
//! the life of the process, and the key space is bounded by what the engine
//! declares.
//!
//! ## Lock Order
//!
//! Every multi-key acquisition sorts and de-duplicates its keys before
//! taking any of them. Two batches that overlap therefore take the shared
//! keys in the same order and cannot wait on each other in a cycle.

pub mod error;
pub mod registry;

pub use error::LeaseError;
pub use registry::{ClaimState, Lease, LeaseGrant, LeaseKey, LeaseRegistry, LeaseSet};
