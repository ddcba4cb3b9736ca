//! # awstags-reconcile: Batch Tag Reconciler
//!
//! Turns a lifecycle call (create, update, delete) over a [`DesiredState`]
//! into the minimal set of remote tag and untag calls, while holding a lease
//! on every `(ARN, tag key)` pair it touches.
//!
//! ## Pipeline
//!
//! 1. **Diff** ([`TagDiff`]): old and new state split into removed keys,
//!    removed identifiers and kept identifiers.
//! 2. **Lease**: every affected pair is leased in one sorted pass. Apply
//!    pairs are required; removal pairs yield to a pending write and are
//!    reported as deferred instead.
//! 3. **Plan** ([`region`]): each remote phase is grouped by routing region
//!    right before it runs. Identifiers that lose the same keys share a call.
//! 4. **Dispatch**: one call per region and phase, each behind the shared
//!    [`RateLimiter`](awstags_client::RateLimiter).
//! 5. **Release**: only after every call succeeded. Removal leases release
//!    unclaimed, apply leases release claimed. On error the leases are
//!    dropped and the pairs stay unclaimed.
//!
//! In preview, steps 3 and 4 are skipped and step 5 still runs, so
//! concurrent real operations see the claim the preview would have made.
//!
//! [`Provider`] maps the two declared resource kinds and their JSON state
//! onto the [`Reconciler`].
//!
//! [`DesiredState`]: awstags_core::DesiredState

pub mod diff;
pub mod error;
pub mod provider;
pub mod reconciler;
pub mod region;

pub use diff::{lease_keys, TagDiff};
pub use error::ReconcileError;
pub use provider::{Applied, Provider, ResourceKind};
pub use reconciler::{Outcome, Reconciler};
pub use region::{CallBody, RegionCall};
