//! # awstags-core: Foundational Types for Tag Reconciliation
//!
//! Defines the vocabulary shared by every other crate in the workspace:
//! parsed resource identifiers, tag pairs, and the desired-state model the
//! reconciler diffs. Depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One desired-state model.** A single-tag declaration and a
//!    multi-resource, multi-tag declaration are both a [`DesiredState`];
//!    the former is the one-identifier, one-tag case.
//!
//! 2. **Ordered collections.** Identifiers and tags live in `BTreeSet` /
//!    `BTreeMap`, so every list derived from them (lease keys, region groups,
//!    tag-key lists) comes out in the same order on every run.
//!
//! 3. **Routing is not data.** [`ResourceArn::routing_region`] only decides
//!    which regional endpoint a call goes to. It never rewrites an identifier.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `awstags-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod arn;
pub mod error;
pub mod state;
pub mod tag;

pub use arn::{routing_region, ResourceArn, GLOBAL_SERVICE_REGION};
pub use error::ArnError;
pub use state::{DesiredState, ResourceTagArgs, TagResourcesArgs};
pub use tag::TagPair;
