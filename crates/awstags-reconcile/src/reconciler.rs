//! # Reconciler
//!
//! Create, update and delete over [`DesiredState`], shared by both resource
//! kinds. One [`Reconciler`] serves every concurrent lifecycle call of the
//! process; the lease registry, the client cache and the rate limiter are
//! its only shared state.
//!
//! Leases are taken before any remote call and released only once every
//! call of the operation succeeded. A failed operation drops its leases, so
//! its pairs stay unclaimed and a later delete is not skipped because of a
//! write that never happened.

use std::sync::Arc;

use awstags_client::{ClientCache, RateLimiter, TaggingApiFactory};
use awstags_core::DesiredState;
use awstags_lease::{LeaseKey, LeaseRegistry};
use tokio_util::sync::CancellationToken;

use crate::diff::{lease_keys, TagDiff};
use crate::error::ReconcileError;
use crate::region::{plan_tag, plan_untag, CallBody, RegionCall};

/// What a lifecycle operation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Remote calls dispatched. Always zero in preview.
    pub remote_calls: usize,
    /// Removal pairs skipped because another operation claimed a write on
    /// them.
    pub deferred: Vec<LeaseKey>,
}

/// Batch tag reconciler.
#[derive(Debug)]
pub struct Reconciler {
    leases: Arc<LeaseRegistry>,
    clients: ClientCache,
    limiter: Arc<RateLimiter>,
}

impl Reconciler {
    pub fn new(
        leases: Arc<LeaseRegistry>,
        factory: Arc<dyn TaggingApiFactory>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            leases,
            clients: ClientCache::new(factory),
            limiter,
        }
    }

    pub fn leases(&self) -> &LeaseRegistry {
        &self.leases
    }

    /// Bring `desired` into existence.
    ///
    /// Every pair must be leasable; a pair another operation claimed fails
    /// with [`ReconcileError::LeaseContention`] before any remote call.
    pub async fn create(
        &self,
        desired: &DesiredState,
        preview: bool,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ReconcileError> {
        if desired.is_empty() {
            tracing::debug!("create declares no pairs");
            return Ok(Outcome::default());
        }
        let grant = self.leases.acquire_batch(lease_keys(desired), Vec::new()).await?;

        if preview {
            tracing::info!(pairs = grant.required.len(), "preview create: no remote calls");
            grant.required.release(true);
            return Ok(Outcome::default());
        }

        let remote_calls = self
            .dispatch(plan_tag(&desired.identifiers, &desired.tags)?, cancel)
            .await?;
        grant.required.release(true);
        Ok(Outcome {
            remote_calls,
            deferred: Vec::new(),
        })
    }

    /// Remove the tags of `state`.
    ///
    /// Pairs another operation has claimed are left alone and reported in
    /// [`Outcome::deferred`]; that write owns their future state.
    pub async fn delete(
        &self,
        state: &DesiredState,
        preview: bool,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ReconcileError> {
        if state.is_empty() {
            tracing::debug!("delete declares no pairs");
            return Ok(Outcome::default());
        }
        let grant = self.leases.acquire_batch(Vec::new(), lease_keys(state)).await?;
        if !grant.deferred.is_empty() {
            tracing::info!(
                deferred = grant.deferred.len(),
                "delete skipped pairs claimed by a pending write"
            );
        }

        if preview {
            tracing::info!(pairs = grant.yielding.len(), "preview delete: no remote calls");
            grant.yielding.release(false);
            return Ok(Outcome {
                remote_calls: 0,
                deferred: grant.deferred,
            });
        }

        let remote_calls = self.dispatch(plan_untag(grant.yielding.keys())?, cancel).await?;
        grant.yielding.release(false);
        Ok(Outcome {
            remote_calls,
            deferred: grant.deferred,
        })
    }

    /// Move from `old` to `new`.
    ///
    /// Remote phases run in order: untag identifiers no longer declared,
    /// untag removed keys from the identifiers that stay, then tag every new
    /// identifier with the full new tag set. A removal pair claimed by
    /// another operation is deferred; a claimed apply pair is
    /// [`ReconcileError::LeaseContention`].
    pub async fn update(
        &self,
        old: &DesiredState,
        new: &DesiredState,
        preview: bool,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ReconcileError> {
        let diff = TagDiff::between(old, new);
        let grant = self
            .leases
            .acquire_batch(lease_keys(new), diff.removal_leases())
            .await?;
        if !grant.deferred.is_empty() {
            tracing::info!(
                deferred = grant.deferred.len(),
                "update skipped removals claimed by a pending write"
            );
        }

        if preview {
            tracing::info!(
                removals = grant.yielding.len(),
                applies = grant.required.len(),
                "preview update: no remote calls"
            );
            grant.yielding.release(false);
            grant.required.release(true);
            return Ok(Outcome {
                remote_calls: 0,
                deferred: grant.deferred,
            });
        }

        let mut remote_calls = 0;
        if diff.is_additive() {
            tracing::debug!("update removes nothing, skipping untag phases");
        } else {
            let (dropped, stripped): (Vec<&LeaseKey>, Vec<&LeaseKey>) = grant
                .yielding
                .keys()
                .partition(|k| diff.removed_identifiers.contains(&k.identifier));
            remote_calls += self.dispatch(plan_untag(dropped)?, cancel).await?;
            remote_calls += self.dispatch(plan_untag(stripped)?, cancel).await?;
        }
        remote_calls += self
            .dispatch(plan_tag(&new.identifiers, &new.tags)?, cancel)
            .await?;

        grant.yielding.release(false);
        grant.required.release(true);
        Ok(Outcome {
            remote_calls,
            deferred: grant.deferred,
        })
    }

    /// Issue `calls` in order, each after a rate limiter token. Stops at the
    /// first failure.
    async fn dispatch(&self, calls: Vec<RegionCall>, cancel: &CancellationToken) -> Result<usize, ReconcileError> {
        let count = calls.len();
        for call in calls {
            let operation = call.body.operation();
            let failure = |source| ReconcileError::RemoteCallFailure {
                region: call.region.clone(),
                operation,
                source,
            };

            self.limiter.wait(cancel).await?;
            let client = self.clients.get(&call.region).map_err(failure)?;
            tracing::info!(region = %call.region, %operation, arns = call.arns.len(), "dispatching tagging call");

            let result = match &call.body {
                CallBody::Tag(tags) => client.tag_resources(&call.arns, tags).await,
                CallBody::Untag(keys) => client.untag_resources(&call.arns, keys).await,
            };
            result.map_err(failure)?;
        }
        Ok(count)
    }
}
