//! # Resource Provider Facade
//!
//! The engine hands each lifecycle call a resource kind and JSON blobs: the
//! declared inputs, and the state it persisted last time. State is the
//! inputs echoed back unchanged, so both blobs share one shape per kind.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use awstags_core::{DesiredState, ResourceTagArgs, TagResourcesArgs};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ReconcileError;
use crate::reconciler::{Outcome, Reconciler};

/// The declarable resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// One ARN, one tag.
    ResourceTag,
    /// Many ARNs, many tags.
    TagResources,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [Self::ResourceTag, Self::TagResources];

    /// Type token the engine uses for this kind.
    pub fn token(&self) -> &'static str {
        match self {
            Self::ResourceTag => "awstags:aws:ResourceTag",
            Self::TagResources => "awstags:index:TagResources",
        }
    }

    /// Parse a blob of this kind into the state it declares.
    pub fn desired_state(&self, blob: &Value) -> Result<DesiredState, ReconcileError> {
        let invalid = |e: serde_json::Error| ReconcileError::InvalidState {
            kind: self.token().to_string(),
            reason: e.to_string(),
        };
        match self {
            Self::ResourceTag => {
                let args = ResourceTagArgs::deserialize(blob).map_err(invalid)?;
                Ok(DesiredState::from(&args))
            }
            Self::TagResources => {
                let args = TagResourcesArgs::deserialize(blob).map_err(invalid)?;
                Ok(DesiredState::from(&args))
            }
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ResourceKind {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.token() == s)
            .ok_or_else(|| ReconcileError::InvalidState {
                kind: s.to_string(),
                reason: "unknown resource type token".into(),
            })
    }
}

/// Result of a create or update: the state to persist and what it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub state: Value,
    pub outcome: Outcome,
}

/// Lifecycle entry points keyed by resource kind.
#[derive(Debug, Clone)]
pub struct Provider {
    reconciler: Arc<Reconciler>,
}

impl Provider {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Create resource `name`. Returns the resource id (the name) and the
    /// state to persist.
    pub async fn create(
        &self,
        kind: ResourceKind,
        name: &str,
        inputs: &Value,
        preview: bool,
        cancel: &CancellationToken,
    ) -> Result<(String, Applied), ReconcileError> {
        let desired = kind.desired_state(inputs)?;
        let outcome = self.reconciler.create(&desired, preview, cancel).await?;
        tracing::info!(%kind, name, preview, calls = outcome.remote_calls, "resource created");
        Ok((
            name.to_string(),
            Applied {
                state: inputs.clone(),
                outcome,
            },
        ))
    }

    /// Move a resource from its persisted `old` state to new `inputs`.
    pub async fn update(
        &self,
        kind: ResourceKind,
        old: &Value,
        inputs: &Value,
        preview: bool,
        cancel: &CancellationToken,
    ) -> Result<Applied, ReconcileError> {
        let old_state = kind.desired_state(old)?;
        let new_state = kind.desired_state(inputs)?;
        let outcome = self
            .reconciler
            .update(&old_state, &new_state, preview, cancel)
            .await?;
        tracing::info!(%kind, preview, calls = outcome.remote_calls, "resource updated");
        Ok(Applied {
            state: inputs.clone(),
            outcome,
        })
    }

    /// Delete a resource given its persisted state.
    pub async fn delete(
        &self,
        kind: ResourceKind,
        state: &Value,
        preview: bool,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ReconcileError> {
        let desired = kind.desired_state(state)?;
        let outcome = self.reconciler.delete(&desired, preview, cancel).await?;
        tracing::info!(%kind, preview, calls = outcome.remote_calls, "resource deleted");
        Ok(outcome)
    }
}
