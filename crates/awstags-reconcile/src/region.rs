//! # Region Grouping
//!
//! Plans the remote calls of one phase. Identifiers are routed with
//! [`routing_region`]; every identifier of the phase is routed before the
//! plan is returned, so a malformed identifier fails the phase before any of
//! its calls go out.
//!
//! Untag phases first group identifiers by the exact set of keys they lose,
//! so identifiers with a deferred pair still share calls with each other
//! but never lose a key they should keep.

use std::collections::{BTreeMap, BTreeSet};

use awstags_client::TagOperation;
use awstags_core::{routing_region, ArnError};
use awstags_lease::LeaseKey;

/// What a call sets or removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallBody {
    Tag(BTreeMap<String, String>),
    Untag(Vec<String>),
}

impl CallBody {
    pub fn operation(&self) -> TagOperation {
        match self {
            Self::Tag(_) => TagOperation::TagResources,
            Self::Untag(_) => TagOperation::UntagResources,
        }
    }
}

/// One remote call: a region, the ARNs routed there, and the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCall {
    pub region: String,
    pub arns: Vec<String>,
    pub body: CallBody,
}

/// Partition `arns` by routing region. Regions come out sorted.
pub fn group_by_region<'a, I>(arns: I) -> Result<BTreeMap<String, Vec<String>>, ArnError>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for arn in arns {
        groups.entry(routing_region(arn)?).or_default().push(arn.clone());
    }
    Ok(groups)
}

/// One tag call per region setting `tags` on every identifier.
pub fn plan_tag(
    identifiers: &BTreeSet<String>,
    tags: &BTreeMap<String, String>,
) -> Result<Vec<RegionCall>, ArnError> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }
    Ok(group_by_region(identifiers)?
        .into_iter()
        .map(|(region, arns)| RegionCall {
            region,
            arns,
            body: CallBody::Tag(tags.clone()),
        })
        .collect())
}

/// Untag calls removing exactly `pairs`: one per distinct key set and region.
pub fn plan_untag<'a, I>(pairs: I) -> Result<Vec<RegionCall>, ArnError>
where
    I: IntoIterator<Item = &'a LeaseKey>,
{
    let mut keys_by_arn: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for pair in pairs {
        keys_by_arn
            .entry(pair.identifier.as_str())
            .or_default()
            .insert(pair.tag_key.as_str());
    }

    let mut arns_by_keys: BTreeMap<Vec<String>, Vec<String>> = BTreeMap::new();
    for (arn, keys) in keys_by_arn {
        let keys = keys.into_iter().map(str::to_string).collect();
        arns_by_keys.entry(keys).or_default().push(arn.to_string());
    }

    let mut calls = Vec::new();
    for (keys, arns) in arns_by_keys {
        for (region, arns) in group_by_region(&arns)? {
            calls.push(RegionCall {
                region,
                arns,
                body: CallBody::Untag(keys.clone()),
            });
        }
    }
    Ok(calls)
}
