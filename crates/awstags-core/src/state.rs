//! # Desired State and Resource Arguments
//!
//! The engine persists the arguments of each declared resource verbatim and
//! hands them back as the old state on the next update or delete. Two shapes
//! exist, and both reduce to one [`DesiredState`]:
//!
//! | Kind token                    | Arguments            | Cardinality            |
//! |-------------------------------|----------------------|------------------------|
//! | `awstags:aws:ResourceTag`     | [`ResourceTagArgs`]  | one ARN, one tag       |
//! | `awstags:index:TagResources`  | [`TagResourcesArgs`] | many ARNs, many tags   |

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::tag::TagPair;

/// The tags that should exist on a set of resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    pub identifiers: BTreeSet<String>,
    pub tags: BTreeMap<String, String>,
}

impl DesiredState {
    pub fn new<I, T, K, V>(identifiers: I, tags: T) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            tags: tags
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The one-identifier, one-tag case.
    pub fn single(identifier: impl Into<String>, tag: TagPair) -> Self {
        let identifier: String = identifier.into();
        Self::new([identifier], [(tag.key, tag.value)])
    }

    /// Tag keys in sorted order.
    pub fn tag_keys(&self) -> Vec<String> {
        self.tags.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty() || self.tags.is_empty()
    }
}

/// Arguments (and echoed state) of a single-tag resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTagArgs {
    #[serde(rename = "resourceARN")]
    pub resource_arn: String,
    pub tag: TagPair,
}

/// Arguments (and echoed state) of a batch tagging resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResourcesArgs {
    #[serde(rename = "resourceARNList")]
    pub resource_arn_list: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl From<&ResourceTagArgs> for DesiredState {
    fn from(args: &ResourceTagArgs) -> Self {
        DesiredState::single(args.resource_arn.clone(), args.tag.clone())
    }
}

impl From<&TagResourcesArgs> for DesiredState {
    fn from(args: &TagResourcesArgs) -> Self {
        DesiredState::new(args.resource_arn_list.iter().cloned(), args.tags.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_tag_args_use_engine_field_names() {
        let args: ResourceTagArgs = serde_json::from_value(json!({
            "resourceARN": "arn:aws:s3:::bucket",
            "tag": {"key": "team", "value": ""}
        }))
        .unwrap();
        assert_eq!(args.tag, TagPair::new("team", ""));

        let state = DesiredState::from(&args);
        assert_eq!(state.identifiers.len(), 1);
        assert_eq!(state.tags.get("team").map(String::as_str), Some(""));
    }

    #[test]
    fn tag_resources_args_echo_verbatim() {
        let raw = json!({
            "resourceARNList": ["arn:aws:sqs:us-east-1:1:b", "arn:aws:sqs:us-east-1:1:a"],
            "tags": {"env": "prod", "app": "web"}
        });
        let args: TagResourcesArgs = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&args).unwrap(), raw);
    }

    #[test]
    fn duplicate_identifiers_collapse_in_desired_state() {
        let args = TagResourcesArgs {
            resource_arn_list: vec!["arn:aws:sns:us-east-1:1:t".into(); 3],
            tags: BTreeMap::from([("k".to_string(), "v".to_string())]),
        };
        let state = DesiredState::from(&args);
        assert_eq!(state.identifiers.len(), 1);
        assert_eq!(state.tag_keys(), vec!["k".to_string()]);
    }

    #[test]
    fn missing_tags_deserialize_as_empty() {
        let args: TagResourcesArgs =
            serde_json::from_value(json!({"resourceARNList": []})).unwrap();
        assert!(DesiredState::from(&args).is_empty());
    }
}
