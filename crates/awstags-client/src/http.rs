//! # HTTP Tagging Client
//!
//! Production implementation of [`TaggingApi`] over `reqwest`, one instance
//! per regional endpoint.
//!
//! | Operation        | `X-Amz-Target`                                      | Body                                  |
//! |------------------|-----------------------------------------------------|---------------------------------------|
//! | `TagResources`   | `ResourceGroupsTaggingAPI_20170126.TagResources`    | `{"ResourceARNList", "Tags"}`         |
//! | `UntagResources` | `ResourceGroupsTaggingAPI_20170126.UntagResources`  | `{"ResourceARNList", "TagKeys"}`      |
//!
//! Both respond with `{"FailedResourcesMap": {arn: {...}}}`.
//!
//! Request signing is not done here. Point `endpoint_template` at a signing
//! proxy or an emulator; `api_token`, when set, is sent as a bearer token.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::{TagOperation, TaggingApi, TaggingApiFactory};
use crate::config::{ConfigError, TaggingConfig};
use crate::error::{FailedResource, TaggingApiError};

const AMZ_JSON: &str = "application/x-amz-json-1.1";
const AMZ_TARGET: &str = "x-amz-target";

#[derive(Debug, Serialize)]
struct TagResourcesRequest<'a> {
    #[serde(rename = "ResourceARNList")]
    resource_arn_list: &'a [String],
    #[serde(rename = "Tags")]
    tags: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct UntagResourcesRequest<'a> {
    #[serde(rename = "ResourceARNList")]
    resource_arn_list: &'a [String],
    #[serde(rename = "TagKeys")]
    tag_keys: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
struct MutationResponse {
    #[serde(rename = "FailedResourcesMap", default)]
    failed_resources_map: BTreeMap<String, FailedResource>,
}

/// Tagging client for one regional endpoint.
#[derive(Debug, Clone)]
pub struct HttpTaggingClient {
    http: reqwest::Client,
    endpoint: Url,
    region: String,
}

impl HttpTaggingClient {
    pub fn new(http: reqwest::Client, endpoint: Url, region: impl Into<String>) -> Self {
        Self {
            http,
            endpoint,
            region: region.into(),
        }
    }

    async fn send<B: Serialize + Sync>(&self, operation: TagOperation, body: &B) -> Result<(), TaggingApiError> {
        let endpoint = format!("{operation}@{}", self.region);

        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(AMZ_TARGET, operation.target())
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON)
            .json(body)
            .send()
            .await
            .map_err(|e| TaggingApiError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TaggingApiError::ApiError {
                endpoint,
                status,
                body,
            });
        }

        let text = resp.text().await.map_err(|e| TaggingApiError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        let parsed: MutationResponse = if text.trim().is_empty() {
            MutationResponse::default()
        } else {
            serde_json::from_str(&text).map_err(|e| TaggingApiError::Deserialization {
                endpoint: endpoint.clone(),
                source: e,
            })?
        };

        if !parsed.failed_resources_map.is_empty() {
            return Err(TaggingApiError::FailedResources {
                endpoint,
                failures: parsed.failed_resources_map,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaggingApi for HttpTaggingClient {
    fn region(&self) -> &str {
        &self.region
    }

    async fn tag_resources(
        &self,
        arns: &[String],
        tags: &BTreeMap<String, String>,
    ) -> Result<(), TaggingApiError> {
        let body = TagResourcesRequest {
            resource_arn_list: arns,
            tags,
        };
        self.send(TagOperation::TagResources, &body).await
    }

    async fn untag_resources(&self, arns: &[String], tag_keys: &[String]) -> Result<(), TaggingApiError> {
        let body = UntagResourcesRequest {
            resource_arn_list: arns,
            tag_keys,
        };
        self.send(TagOperation::UntagResources, &body).await
    }
}

/// Builds [`HttpTaggingClient`]s sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpTaggingFactory {
    http: reqwest::Client,
    config: TaggingConfig,
}

impl HttpTaggingFactory {
    pub fn new(config: TaggingConfig) -> Result<Self, TaggingApiError> {
        config.validate()?;
        if config.targets_aws_directly() {
            tracing::warn!(
                template = %config.endpoint_template,
                "endpoint is AWS itself; requests are unsigned and will be rejected without a signing proxy"
            );
        }

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let mut value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| ConfigError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| TaggingApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self { http, config })
    }
}

impl TaggingApiFactory for HttpTaggingFactory {
    fn connect(&self, region: &str) -> Result<Arc<dyn TaggingApi>, TaggingApiError> {
        let endpoint = self.config.endpoint_for(region)?;
        tracing::debug!(region, %endpoint, "tagging client created");
        Ok(Arc::new(HttpTaggingClient::new(self.http.clone(), endpoint, region)))
    }
}
