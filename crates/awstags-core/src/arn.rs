//! # Resource Identifiers
//!
//! Parses ARN-shaped identifiers of the form
//! `arn:<partition>:<service>:<region>:<account-id>:<resource>` and derives
//! the region a tagging call for that resource must be routed to.
//!
//! The resource section is everything after the fifth colon and may itself
//! contain `:` or `/` (`arn:aws:logs:us-east-1:1234:log-group:/app:*`).
//! Region and account id may be empty; partition, service and resource may not.

use std::fmt;
use std::str::FromStr;

use crate::error::ArnError;

/// Region used to route calls for globally scoped services.
///
/// S3 bucket ARNs carry no region; the tagging endpoint in `us-east-1`
/// accepts them.
pub const GLOBAL_SERVICE_REGION: &str = "us-east-1";

/// Services whose ARNs are always routed to [`GLOBAL_SERVICE_REGION`].
const GLOBAL_SERVICES: &[&str] = &["s3"];

const PREFIX: &str = "arn:";

/// A parsed ARN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceArn {
    /// Partition, e.g. `aws`, `aws-cn`.
    pub partition: String,
    /// Service namespace, e.g. `s3`, `lambda`.
    pub service: String,
    /// Region, possibly empty.
    pub region: String,
    /// Account id, possibly empty.
    pub account_id: String,
    /// Service-specific resource path.
    pub resource: String,
}

impl ResourceArn {
    /// Parse an identifier into its ARN sections.
    pub fn parse(arn: &str) -> Result<Self, ArnError> {
        if !arn.starts_with(PREFIX) {
            return Err(ArnError::MissingPrefix { arn: arn.to_string() });
        }

        let sections: Vec<&str> = arn.splitn(6, ':').collect();
        if sections.len() != 6 {
            return Err(ArnError::NotEnoughSections {
                arn: arn.to_string(),
                found: sections.len(),
            });
        }

        let empty = |section: &'static str| ArnError::EmptySection {
            arn: arn.to_string(),
            section,
        };
        if sections[1].is_empty() {
            return Err(empty("partition"));
        }
        if sections[2].is_empty() {
            return Err(empty("service"));
        }
        if sections[5].is_empty() {
            return Err(empty("resource"));
        }

        Ok(Self {
            partition: sections[1].to_string(),
            service: sections[2].to_string(),
            region: sections[3].to_string(),
            account_id: sections[4].to_string(),
            resource: sections[5].to_string(),
        })
    }

    /// Whether this ARN belongs to a service without a native region.
    pub fn is_global_service(&self) -> bool {
        GLOBAL_SERVICES.contains(&self.service.as_str())
    }

    /// The region whose tagging endpoint handles this resource.
    ///
    /// Global services resolve to [`GLOBAL_SERVICE_REGION`]; any other
    /// service must name its region in lowercase ASCII letters, digits and
    /// `-`, the only characters a regional endpoint name can hold.
    pub fn routing_region(&self) -> Result<&str, ArnError> {
        if self.is_global_service() {
            return Ok(GLOBAL_SERVICE_REGION);
        }
        if self.region.is_empty() {
            return Err(ArnError::MissingRegion {
                arn: self.to_string(),
                service: self.service.clone(),
            });
        }
        if !is_region_name(&self.region) {
            return Err(ArnError::InvalidRegion {
                arn: self.to_string(),
                region: self.region.clone(),
            });
        }
        Ok(&self.region)
    }
}

fn is_region_name(region: &str) -> bool {
    region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Parse `arn` and return the region its tagging calls are routed to.
pub fn routing_region(arn: &str) -> Result<String, ArnError> {
    ResourceArn::parse(arn)?.routing_region().map(str::to_string)
}

impl FromStr for ResourceArn {
    type Err = ArnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}
