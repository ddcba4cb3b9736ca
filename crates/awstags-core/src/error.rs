//! # Error Types
//!
//! Identifier parsing is the only fallible operation in this crate.

use thiserror::Error;

/// A resource identifier could not be turned into a routable ARN.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArnError {
    /// The identifier does not start with `arn:`.
    #[error("malformed identifier {arn:?}: missing \"arn:\" prefix")]
    MissingPrefix {
        /// The offending identifier.
        arn: String,
    },

    /// The identifier has fewer than six colon-separated sections.
    #[error("malformed identifier {arn:?}: expected 6 sections, found {found}")]
    NotEnoughSections {
        /// The offending identifier.
        arn: String,
        /// Number of sections present.
        found: usize,
    },

    /// A mandatory section (partition, service, resource) is empty.
    #[error("malformed identifier {arn:?}: empty {section}")]
    EmptySection {
        /// The offending identifier.
        arn: String,
        /// Name of the empty section.
        section: &'static str,
    },

    /// A regional service ARN carries no region, so no endpoint can be chosen.
    #[error("malformed identifier {arn:?}: no region for service {service:?}")]
    MissingRegion {
        /// The offending identifier.
        arn: String,
        /// The service named by the ARN.
        service: String,
    },

    /// The region section holds characters no endpoint name can contain.
    #[error("malformed identifier {arn:?}: invalid region {region:?}")]
    InvalidRegion {
        /// The offending identifier.
        arn: String,
        /// The region section as written.
        region: String,
    },
}

impl ArnError {
    /// The identifier that failed to parse.
    pub fn arn(&self) -> &str {
        match self {
            Self::MissingPrefix { arn }
            | Self::NotEnoughSections { arn, .. }
            | Self::EmptySection { arn, .. }
            | Self::MissingRegion { arn, .. }
            | Self::InvalidRegion { arn, .. } => arn,
        }
    }
}
