//! # awstags-cli: Command-Line Lifecycle Driver
//!
//! Runs one lifecycle call of a declared tagging resource outside the
//! engine, against JSON files holding its inputs or persisted state:
//!
//! ```bash
//! awstags create --kind tag-resources --name web-tags --inputs web.json
//! awstags update --kind tag-resources --old web.json --new web-v2.json --preview
//! awstags delete --kind resource-tag --state bucket-tag.json --dry-run
//! ```
//!
//! The report goes to stdout as JSON; logs go to stderr.

pub mod lifecycle;

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}
