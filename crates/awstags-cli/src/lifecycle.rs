//! # Lifecycle Subcommands
//!
//! - `create`: Tag every declared resource and claim the pairs.
//! - `update`: Move from a persisted state to new inputs.
//! - `delete`: Remove the tags of a persisted state.
//!
//! `--preview` leases and releases as the real call would but makes no
//! remote call. `--dry-run` swaps the HTTP backend for the recording one and
//! lists the calls that would have been made.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use awstags_client::{
    HttpTaggingFactory, RateLimiter, RecordedCall, RecordingFactory, TagOperation,
    TaggingApiFactory, TaggingConfig,
};
use awstags_lease::LeaseRegistry;
use awstags_reconcile::{Outcome, Provider, Reconciler, ResourceKind};

/// Lifecycle verbs.
#[derive(Subcommand, Debug, Clone)]
pub enum LifecycleCommand {
    /// Create a resource from its inputs.
    Create {
        #[command(flatten)]
        common: CommonArgs,
        /// Resource name; becomes the resource id.
        #[arg(long, default_value = "awstags")]
        name: String,
        /// Path to the inputs JSON.
        #[arg(long)]
        inputs: PathBuf,
    },

    /// Update a resource from its persisted state to new inputs.
    Update {
        #[command(flatten)]
        common: CommonArgs,
        /// Path to the persisted state JSON.
        #[arg(long)]
        old: PathBuf,
        /// Path to the new inputs JSON.
        #[arg(long)]
        new: PathBuf,
    },

    /// Delete a resource given its persisted state.
    Delete {
        #[command(flatten)]
        common: CommonArgs,
        /// Path to the persisted state JSON.
        #[arg(long)]
        state: PathBuf,
    },
}

impl LifecycleCommand {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Create { common, .. } | Self::Update { common, .. } | Self::Delete { common, .. } => common,
        }
    }
}

/// Flags shared by every verb.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Resource kind of the state files.
    #[arg(long, value_enum)]
    pub kind: KindArg,

    /// Lease and release without calling the tagging API.
    #[arg(long)]
    pub preview: bool,

    /// Record calls in memory instead of sending them.
    #[arg(long)]
    pub dry_run: bool,

    /// Endpoint template, `{region}` is substituted. Requests go out
    /// unsigned, so this must name a SigV4 signing proxy or an emulator.
    /// Overrides `AWSTAGS_ENDPOINT_TEMPLATE`.
    #[arg(long)]
    pub endpoint_template: Option<String>,

    /// Request timeout in seconds. Overrides `AWSTAGS_TIMEOUT_SECS`.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Calls per second. Overrides `AWSTAGS_RATE_LIMIT_PER_SEC`.
    #[arg(long)]
    pub rate_limit_per_sec: Option<f64>,

    /// Calls allowed back to back. Overrides `AWSTAGS_RATE_LIMIT_BURST`.
    #[arg(long)]
    pub rate_limit_burst: Option<u32>,
}

impl CommonArgs {
    /// Environment configuration with flag overrides applied.
    pub fn config(&self) -> Result<TaggingConfig> {
        let mut config = TaggingConfig::from_env()?;
        if let Some(template) = &self.endpoint_template {
            config.endpoint_template = template.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if let Some(rate) = self.rate_limit_per_sec {
            config.rate_limit.per_second = rate;
        }
        if let Some(burst) = self.rate_limit_burst {
            config.rate_limit.burst = burst;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Resource kind as spelled on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    /// `awstags:aws:ResourceTag`: one ARN, one tag.
    ResourceTag,
    /// `awstags:index:TagResources`: many ARNs, many tags.
    TagResources,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::ResourceTag => ResourceKind::ResourceTag,
            KindArg::TagResources => ResourceKind::TagResources,
        }
    }
}

/// A recorded call, as printed in a dry-run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallReport {
    pub region: String,
    pub operation: TagOperation,
    pub arns: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_keys: Vec<String>,
}

impl From<&RecordedCall> for CallReport {
    fn from(call: &RecordedCall) -> Self {
        Self {
            region: call.region.clone(),
            operation: call.operation,
            arns: call.arns.clone(),
            tags: call.tags.clone(),
            tag_keys: call.tag_keys.clone(),
        }
    }
}

/// What the command prints on stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Resource id, on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// State to persist; `null` after a delete.
    pub state: Option<Value>,
    pub remote_calls: usize,
    /// Pairs left alone because a pending write claimed them, as `arn#key`.
    pub deferred: Vec<String>,
    /// Calls captured by `--dry-run`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recorded: Vec<CallReport>,
}

impl Report {
    fn new(id: Option<String>, state: Option<Value>, outcome: Outcome) -> Self {
        Self {
            id,
            state,
            remote_calls: outcome.remote_calls,
            deferred: outcome.deferred.iter().map(ToString::to_string).collect(),
            recorded: Vec::new(),
        }
    }
}

/// Build the provider for one process run.
pub fn build_provider(config: &TaggingConfig, factory: Arc<dyn TaggingApiFactory>) -> Result<Provider> {
    let limiter = Arc::new(RateLimiter::new(config.rate_limit)?);
    let reconciler = Reconciler::new(Arc::new(LeaseRegistry::new()), factory, limiter);
    Ok(Provider::new(Arc::new(reconciler)))
}

/// Run `command` against the backend its flags select.
pub async fn run_lifecycle(command: &LifecycleCommand, cancel: &CancellationToken) -> Result<Report> {
    let common = command.common();
    let config = common.config()?;
    tracing::debug!(?config, dry_run = common.dry_run, "resolved configuration");

    let recorder = common.dry_run.then(|| Arc::new(RecordingFactory::new()));
    let factory: Arc<dyn TaggingApiFactory> = match &recorder {
        Some(recorder) => recorder.clone(),
        None => Arc::new(HttpTaggingFactory::new(config.clone())?),
    };

    let provider = build_provider(&config, factory)?;
    let mut report = execute(&provider, command, cancel).await?;
    if let Some(recorder) = recorder {
        report.recorded = recorder.calls().iter().map(CallReport::from).collect();
    }
    Ok(report)
}

/// Run `command` through `provider`.
pub async fn execute(provider: &Provider, command: &LifecycleCommand, cancel: &CancellationToken) -> Result<Report> {
    let common = command.common();
    let kind = ResourceKind::from(common.kind);

    let report = match command {
        LifecycleCommand::Create { name, inputs, .. } => {
            let inputs = crate::read_json(inputs)?;
            let (id, applied) = provider.create(kind, name, &inputs, common.preview, cancel).await?;
            Report::new(Some(id), Some(applied.state), applied.outcome)
        }
        LifecycleCommand::Update { old, new, .. } => {
            let old = crate::read_json(old)?;
            let new = crate::read_json(new)?;
            let applied = provider.update(kind, &old, &new, common.preview, cancel).await?;
            Report::new(None, Some(applied.state), applied.outcome)
        }
        LifecycleCommand::Delete { state, .. } => {
            let state = crate::read_json(state)?;
            let outcome = provider.delete(kind, &state, common.preview, cancel).await?;
            Report::new(None, None, outcome)
        }
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        command: LifecycleCommand,
    }

    fn parse(args: &[&str]) -> LifecycleCommand {
        TestCli::try_parse_from(std::iter::once("awstags").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    fn write(dir: &tempfile::TempDir, name: &str, value: Value) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
        path.display().to_string()
    }

    #[test]
    fn parses_kind_and_flags() {
        let cmd = parse(&["delete", "--kind", "resource-tag", "--state", "s.json", "--preview"]);
        assert_eq!(cmd.common().kind, KindArg::ResourceTag);
        assert!(cmd.common().preview);
        assert!(!cmd.common().dry_run);
    }

    #[test]
    fn endpoint_flag_help_names_the_signing_proxy() {
        use clap::CommandFactory;

        let cmd = TestCli::command();
        for verb in ["create", "update", "delete"] {
            let sub = cmd.find_subcommand(verb).unwrap();
            let arg = sub
                .get_arguments()
                .find(|a| a.get_long() == Some("endpoint-template"))
                .unwrap();
            let help = arg.get_help().unwrap().to_string();
            assert!(help.contains("signing proxy"), "{verb}: {help}");
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let res = TestCli::try_parse_from(["awstags", "create", "--kind", "bucket", "--inputs", "i.json"]);
        assert!(res.is_err());
    }

    #[test]
    fn flags_override_configuration() {
        let cmd = parse(&[
            "create",
            "--kind",
            "tag-resources",
            "--inputs",
            "i.json",
            "--rate-limit-per-sec",
            "2",
            "--endpoint-template",
            "http://127.0.0.1:4566/{region}",
        ]);
        let config = cmd.common().config().unwrap();
        assert_eq!(config.rate_limit.per_second, 2.0);
        assert_eq!(
            config.endpoint_for("us-east-1").unwrap().as_str(),
            "http://127.0.0.1:4566/us-east-1"
        );
    }

    #[tokio::test]
    async fn dry_run_create_reports_recorded_calls() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = json!({
            "resourceARNList": [
                "arn:aws:sqs:us-east-1:123456789012:a",
                "arn:aws:sqs:eu-west-1:123456789012:b"
            ],
            "tags": {"env": "prod"}
        });
        let path = write(&dir, "inputs.json", inputs.clone());

        let cmd = parse(&[
            "create", "--kind", "tag-resources", "--name", "web", "--inputs", &path, "--dry-run",
        ]);
        let report = run_lifecycle(&cmd, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.id.as_deref(), Some("web"));
        assert_eq!(report.state, Some(inputs));
        assert_eq!(report.remote_calls, 2);
        assert_eq!(report.recorded.len(), 2);
        assert_eq!(report.recorded[0].region, "eu-west-1");
    }

    #[tokio::test]
    async fn preview_update_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let old = write(
            &dir,
            "old.json",
            json!({"resourceARN": "arn:aws:s3:::bucket", "tag": {"key": "a", "value": "1"}}),
        );
        let new = write(
            &dir,
            "new.json",
            json!({"resourceARN": "arn:aws:s3:::bucket", "tag": {"key": "b", "value": "1"}}),
        );

        let cmd = parse(&[
            "update", "--kind", "resource-tag", "--old", &old, "--new", &new, "--preview", "--dry-run",
        ]);
        let report = run_lifecycle(&cmd, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.remote_calls, 0);
        assert!(report.recorded.is_empty());
    }

    #[tokio::test]
    async fn delete_report_has_null_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = write(
            &dir,
            "state.json",
            json!({"resourceARN": "arn:aws:s3:::bucket", "tag": {"key": "a", "value": "1"}}),
        );

        let cmd = parse(&["delete", "--kind", "resource-tag", "--state", &state, "--dry-run"]);
        let report = run_lifecycle(&cmd, &CancellationToken::new()).await.unwrap();

        let printed = serde_json::to_value(&report).unwrap();
        assert_eq!(printed["state"], Value::Null);
        assert_eq!(printed["remoteCalls"], 1);
        assert_eq!(printed["recorded"][0]["operation"], "UntagResources");
        assert_eq!(printed["recorded"][0]["region"], "us-east-1");
    }
}
