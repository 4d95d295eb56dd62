//! Helpers shared by the per-cloud suites.
//!
//! A suite test typically looks like:
//!
//! ```no_run
//! use infratest::suite::{Precondition, Provider, TestCase};
//! use infratest::{Harness, HarnessConfig, RunOptions};
//!
//! let mut case = TestCase::start("ecr");
//! if case.skip_if(&[Precondition::SkipWhenTrue("SKIP_ECR")]) {
//!     return;
//! }
//! let config = HarnessConfig::from_env().expect("config");
//! let opts = RunOptions::new(Provider::Aws.module(&config, "ecr"))
//!     .var("project", case.project("test"))
//!     .envs(Provider::Aws.tool_env(&config));
//! let ecr = Harness::terraform(&config).deploy(opts);
//! assert!(!ecr.output("repository_url").is_empty());
//! ```

use crate::config::HarnessConfig;
use crate::util::id::unique_id;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Env var that opts in to suites skipped by default for cost.
pub const COSTLY_OPT_IN: &str = "INFRATEST_ENABLE_COSTLY";

/// Cloud a suite targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
}

impl Provider {
    pub const ALL: [Self; 3] = [Self::Aws, Self::Azure, Self::Gcp];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
        }
    }

    /// Region (or Azure location) from config, which already folds in
    /// `AWS_REGION` / `AZURE_LOCATION` / `GCP_REGION`.
    #[must_use]
    pub fn region(self, config: &HarnessConfig) -> &str {
        match self {
            Self::Aws => &config.aws_region,
            Self::Azure => &config.azure_location,
            Self::Gcp => &config.gcp_region,
        }
    }

    /// Module directory, e.g. `modules/aws/vpc`.
    #[must_use]
    pub fn module(self, config: &HarnessConfig, name: &str) -> PathBuf {
        config.modules_root.join(self.as_str()).join(name)
    }

    /// Environment the tool needs to target the configured region.
    ///
    /// AWS reads the region from the environment; Azure and GCP take it as a
    /// module variable instead.
    #[must_use]
    pub fn tool_env(self, config: &HarnessConfig) -> Vec<(String, String)> {
        match self {
            Self::Aws => vec![(
                "AWS_DEFAULT_REGION".to_string(),
                config.aws_region.clone(),
            )],
            Self::Gcp => config
                .gcp_project
                .iter()
                .map(|p| ("GOOGLE_PROJECT".to_string(), p.clone()))
                .collect(),
            Self::Azure => Vec::new(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reason a live test should not run in this environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Skip when the var is exactly `true`.
    SkipWhenTrue(&'static str),
    /// Skip when the var is set to anything non-empty.
    SkipWhenSet(&'static str),
    /// Skip unless the var is set and non-empty.
    RequireEnv(&'static str),
    /// Skip unless the var is a truthy flag (`1`, `true`, `yes`, `on`).
    RequireOptIn(&'static str),
    /// Always skip.
    Disabled(&'static str),
}

impl Precondition {
    /// Evaluate against a lookup function, returning the skip reason if any.
    pub fn evaluate<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |var: &str| lookup(var).filter(|v| !v.is_empty());
        match self {
            Self::SkipWhenTrue(var) => value(var)
                .filter(|v| v == "true")
                .map(|_| format!("{var}=true")),
            Self::SkipWhenSet(var) => value(var).map(|v| format!("{var} is set ({v})")),
            Self::RequireEnv(var) => match value(var) {
                Some(_) => None,
                None => Some(format!("{var} must be set")),
            },
            Self::RequireOptIn(var) => {
                match value(var).as_deref().and_then(crate::config::parse_bool) {
                    Some(true) => None,
                    _ => Some(format!("set {var}=1 to run")),
                }
            }
            Self::Disabled(reason) => Some((*reason).to_string()),
        }
    }
}

/// First skip reason among `preconditions`, read from the process environment.
#[must_use]
pub fn check(preconditions: &[Precondition]) -> Option<String> {
    check_with(preconditions, |var| env::var(var).ok())
}

/// Like [`check`] with an explicit lookup, for tests.
pub fn check_with<F>(preconditions: &[Precondition], lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    preconditions.iter().find_map(|p| p.evaluate(&lookup))
}

/// Per-test context: a unique id plus start/finish logging.
///
/// Dropping it logs how the test ended.
#[derive(Debug)]
pub struct TestCase {
    name: String,
    uid: String,
    start: Instant,
    skipped: bool,
}

impl TestCase {
    #[must_use]
    pub fn start(name: &str) -> Self {
        let uid = unique_id();
        info!(test = name, uid = %uid, "starting");
        Self {
            name: name.to_string(),
            uid,
            start: Instant::now(),
            skipped: false,
        }
    }

    /// The random id shared by every name in this test.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"{prefix}-{uid}"`.
    #[must_use]
    pub fn project(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.uid)
    }

    /// Evaluate preconditions; on a skip, print `SKIPPED` and return `true`.
    pub fn skip_if(&mut self, preconditions: &[Precondition]) -> bool {
        match check(preconditions) {
            Some(reason) => {
                self.skip(&reason);
                true
            }
            None => false,
        }
    }

    /// Mark the test skipped with `reason`.
    pub fn skip(&mut self, reason: &str) {
        self.skipped = true;
        eprintln!("SKIPPED {}: {reason}", self.name);
        info!(test = %self.name, reason, "skipped");
    }
}

impl Drop for TestCase {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis();
        if self.skipped {
            return;
        }
        if std::thread::panicking() {
            warn!(test = %self.name, uid = %self.uid, elapsed_ms, "failed");
        } else {
            info!(test = %self.name, uid = %self.uid, elapsed_ms, "assertions passed");
        }
    }
}
