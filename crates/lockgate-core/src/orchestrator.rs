//! # Orchestrator
//!
//! Drives one validation run through its stages:
//!
//! ```text
//! Configuring → Loading → Validating → Reporting → Done
//! ```
//!
//! A load failure skips straight to Reporting with a parse-error outcome and
//! no validator is invoked. An error returned by a validator, or a panic
//! inside one, is caught here, logged with its detail, and reported as a
//! generic internal error.
//! Nothing is retried: both cases are deterministic input or configuration
//! problems.
//!
//! [`run`] is the pure core of the pipeline (policy + packages → verdict) and
//! is what tests and embedders should call when they already hold a
//! [`PackageModel`].

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::Path;

use crate::aggregate::{aggregate, AggregateVerdict};
use crate::error::{LockgateError, LockgateResult, ParseError, PolicyError};
use crate::lockfile::{LockfileLoader, LockfileSource};
use crate::package::PackageModel;
use crate::policy::PolicyConfig;
use crate::validate::{HostValidator, SchemeValidator, TransportSecurityValidator, Validator};

/// Text reported when a validator fails unexpectedly.
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong during validation";

/// Text reported when every validator passes.
pub const PASSED_MESSAGE: &str = "Passed validators";

/// Stages of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Building validators from the policy.
    Configuring,
    /// Reading the lockfile into a package model.
    Loading,
    /// Running validators and aggregating their results.
    Validating,
    /// Handing the outcome to the reporter.
    Reporting,
    /// Terminal.
    Done,
}

impl Stage {
    /// Stage name as logged.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Configuring => "configuring",
            Stage::Loading => "loading",
            Stage::Validating => "validating",
            Stage::Reporting => "reporting",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every validator passed.
    Passed {
        /// Number of lockfile entries checked.
        packages: usize,
    },
    /// One or more policy violations, one message per violation.
    Failed {
        /// Violation messages in reporting order.
        messages: Vec<String>,
    },
    /// The lockfile could not be loaded.
    LoadFailed(ParseError),
    /// The policy could not be turned into validators.
    InvalidPolicy(PolicyError),
    /// A validator failed unexpectedly. Carries the generic user message;
    /// the detail is in the logs.
    InternalError(String),
}

impl RunOutcome {
    /// Whether the lockfile passed every validator.
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Passed { .. })
    }

    /// Process exit status: 0 on pass, 1 on violations, 2 when the run could
    /// not complete.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Passed { .. } => 0,
            RunOutcome::Failed { .. } => 1,
            RunOutcome::LoadFailed(_)
            | RunOutcome::InvalidPolicy(_)
            | RunOutcome::InternalError(_) => 2,
        }
    }

    /// Human-readable text for the outcome. Violations are one per line.
    pub fn summary(&self) -> String {
        match self {
            RunOutcome::Passed { .. } => PASSED_MESSAGE.to_string(),
            RunOutcome::Failed { messages } => messages.join("\n"),
            RunOutcome::LoadFailed(e) => e.to_string(),
            RunOutcome::InvalidPolicy(e) => format!("invalid policy: {e}"),
            RunOutcome::InternalError(message) => message.clone(),
        }
    }

    fn from_verdict(verdict: AggregateVerdict, packages: usize) -> Self {
        if verdict.passed {
            RunOutcome::Passed { packages }
        } else {
            RunOutcome::Failed {
                messages: verdict.messages,
            }
        }
    }
}

/// Receives the final outcome of a run.
pub trait Reporter {
    /// Present `outcome` to the user or surrounding job.
    fn report(&mut self, outcome: &RunOutcome) -> std::io::Result<()>;
}

/// Build the standard validator set for `policy`, in reporting order:
/// host, transport, scheme.
pub fn validators_for(policy: &PolicyConfig) -> Result<Vec<Box<dyn Validator>>, PolicyError> {
    Ok(vec![
        Box::new(HostValidator::from_policy(policy)?),
        Box::new(TransportSecurityValidator::new()),
        Box::new(SchemeValidator::from_policy(policy)),
    ])
}

fn run_validators(
    validators: &[Box<dyn Validator>],
    packages: &PackageModel,
) -> LockgateResult<AggregateVerdict> {
    let mut results = Vec::with_capacity(validators.len());
    for validator in validators {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| validator.validate(packages)))
            .map_err(|payload| {
                LockgateError::Internal(format!(
                    "validator {} panicked: {}",
                    validator.name(),
                    panic_message(payload.as_ref())
                ))
            })??;
        tracing::debug!(
            validator = validator.name(),
            violations = result.violations().len(),
            "validator finished"
        );
        results.push(result);
    }
    Ok(aggregate(&results))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Run the standard validators over an already-loaded package model.
///
/// Pure: no I/O, no global state. Running it twice on the same inputs yields
/// identical verdicts.
pub fn run(policy: &PolicyConfig, packages: &PackageModel) -> LockgateResult<AggregateVerdict> {
    let validators = validators_for(policy)?;
    run_validators(&validators, packages)
}

/// Drives a full run from lockfile path to reported outcome.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator<S = LockfileLoader> {
    source: S,
}

impl<S: LockfileSource> Orchestrator<S> {
    /// Create an orchestrator reading lockfiles through `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run the standard validators for `policy` against the lockfile at
    /// `path` and report the outcome.
    pub fn execute(
        &self,
        policy: &PolicyConfig,
        path: &Path,
        reporter: &mut dyn Reporter,
    ) -> RunOutcome {
        let mut stage = Stage::Configuring;
        tracing::debug!(stage = %stage, "starting validation run");
        let validators = match validators_for(policy) {
            Ok(validators) => validators,
            Err(e) => {
                tracing::error!(error = %e, "policy rejected");
                return finish(&mut stage, RunOutcome::InvalidPolicy(e), reporter);
            }
        };
        self.drive(&mut stage, &validators, path, reporter)
    }

    /// Like [`execute`](Self::execute) with a caller-supplied validator set.
    pub fn execute_with(
        &self,
        validators: &[Box<dyn Validator>],
        path: &Path,
        reporter: &mut dyn Reporter,
    ) -> RunOutcome {
        let mut stage = Stage::Configuring;
        self.drive(&mut stage, validators, path, reporter)
    }

    fn drive(
        &self,
        stage: &mut Stage,
        validators: &[Box<dyn Validator>],
        path: &Path,
        reporter: &mut dyn Reporter,
    ) -> RunOutcome {
        advance(stage, Stage::Loading);
        let packages = match self.source.load(path) {
            Ok(packages) => packages,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "lockfile could not be loaded");
                return finish(stage, RunOutcome::LoadFailed(e), reporter);
            }
        };
        tracing::info!(
            path = %path.display(),
            packages = packages.len(),
            "lockfile loaded"
        );

        advance(stage, Stage::Validating);
        let outcome = match run_validators(validators, &packages) {
            Ok(verdict) => RunOutcome::from_verdict(verdict, packages.len()),
            Err(e) => {
                tracing::error!(error = %e, "validator failed unexpectedly");
                RunOutcome::InternalError(INTERNAL_ERROR_MESSAGE.to_string())
            }
        };
        finish(stage, outcome, reporter)
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = %stage, to = %next, "stage transition");
    *stage = next;
}

fn finish(stage: &mut Stage, outcome: RunOutcome, reporter: &mut dyn Reporter) -> RunOutcome {
    advance(stage, Stage::Reporting);
    if let Err(e) = reporter.report(&outcome) {
        tracing::error!(error = %e, "failed to report validation outcome");
    }
    advance(stage, Stage::Done);
    tracing::info!(
        passed = outcome.is_success(),
        exit_code = outcome.exit_code(),
        "validation run finished"
    );
    outcome
}
