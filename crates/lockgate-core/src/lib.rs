#![deny(missing_docs)]

//! # lockgate-core: Lockfile Provenance Validation
//!
//! Checks that every package recorded in a dependency lockfile was resolved
//! from a trusted host, over an allowed URL scheme, and over encrypted
//! transport. Intended as a pre-merge or pre-build gate.
//!
//! ## Pipeline
//!
//! ```text
//! lockfile ──▶ PackageModel ──▶ { host, transport, scheme } ──▶ aggregate ──▶ verdict
//! ```
//!
//! 1. **[`lockfile`]** reads npm and yarn classic lockfiles into an immutable
//!    [`PackageModel`].
//! 2. **[`validate`]** holds the three [`Validator`] implementations. Each
//!    reads the same model and returns a [`ValidationResult`]; none has state
//!    shared with another, so results do not depend on run order.
//! 3. **[`aggregate`](mod@aggregate)** flattens results into an
//!    [`AggregateVerdict`].
//! 4. **[`orchestrator`]** wires a [`PolicyConfig`] to validators, runs the
//!    stages, and hands the [`RunOutcome`] to a [`Reporter`].
//!
//! ## Errors
//!
//! Violations are data. Only exceptional conditions use [`LockgateError`]:
//! an unloadable lockfile ([`ParseError`]), an unusable policy
//! ([`PolicyError`]), or a validator failing on its own. No `.unwrap()`
//! outside tests.

pub mod aggregate;
pub mod error;
pub mod lockfile;
pub mod orchestrator;
pub mod package;
pub mod policy;
pub mod validate;

// Re-export primary types at crate root for ergonomic imports.
pub use aggregate::{aggregate, AggregateVerdict};
pub use error::{LockgateError, LockgateResult, ParseError, PolicyError};
pub use lockfile::{LockfileKind, LockfileLoader, LockfileSource};
pub use orchestrator::{run, Orchestrator, Reporter, RunOutcome, Stage};
pub use package::{PackageEntry, PackageMetadata, PackageModel};
pub use policy::{PolicyConfig, PolicyConfigBuilder};
pub use validate::{
    HostValidator, SchemeValidator, TransportSecurityValidator, ValidationResult, Validator,
    Violation,
};
