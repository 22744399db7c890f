//! # Result Aggregation
//!
//! Merges the results of any number of validators into one verdict.
//!
//! Messages are flattened in the order the results are supplied, and within
//! each result in the order its violations were recorded. The aggregator does
//! not assume which validators ran or how many.

use serde::Serialize;

use crate::validate::ValidationResult;

/// Final pass/fail outcome of a validation run plus its diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateVerdict {
    /// True iff no messages were collected.
    pub passed: bool,
    /// One line per violation, in result order then violation order.
    pub messages: Vec<String>,
}

impl AggregateVerdict {
    /// The messages joined one per line, as shown to users.
    pub fn failure_text(&self) -> String {
        self.messages.join("\n")
    }
}

/// Combine validator results into a single verdict.
///
/// `Success` results contribute nothing. An empty input passes.
pub fn aggregate<'a, I>(results: I) -> AggregateVerdict
where
    I: IntoIterator<Item = &'a ValidationResult>,
{
    let messages: Vec<String> = results
        .into_iter()
        .flat_map(|result| result.violations().iter().map(|v| v.message.clone()))
        .collect();

    AggregateVerdict {
        passed: messages.is_empty(),
        messages,
    }
}
