//! # Error Types and Failure Aggregation
//!
//! This module defines the harness's error surface. Two families of error
//! exist side by side:
//!
//! - [`HarnessError`]: fatal, non-collectible errors (bad config, a subject
//!   binary that cannot be launched at all). These abort the process.
//! - [`FailureRecord`] / [`AggregateFailure`]: collectible findings produced
//!   by a plan while it keeps running. A plan that finds three inconsistent
//!   outputs does not stop at the first one — it records all three and
//!   reports them together.
//!
//! The two families never mix: a [`HarnessError`] ends the program, an
//! [`AggregateFailure`] is just data describing what the plan observed.

use std::fmt;

/// Fatal errors that abort the harness before or during a run.
///
/// These are distinct from [`AggregateFailure`], which represents findings
/// *about the subject programs* collected during a successful run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("unknown interface {name:?}; expected one of dsa, ecdsa, enc, rsaenc, rsasign, prf, xof")]
    UnknownInterface { name: String },

    #[error("interface {name:?} is reserved but not implemented")]
    UnimplementedInterface { name: String },

    #[error("subject program not found at {path:?}")]
    MissingSubject { path: String },

    #[error("failed to read configuration file {path:?}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path:?}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to launch subject program {program:?}")]
    SubjectInfrastructure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid hex in configuration field {field:?}: {reason}")]
    InvalidHex { field: String, reason: String },
}

/// A single collected finding produced while exercising a subject program:
/// a probe id for reproduction and a human-readable description of the
/// mismatch.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    /// Identifies which probe produced this finding, e.g. `"dsa#buf#37"`.
    pub probe_id: String,
    /// Free-form description of what went wrong.
    pub message: String,
}

impl FailureRecord {
    pub fn new(probe_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            probe_id: probe_id.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.probe_id, self.message)
    }
}

/// An ordered collection of [`FailureRecord`]s produced by a single plan run.
///
/// Renders as `"(N errors)\n<msg1>\n<msg2>..."` (singular `"(1 error)"` for
/// `N == 1`). This rendering is load-bearing: plans and tests assert on it
/// directly (e.g. a plan may check the string contains `"(2 errors)"`).
#[derive(Debug, Clone, Default)]
pub struct AggregateFailure {
    records: Vec<FailureRecord>,
}

impl AggregateFailure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FailureRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, other: AggregateFailure) {
        self.records.extend(other.records);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    /// Returns `Ok(())` if no findings were collected, otherwise `Err(self)`.
    ///
    /// Plans build up an `AggregateFailure` unconditionally and call this at
    /// the end of `run()` to produce the `Result<(), AggregateFailure>` the
    /// spec's plan contract requires.
    pub fn into_result(self) -> Result<(), AggregateFailure> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.records.len();
        let plural = if n == 1 { "" } else { "s" };
        write!(f, "({} error{})", n, plural)?;
        for record in &self.records {
            write!(f, "\n{}", record)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFailure {}
