//! # Cryptographic Differential Testing Harness
//!
//! A black-box differential and property-based testing harness for
//! cryptographic primitives. Drives pairs of external subject programs
//! implementing one interface each (symmetric encryption, PRF, XOF,
//! DSA/ECDSA signatures, RSA encryption, RSA signatures) with randomized
//! and adversarially crafted inputs, cross-checks their outputs, and
//! statistically tests for timing side-channels.

pub mod bigint;
pub mod cli;
pub mod config;
pub mod dudect;
pub mod errors;
pub mod logging;
pub mod plans;
pub mod pool;
pub mod prng;
pub mod probes;
pub mod runner;

pub use cli::{Args, Interface};
pub use config::{load_config, Configuration};
pub use errors::{AggregateFailure, FailureRecord, HarnessError};
pub use plans::{run_plan, PlanContext};
pub use runner::{Outcome, ProcessRunner, Runner};

/// The current version of the harness.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values, used when a field is absent from
/// `config.json` or when tests need a sensible baseline.
pub mod defaults {
    use std::time::Duration;

    /// Subprocess timeout applied when `config.json` omits or zeroes the
    /// `timeout` field.
    pub const TIMEOUT: Duration = Duration::from_secs(10);

    /// Worker concurrency floor; a configured value of 0 is treated as 1.
    pub const MIN_CONCURRENCY: u32 = 1;

    /// Number of percentile-cropped t-test buckets maintained by the
    /// timing-leak tester, in addition to the raw and second-order buckets.
    pub const TIMING_PERCENTILE_BUCKETS: usize = 100;

    /// Sample count at which the timing-leak tester starts feeding the
    /// second-order centered-product test.
    pub const TIMING_SECOND_ORDER_THRESHOLD: u64 = 10_000;
}
