//! # Per-Interface Test Plans
//!
//! Each plan exposes `run() -> Result<(), AggregateFailure>` and shares a
//! common structure: one consistency sweep (varying one length dimension)
//! plus zero or more edge-case probes. The seven plans are represented as a
//! dispatch table rather than a trait hierarchy: which interface to run is
//! a tagged variant known entirely at the CLI boundary, not an open set of
//! types needing dynamic dispatch.

pub mod dsa;
pub mod ecdsa;
pub mod enc;
pub mod prf;
pub mod rsa_enc;
pub mod rsa_sign;
pub mod xof;

use std::sync::Arc;

use crate::cli::Interface;
use crate::config::Configuration;
use crate::errors::{AggregateFailure, HarnessError};
use crate::runner::Runner;

/// Everything a plan needs: the immutable run configuration, the two
/// subject program paths, and the runner abstraction (real or fake).
pub struct PlanContext {
    pub config: Arc<Configuration>,
    pub prog1: String,
    pub prog2: String,
    pub hash_flag: bool,
    pub runner: Arc<dyn Runner>,
}

/// Dispatches to the named interface's plan. Returns `Ok(())` on a clean
/// run, `Err(AggregateFailure)` when the plan collected findings, and a
/// fatal `HarnessError` only for infrastructure problems the plan cannot
/// recover from (handled inside each plan via early return).
pub async fn run_plan(
    interface: Interface,
    ctx: PlanContext,
) -> Result<Result<(), AggregateFailure>, HarnessError> {
    match interface {
        Interface::Xof => Ok(xof::run(&ctx).await),
        Interface::Prf => Ok(prf::run(&ctx).await),
        Interface::Enc => Ok(enc::run(&ctx).await),
        Interface::Dsa => Ok(dsa::run(&ctx).await),
        Interface::Ecdsa => Ok(ecdsa::run(&ctx).await),
        Interface::Rsaenc => Ok(rsa_enc::run(&ctx).await),
        Interface::Rsasign => Ok(rsa_sign::run(&ctx).await),
        Interface::Ecdh => Err(HarnessError::UnimplementedInterface {
            name: "ecdh".to_string(),
        }),
    }
}

/// Builds a run id string following the `"<interface>#<dimension>#<value>"`
/// convention, used both for tracing context and for probe ids in failure
/// records.
pub fn run_id(interface: &str, dimension: &str, value: impl std::fmt::Display) -> String {
    format!("{}#{}#{}", interface, dimension, value)
}
