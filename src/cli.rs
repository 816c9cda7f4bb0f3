//! # Command Line Interface
//!
//! `harness <interface> <path-to-prog1> <path-to-prog2>` plus timing/hash/
//! verbosity flags, parsed with `clap`'s derive API.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::errors::HarnessError;

/// The cryptographic interfaces this harness knows how to test.
///
/// `Ecdh` is kept as a named variant since it is a recognized interface
/// name, but it has no implemented plan — selecting it is a
/// [`HarnessError::UnimplementedInterface`], not a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum Interface {
    Dsa,
    Ecdsa,
    Ecdh,
    Enc,
    Rsaenc,
    Rsasign,
    Prf,
    Xof,
}

impl Interface {
    pub fn is_implemented(self) -> bool {
        !matches!(self, Interface::Ecdh)
    }

    pub fn name(self) -> &'static str {
        match self {
            Interface::Dsa => "dsa",
            Interface::Ecdsa => "ecdsa",
            Interface::Ecdh => "ecdh",
            Interface::Enc => "enc",
            Interface::Rsaenc => "rsaenc",
            Interface::Rsasign => "rsasign",
            Interface::Prf => "prf",
            Interface::Xof => "xof",
        }
    }
}

/// Differential and property-based testing harness for cryptographic
/// primitives.
#[derive(Debug, Parser)]
#[command(name = "cdf-harness", version, about)]
pub struct Args {
    /// Interface to test: dsa, ecdsa, enc, rsaenc, rsasign, prf, or xof.
    pub interface: Interface,

    /// Path to the first subject program (signer / encryptor, or a
    /// hash-like program for xof/prf).
    pub prog1: PathBuf,

    /// Path to the second subject program (verifier / decryptor, or the
    /// cross-checked hash-like program for xof/prf).
    pub prog2: PathBuf,

    /// Number of timing-test batches to run (0 disables timing tests; may
    /// take hours for large values).
    #[arg(short = 't', long = "timing-passes", default_value_t = 0)]
    pub timing_passes: u32,

    /// Declare that both subjects accept an optional `-h <hex-hash>` flag,
    /// enabling hash-length sweeps and zero-hash probes.
    #[arg(short = 'H', long = "hash-flag")]
    pub hash_flag: bool,

    /// Increase logging verbosity. May be repeated (`-v`, `-vv`, `-vvv`).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Validates that `interface` is implemented and both subject binaries
    /// exist, returning a [`HarnessError`] describing the first problem
    /// found. Called before any subprocess is spawned.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if !self.interface.is_implemented() {
            return Err(HarnessError::UnimplementedInterface {
                name: self.interface.name().to_string(),
            });
        }
        for path in [&self.prog1, &self.prog2] {
            if std::fs::metadata(path).is_err() {
                return Err(HarnessError::MissingSubject {
                    path: path.display().to_string(),
                });
            }
        }
        Ok(())
    }
}
