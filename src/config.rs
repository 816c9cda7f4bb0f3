//! # Run Configuration
//!
//! `config.json` is read from the current working directory and deserialized
//! with its camelCase field names (`minMsgLen`, `dsaP`, `verboseLog`, ...)
//! before being converted into the immutable [`Configuration`] every plan
//! receives.

use std::path::Path;

use serde::Deserialize;

use crate::errors::HarnessError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Wire format of `config.json`.
#[derive(Debug, Deserialize)]
struct RawConfig {
    seed: u64,
    #[serde(rename = "minMsgLen")]
    min_msg_len: usize,
    #[serde(rename = "maxMsgLen")]
    max_msg_len: usize,
    #[serde(rename = "incrementMsg")]
    increment_msg: usize,
    #[serde(rename = "minKeyLen")]
    min_key_len: usize,
    #[serde(rename = "maxKeyLen")]
    max_key_len: usize,
    #[serde(rename = "incrementKey")]
    increment_key: usize,
    #[serde(rename = "rsaP")]
    rsa_p: String,
    #[serde(rename = "rsaQ")]
    rsa_q: String,
    #[serde(rename = "rsaN")]
    rsa_n: String,
    #[serde(rename = "rsaE")]
    rsa_e: String,
    #[serde(rename = "rsaD")]
    rsa_d: String,
    #[serde(rename = "ecdsaX")]
    ecdsa_x: String,
    #[serde(rename = "ecdsaY")]
    ecdsa_y: String,
    #[serde(rename = "ecdsaD")]
    ecdsa_d: String,
    #[serde(rename = "dsaP")]
    dsa_p: String,
    #[serde(rename = "dsaQ")]
    dsa_q: String,
    #[serde(rename = "dsaG")]
    dsa_g: String,
    #[serde(rename = "dsaY")]
    dsa_y: String,
    #[serde(rename = "dsaX")]
    dsa_x: String,
    #[serde(default)]
    timeout: u64,
    concurrency: u32,
    #[serde(rename = "verboseLog", default)]
    verbose_log: bool,
}

/// Immutable run configuration shared read-only (`Arc<Configuration>`)
/// across the plan and every worker it dispatches.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub seed: u64,
    pub min_msg_len: usize,
    pub max_msg_len: usize,
    pub increment_msg: usize,
    pub min_key_len: usize,
    pub max_key_len: usize,
    pub increment_key: usize,
    pub rsa_p: String,
    pub rsa_q: String,
    pub rsa_n: String,
    pub rsa_e: String,
    pub rsa_d: String,
    pub ecdsa_x: String,
    pub ecdsa_y: String,
    pub ecdsa_d: String,
    pub dsa_p: String,
    pub dsa_q: String,
    pub dsa_g: String,
    pub dsa_y: String,
    pub dsa_x: String,
    pub timeout: std::time::Duration,
    pub concurrency: u32,
    pub verbose_log: bool,
}

impl From<RawConfig> for Configuration {
    fn from(raw: RawConfig) -> Self {
        let timeout_secs = if raw.timeout == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            raw.timeout
        };
        Self {
            seed: raw.seed,
            min_msg_len: raw.min_msg_len,
            max_msg_len: raw.max_msg_len,
            increment_msg: raw.increment_msg,
            min_key_len: raw.min_key_len,
            max_key_len: raw.max_key_len,
            increment_key: raw.increment_key,
            rsa_p: raw.rsa_p,
            rsa_q: raw.rsa_q,
            rsa_n: raw.rsa_n,
            rsa_e: raw.rsa_e,
            rsa_d: raw.rsa_d,
            ecdsa_x: raw.ecdsa_x,
            ecdsa_y: raw.ecdsa_y,
            ecdsa_d: raw.ecdsa_d,
            dsa_p: raw.dsa_p,
            dsa_q: raw.dsa_q,
            dsa_g: raw.dsa_g,
            dsa_y: raw.dsa_y,
            dsa_x: raw.dsa_x,
            timeout: std::time::Duration::from_secs(timeout_secs),
            concurrency: raw.concurrency.max(1),
            verbose_log: raw.verbose_log,
        }
    }
}

/// Loads and parses `config.json` from `path`.
pub fn load_config(path: &Path) -> Result<Configuration, HarnessError> {
    let text = std::fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead {
        path: path.display().to_string(),
        source,
    })?;
    let raw: RawConfig =
        serde_json::from_str(&text).map_err(|source| HarnessError::ConfigParse {
            path: path.display().to_string(),
            source,
        })?;
    Ok(raw.into())
}
