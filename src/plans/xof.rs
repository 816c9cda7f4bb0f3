//! # XOF Plan
//!
//! Extendable-output-function interface. Both subject programs compute the
//! same function over a message and are cross-checked against each other;
//! additionally no two distinct message lengths should ever produce the
//! same output (duplicate-output detection).
//!
//! Sequential by design: each step depends only on the fixed message
//! prefix, not on other steps. Unlike the consistency sweeps in
//! ENC/DSA/ECDSA/RSA, this plan does not go through the worker pool.

use std::collections::HashMap;

use crate::errors::{AggregateFailure, FailureRecord};
use crate::prng::Prng;

use super::{run_id, PlanContext};

pub async fn run(ctx: &PlanContext) -> Result<(), AggregateFailure> {
    let mut aggregate = AggregateFailure::new();
    let mut prng = Prng::from_seed(ctx.config.seed);

    let max_len = ctx.config.max_msg_len;
    let full_message_hex = prng.random_hex(max_len);

    let mut seen_outputs: HashMap<String, usize> = HashMap::new();

    let mut i = ctx.config.min_msg_len;
    while i <= max_len {
        let hex_len = i * 2;
        let prefix = &full_message_hex[..hex_len.min(full_message_hex.len())];
        let argv = vec![prefix.to_string()];
        let id = run_id("xof", "len", i);

        let (out1, outcome1) = ctx
            .runner
            .run(&ctx.prog1, &id, &argv, ctx.config.timeout)
            .await;
        if !outcome1.is_ok() {
            aggregate.push(FailureRecord::new(
                &id,
                format!("prog1 failed on length {}: {}", i, outcome1.diagnostic()),
            ));
            i += ctx.config.increment_msg.max(1);
            continue;
        }

        let (out2, outcome2) = ctx
            .runner
            .run(&ctx.prog2, &id, &argv, ctx.config.timeout)
            .await;
        if !outcome2.is_ok() {
            aggregate.push(FailureRecord::new(
                &id,
                format!("prog2 failed on length {}: {}", i, outcome2.diagnostic()),
            ));
            i += ctx.config.increment_msg.max(1);
            continue;
        }

        if out1 != out2 {
            aggregate.push(FailureRecord::new(
                &id,
                format!(
                    "outputs disagree on length {}: prog1={:?} prog2={:?}",
                    i, out1, out2
                ),
            ));
        }

        if let Some(previous_len) = seen_outputs.get(&out1) {
            aggregate.push(FailureRecord::new(
                &id,
                format!(
                    "duplicate output for length {} matches length {}",
                    i, previous_len
                ),
            ));
        } else {
            seen_outputs.insert(out1.clone(), i);
        }

        i += ctx.config.increment_msg.max(1);
    }

    aggregate.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::runner::fake::FakeRunner;
    use crate::runner::Outcome;
    use std::sync::Arc;

    fn base_config() -> Configuration {
        Configuration {
            seed: 1,
            min_msg_len: 1,
            max_msg_len: 4,
            increment_msg: 1,
            min_key_len: 1,
            max_key_len: 1,
            increment_key: 1,
            rsa_p: String::new(),
            rsa_q: String::new(),
            rsa_n: String::new(),
            rsa_e: String::new(),
            rsa_d: String::new(),
            ecdsa_x: String::new(),
            ecdsa_y: String::new(),
            ecdsa_d: String::new(),
            dsa_p: String::new(),
            dsa_q: String::new(),
            dsa_g: String::new(),
            dsa_y: String::new(),
            dsa_x: String::new(),
            timeout: std::time::Duration::from_secs(5),
            concurrency: 2,
            verbose_log: false,
        }
    }

    #[tokio::test]
    async fn agreeing_unique_outputs_pass() {
        let runner = FakeRunner::new(
            "prog1",
            "prog2",
            Arc::new(|_p, argv| (format!("hash-{}", argv[0]), Outcome::Ok)),
            Arc::new(|_p, argv| (format!("hash-{}", argv[0]), Outcome::Ok)),
        );
        let ctx = PlanContext {
            config: Arc::new(base_config()),
            prog1: "prog1".to_string(),
            prog2: "prog2".to_string(),
            hash_flag: false,
            runner: Arc::new(runner),
        };
        assert!(run(&ctx).await.is_ok());
    }

    #[tokio::test]
    async fn disagreement_is_collected() {
        let runner = FakeRunner::new(
            "prog1",
            "prog2",
            Arc::new(|_p, argv| (format!("hash-a-{}", argv[0]), Outcome::Ok)),
            Arc::new(|_p, argv| (format!("hash-b-{}", argv[0]), Outcome::Ok)),
        );
        let ctx = PlanContext {
            config: Arc::new(base_config()),
            prog1: "prog1".to_string(),
            prog2: "prog2".to_string(),
            hash_flag: false,
            runner: Arc::new(runner),
        };
        let result = run(&ctx).await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().len(), 4);
    }

    #[tokio::test]
    async fn duplicate_output_across_lengths_is_collected() {
        let runner = FakeRunner::new(
            "prog1",
            "prog2",
            Arc::new(|_p, _argv| ("same-hash".to_string(), Outcome::Ok)),
            Arc::new(|_p, _argv| ("same-hash".to_string(), Outcome::Ok)),
        );
        let ctx = PlanContext {
            config: Arc::new(base_config()),
            prog1: "prog1".to_string(),
            prog2: "prog2".to_string(),
            hash_flag: false,
            runner: Arc::new(runner),
        };
        let result = run(&ctx).await;
        assert!(result.is_err());
        // lengths 2,3,4 all collide with length 1's output.
        assert_eq!(result.unwrap_err().len(), 3);
    }
}
