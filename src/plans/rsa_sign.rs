//! # RSA-SIGN Plan
//!
//! `prog1` signs `(p, q, e, d, m) -> signature`; `prog2` verifies
//! `(n, e, s, m) -> "true"|"false"`. Consistency sweep over message
//! lengths through the worker pool. A subprocess error whose output
//! contains the token `fail` is an expected, informational failure for
//! that input rather than a fatal error.

use crate::errors::{AggregateFailure, FailureRecord};
use crate::prng::Prng;

use super::{run_id, PlanContext};

struct SignVerifyJob {
    id: String,
    message: String,
}

pub async fn run(ctx: &PlanContext) -> Result<(), AggregateFailure> {
    let mut prng = Prng::from_seed(ctx.config.seed);
    let mut jobs = Vec::new();

    let mut i = ctx.config.min_msg_len;
    while i <= ctx.config.max_msg_len {
        jobs.push(SignVerifyJob {
            id: run_id("rsasign", "msglen", i),
            message: prng.random_hex(i),
        });
        i += ctx.config.increment_msg.max(1);
    }

    let p = ctx.config.rsa_p.clone();
    let q = ctx.config.rsa_q.clone();
    let n = ctx.config.rsa_n.clone();
    let e = ctx.config.rsa_e.clone();
    let d = ctx.config.rsa_d.clone();
    let prog1 = ctx.prog1.clone();
    let prog2 = ctx.prog2.clone();
    let runner = ctx.runner.clone();
    let timeout = ctx.config.timeout;
    let concurrency = ctx.config.concurrency as usize;

    crate::pool::run_jobs(jobs, concurrency, move |job: SignVerifyJob| {
        let p = p.clone();
        let q = q.clone();
        let n = n.clone();
        let e = e.clone();
        let d = d.clone();
        let prog1 = prog1.clone();
        let prog2 = prog2.clone();
        let runner = runner.clone();
        async move {
            let sign_argv = vec![p.clone(), q.clone(), e.clone(), d.clone(), job.message.clone()];
            let (signature, sign_outcome) = runner.run(&prog1, &job.id, &sign_argv, timeout).await;
            if !sign_outcome.is_ok() {
                if signature.contains("fail") {
                    return Err(FailureRecord::new(
                        &job.id,
                        format!("FAIL: sign reported expected failure: {}", signature),
                    ));
                }
                return Err(FailureRecord::new(
                    &job.id,
                    format!("sign failed: {}", sign_outcome.diagnostic()),
                ));
            }

            let verify_argv = vec![n.clone(), e.clone(), signature.clone(), job.message.clone()];
            let (verify_output, verify_outcome) =
                runner.run(&prog2, &job.id, &verify_argv, timeout).await;
            if !verify_outcome.is_ok() {
                if verify_output.contains("fail") {
                    return Err(FailureRecord::new(
                        &job.id,
                        format!("FAIL: verify reported expected failure: {}", verify_output),
                    ));
                }
                return Err(FailureRecord::new(
                    &job.id,
                    format!("verify failed: {}", verify_outcome.diagnostic()),
                ));
            }
            if verify_output != "true" {
                return Err(FailureRecord::new(
                    &job.id,
                    format!("signature failed to verify, got {:?}", verify_output),
                ));
            }
            Ok(())
        }
    })
    .await
    .into_result()
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
            seed: 31,
            min_msg_len: 1,
            max_msg_len: 3,
            increment_msg: 1,
            min_key_len: 1,
            max_key_len: 2,
            increment_key: 1,
            rsa_p: "0b".to_string(),
            rsa_q: "0d".to_string(),
            rsa_n: "8f".to_string(),
            rsa_e: "03".to_string(),
            rsa_d: "43".to_string(),
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

    fn toy_sign(_p: &str, argv: &[String]) -> (String, Outcome) {
        (format!("sig-{}", argv[4]), Outcome::Ok)
    }

    fn toy_verify(_p: &str, argv: &[String]) -> (String, Outcome) {
        let expected = format!("sig-{}", argv[3]);
        if argv[2] == expected {
            ("true".to_string(), Outcome::Ok)
        } else {
            ("false".to_string(), Outcome::Ok)
        }
    }

    #[tokio::test]
    async fn consistent_subject_passes() {
        let runner = FakeRunner::new("prog1", "prog2", Arc::new(toy_sign), Arc::new(toy_verify));
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
    async fn expected_failure_token_is_recorded_as_informational() {
        let runner = FakeRunner::new(
            "prog1",
            "prog2",
            Arc::new(|_p, _argv| ("fail: message too short".to_string(), Outcome::ExitFailure { code: Some(1) })),
            Arc::new(toy_verify),
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
        assert!(result
            .unwrap_err()
            .records()
            .iter()
            .all(|r| r.message.starts_with("FAIL:")));
    }

    #[tokio::test]
    async fn broken_verify_is_collected() {
        let runner = FakeRunner::new(
            "prog1",
            "prog2",
            Arc::new(toy_sign),
            Arc::new(|_p, _argv| ("false".to_string(), Outcome::Ok)),
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
        assert_eq!(result.unwrap_err().len(), 3);
    }
}
