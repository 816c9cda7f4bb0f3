//! # Symmetric Encryption Plan
//!
//! `prog1` encrypts `(key, message) -> ciphertext`; `prog2` decrypts
//! `(key, ciphertext) -> message`. The core property is round-trip
//! consistency: `prog2(k, prog1(k, m)) == m`. Two sweeps run through the
//! bounded worker pool since each job is fully independent: message length
//! with a fixed short key, then key length with a fixed middle-size message.

use crate::errors::{AggregateFailure, FailureRecord};
use crate::prng::Prng;

use super::{run_id, PlanContext};

struct Job {
    id: String,
    key_hex: String,
    msg_hex: String,
}

pub async fn run(ctx: &PlanContext) -> Result<(), AggregateFailure> {
    let mut prng = Prng::from_seed(ctx.config.seed);
    let mut jobs = Vec::new();

    let fixed_short_key = prng.random_hex(ctx.config.min_key_len.max(1));
    let mut i = ctx.config.min_msg_len;
    while i <= ctx.config.max_msg_len {
        jobs.push(Job {
            id: run_id("enc", "msglen", i),
            key_hex: fixed_short_key.clone(),
            msg_hex: prng.random_hex(i),
        });
        i += ctx.config.increment_msg.max(1);
    }

    let mid_msg_len = ctx.config.min_msg_len
        + (ctx.config.max_msg_len - ctx.config.min_msg_len) / 2;
    let fixed_mid_msg = prng.random_hex(mid_msg_len.max(1));
    let mut j = ctx.config.min_key_len;
    while j <= ctx.config.max_key_len {
        jobs.push(Job {
            id: run_id("enc", "keylen", j),
            key_hex: prng.random_hex(j),
            msg_hex: fixed_mid_msg.clone(),
        });
        j += ctx.config.increment_key.max(1);
    }

    let prog1 = ctx.prog1.clone();
    let prog2 = ctx.prog2.clone();
    let timeout = ctx.config.timeout;
    let runner = ctx.runner.clone();
    let concurrency = ctx.config.concurrency as usize;

    crate::pool::run_jobs(jobs, concurrency, move |job: Job| {
        let prog1 = prog1.clone();
        let prog2 = prog2.clone();
        let runner = runner.clone();
        async move {
            let encrypt_argv = vec![job.key_hex.clone(), job.msg_hex.clone()];
            let (ciphertext, outcome1) = runner
                .run(&prog1, &job.id, &encrypt_argv, timeout)
                .await;
            if !outcome1.is_ok() {
                return Err(FailureRecord::new(
                    &job.id,
                    format!("encrypt failed: {}", outcome1.diagnostic()),
                ));
            }

            let decrypt_argv = vec![job.key_hex.clone(), ciphertext.clone()];
            let (recovered, outcome2) = runner
                .run(&prog2, &job.id, &decrypt_argv, timeout)
                .await;
            if !outcome2.is_ok() {
                return Err(FailureRecord::new(
                    &job.id,
                    format!("decrypt failed: {}", outcome2.diagnostic()),
                ));
            }

            if recovered != job.msg_hex {
                return Err(FailureRecord::new(
                    &job.id,
                    format!(
                        "round trip mismatch: original={:?} recovered={:?}",
                        job.msg_hex, recovered
                    ),
                ));
            }

            Ok(())
        }
    })
    .await
    .into_result()
}
