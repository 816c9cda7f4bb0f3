//! # PRF Plan
//!
//! Pseudo-random function interface: both subject programs compute the same
//! tag over `(key, message)` and are cross-checked. Two sweeps — varying
//! message length with a fixed middle-size key, then varying key length
//! with a fixed middle-size message — plus a right-zero-padding probe that
//! detects keys treated as zero-terminated or zero-stripped.
//!
//! Sequential, like the XOF plan: each step is independent of worker-pool
//! parallelism since duplicate detection needs a single running view of all
//! tags produced so far.

use std::collections::HashMap;

use crate::errors::{AggregateFailure, FailureRecord};
use crate::prng::Prng;

use super::{run_id, PlanContext};

fn mid(min: usize, max: usize) -> usize {
    min + (max - min) / 2
}

async fn call_both(
    ctx: &PlanContext,
    id: &str,
    key_hex: &str,
    msg_hex: &str,
) -> Result<(String, String), FailureRecord> {
    let argv = vec![key_hex.to_string(), msg_hex.to_string()];
    let (out1, outcome1) = ctx
        .runner
        .run(&ctx.prog1, id, &argv, ctx.config.timeout)
        .await;
    if !outcome1.is_ok() {
        return Err(FailureRecord::new(
            id,
            format!("prog1 failed: {}", outcome1.diagnostic()),
        ));
    }
    let (out2, outcome2) = ctx
        .runner
        .run(&ctx.prog2, id, &argv, ctx.config.timeout)
        .await;
    if !outcome2.is_ok() {
        return Err(FailureRecord::new(
            id,
            format!("prog2 failed: {}", outcome2.diagnostic()),
        ));
    }
    if out1 != out2 {
        return Err(FailureRecord::new(
            id,
            format!("tags disagree: prog1={:?} prog2={:?}", out1, out2),
        ));
    }
    Ok((out1, out2))
}

pub async fn run(ctx: &PlanContext) -> Result<(), AggregateFailure> {
    let mut aggregate = AggregateFailure::new();
    let mut prng = Prng::from_seed(ctx.config.seed);
    let mut seen_tags: HashMap<String, String> = HashMap::new();

    let mid_key = mid(ctx.config.min_key_len, ctx.config.max_key_len).max(1);
    let mid_msg = mid(ctx.config.min_msg_len, ctx.config.max_msg_len).max(1);
    let fixed_key = prng.random_hex(mid_key);
    let fixed_msg = prng.random_hex(mid_msg);

    let mut i = ctx.config.min_msg_len;
    while i <= ctx.config.max_msg_len {
        let msg = prng.random_hex(i);
        let id = run_id("prf", "msglen", i);
        match call_both(ctx, &id, &fixed_key, &msg).await {
            Ok((tag, _)) => record_unique(&mut aggregate, &mut seen_tags, &id, tag),
            Err(failure) => aggregate.push(failure),
        }
        i += ctx.config.increment_msg.max(1);
    }

    let mut j = ctx.config.min_key_len;
    while j <= ctx.config.max_key_len {
        let key = prng.random_hex(j);
        let id = run_id("prf", "keylen", j);
        match call_both(ctx, &id, &key, &fixed_msg).await {
            Ok((tag, _)) => record_unique(&mut aggregate, &mut seen_tags, &id, tag),
            Err(failure) => aggregate.push(failure),
        }
        j += ctx.config.increment_key.max(1);
    }

    // Right-zero-padding probe: a key extended by one "00" byte must
    // produce a different tag than the original key.
    let probe_key = prng.random_hex(mid_key);
    let probe_msg = prng.random_hex(mid_msg);
    let id = run_id("prf", "padding", "probe");
    match call_both(ctx, &format!("{}#base", id), &probe_key, &probe_msg).await {
        Ok((base_tag, _)) => {
            let padded_key = format!("{}00", probe_key);
            match call_both(ctx, &format!("{}#padded", id), &padded_key, &probe_msg).await {
                Ok((padded_tag, _)) => {
                    if base_tag == padded_tag {
                        aggregate.push(FailureRecord::new(
                            &id,
                            "right-zero-padding the key did not change the tag",
                        ));
                    }
                }
                Err(failure) => aggregate.push(failure),
            }
        }
        Err(failure) => aggregate.push(failure),
    }

    aggregate.into_result()
}

fn record_unique(
    aggregate: &mut AggregateFailure,
    seen: &mut HashMap<String, String>,
    id: &str,
    tag: String,
) {
    if let Some(previous_id) = seen.get(&tag) {
        aggregate.push(FailureRecord::new(
            id,
            format!("duplicate tag, first produced by {}", previous_id),
        ));
    } else {
        seen.insert(tag, id.to_string());
    }
}
