//! # ECDSA Plan
//!
//! `prog1` signs `(X, Y, D, m) -> "r\ns\n"`; `prog2` verifies
//! `(X, Y, r, s, m) -> "true"|"false"`. Analogous to the DSA plan but with
//! affine public-key coordinates and no domain parameters to substitute,
//! plus two probes specific to curve arithmetic: the point-at-infinity
//! probe and the nonce-selection infinite-loop probe.

use std::collections::HashMap;

use crate::errors::{AggregateFailure, FailureRecord};
use crate::prng::Prng;
use crate::probes::{Judgment, Verdict};

use super::{run_id, PlanContext};

fn parse_signature(output: &str) -> Option<(String, String)> {
    let mut lines = output.lines();
    let r = lines.next()?.trim().to_string();
    let s = lines.next()?.trim().to_string();
    Some((r, s))
}

async fn sign_and_verify(
    ctx: &PlanContext,
    id: &str,
    x: &str,
    y: &str,
    d: &str,
    message: &str,
) -> Result<(String, String), FailureRecord> {
    let sign_argv = vec![x.to_string(), y.to_string(), d.to_string(), message.to_string()];
    let (sign_output, sign_outcome) = ctx
        .runner
        .run(&ctx.prog1, id, &sign_argv, ctx.config.timeout)
        .await;
    if !sign_outcome.is_ok() {
        return Err(FailureRecord::new(
            id,
            format!("sign failed: {}", sign_outcome.diagnostic()),
        ));
    }
    let (r, s) = parse_signature(&sign_output).ok_or_else(|| {
        FailureRecord::new(id, format!("sign output not parseable as r/s: {:?}", sign_output))
    })?;

    let verify_argv = vec![x.to_string(), y.to_string(), r.clone(), s.clone(), message.to_string()];
    let (verify_output, verify_outcome) = ctx
        .runner
        .run(&ctx.prog2, id, &verify_argv, ctx.config.timeout)
        .await;
    match Judgment::MustReturnTrue.evaluate(&verify_output, &verify_outcome) {
        Verdict::Pass => Ok((r, s)),
        Verdict::Fail(reason) => Err(FailureRecord::new(id, reason)),
    }
}

pub async fn run(ctx: &PlanContext) -> Result<(), AggregateFailure> {
    let mut aggregate = AggregateFailure::new();
    let mut prng = Prng::from_seed(ctx.config.seed);

    let x = ctx.config.ecdsa_x.clone();
    let y = ctx.config.ecdsa_y.clone();
    let d = ctx.config.ecdsa_d.clone();

    let mut seen_signatures: HashMap<String, String> = HashMap::new();
    let mut i = ctx.config.min_msg_len;
    while i <= ctx.config.max_msg_len {
        let message = prng.random_hex(i);
        let id = run_id("ecdsa", "msglen", i);
        match sign_and_verify(ctx, &id, &x, &y, &d, &message).await {
            Ok((r, s)) => {
                let tag = format!("{}{}", r, s);
                if let Some(previous) = seen_signatures.get(&tag) {
                    aggregate.push(FailureRecord::new(
                        &id,
                        format!("signature collides with {}", previous),
                    ));
                } else {
                    seen_signatures.insert(tag, id.clone());
                }
            }
            Err(failure) => aggregate.push(failure),
        }
        i += ctx.config.increment_msg.max(1);
    }

    let message = prng.random_hex(ctx.config.min_msg_len.max(1));

    // (0,0) as public key and 0 as private scalar: the origin is not on a
    // prime-order short-Weierstrass curve with non-zero b, so signing must
    // fail outright. Both subjects are tried against the sign-style argv,
    // since either may implement the signing role.
    for program in [&ctx.prog1, &ctx.prog2] {
        let id = run_id("ecdsa", "zeropoint", program.as_str());
        let argv = vec!["00".to_string(), "00".to_string(), "00".to_string(), message.clone()];
        let (output, outcome) = ctx.runner.run(program, &id, &argv, ctx.config.timeout).await;
        if let Verdict::Fail(reason) = Judgment::MustReject.evaluate(&output, &outcome) {
            aggregate.push(FailureRecord::new(
                &id,
                format!("{} accepts the (0,0) coordinate and 0 as private integer: {}", program, reason),
            ));
        }
    }

    // Null-signature verification: any of these (r, s) must not verify.
    // Both subjects are tried against the verify-style argv.
    for program in [&ctx.prog1, &ctx.prog2] {
        for (idx, (r, s)) in [("00", "00"), ("01", "00"), ("00", "01")].iter().enumerate() {
            let id = run_id("ecdsa", "nullsig", format!("{}-{}", idx, program));
            let argv = vec![x.clone(), y.clone(), r.to_string(), s.to_string(), message.clone()];
            let (output, outcome) = ctx.runner.run(program, &id, &argv, ctx.config.timeout).await;
            if let Verdict::Fail(reason) = Judgment::MustReturnFalse.evaluate(&output, &outcome) {
                aggregate.push(FailureRecord::new(&id, reason));
            }
        }
    }

    if ctx.hash_flag {
        // Zero-hash probe: otherwise-valid sign/verify with an explicit
        // all-zero hash.
        let id = run_id("ecdsa", "zerohash", "probe");
        let sign_argv = vec![
            x.clone(),
            y.clone(),
            d.clone(),
            "-h".to_string(),
            "00".to_string(),
        ];
        let (sign_output, sign_outcome) = ctx
            .runner
            .run(&ctx.prog1, &id, &sign_argv, ctx.config.timeout)
            .await;
        if sign_outcome.is_ok() {
            if let Some((r, s)) = parse_signature(&sign_output) {
                let verify_argv = vec![
                    x.clone(),
                    y.clone(),
                    r,
                    s,
                    "-h".to_string(),
                    "00".to_string(),
                ];
                let (verify_output, verify_outcome) = ctx
                    .runner
                    .run(&ctx.prog2, &id, &verify_argv, ctx.config.timeout)
                    .await;
                if let Verdict::Fail(reason) =
                    Judgment::MustReturnTrue.evaluate(&verify_output, &verify_outcome)
                {
                    aggregate.push(FailureRecord::new(&id, reason));
                }
            }
        }

        // Infinite-loop probe: -h 00 with private scalar 00. A timeout here
        // indicates a nonce-selection loop with no domain check.
        let id = run_id("ecdsa", "infiniteloop", "probe");
        let argv = vec![
            x.clone(),
            y.clone(),
            "00".to_string(),
            "-h".to_string(),
            "00".to_string(),
        ];
        let (output, outcome) = ctx
            .runner
            .run(&ctx.prog1, &id, &argv, ctx.config.timeout)
            .await;
        if let Verdict::Fail(reason) = Judgment::MustTimeoutMeansBug.evaluate(&output, &outcome) {
            aggregate.push(FailureRecord::new(&id, reason));
        }
    }

    aggregate.into_result()
}
