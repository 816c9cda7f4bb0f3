//! # DSA Plan
//!
//! `prog1` signs `(p, q, g, y, x, m) -> "r\nsl\n"`; `prog2` verifies
//! `(p, q, g, y, r, s, m) -> "true"|"false"`. The core property is that
//! every signature prog1 produces must verify. A hash-length sweep and a
//! battery of edge-case probes run alongside the consistency sweep.

use std::collections::HashMap;

use crate::errors::{AggregateFailure, FailureRecord};
use crate::prng::Prng;
use crate::probes::Judgment;

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
    p: &str,
    q: &str,
    g: &str,
    y: &str,
    x: &str,
    message: &str,
) -> Result<(String, String), FailureRecord> {
    let sign_argv = vec![
        p.to_string(),
        q.to_string(),
        g.to_string(),
        y.to_string(),
        x.to_string(),
        message.to_string(),
    ];
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

    let verify_argv = vec![
        p.to_string(),
        q.to_string(),
        g.to_string(),
        y.to_string(),
        r.clone(),
        s.clone(),
        message.to_string(),
    ];
    let (verify_output, verify_outcome) = ctx
        .runner
        .run(&ctx.prog2, id, &verify_argv, ctx.config.timeout)
        .await;
    match Judgment::MustReturnTrue.evaluate(&verify_output, &verify_outcome) {
        crate::probes::Verdict::Pass => Ok((r, s)),
        crate::probes::Verdict::Fail(reason) => Err(FailureRecord::new(id, reason)),
    }
}

async fn probe(
    ctx: &PlanContext,
    id: &str,
    argv: Vec<String>,
    judgment: Judgment,
    on: &str,
) -> Result<(), FailureRecord> {
    let (output, outcome) = ctx
        .runner
        .run(on, id, &argv, ctx.config.timeout)
        .await;
    match judgment.evaluate(&output, &outcome) {
        crate::probes::Verdict::Pass => Ok(()),
        crate::probes::Verdict::Fail(reason) => Err(FailureRecord::new(id, reason)),
    }
}

pub async fn run(ctx: &PlanContext) -> Result<(), AggregateFailure> {
    let mut aggregate = AggregateFailure::new();
    let mut prng = Prng::from_seed(ctx.config.seed);

    let p = ctx.config.dsa_p.clone();
    let q = ctx.config.dsa_q.clone();
    let g = ctx.config.dsa_g.clone();
    let y = ctx.config.dsa_y.clone();
    let x = ctx.config.dsa_x.clone();

    // Consistency sweep over message length.
    let mut seen_tags: HashMap<String, String> = HashMap::new();
    let mut i = ctx.config.min_msg_len;
    while i <= ctx.config.max_msg_len {
        let message = prng.random_hex(i);
        let id = run_id("dsa", "msglen", i);
        match sign_and_verify(ctx, &id, &p, &q, &g, &y, &x, &message).await {
            Ok((r, s)) => {
                let tag = format!("{}{}", r, s);
                if let Some(previous) = seen_tags.get(&tag) {
                    aggregate.push(FailureRecord::new(
                        &id,
                        format!(
                            "note: signature collides with {} (only expected for deterministic DSA per RFC 6979)",
                            previous
                        ),
                    ));
                } else {
                    seen_tags.insert(tag, id.clone());
                }
            }
            Err(failure) => aggregate.push(failure),
        }
        i += ctx.config.increment_msg.max(1);
    }

    // Hash-length sweep, gated on an explicit `-h` flag.
    if ctx.hash_flag {
        let nbytes = crate::bigint::hex_to_biguint(&q)
            .map(|q| (q.bits() as usize + 7) / 8)
            .unwrap_or(20);
        let mut seen_hashes: HashMap<String, String> = HashMap::new();
        let mut h = 1usize;
        while h <= nbytes {
            let hash = prng.random_hex(h);
            let id = run_id("dsa", "hashlen", h);
            let sign_argv = vec![
                p.clone(),
                q.clone(),
                g.clone(),
                y.clone(),
                x.clone(),
                "-h".to_string(),
                hash.clone(),
            ];
            let (sign_output, sign_outcome) = ctx
                .runner
                .run(&ctx.prog1, &id, &sign_argv, ctx.config.timeout)
                .await;
            if !sign_outcome.is_ok() {
                aggregate.push(FailureRecord::new(
                    &id,
                    format!("hash-length sign failed: {}", sign_outcome.diagnostic()),
                ));
                h += 1;
                continue;
            }
            if let Some((r, s)) = parse_signature(&sign_output) {
                let verify_argv = vec![
                    p.clone(),
                    q.clone(),
                    g.clone(),
                    y.clone(),
                    r.clone(),
                    s.clone(),
                    "-h".to_string(),
                    hash.clone(),
                ];
                let (verify_output, verify_outcome) = ctx
                    .runner
                    .run(&ctx.prog2, &id, &verify_argv, ctx.config.timeout)
                    .await;
                if let crate::probes::Verdict::Fail(reason) =
                    Judgment::MustReturnTrue.evaluate(&verify_output, &verify_outcome)
                {
                    aggregate.push(FailureRecord::new(&id, reason));
                }
                let tag = format!("{}{}", r, s);
                if let Some(previous) = seen_hashes.get(&tag) {
                    aggregate.push(FailureRecord::new(
                        &id,
                        format!(
                            "note: hash-length signature collides with {} (only expected for deterministic DSA per RFC 6979)",
                            previous
                        ),
                    ));
                } else {
                    seen_hashes.insert(tag, id.clone());
                }
            }
            h += 1;
        }
    }

    // Edge-case probes: substitute "00" for each of {p, q, g, x}, skipping
    // y in the sign direction. Both subjects are tried against the
    // sign-style argv, since either may implement the signing role.
    let message = prng.random_hex(ctx.config.min_msg_len.max(1));
    for program in [&ctx.prog1, &ctx.prog2] {
        for field in ["p", "q", "g", "x"] {
            let id = run_id("dsa", "zeroparam", format!("{}-{}", field, program));
            let argv = build_sign_argv_substituting(&p, &q, &g, &y, &x, &message, field, "00");
            if let Err(failure) = probe(ctx, &id, argv, Judgment::MustReject, program).await {
                aggregate.push(failure);
            }
        }
    }

    // Substitute "01" for each of {p, q, g, y, x}, against both subjects.
    for program in [&ctx.prog1, &ctx.prog2] {
        for field in ["p", "q", "g", "y", "x"] {
            let id = run_id("dsa", "oneparam", format!("{}-{}", field, program));
            let argv = build_sign_argv_substituting(&p, &q, &g, &y, &x, &message, field, "01");
            if let Err(failure) = probe(ctx, &id, argv, Judgment::MustReject, program).await {
                aggregate.push(failure);
            }
        }
    }

    // Null-signature verification: any of these (r, s) pairs returning
    // "true" is a security failure. Both subjects are tried against the
    // verify-style argv.
    let null_signatures = [("00", "00"), ("01", "00"), ("00", "01"), ("01", q.as_str())];
    for program in [&ctx.prog1, &ctx.prog2] {
        for (idx, (r, s)) in null_signatures.iter().enumerate() {
            let id = run_id("dsa", "nullsig", format!("{}-{}", idx, program));
            let argv = vec![
                p.clone(),
                q.clone(),
                g.clone(),
                y.clone(),
                r.to_string(),
                s.to_string(),
                message.clone(),
            ];
            if let Err(failure) = probe(ctx, &id, argv, Judgment::MustReturnFalse, program).await {
                aggregate.push(failure);
            }
        }
    }

    // Zero-hash probe: fabricated (x, r, s) = (01, 01, 01) must not verify.
    // Both subjects are tried against the verify-style argv.
    for program in [&ctx.prog1, &ctx.prog2] {
        let id = run_id("dsa", "zerohash", program.as_str());
        let argv = vec![
            p.clone(),
            q.clone(),
            g.clone(),
            y.clone(),
            "01".to_string(),
            "01".to_string(),
            "01".to_string(),
        ];
        if let Err(failure) = probe(ctx, &id, argv, Judgment::MustReturnFalse, program).await {
            aggregate.push(failure);
        }
    }

    aggregate.into_result()
}

fn build_sign_argv_substituting(
    p: &str,
    q: &str,
    g: &str,
    y: &str,
    x: &str,
    message: &str,
    field: &str,
    replacement: &str,
) -> Vec<String> {
    let mut values = vec![
        p.to_string(),
        q.to_string(),
        g.to_string(),
        y.to_string(),
        x.to_string(),
    ];
    let index = match field {
        "p" => 0,
        "q" => 1,
        "g" => 2,
        "y" => 3,
        "x" => 4,
        _ => unreachable!("unknown DSA field {:?}", field),
    };
    values[index] = replacement.to_string();
    values.push(message.to_string());
    values
}
