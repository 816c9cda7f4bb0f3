//! End-to-end scenarios driven against real subprocesses (`/bin/sh` scripts
//! standing in for subject programs) through the real [`ProcessRunner`],
//! rather than the in-process fake the per-plan unit tests use. These mirror
//! the handful of literal-input seed scenarios the plans' unit tests only
//! approximate with `FakeRunner` closures.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cdf_harness::config::Configuration;
use cdf_harness::plans::PlanContext;
use cdf_harness::runner::ProcessRunner;
use cdf_harness::{plans, Interface};

/// Writes an executable POSIX shell script into `dir` and returns its path.
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write subject script");
    let mut perms = fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod script");
    path
}

fn base_config() -> Configuration {
    Configuration {
        seed: 1,
        min_msg_len: 1,
        max_msg_len: 2,
        increment_msg: 1,
        min_key_len: 1,
        max_key_len: 2,
        increment_key: 1,
        rsa_p: String::new(),
        rsa_q: String::new(),
        rsa_n: String::new(),
        rsa_e: String::new(),
        rsa_d: String::new(),
        ecdsa_x: "aa".to_string(),
        ecdsa_y: "bb".to_string(),
        ecdsa_d: "cc".to_string(),
        dsa_p: "ff".to_string(),
        dsa_q: "fd".to_string(),
        dsa_g: "02".to_string(),
        dsa_y: "0e".to_string(),
        dsa_x: "0f".to_string(),
        timeout: Duration::from_secs(5),
        concurrency: 3,
        verbose_log: false,
    }
}

/// S1: ENC consistency with an identity-echo subject for both roles, with
/// the exact configuration the scenario names. Every subprocess invocation
/// appends a marker line to a counter file so the test can assert the
/// literal invocation count alongside the no-findings result.
#[tokio::test]
async fn s1_enc_consistency_known_good_subject() {
    let dir = tempfile::tempdir().expect("tempdir");
    let counter = dir.path().join("invocations");
    fs::write(&counter, "").expect("seed counter file");

    let echo = write_script(
        dir.path(),
        "echo_identity",
        &format!("echo x >> {}\nprintf '%s' \"$2\"\n", counter.display()),
    );

    let mut config = base_config();
    config.min_msg_len = 1;
    config.max_msg_len = 2;
    config.increment_msg = 1;
    config.min_key_len = 1;
    config.max_key_len = 2;
    config.increment_key = 1;
    config.concurrency = 3;

    let ctx = PlanContext {
        config: Arc::new(config),
        prog1: echo.display().to_string(),
        prog2: echo.display().to_string(),
        hash_flag: false,
        runner: Arc::new(ProcessRunner),
    };

    let result = plans::run_plan(Interface::Enc, ctx)
        .await
        .expect("enc is implemented");
    assert!(result.is_ok(), "expected no findings, got {:?}", result);

    let invocations = fs::read_to_string(&counter).expect("read counter");
    assert_eq!(invocations.lines().count(), 8);
}

/// S2: ECDSA against a subject that accepts `(0,0)` as a public point and
/// `0` as a private scalar. Both the sign role (`prog1`) and the verify
/// role (`prog2`) point at the same buggy script, so the zero-point probe
/// runs against both and the aggregate carries exactly two occurrences of
/// the failure substring.
#[tokio::test]
async fn s2_ecdsa_buggy_subject_accepts_zero_point() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = write_script(
        dir.path(),
        "buggy_ecdsa",
        r#"
if [ "$#" -eq 4 ]; then
    echo "0a"
    echo "0b"
    exit 0
elif [ "$#" -eq 5 ]; then
    if [ "$3" = "0a" ] && [ "$4" = "0b" ]; then
        echo true
    else
        echo false
    fi
    exit 0
fi
exit 1
"#,
    );

    let mut config = base_config();
    config.min_msg_len = 1;
    config.max_msg_len = 1;

    let ctx = PlanContext {
        config: Arc::new(config),
        prog1: script.display().to_string(),
        prog2: script.display().to_string(),
        hash_flag: false,
        runner: Arc::new(ProcessRunner),
    };

    let result = plans::run_plan(Interface::Ecdsa, ctx)
        .await
        .expect("ecdsa is implemented");
    let aggregate = result.expect_err("buggy subject must be caught");
    let rendered = aggregate.to_string();
    assert!(
        rendered.contains("(2 errors)"),
        "rendered aggregate: {}",
        rendered
    );
    assert_eq!(rendered.matches("accepts the (0,0)").count(), 2);
}

/// S3: DSA against a subject that signs without error when the domain
/// parameter `g` is substituted with `01`, echoing back the padded literal
/// the one-param probe is seeded to recognize. The probe runs against both
/// subjects, so the literal substring appears exactly twice.
#[tokio::test]
async fn s3_dsa_buggy_subject_signs_with_domain_param_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = write_script(
        dir.path(),
        "buggy_dsa",
        r#"
if [ "$#" -eq 6 ]; then
    P="$1"; Q="$2"; G="$3"; Y="$4"; X="$5"; MSG="$6"
    if [ "$P" = "00" ] || [ "$Q" = "00" ] || [ "$G" = "00" ] || [ "$X" = "00" ]; then
        exit 1
    fi
    if [ "$P" = "01" ] || [ "$Q" = "01" ] || [ "$Y" = "01" ] || [ "$X" = "01" ]; then
        exit 1
    fi
    if [ "$G" = "01" ]; then
        echo "0000000000000000000000000000000000000001"
        exit 0
    fi
    LEN=${#MSG}
    printf '%040x\n%040x\n' "$LEN" "$LEN"
    exit 0
elif [ "$#" -eq 7 ]; then
    MSG="$7"
    LEN=${#MSG}
    EXP=$(printf '%040x' "$LEN")
    if [ "$5" = "$EXP" ] && [ "$6" = "$EXP" ]; then
        echo true
    else
        echo false
    fi
    exit 0
fi
exit 1
"#,
    );

    let mut config = base_config();
    config.min_msg_len = 1;
    config.max_msg_len = 2;
    config.increment_msg = 1;

    let ctx = PlanContext {
        config: Arc::new(config),
        prog1: script.display().to_string(),
        prog2: script.display().to_string(),
        hash_flag: false,
        runner: Arc::new(ProcessRunner),
    };

    let result = plans::run_plan(Interface::Dsa, ctx)
        .await
        .expect("dsa is implemented");
    let aggregate = result.expect_err("buggy subject must be caught");
    let rendered = aggregate.to_string();
    assert!(
        rendered.contains("(2 errors)"),
        "rendered aggregate: {}",
        rendered
    );
    assert_eq!(
        rendered
            .matches("0000000000000000000000000000000000000001")
            .count(),
        2
    );
}
