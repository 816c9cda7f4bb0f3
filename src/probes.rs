//! # Edge-Case Probe Judgments
//!
//! A probe is an adversarial argv plus a [`Judgment`] describing what a
//! correct subject program must do with it. Plans build the argv themselves
//! (each interface's layout differs); this module only knows how to grade
//! the `(output, outcome)` pair that comes back from the [`Runner`](crate::runner::Runner).

use crate::runner::Outcome;

/// What a correct subject program is expected to do with a given adversarial
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgment {
    /// Any non-error exit with output is a bug; a non-zero exit is correct
    /// behavior (the program refused the malformed input).
    MustReject,
    /// The program must answer exactly `"true"`.
    MustReturnTrue,
    /// The program must not answer `"true"`; `"false"` or a non-zero exit
    /// are both acceptable.
    MustReturnFalse,
    /// A timeout on this input is itself the bug (e.g. a nonce-selection
    /// loop with no domain check); any other outcome is fine.
    MustTimeoutMeansBug,
}

/// Result of grading a probe's observed `(output, outcome)` against its
/// judgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Carries a human-readable description of why the probe failed, to be
    /// wrapped into a [`crate::errors::FailureRecord`] by the calling plan.
    Fail(String),
}

impl Judgment {
    pub fn evaluate(self, output: &str, outcome: &Outcome) -> Verdict {
        match self {
            Judgment::MustReject => match outcome {
                Outcome::Ok => Verdict::Fail(format!(
                    "expected rejection but subject exited 0 with output {:?}",
                    output
                )),
                _ => Verdict::Pass,
            },
            Judgment::MustReturnTrue => {
                if outcome.is_ok() && output == "true" {
                    Verdict::Pass
                } else {
                    Verdict::Fail(format!(
                        "expected \"true\" but got output {:?} ({})",
                        output,
                        outcome.diagnostic()
                    ))
                }
            }
            Judgment::MustReturnFalse => {
                if outcome.is_ok() && output == "true" {
                    Verdict::Fail("subject accepted an input that must be rejected".to_string())
                } else {
                    Verdict::Pass
                }
            }
            Judgment::MustTimeoutMeansBug => {
                if outcome.is_timeout() {
                    Verdict::Fail(
                        "subject timed out on pathological input (likely infinite loop)"
                            .to_string(),
                    )
                } else {
                    Verdict::Pass
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_reject_passes_on_error_exit() {
        let outcome = Outcome::ExitFailure { code: Some(1) };
        assert_eq!(
            Judgment::MustReject.evaluate("anything", &outcome),
            Verdict::Pass
        );
    }

    #[test]
    fn must_reject_fails_on_success() {
        let outcome = Outcome::Ok;
        assert!(matches!(
            Judgment::MustReject.evaluate("accepted", &outcome),
            Verdict::Fail(_)
        ));
    }

    #[test]
    fn must_return_true_requires_exact_match() {
        assert_eq!(
            Judgment::MustReturnTrue.evaluate("true", &Outcome::Ok),
            Verdict::Pass
        );
        assert!(matches!(
            Judgment::MustReturnTrue.evaluate("maybe", &Outcome::Ok),
            Verdict::Fail(_)
        ));
    }

    #[test]
    fn must_return_false_rejects_true_only() {
        assert!(matches!(
            Judgment::MustReturnFalse.evaluate("true", &Outcome::Ok),
            Verdict::Fail(_)
        ));
        assert_eq!(
            Judgment::MustReturnFalse.evaluate("false", &Outcome::Ok),
            Verdict::Pass
        );
        assert_eq!(
            Judgment::MustReturnFalse.evaluate("", &Outcome::ExitFailure { code: Some(1) }),
            Verdict::Pass
        );
    }

    #[test]
    fn must_timeout_means_bug_flips_the_usual_polarity() {
        assert!(matches!(
            Judgment::MustTimeoutMeansBug.evaluate("", &Outcome::TimedOut),
            Verdict::Fail(_)
        ));
        assert_eq!(
            Judgment::MustTimeoutMeansBug.evaluate("", &Outcome::Ok),
            Verdict::Pass
        );
    }
}
