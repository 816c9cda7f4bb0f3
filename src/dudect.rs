//! # Constant-Time Leakage Tester (dudect core)
//!
//! A Welch t-test leakage detector in the style of dudect. Measures
//! wall-clock execution of one external program across two input classes,
//! maintains online variance over the full distribution plus a bank of
//! percentile-cropped distributions, and a second-order centered-product
//! test, then reports a confidence verdict after each batch.
//!
//! Modeled as a [`LeakageSession`] value with no process-wide globals, so
//! multiple sessions (or tests) can run independently.

const NUMBER_PERCENTILES: usize = 100;
/// Index 0 is the raw-elapsed test, 1..=100 are percentile-cropped tests,
/// 101 is the second-order centered-product test.
const NUMBER_TESTS: usize = NUMBER_PERCENTILES + 2;
const SECOND_ORDER_INDEX: usize = NUMBER_TESTS - 1;
const SECOND_ORDER_MIN_SAMPLES: u64 = 10_000;

const T_THRESHOLD_BANANAS: f64 = 500.0;
const T_THRESHOLD_MODERATE: f64 = 5.0;
const CONSECUTIVE_HINT_LIMIT: u32 = 5;

/// A single `(elapsed_ns, class)` measurement.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub elapsed_ns: i64,
    pub class: u8,
}

/// Online Welford running statistics for one class within one t-test bucket.
#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    n: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn push(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    fn variance(&self) -> f64 {
        if self.n < 2 {
            0.0
        } else {
            self.m2 / (self.n - 1) as f64
        }
    }
}

/// One Welch t-test bucket: running statistics for class 0 and class 1.
#[derive(Debug, Clone, Copy, Default)]
struct TTestBucket {
    class0: RunningStats,
    class1: RunningStats,
}

impl TTestBucket {
    fn push(&mut self, x: f64, class: u8) {
        if class == 0 {
            self.class0.push(x);
        } else {
            self.class1.push(x);
        }
    }

    /// `None` until both classes have at least 2 samples (variance needs
    /// `n >= 2`) and at least one sample (mean needs `n >= 1`).
    fn t_statistic(&self) -> Option<f64> {
        if self.class0.n == 0 || self.class1.n == 0 {
            return None;
        }
        let var0 = self.class0.variance();
        let var1 = self.class1.variance();
        let denom = (var0 / self.class0.n as f64 + var1 / self.class1.n as f64).sqrt();
        if denom == 0.0 {
            return None;
        }
        Some((self.class0.mean - self.class1.mean) / denom)
    }
}

/// Overall confidence verdict after a measurement batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// `|t| > 500`: clear evidence of non-constant-time behavior. Testing
    /// stops immediately.
    DefinitelyNotConstantTime { max_t: f64 },
    /// `|t| > 5` for `consecutive_hints` consecutive batches: suspicious but
    /// not yet conclusive.
    ProbablyNotConstantTime { max_t: f64, consecutive_hints: u32 },
    /// No bucket has exceeded the moderate threshold (or no bucket yet has
    /// enough samples to judge).
    MaybeConstantTime,
}

/// Owns the t-test bank, percentile table, and hint counter across batches.
/// No process-wide state: construct one per timing test, drive it with
/// [`LeakageSession::run_batch`], and discard it when done.
pub struct LeakageSession {
    enough_measurements: u64,
    buckets: Vec<TTestBucket>,
    percentiles: Option<Vec<i64>>,
    consecutive_hints: u32,
}

impl LeakageSession {
    pub fn new(enough_measurements: u64) -> Self {
        Self {
            enough_measurements,
            buckets: vec![TTestBucket::default(); NUMBER_TESTS],
            percentiles: None,
            consecutive_hints: 0,
        }
    }

    /// Computes the 100 percentile thresholds from the first batch of
    /// elapsed times, at levels `1 - 0.5^(10*(i+1)/100)` for `i=0..99`.
    /// A no-op if the table has already been computed.
    fn ensure_percentiles(&mut self, elapsed_sorted_ascending: &[i64]) {
        if self.percentiles.is_some() || elapsed_sorted_ascending.is_empty() {
            return;
        }
        let n = elapsed_sorted_ascending.len();
        let mut table = Vec::with_capacity(NUMBER_PERCENTILES);
        for i in 0..NUMBER_PERCENTILES {
            let p = 1.0 - 0.5f64.powf(10.0 * (i as f64 + 1.0) / 100.0);
            let index = ((p * n as f64).floor() as usize).min(n - 1);
            table.push(elapsed_sorted_ascending[index]);
        }
        self.percentiles = Some(table);
    }

    /// Feeds one batch of measurements into the session and returns the
    /// verdict for this batch. Negative elapsed times are discarded as a
    /// monotonic-clock counter-wraparound guard.
    pub fn run_batch(&mut self, samples: &[Sample]) -> Verdict {
        if self.percentiles.is_none() {
            let mut sorted: Vec<i64> = samples
                .iter()
                .map(|s| s.elapsed_ns)
                .filter(|&e| e >= 0)
                .collect();
            sorted.sort_unstable();
            self.ensure_percentiles(&sorted);
        }

        for sample in samples {
            if sample.elapsed_ns < 0 {
                continue;
            }
            let x = sample.elapsed_ns as f64;
            self.buckets[0].push(x, sample.class);

            if let Some(percentiles) = &self.percentiles {
                for (k, threshold) in percentiles.iter().enumerate() {
                    if sample.elapsed_ns < *threshold {
                        self.buckets[k + 1].push(x, sample.class);
                    }
                }
            }

            if self.buckets[0].class0.n > SECOND_ORDER_MIN_SAMPLES {
                let mean = if sample.class == 0 {
                    self.buckets[0].class0.mean
                } else {
                    self.buckets[0].class1.mean
                };
                let centered = (x - mean).powi(2);
                self.buckets[SECOND_ORDER_INDEX].push(centered, sample.class);
            }
        }

        self.verdict()
    }

    fn verdict(&mut self) -> Verdict {
        let mut max_t = 0.0f64;
        let mut found_eligible = false;

        for bucket in &self.buckets {
            if bucket.class0.n <= self.enough_measurements {
                continue;
            }
            if let Some(t) = bucket.t_statistic() {
                found_eligible = true;
                if t.abs() > max_t.abs() {
                    max_t = t;
                }
            }
        }

        if !found_eligible {
            self.consecutive_hints = 0;
            return Verdict::MaybeConstantTime;
        }

        if max_t.abs() > T_THRESHOLD_BANANAS {
            return Verdict::DefinitelyNotConstantTime { max_t: max_t.abs() };
        }

        if max_t.abs() > T_THRESHOLD_MODERATE {
            self.consecutive_hints += 1;
            Verdict::ProbablyNotConstantTime {
                max_t: max_t.abs(),
                consecutive_hints: self.consecutive_hints,
            }
        } else {
            self.consecutive_hints = 0;
            Verdict::MaybeConstantTime
        }
    }

    /// Whether the session should stop per the consecutive-hint rule (five
    /// consecutive `ProbablyNotConstantTime` batches) or a conclusive
    /// verdict.
    pub fn should_stop(&self, verdict: &Verdict) -> bool {
        match verdict {
            Verdict::DefinitelyNotConstantTime { .. } => true,
            Verdict::ProbablyNotConstantTime {
                consecutive_hints, ..
            } => *consecutive_hints >= CONSECUTIVE_HINT_LIMIT,
            Verdict::MaybeConstantTime => false,
        }
    }

    /// Formats a report line: `(maxT, maxTau, (5/maxTau)^2, mean0 in ms)`.
    pub fn report_line(&self, max_t: f64) -> String {
        let n0 = self.buckets[0].class0.n;
        let n1 = self.buckets[0].class1.n;
        let max_tau = if n0 + n1 > 0 {
            max_t / ((n0 + n1) as f64).sqrt()
        } else {
            0.0
        };
        let projected_n = if max_tau != 0.0 {
            (T_THRESHOLD_MODERATE / max_tau).powi(2)
        } else {
            f64::INFINITY
        };
        let mean0_ms = self.buckets[0].class0.mean / 1_000_000.0;
        format!(
            "maxT={:.3} maxTau={:.6} measurements_to_verdict={:.1} mean0_ms={:.6}",
            max_t, max_tau, projected_n, mean0_ms
        )
    }
}

/// Two-pass variance, used only by tests to validate Welford's online
/// algorithm against a reference implementation.
#[cfg(test)]
fn two_pass_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
}
