//! Welch's Two-Sample t-Test
//!
//! Tests the null hypothesis that two populations share a mean without
//! assuming equal variances. Degrees of freedom follow Welch-Satterthwaite;
//! the p-value is two-tailed.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Mean, sample variance and size of one group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    /// Arithmetic mean
    pub mean: f64,
    /// Sample variance (n - 1 denominator), 0.0 when n < 2
    pub variance: f64,
    /// Number of observations
    pub n: usize,
}

/// Outcome of a Welch test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchTest {
    /// t statistic, positive when the first group is slower
    pub t: f64,
    /// Welch-Satterthwaite degrees of freedom
    pub df: f64,
    /// Two-tailed p-value
    pub p_value: f64,
}

impl WelchTest {
    /// Whether equal means are rejected at `confidence` (e.g. 0.99)
    pub fn rejects_at(&self, confidence: f64) -> bool {
        self.p_value < 1.0 - confidence
    }
}

/// Run Welch's t-test on two groups.
///
/// With no variance in either group the standard error is zero; the test
/// then degenerates to comparing means, giving p = 0 when they differ and
/// p = 1 when they are equal.
pub fn welch_t_test(a: &Moments, b: &Moments) -> WelchTest {
    let va = scaled_variance(a);
    let vb = scaled_variance(b);
    let se2 = va + vb;
    let diff = a.mean - b.mean;

    if se2 <= 0.0 || !se2.is_finite() {
        let differs = diff != 0.0;
        return WelchTest {
            t: if differs { diff.signum() * f64::INFINITY } else { 0.0 },
            df: f64::NAN,
            p_value: if differs { 0.0 } else { 1.0 },
        };
    }

    let t = diff / se2.sqrt();
    let df = se2 * se2 / (df_term(va, a.n) + df_term(vb, b.n));

    let p_value = StudentsT::new(0.0, 1.0, df)
        .map(|dist| (2.0 * dist.sf(t.abs())).min(1.0))
        .unwrap_or(f64::NAN);

    WelchTest { t, df, p_value }
}

fn scaled_variance(m: &Moments) -> f64 {
    if m.n == 0 {
        0.0
    } else {
        m.variance / m.n as f64
    }
}

fn df_term(scaled: f64, n: usize) -> f64 {
    if scaled == 0.0 || n < 2 {
        0.0
    } else {
        scaled * scaled / (n - 1) as f64
    }
}
