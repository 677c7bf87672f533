//! The canonical procedures a hypothesis may run.
//!
//! Every procedure refuses degenerate input (too few observations, zero
//! variance, an empty contingency margin) with a [`StatsError`] instead of
//! returning NaN.

use serde::Serialize;
use thiserror::Error;

use crate::distributions::{chi_square_upper_p, f_upper_p, student_t_two_sided_p};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("{sample} needs at least {required} observations, got {actual}")]
    TooFewObservations {
        sample: String,
        required: usize,
        actual: usize,
    },
    #[error("{0} has zero variance")]
    ZeroVariance(String),
    #[error("paired series differ in length ({0} vs {1})")]
    LengthMismatch(usize, usize),
    #[error("contingency table has an empty row or column")]
    EmptyMargin,
    #[error("one-way comparison needs at least {required} groups, got {actual}")]
    TooFewGroups { required: usize, actual: usize },
}

/// Sample size, mean and sample standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Describe {
    pub n: usize,
    pub mean: f64,
    pub sd: f64,
}

pub fn describe(values: &[f64]) -> Describe {
    let n = values.len();
    if n == 0 {
        return Describe { n, mean: 0.0, sd: 0.0 };
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let sd = if n > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    } else {
        0.0
    };
    Describe { n, mean, sd }
}

fn max_abs<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    values.into_iter().fold(0.0, |m, v| m.max(v.abs()))
}

/// Whether a sum of squared deviations over `n` values of magnitude up to
/// `scale` is indistinguishable from rounding residue.
///
/// Summation error in a mean is bounded by `n * EPSILON * scale`, so a
/// constant series like `[0.7; 15]` leaves squared deviations near 1e-32
/// instead of an exact zero.
fn within_rounding(sum_squares: f64, n: usize, scale: f64) -> bool {
    let n = n as f64;
    sum_squares <= n * (n * f64::EPSILON * scale).powi(2)
}

fn require(sample: &str, values: &[f64], required: usize) -> Result<(), StatsError> {
    if values.len() < required {
        return Err(StatsError::TooFewObservations {
            sample: sample.to_string(),
            required,
            actual: values.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TTestResult {
    pub t: f64,
    pub df: f64,
    pub p: f64,
    /// Mean difference over the root mean of the two variances
    pub cohens_d: f64,
    pub a: Describe,
    pub b: Describe,
}

/// Student two-sample t test with pooled variance, `a` minus `b`.
pub fn independent_t_test(a: &[f64], b: &[f64]) -> Result<TTestResult, StatsError> {
    require("first sample", a, 2)?;
    require("second sample", b, 2)?;
    let da = describe(a);
    let db = describe(b);

    let df = (da.n + db.n - 2) as f64;
    let sum_squares = (da.n - 1) as f64 * da.sd.powi(2) + (db.n - 1) as f64 * db.sd.powi(2);
    if within_rounding(sum_squares, da.n + db.n, max_abs(a.iter().chain(b))) {
        return Err(StatsError::ZeroVariance("pooled samples".to_string()));
    }

    let pooled_var = sum_squares / df;
    let diff = da.mean - db.mean;
    let t = diff / (pooled_var * (1.0 / da.n as f64 + 1.0 / db.n as f64)).sqrt();
    let cohens_d = diff / ((da.sd.powi(2) + db.sd.powi(2)) / 2.0).sqrt();

    Ok(TTestResult {
        t,
        df,
        p: student_t_two_sided_p(t, df),
        cohens_d,
        a: da,
        b: db,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedTResult {
    pub t: f64,
    pub df: f64,
    pub p: f64,
    /// Mean difference over the standard deviation of the differences
    pub d_z: f64,
    pub mean_difference: f64,
    pub before: Describe,
    pub after: Describe,
}

/// Paired t test on `after - before`.
pub fn paired_t_test(before: &[f64], after: &[f64]) -> Result<PairedTResult, StatsError> {
    if before.len() != after.len() {
        return Err(StatsError::LengthMismatch(before.len(), after.len()));
    }
    let differences: Vec<f64> = before.iter().zip(after).map(|(b, a)| a - b).collect();
    require("paired differences", &differences, 2)?;
    let diff = describe(&differences);
    // Residue of the subtraction scales with the operands, not the differences
    let scale = max_abs(before.iter().chain(after));
    if within_rounding((diff.n - 1) as f64 * diff.sd.powi(2), diff.n, scale) {
        return Err(StatsError::ZeroVariance("paired differences".to_string()));
    }

    let n = diff.n as f64;
    let t = diff.mean / (diff.sd / n.sqrt());
    let df = n - 1.0;
    Ok(PairedTResult {
        t,
        df,
        p: student_t_two_sided_p(t, df),
        d_z: diff.mean / diff.sd,
        mean_difference: diff.mean,
        before: describe(before),
        after: describe(after),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub r: f64,
    pub t: f64,
    pub df: f64,
    pub p: f64,
    pub n: usize,
}

/// Pearson product-moment correlation with a t-based p-value.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<CorrelationResult, StatsError> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch(x.len(), y.len()));
    }
    require("correlated series", x, 3)?;
    let n = x.len();
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if within_rounding(sxx, n, max_abs(x)) {
        return Err(StatsError::ZeroVariance("first series".to_string()));
    }
    if within_rounding(syy, n, max_abs(y)) {
        return Err(StatsError::ZeroVariance("second series".to_string()));
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let t = if r.abs() >= 1.0 {
        f64::INFINITY.copysign(r)
    } else {
        r * df.sqrt() / (1.0 - r * r).sqrt()
    };
    Ok(CorrelationResult {
        r,
        t,
        df,
        p: student_t_two_sided_p(t, df),
        n,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChiSquareResult {
    /// Yates-corrected statistic
    pub chi_square: f64,
    pub df: f64,
    pub p: f64,
    /// Signed phi from the uncorrected statistic; positive when the first row
    /// leans to the first column
    pub phi: f64,
    pub table: [[u64; 2]; 2],
    pub n: u64,
}

/// Chi-square test of independence on a 2x2 table `[[a, b], [c, d]]`.
pub fn chi_square_2x2(table: [[u64; 2]; 2]) -> Result<ChiSquareResult, StatsError> {
    let [[a, b], [c, d]] = table;
    let margins = [a + b, c + d, a + c, b + d];
    if margins.contains(&0) {
        return Err(StatsError::EmptyMargin);
    }
    let n = (a + b + c + d) as f64;
    let (a, b, c, d) = (a as f64, b as f64, c as f64, d as f64);
    let denominator = margins.iter().map(|&m| m as f64).product::<f64>();

    let cross = a * d - b * c;
    let corrected = (cross.abs() - n / 2.0).max(0.0);
    let chi_square = n * corrected.powi(2) / denominator;
    let phi = cross / denominator.sqrt();

    Ok(ChiSquareResult {
        chi_square,
        df: 1.0,
        p: chi_square_upper_p(chi_square, 1.0),
        phi,
        table,
        n: n as u64,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaResult {
    pub f: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub p: f64,
    /// Between-group share of the total sum of squares
    pub eta_squared: f64,
    pub groups: Vec<Describe>,
}

/// One-way analysis of variance across `groups`.
pub fn one_way_anova(groups: &[Vec<f64>]) -> Result<AnovaResult, StatsError> {
    if groups.len() < 2 {
        return Err(StatsError::TooFewGroups {
            required: 2,
            actual: groups.len(),
        });
    }
    for (i, group) in groups.iter().enumerate() {
        require(&format!("group {}", i + 1), group, 1)?;
    }

    let k = groups.len();
    let total: usize = groups.iter().map(Vec::len).sum();
    if total <= k {
        return Err(StatsError::TooFewObservations {
            sample: "pooled groups".to_string(),
            required: k + 1,
            actual: total,
        });
    }
    let grand_mean = groups.iter().flatten().sum::<f64>() / total as f64;
    let described: Vec<Describe> = groups.iter().map(|g| describe(g)).collect();

    let ss_between: f64 = described
        .iter()
        .map(|d| d.n as f64 * (d.mean - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = groups
        .iter()
        .zip(&described)
        .map(|(g, d)| g.iter().map(|v| (v - d.mean).powi(2)).sum::<f64>())
        .sum();
    if within_rounding(ss_within, total, max_abs(groups.iter().flatten())) {
        return Err(StatsError::ZeroVariance("within-group values".to_string()));
    }

    let df_between = (k - 1) as f64;
    let df_within = (total - k) as f64;
    let f = (ss_between / df_between) / (ss_within / df_within);
    Ok(AnovaResult {
        f,
        df_between,
        df_within,
        p: f_upper_p(f, df_between, df_within),
        eta_squared: ss_between / (ss_between + ss_within),
        groups: described,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn independent_t_matches_reference() {
        let result = independent_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();
        close(result.t, -5.0, 1e-12);
        assert_eq!(result.df, 8.0);
        close(result.p, 0.001_052_825_793, 1e-9);
        close(result.cohens_d, -5.0 / 2.5f64.sqrt(), 1e-12);
        assert_eq!(result.a.n, 5);
    }

    #[test]
    fn independent_t_rejects_degenerate_samples() {
        assert!(matches!(
            independent_t_test(&[], &[1.0, 2.0]),
            Err(StatsError::TooFewObservations { actual: 0, .. })
        ));
        assert!(matches!(
            independent_t_test(&[3.0, 3.0, 3.0], &[3.0, 3.0]),
            Err(StatsError::ZeroVariance(_))
        ));
    }

    #[test]
    fn paired_t_matches_reference() {
        let before = [10.0, 12.0, 14.0, 16.0, 18.0];
        let after = [11.0, 14.0, 15.0, 19.0, 20.0];
        let result = paired_t_test(&before, &after).unwrap();
        close(result.t, 4.810_702_354, 1e-8);
        close(result.p, 0.008_580_918_722, 1e-9);
        close(result.d_z, 2.151_411_497, 1e-8);
        close(result.mean_difference, 1.8, 1e-12);
    }

    #[test]
    fn paired_t_needs_varying_differences() {
        let result = paired_t_test(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0]);
        assert!(matches!(result, Err(StatsError::ZeroVariance(_))));
        assert!(matches!(
            paired_t_test(&[1.0], &[1.0, 2.0]),
            Err(StatsError::LengthMismatch(1, 2))
        ));
    }

    #[test]
    fn pearson_matches_reference() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [2.0, 1.0, 4.0, 3.0, 6.0, 5.0];
        let result = pearson(&x, &y).unwrap();
        close(result.r, 0.828_571_428_571, 1e-10);
        close(result.p, 0.041_562_682_216, 1e-9);

        let inverse: Vec<f64> = x.iter().map(|v| -v).collect();
        let perfect = pearson(&x, &inverse).unwrap();
        assert_eq!(perfect.r, -1.0);
        assert_eq!(perfect.p, 0.0);
    }

    #[test]
    fn pearson_rejects_constant_series() {
        assert!(matches!(
            pearson(&[1.0, 2.0, 3.0], &[0.5, 0.5, 0.5]),
            Err(StatsError::ZeroVariance(_))
        ));
    }

    #[test]
    fn chi_square_matches_reference() {
        let result = chi_square_2x2([[20, 10], [5, 25]]).unwrap();
        close(result.chi_square, 13.44, 1e-10);
        close(result.p, 0.000_246_315_622, 1e-9);
        close(result.phi, 0.507_092_552_837, 1e-10);
        assert_eq!(result.n, 60);
    }

    #[test]
    fn chi_square_correction_never_overshoots() {
        let result = chi_square_2x2([[5, 5], [5, 5]]).unwrap();
        assert_eq!(result.chi_square, 0.0);
        assert_eq!(result.p, 1.0);
        assert_eq!(result.phi, 0.0);
        assert!(matches!(chi_square_2x2([[0, 0], [3, 4]]), Err(StatsError::EmptyMargin)));
    }

    #[test]
    fn anova_matches_reference() {
        let groups = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]];
        let result = one_way_anova(&groups).unwrap();
        close(result.f, 27.0, 1e-10);
        close(result.p, 0.001, 1e-10);
        close(result.eta_squared, 0.9, 1e-12);
        assert_eq!(result.df_between, 2.0);
        assert_eq!(result.df_within, 6.0);
    }

    #[test]
    fn constant_fractions_count_as_zero_variance() {
        // 0.1 and 0.7 are not representable, so their means leave residue
        assert!(matches!(
            independent_t_test(&[0.1; 10], &[0.1; 10]),
            Err(StatsError::ZeroVariance(_))
        ));
        assert!(matches!(
            independent_t_test(&[0.7; 15], &[0.1; 12]),
            Err(StatsError::ZeroVariance(_))
        ));

        let before = [0.1; 10];
        let after: Vec<f64> = before.iter().map(|v| v + 0.7).collect();
        assert!(matches!(paired_t_test(&before, &after), Err(StatsError::ZeroVariance(_))));

        let varying: Vec<f64> = (0..15).map(|i| 0.1 * i as f64).collect();
        assert!(matches!(
            pearson(&varying, &[0.7; 15]),
            Err(StatsError::ZeroVariance(_))
        ));
        assert!(matches!(
            pearson(&[0.1; 15], &varying),
            Err(StatsError::ZeroVariance(_))
        ));

        let groups = vec![vec![0.1; 4], vec![0.7; 5], vec![0.3; 3]];
        assert!(matches!(one_way_anova(&groups), Err(StatsError::ZeroVariance(_))));
    }

    #[test]
    fn small_but_real_spread_is_kept() {
        let a = [1e-6, 2e-6, 3e-6, 4e-6];
        let b = [5e-6, 6e-6, 7e-6, 8e-6];
        let result = independent_t_test(&a, &b).unwrap();
        assert!(result.t < 0.0);
        assert!(pearson(&a, &b).unwrap().r > 0.999);
    }

    #[test]
    fn anova_rejects_empty_groups() {
        let groups = vec![vec![1.0, 2.0], vec![]];
        assert!(matches!(
            one_way_anova(&groups),
            Err(StatsError::TooFewObservations { actual: 0, .. })
        ));
    }
}
