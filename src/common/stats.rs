//! Rank statistics for the Kruskal-Wallis test
//!
//! The H statistic is computed in-crate from average ranks with the usual
//! tie correction; the reference chi-squared distribution (p-value, critical
//! value, density for the charts) comes from [`statrs`].

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use thiserror::Error;

/// Significance level shared by the decision rule and the critical value
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// The df = 1 critical value the original analysis read from a printed
/// chi-squared table. The tester always derives the critical value from the
/// degrees of freedom; this constant documents the legacy number and a unit
/// test pins the derived df = 1 quantile to it.
pub const CHI2_CRITICAL_DF1_TABLE: f64 = 3.841;

/// Errors that can occur while computing test statistics
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Invalid chi-squared distribution for {degrees_of_freedom} degrees of freedom: {message}")]
    Distribution {
        degrees_of_freedom: f64,
        message: String,
    },
}

type Result<T> = core::result::Result<T, StatsError>;

/// Outcome of comparing the statistic against the rejection threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    /// H0 rejected: the groups differ significantly
    Reject,
    /// H0 not rejected
    FailToReject,
    /// Fewer than two non-empty groups, nothing was computed
    InsufficientGroups,
}

/// A completed Kruskal-Wallis test
///
/// For an [`Decision::InsufficientGroups`] marker every numeric field is NaN.
#[derive(Debug, Clone, Serialize)]
pub struct KruskalWallis {
    pub h: f64,
    pub p_value: f64,
    pub degrees_of_freedom: f64,
    pub critical_value: f64,
    pub decision: Decision,
}

impl KruskalWallis {
    /// Whether the test actually ran (finite statistic and threshold)
    pub fn is_computed(&self) -> bool {
        self.h.is_finite() && self.critical_value.is_finite() && self.degrees_of_freedom >= 1.0
    }
}

/// The marker result emitted when fewer than two non-empty groups exist
pub fn insufficient_groups() -> KruskalWallis {
    KruskalWallis {
        h: f64::NAN,
        p_value: f64::NAN,
        degrees_of_freedom: f64::NAN,
        critical_value: f64::NAN,
        decision: Decision::InsufficientGroups,
    }
}

/// Runs the Kruskal-Wallis rank-sum test across the given groups
///
/// Empty groups are excluded up front; with fewer than two groups left the
/// insufficient-groups marker is returned instead of an error. Scores must
/// be finite (the cleaner guarantees this).
///
/// Ties receive average ranks and the statistic is divided by the standard
/// tie correction. When every observation is tied the correction divisor is
/// zero; the statistic is then 0 and the p-value 1, i.e. no evidence at all
/// against H0.
pub fn kruskal_wallis(groups: &[&[f64]]) -> Result<KruskalWallis> {
    let groups: Vec<&[f64]> = groups.iter().copied().filter(|g| !g.is_empty()).collect();
    if groups.len() < 2 {
        return Ok(insufficient_groups());
    }

    let mut pooled: Vec<(f64, usize)> = Vec::new();
    for (group_index, group) in groups.iter().enumerate() {
        for &value in *group {
            pooled.push((value, group_index));
        }
    }
    pooled.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

    let ranked = assign_ranks_with_ties(&pooled);
    let n = ranked.len() as f64;

    let mut rank_sums = vec![0.0f64; groups.len()];
    for (rank, group_index) in &ranked {
        rank_sums[*group_index] += rank;
    }
    let sum_term: f64 = rank_sums
        .iter()
        .zip(&groups)
        .map(|(rank_sum, group)| rank_sum * rank_sum / group.len() as f64)
        .sum();

    let uncorrected = 12.0 / (n * (n + 1.0)) * sum_term - 3.0 * (n + 1.0);
    let correction = tie_correction(&pooled);

    let degrees_of_freedom = (groups.len() - 1) as f64;
    let distribution = chi_squared(degrees_of_freedom)?;
    let critical_value = chi_squared_critical(degrees_of_freedom, SIGNIFICANCE_LEVEL)?;

    let (h, p_value) = if correction <= 0.0 {
        // Every observation is tied, there is no rank information at all
        (0.0, 1.0)
    } else {
        let h = uncorrected / correction;
        (h, 1.0 - distribution.cdf(h))
    };

    Ok(KruskalWallis {
        h,
        p_value,
        degrees_of_freedom,
        critical_value,
        decision: decide(h, critical_value, p_value),
    })
}

/// Chi-squared critical value at the given significance level
pub fn chi_squared_critical(degrees_of_freedom: f64, significance_level: f64) -> Result<f64> {
    Ok(chi_squared(degrees_of_freedom)?.inverse_cdf(1.0 - significance_level))
}

pub(crate) fn chi_squared(degrees_of_freedom: f64) -> Result<ChiSquared> {
    ChiSquared::new(degrees_of_freedom).map_err(|e| StatsError::Distribution {
        degrees_of_freedom,
        message: e.to_string(),
    })
}

/// Assigns 1-based ranks to value-sorted observations, averaging over ties
///
/// Input pairs are (value, group index), sorted ascending by value; output
/// pairs are (rank, group index) in the same order.
fn assign_ranks_with_ties(sorted: &[(f64, usize)]) -> Vec<(f64, usize)> {
    let mut ranks = Vec::with_capacity(sorted.len());
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start;
        while end < sorted.len() && sorted[end].0 == sorted[start].0 {
            end += 1;
        }
        // Ranks start+1 ..= end share their average
        let rank = (start + 1 + end) as f64 / 2.0;
        for &(_, group_index) in &sorted[start..end] {
            ranks.push((rank, group_index));
        }
        start = end;
    }
    ranks
}

/// Tie correction divisor `1 - sum(t^3 - t) / (n^3 - n)`
fn tie_correction(sorted: &[(f64, usize)]) -> f64 {
    let n = sorted.len() as f64;
    let mut tie_sum = 0.0;
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start;
        while end < sorted.len() && sorted[end].0 == sorted[start].0 {
            end += 1;
        }
        let t = (end - start) as f64;
        tie_sum += t * t * t - t;
        start = end;
    }
    1.0 - tie_sum / (n * n * n - n)
}

/// Applies the decision rule: reject H0 when the statistic reaches the
/// critical value and the p-value falls below the significance level
///
/// Through the chi-squared CDF these are the same condition, so outside
/// float noise around the boundary they must agree.
fn decide(h: f64, critical_value: f64, p_value: f64) -> Decision {
    let by_statistic = h >= critical_value;
    let by_p_value = p_value < SIGNIFICANCE_LEVEL;
    debug_assert!(
        by_statistic == by_p_value
            || (p_value - SIGNIFICANCE_LEVEL).abs() < 1e-9
            || (h - critical_value).abs() < 1e-9,
        "statistic and p-value criteria disagree: H={h}, critical={critical_value}, p={p_value}"
    );
    if by_statistic && by_p_value {
        Decision::Reject
    } else {
        Decision::FailToReject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_ranks_no_ties() {
        let sorted = vec![(1.0, 0), (2.0, 1), (3.0, 0), (4.0, 1)];
        let ranks = assign_ranks_with_ties(&sorted);

        assert_eq!(ranks.len(), 4);
        assert!((ranks[0].0 - 1.0).abs() < 1e-10);
        assert!((ranks[1].0 - 2.0).abs() < 1e-10);
        assert!((ranks[2].0 - 3.0).abs() < 1e-10);
        assert!((ranks[3].0 - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_assign_ranks_with_multiple_tie_groups() {
        let sorted = vec![(1.0, 0), (1.0, 1), (3.0, 0), (3.0, 1)];
        let ranks = assign_ranks_with_ties(&sorted);

        // First pair shares rank 1.5, second pair rank 3.5
        assert!((ranks[0].0 - 1.5).abs() < 1e-10);
        assert!((ranks[1].0 - 1.5).abs() < 1e-10);
        assert!((ranks[2].0 - 3.5).abs() < 1e-10);
        assert!((ranks[3].0 - 3.5).abs() < 1e-10);
    }

    #[test]
    fn test_separated_groups_reject() {
        let control = [1.0, 2.0, 3.0];
        let experimental = [10.0, 11.0, 12.0];
        let result = kruskal_wallis(&[&control, &experimental]).unwrap();

        // Matches scipy.stats.kruskal([1,2,3],[10,11,12])
        assert!((result.h - 3.857142857142847).abs() < 1e-9);
        assert!((result.p_value - 0.049534613435626).abs() < 1e-6);
        assert!(result.h > result.critical_value);
        assert_eq!(result.decision, Decision::Reject);
    }

    #[test]
    fn test_identical_groups_do_not_reject() {
        let a = [5.0, 5.0, 5.0, 5.0];
        let b = [5.0, 5.0, 5.0, 5.0];
        let result = kruskal_wallis(&[&a, &b]).unwrap();

        assert_eq!(result.h, 0.0);
        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.decision, Decision::FailToReject);
    }

    #[test]
    fn test_tie_correction_matches_reference() {
        let a = [1.0, 1.0, 2.0];
        let b = [2.0, 3.0, 3.0];
        let result = kruskal_wallis(&[&a, &b]).unwrap();

        // scipy.stats.kruskal([1,1,2],[2,3,3]) = 10/3
        assert!((result.h - 10.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.decision, Decision::FailToReject);
    }

    #[test]
    fn test_three_groups_use_two_degrees_of_freedom() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        let c = [7.0, 8.0, 9.0];
        let result = kruskal_wallis(&[&a, &b, &c]).unwrap();

        assert_eq!(result.degrees_of_freedom, 2.0);
        assert!((result.h - 7.2).abs() < 1e-9);
        // Survival of chi2(df=2) at 7.2 is exp(-3.6)
        assert!((result.p_value - (-3.6f64).exp()).abs() < 1e-9);
        assert!((result.critical_value - 5.991).abs() < 1e-3);
        assert_eq!(result.decision, Decision::Reject);
    }

    #[test]
    fn test_fewer_than_two_groups_is_a_marker_not_an_error() {
        let only = [1.0, 2.0, 3.0];
        let empty: [f64; 0] = [];

        for groups in [&[][..], &[&only[..]][..], &[&only[..], &empty[..]][..]] {
            let result = kruskal_wallis(groups).unwrap();
            assert_eq!(result.decision, Decision::InsufficientGroups);
            assert!(result.h.is_nan());
            assert!(result.p_value.is_nan());
            assert!(result.degrees_of_freedom.is_nan());
            assert!(result.critical_value.is_nan());
            assert!(!result.is_computed());
        }
    }

    #[test]
    fn test_critical_value_is_derived_not_hardcoded() {
        // The legacy table value for df = 1 must match the derived quantile
        let df1 = chi_squared_critical(1.0, SIGNIFICANCE_LEVEL).unwrap();
        assert!((df1 - CHI2_CRITICAL_DF1_TABLE).abs() < 1e-3);

        // And larger group counts get their own quantile
        let df2 = chi_squared_critical(2.0, SIGNIFICANCE_LEVEL).unwrap();
        assert!((df2 - 5.991).abs() < 1e-3);
        let df4 = chi_squared_critical(4.0, SIGNIFICANCE_LEVEL).unwrap();
        assert!((df4 - 9.488).abs() < 1e-3);
    }

    #[test]
    fn test_decision_rule_agreement() {
        assert_eq!(decide(5.0, 3.841, 0.02), Decision::Reject);
        assert_eq!(decide(1.0, 3.841, 0.4), Decision::FailToReject);
    }
}
