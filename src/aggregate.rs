//! Per-group descriptive statistics.
//!
//! Groups iterate in sorted key order: numeric keys ascending, categorical keys
//! lexicographically. Annotation placement follows this order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::BoxSummary;
use crate::dataset::{Column, Row, RowSet, Value};

/// Tukey whisker reach, in interquartile ranges.
const WHISKER_IQR: f64 = 1.5;
/// Notch half-width factor applied to `IQR / sqrt(n)`.
const NOTCH_FACTOR: f64 = 1.57;
/// 2^500; groups with a larger magnitude are summarized in rescaled form.
const LARGE_VALUE: f64 = 3.273_390_607_896_142e150;

/// A distinct value of the grouping column.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupKey {
    Num(f64),
    Cat(String),
}

impl GroupKey {
    pub(crate) fn from_value(value: Value<'_>) -> Self {
        match value {
            // -0.0 and 0.0 are the same group
            Value::Num(v) => GroupKey::Num(v + 0.0),
            Value::Cat(c) => GroupKey::Cat(c.to_string()),
        }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Num(a), GroupKey::Num(b)) => a.total_cmp(b),
            (GroupKey::Cat(a), GroupKey::Cat(b)) => a.cmp(b),
            (GroupKey::Num(_), GroupKey::Cat(_)) => Ordering::Less,
            (GroupKey::Cat(_), GroupKey::Num(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Num(v) => write!(f, "{v}"),
            GroupKey::Cat(c) => f.write_str(c),
        }
    }
}

/// Count, mean and sample standard deviation of one group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub count: usize,
    /// Undefined for an empty group
    pub mean: Option<f64>,
    /// Undefined below two values; never reported as zero
    pub stddev: Option<f64>,
}

impl GroupStats {
    /// Summarize `values`. Summation runs in sorted order, so any permutation
    /// of the same values gives bit-identical results.
    pub fn from_values(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self::from_sorted(&sorted)
    }

    fn from_sorted(sorted: &[f64]) -> Self {
        let count = sorted.len();
        if count == 0 {
            return Self::default();
        }
        // Power-of-two scaling is exact, and keeps the squared deviations of
        // huge values representable.
        let largest = sorted[0].abs().max(sorted[count - 1].abs());
        let scale = if largest > LARGE_VALUE { 2f64.powi(600) } else { 1.0 };

        // Welford's running update
        let mut mean = 0.0;
        let mut m2 = 0.0;
        for (i, &v) in sorted.iter().enumerate() {
            let v = v / scale;
            let delta = v - mean;
            mean += delta / (i + 1) as f64;
            m2 += delta * (v - mean);
        }
        let stddev = (count >= 2).then(|| (m2 / (count - 1) as f64).sqrt() * scale);
        Self {
            count,
            mean: Some(mean * scale),
            stddev,
        }
    }
}

pub type GroupedStats = BTreeMap<GroupKey, GroupStats>;

/// Measure values per group key, each list sorted ascending.
///
/// Rows missing either value are skipped. Categorical measures contribute nothing.
pub fn group_values<'a>(
    rows: impl Iterator<Item = &'a Row>,
    group: &Column,
    measure: &Column,
) -> BTreeMap<GroupKey, Vec<f64>> {
    let mut groups: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let (Some(key), Some(v)) = (row.value(group), row.number(measure)) else {
            continue;
        };
        groups.entry(GroupKey::from_value(key)).or_default().push(v);
    }
    for values in groups.values_mut() {
        values.sort_by(f64::total_cmp);
    }
    groups
}

/// Statistics of `measure` for each distinct value of `group`.
pub fn aggregate(rows: &RowSet<'_>, group: &Column, measure: &Column) -> GroupedStats {
    group_values(rows.iter(), group, measure)
        .into_iter()
        .map(|(key, values)| (key, GroupStats::from_sorted(&values)))
        .collect()
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

impl BoxSummary {
    /// Notched box for sorted values; `None` for an empty group.
    pub fn from_sorted(group: GroupKey, x: f64, sorted: &[f64]) -> Option<Self> {
        let (&first, &last) = (sorted.first()?, sorted.last()?);
        let q1 = quantile(sorted, 0.25);
        let median = quantile(sorted, 0.5);
        let q3 = quantile(sorted, 0.75);
        let iqr = q3 - q1;

        let lower_fence = q1 - WHISKER_IQR * iqr;
        let upper_fence = q3 + WHISKER_IQR * iqr;
        let lower_whisker = sorted
            .iter()
            .copied()
            .find(|&v| v >= lower_fence)
            .unwrap_or(first);
        let upper_whisker = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= upper_fence)
            .unwrap_or(last);

        let half_notch = NOTCH_FACTOR * iqr / (sorted.len() as f64).sqrt();
        Some(Self {
            group,
            x,
            count: sorted.len(),
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
            notch_low: median - half_notch,
            notch_high: median + half_notch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Source;
    use crate::dataset::Dataset;

    fn pai() -> Column {
        Column::Measure("grid_PAI".into())
    }

    fn rows(values: &[(i64, f64)]) -> Dataset {
        Dataset::new(
            values
                .iter()
                .map(|&(age, v)| Row::new(Source::Dep10, "I-214").with_age(age).with_measure("grid_PAI", v))
                .collect(),
        )
    }

    #[test]
    fn three_values_give_unit_stddev() {
        let ds = rows(&[(5, 1.0), (5, 2.0), (5, 3.0)]);
        let stats = aggregate(&ds.all(), &Column::AgePlan, &pai());
        assert_eq!(
            stats.get(&GroupKey::Num(5.0)),
            Some(&GroupStats {
                count: 3,
                mean: Some(2.0),
                stddev: Some(1.0)
            })
        );
    }

    #[test]
    fn single_value_has_no_stddev() {
        let stats = GroupStats::from_values(&[4.25]);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, Some(4.25));
        assert_eq!(stats.stddev, None);
    }

    #[test]
    fn out_of_range_ages_never_counted() {
        let ds = rows(&[(0, 1.0), (13, 2.0), (12, 3.0), (1, 4.0), (-2, 5.0)]);
        let stats = aggregate(&ds.all(), &Column::AgePlan, &pai());
        let keys: Vec<&GroupKey> = stats.keys().collect();
        assert_eq!(keys, [&GroupKey::Num(1.0), &GroupKey::Num(12.0)]);
        assert_eq!(stats.values().map(|s| s.count).sum::<usize>(), 2);
    }

    #[test]
    fn missing_measure_rows_are_skipped() {
        let ds = Dataset::new(vec![
            Row::new(Source::Dep10, "I-214").with_age(2).with_measure("grid_PAI", 1.0),
            Row::new(Source::Dep10, "I-214").with_age(2),
            Row::new(Source::Dep10, "I-214").with_measure("grid_PAI", 9.0),
            Row::new(Source::Dep10, "I-214").with_age(2).with_measure("grid_PAI", f64::NAN),
        ]);
        let stats = aggregate(&ds.all(), &Column::AgePlan, &pai());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[&GroupKey::Num(2.0)].count, 1);
    }

    #[test]
    fn permutation_does_not_change_stats() {
        let values = [(3, 0.1), (3, 0.7), (4, 1.3), (3, 0.2), (4, 2.9), (3, 1e-9)];
        let mut reversed = values;
        reversed.reverse();
        let a = aggregate(&rows(&values).all(), &Column::AgePlan, &pai());
        let b = aggregate(&rows(&reversed).all(), &Column::AgePlan, &pai());
        assert_eq!(a, b);
    }

    #[test]
    fn keys_iterate_in_sorted_order() {
        let ds = rows(&[(9, 1.0), (2, 1.0), (11, 1.0), (4, 1.0)]);
        let stats = aggregate(&ds.all(), &Column::AgePlan, &pai());
        let keys: Vec<String> = stats.keys().map(ToString::to_string).collect();
        assert_eq!(keys, ["2", "4", "9", "11"]);

        let ds = Dataset::new(vec![
            Row::new(Source::Dep47, "Koster").with_measure("grid_PAI", 1.0),
            Row::new(Source::Dep47, "A4A").with_measure("grid_PAI", 1.0),
        ]);
        let stats = aggregate(&ds.all(), &Column::Cultivar, &pai());
        let keys: Vec<String> = stats.keys().map(ToString::to_string).collect();
        assert_eq!(keys, ["A4A", "Koster"]);
    }

    #[test]
    fn signed_zeros_share_a_group() {
        let ds = Dataset::new(vec![
            Row::new(Source::Dep10, "I-214").with_measure("offset", 0.0).with_measure("grid_PAI", 1.0),
            Row::new(Source::Dep10, "I-214").with_measure("offset", -0.0).with_measure("grid_PAI", 3.0),
        ]);
        let stats = aggregate(&ds.all(), &Column::Measure("offset".into()), &pai());
        assert_eq!(stats.len(), 1);
        let (key, group) = stats.iter().next().unwrap();
        assert!(matches!(key, GroupKey::Num(v) if v.is_sign_positive()));
        assert_eq!((group.count, group.mean), (2, Some(2.0)));
    }

    #[test]
    fn huge_values_stay_finite() {
        let stats = GroupStats::from_values(&[1e308, 1e308]);
        assert_eq!(stats.mean, Some(1e308));
        assert_eq!(stats.stddev, Some(0.0));

        let stats = GroupStats::from_values(&[1e308, -1e308]);
        assert_eq!(stats.mean, Some(0.0));
        assert!(stats.stddev.is_some_and(|s| (s / 1e308 - 2f64.sqrt()).abs() < 1e-12));
    }

    #[test]
    fn box_summary_quartiles_and_whiskers() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let b = BoxSummary::from_sorted(GroupKey::Num(1.0), 1.0, &sorted).unwrap();
        assert_eq!(b.q1, 2.25);
        assert_eq!(b.median, 3.5);
        assert_eq!(b.q3, 4.75);
        assert_eq!(b.lower_whisker, 1.0);
        assert_eq!(b.upper_whisker, 5.0);
        assert!(b.notch_low < b.median && b.median < b.notch_high);
        assert!(BoxSummary::from_sorted(GroupKey::Num(1.0), 1.0, &[]).is_none());
    }
}
