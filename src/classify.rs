use crate::types::{Attribute, AttributeRow};
use tracing::debug;

/// Class colors, light for low participation through dark for high.
pub const COLOR_CLASSES: [&str; 5] = ["#bbedda", "#9bc7b6", "#7da194", "#607e72", "#445c53"];

/// Fill for municipalities and bars with no usable value.
pub const NEUTRAL_COLOR: &str = "#ccc";

pub const CLASS_COUNT: usize = COLOR_CLASSES.len();

/// Threshold scale over natural-breaks boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    domain: Vec<f64>,
}

impl ColorScale {
    /// Builds the scale for `attr` from every row of the attribute table.
    pub fn from_rows(rows: &[AttributeRow], attr: Attribute) -> Self {
        let values: Vec<f64> = rows.iter().map(|row| row.value(attr)).collect();
        let scale = Self::from_values(&values);
        debug!("Class breaks for {}: {:?}", attr, scale.domain);
        scale
    }

    /// Non-finite values are dropped before clustering.
    pub fn from_values(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let clusters = ckmeans(&finite, CLASS_COUNT);

        // Each cluster's minimum is a lower class bound; the first is the global minimum.
        let domain = clusters
            .iter()
            .skip(1)
            .filter_map(|cluster| cluster.first().copied())
            .collect();

        Self { domain }
    }

    pub fn with_domain(domain: Vec<f64>) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> &[f64] {
        &self.domain
    }

    /// Index of the class `value` falls into. The domain is searched as-is, unsorted.
    pub fn class_index(&self, value: f64) -> usize {
        let n = self.domain.len().min(CLASS_COUNT - 1);
        let (mut lo, mut hi) = (0, n);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if value < self.domain[mid] {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    pub fn threshold(&self, value: f64) -> &'static str {
        COLOR_CLASSES[self.class_index(value)]
    }

    /// Fill for a possibly missing value; absent and NaN never reach the threshold.
    pub fn color(&self, value: Option<f64>) -> &'static str {
        match value {
            Some(v) if !v.is_nan() => self.threshold(v),
            _ => NEUTRAL_COLOR,
        }
    }
}

/// Optimal 1-D k-means (Ckmeans.1d.dp): splits `values` into at most
/// `n_clusters` sorted groups minimizing the within-group sum of squares.
///
/// Inputs must be finite. Fewer values than clusters shrinks the cluster
/// count; a single distinct value yields one cluster.
pub fn ckmeans(values: &[f64], n_clusters: usize) -> Vec<Vec<f64>> {
    if values.is_empty() || n_clusters == 0 {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    if sorted[0] == sorted[n - 1] {
        return vec![sorted];
    }
    let k = n_clusters.min(n);

    // Shifted prefix sums keep the variance arithmetic stable.
    let shift = sorted[n / 2];
    let mut sums = Vec::with_capacity(n);
    let mut sums_of_squares = Vec::with_capacity(n);
    let (mut s, mut sq) = (0.0, 0.0);
    for v in &sorted {
        let shifted = v - shift;
        s += shifted;
        sq += shifted * shifted;
        sums.push(s);
        sums_of_squares.push(sq);
    }

    let ssq = |j: usize, i: usize| -> f64 {
        let sji = if j > 0 {
            let count = (i - j + 1) as f64;
            let mean = (sums[i] - sums[j - 1]) / count;
            sums_of_squares[i] - sums_of_squares[j - 1] - count * mean * mean
        } else {
            sums_of_squares[i] - sums[i] * sums[i] / (i + 1) as f64
        };
        sji.max(0.0)
    };

    let mut cost = vec![vec![0.0; n]; k];
    let mut backtrack = vec![vec![0usize; n]; k];

    for i in 0..n {
        cost[0][i] = ssq(0, i);
    }

    for cluster in 1..k {
        // Only the full prefix matters for the last cluster.
        let i_min = if cluster < k - 1 { cluster } else { n - 1 };
        for i in i_min..n {
            let mut best = f64::INFINITY;
            let mut best_j = cluster;
            for j in cluster..=i {
                let candidate = cost[cluster - 1][j - 1] + ssq(j, i);
                if candidate < best {
                    best = candidate;
                    best_j = j;
                }
            }
            cost[cluster][i] = best;
            backtrack[cluster][i] = best_j;
        }
    }

    let mut clusters = vec![Vec::new(); k];
    let mut right = n - 1;
    for cluster in (0..k).rev() {
        let left = backtrack[cluster][right];
        clusters[cluster] = sorted[left..=right].to_vec();
        if cluster > 0 {
            right = left - 1;
        }
    }

    clusters
}
