use serde::{Deserialize, Serialize};

/// How percentiles are read off the sorted sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentileMethod {
    /// Linear interpolation between adjacent order statistics.
    #[default]
    Linear,
    /// Smallest value with at least p% of the sample at or below it.
    NearestRank,
}

/// Percentile summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McPercentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

impl McPercentiles {
    pub fn from_sorted(sorted: &[f64], method: PercentileMethod) -> Self {
        McPercentiles {
            p5: percentile_sorted(sorted, 5.0, method),
            p10: percentile_sorted(sorted, 10.0, method),
            p25: percentile_sorted(sorted, 25.0, method),
            p50: percentile_sorted(sorted, 50.0, method),
            p75: percentile_sorted(sorted, 75.0, method),
            p90: percentile_sorted(sorted, 90.0, method),
            p95: percentile_sorted(sorted, 95.0, method),
        }
    }
}

/// A single histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub frequency: f64,
}

/// Streaming mean/variance (Welford), stable for large samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct Welford {
    n: u64,
    mean: f64,
    m2: f64,
}

impl Welford {
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (n - 1); zero for fewer than two observations.
    pub fn sample_variance(&self) -> f64 {
        if self.n < 2 {
            0.0
        } else {
            self.m2 / (self.n - 1) as f64
        }
    }

    pub fn population_variance(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.m2 / self.n as f64
        }
    }
}

impl FromIterator<f64> for Welford {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut w = Welford::default();
        for x in iter {
            w.push(x);
        }
        w
    }
}

/// Compute the percentile value from a **sorted**, non-empty slice.
pub fn percentile_sorted(sorted: &[f64], p: f64, method: PercentileMethod) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    match method {
        PercentileMethod::Linear => {
            let rank = p / 100.0 * (sorted.len() - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper {
                sorted[lower]
            } else {
                let (a, b) = (sorted[lower], sorted[upper]);
                let frac = rank - lower as f64;
                // Exact on ties and kept inside [a, b] so p is monotone.
                (a + (b - a) * frac).max(a).min(b)
            }
        }
        PercentileMethod::NearestRank => {
            let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
            sorted[rank.clamp(1, sorted.len()) - 1]
        }
    }
}

/// Build a histogram with `num_bins` equal-width bins over a sorted slice.
pub fn build_histogram(sorted: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    let (Some(&min_val), Some(&max_val)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };

    // All values identical
    if (max_val - min_val).abs() < f64::EPSILON || num_bins == 0 {
        return vec![HistogramBin {
            lower: min_val,
            upper: max_val,
            count: sorted.len() as u32,
            frequency: 1.0,
        }];
    }

    let bin_width = (max_val - min_val) / num_bins as f64;
    let n = sorted.len() as f64;

    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| HistogramBin {
            lower: min_val + i as f64 * bin_width,
            upper: if i == num_bins - 1 {
                max_val
            } else {
                min_val + (i + 1) as f64 * bin_width
            },
            count: 0,
            frequency: 0.0,
        })
        .collect();

    for &val in sorted {
        let idx = (((val - min_val) / bin_width).floor() as usize).min(num_bins - 1);
        bins[idx].count += 1;
    }

    for bin in &mut bins {
        bin.frequency = bin.count as f64 / n;
    }

    bins
}

/// Population skewness and excess kurtosis; both zero for a flat sample.
pub fn shape_moments(values: &[f64], mean: f64, population_std: f64) -> (f64, f64) {
    if population_std <= f64::EPSILON * mean.abs().max(1.0) {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let (m3, m4) = values.iter().fold((0.0, 0.0), |(s3, s4), v| {
        let z = (v - mean) / population_std;
        let z2 = z * z;
        (s3 + z2 * z, s4 + z2 * z2)
    });
    (m3 / n, m4 / n - 3.0)
}

/// Pearson correlation; `None` when either side has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let wx: Welford = xs.iter().copied().collect();
    let wy: Welford = ys.iter().copied().collect();
    let cov: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - wx.mean()) * (y - wy.mean()))
        .sum();
    let denom = (wx.population_variance() * wy.population_variance()).sqrt() * xs.len() as f64;
    if denom <= f64::EPSILON {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}
