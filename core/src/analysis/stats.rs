use std::f64::consts::PI;

/// Number of grid points a density curve is evaluated on
pub const KDE_GRID_SIZE: usize = 200;

/// Bandwidths the density grid extends past the data on each side
const KDE_CUT: f64 = 3.0;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1), `None` below two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Smallest and largest value, `None` for an empty slice
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Equal-width histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `counts.len() + 1` bin edges
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Largest bin count
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// `(start, end, count)` for each bin
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &c)| (self.edges[i], self.edges[i + 1], c))
    }
}

/// Bins values over `[min, max]`; the last bin includes its right edge
///
/// A constant sample gets the range `[v - 0.5, v + 0.5]`.
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    if bins == 0 {
        return None;
    }
    let (mut lo, mut hi) = min_max(values)?;
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Some(Histogram { edges, counts })
}

/// Scott's rule bandwidth: `std * n^(-1/5)`
pub fn scott_bandwidth(values: &[f64]) -> Option<f64> {
    let std = sample_std(values)?;
    if std <= 0.0 {
        return None;
    }
    Some(std * (values.len() as f64).powf(-0.2))
}

/// Gaussian kernel density estimate on an evenly spaced grid
///
/// The grid spans the data plus three bandwidths on each side. Returns an empty
/// curve when the bandwidth is undefined (fewer than two values or zero spread).
pub fn gaussian_kde(values: &[f64], grid_size: usize) -> Vec<(f64, f64)> {
    let (Some(bw), Some((lo, hi))) = (scott_bandwidth(values), min_max(values)) else {
        return Vec::new();
    };
    if grid_size < 2 {
        return Vec::new();
    }

    let start = lo - KDE_CUT * bw;
    let end = hi + KDE_CUT * bw;
    let step = (end - start) / (grid_size - 1) as f64;
    let norm = 1.0 / (values.len() as f64 * bw * (2.0 * PI).sqrt());

    (0..grid_size)
        .map(|i| {
            let x = start + step * i as f64;
            let density = values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bw).powi(2)).exp())
                .sum::<f64>()
                * norm;
            (x, density)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        let std = sample_std(&values).unwrap();
        assert!((std - 2.138089935).abs() < 1e-6);
        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min_max(&[3.0, -1.0, 8.0]), Some((-1.0, 8.0)));
        assert_eq!(min_max(&[]), None);
    }

    #[test]
    fn test_histogram_edges_and_counts() {
        let hist = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert_eq!(hist.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        // max value lands in the last bin
        assert_eq!(hist.counts, vec![1, 1, 1, 2]);
        assert_eq!(hist.max_count(), 2);
        assert_eq!(hist.bins().count(), 4);
    }

    #[test]
    fn test_histogram_constant_values() {
        let hist = histogram(&[5.0, 5.0], 2).unwrap();
        assert_eq!(hist.edges, vec![4.5, 5.0, 5.5]);
        assert_eq!(hist.counts.iter().sum::<usize>(), 2);
        assert!(histogram(&[], 3).is_none());
    }

    #[test]
    fn test_kde_integrates_to_one() {
        let values = [20.0, 22.0, 25.0, 25.5, 30.0, 33.0];
        let curve = gaussian_kde(&values, 400);
        assert_eq!(curve.len(), 400);
        let step = curve[1].0 - curve[0].0;
        let area: f64 = curve.iter().map(|(_, d)| d * step).sum();
        assert!((area - 1.0).abs() < 0.01, "area {}", area);
    }

    #[test]
    fn test_kde_degenerate() {
        assert!(gaussian_kde(&[1.0], KDE_GRID_SIZE).is_empty());
        assert!(gaussian_kde(&[2.0, 2.0, 2.0], KDE_GRID_SIZE).is_empty());
    }
}
