//! Nearest-rank percentile lookup over raw millisecond samples.
//!
//! Samples are kept as-is (no binning), sorted once, and indexed at
//! `floor(p * count / 100)`. The index is clamped to the last element, so the
//! 100th percentile (or anything above it) is the maximum. An empty sample set
//! has no percentile at all and renders as [`NO_DATA`].

/// Rendering of a percentile query over an empty sample set.
pub const NO_DATA: &str = "no data";

/// A sorted view over a sample set, answering any number of percentile
/// queries without re-sorting.
#[derive(Debug, Clone)]
pub struct Percentiles {
    sorted: Vec<u64>,
}

impl Percentiles {
    /// Sort `samples` ascending and keep them for lookups.
    pub fn new(mut samples: Vec<u64>) -> Self {
        samples.sort_unstable();
        Self { sorted: samples }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Value at percentile `p` (0–100). `None` if there are no samples.
    pub fn at(&self, p: u32) -> Option<u64> {
        let count = self.sorted.len();
        if count == 0 {
            return None;
        }
        let index = (p as usize).saturating_mul(count) / 100;
        Some(self.sorted[index.min(count - 1)])
    }

    /// Each percentile in `list` as `<value>ms`, joined with `/`.
    pub fn format(&self, list: &[u32]) -> String {
        if self.is_empty() {
            return NO_DATA.to_string();
        }
        list.iter()
            .filter_map(|&p| self.at(p))
            .map(|v| format!("{v}ms"))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Value at percentile `p` of `samples`. `None` for an empty slice.
pub fn percentile(samples: &[u64], p: u32) -> Option<u64> {
    Percentiles::new(samples.to_vec()).at(p)
}

/// Format several percentiles of `samples`, e.g. `10ms/20ms/30ms`.
pub fn format_percentiles(samples: &[u64], list: &[u32]) -> String {
    Percentiles::new(samples.to_vec()).format(list)
}
