//! Per-category latency summaries built from a fetched delay-log batch.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::percentile::{NO_DATA, Percentiles};

/// Percentiles reported for every category, in output order.
pub const DELAY_PERCENTILES: [u32; 5] = [5, 25, 50, 75, 95];

/// Summary of one category's latencies for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelaySummary {
    NoData,
    Stats {
        average_ms: u64,
        count: usize,
        /// Values for [`DELAY_PERCENTILES`], same order.
        percentiles: [u64; 5],
    },
}

impl DelaySummary {
    pub fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::NoData;
        }
        let count = samples.len();
        let sum: u128 = samples.iter().map(|&v| v as u128).sum();
        let average_ms = (sum / count as u128) as u64;

        let sorted = Percentiles::new(samples.to_vec());
        let mut percentiles = [0u64; 5];
        for (slot, &p) in percentiles.iter_mut().zip(DELAY_PERCENTILES.iter()) {
            *slot = sorted.at(p).unwrap_or_default();
        }
        Self::Stats { average_ms, count, percentiles }
    }
}

impl fmt::Display for DelaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => f.write_str(NO_DATA),
            Self::Stats { average_ms, count, percentiles } => {
                let [p5, p25, p50, p75, p95] = percentiles;
                write!(
                    f,
                    "Average: {average_ms}ms - Count: {count} - Percentiles (5/25/50/75/95): \
                     {p5}ms/{p25}ms/{p50}ms/{p75}ms/{p95}ms"
                )
            }
        }
    }
}

/// Build `<category>: <summary>` lines, sorted by category name.
pub fn report(batch: &HashMap<String, Vec<u64>>) -> Vec<String> {
    let ordered: BTreeMap<&str, &Vec<u64>> = batch.iter().map(|(k, v)| (k.as_str(), v)).collect();
    ordered
        .into_iter()
        .map(|(category, samples)| format!("{category}: {}", DelaySummary::from_samples(samples)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_samples() {
        let summary = DelaySummary::from_samples(&[10, 20, 30, 40, 50]);
        assert_eq!(
            summary.to_string(),
            "Average: 30ms - Count: 5 - Percentiles (5/25/50/75/95): 10ms/20ms/30ms/40ms/50ms"
        );
    }

    #[test]
    fn average_truncates() {
        match DelaySummary::from_samples(&[1, 2]) {
            DelaySummary::Stats { average_ms, count, .. } => {
                assert_eq!(average_ms, 1);
                assert_eq!(count, 2);
            }
            DelaySummary::NoData => panic!("expected stats"),
        }
    }

    #[test]
    fn huge_values_do_not_overflow() {
        let summary = DelaySummary::from_samples(&[u64::MAX, u64::MAX]);
        assert!(matches!(summary, DelaySummary::Stats { average_ms: u64::MAX, .. }));
    }

    #[test]
    fn report_lines_sorted_with_no_data() {
        let mut batch = HashMap::new();
        batch.insert("move".to_string(), vec![4, 4, 4, 4]);
        batch.insert("join".to_string(), vec![]);
        let lines = report(&batch);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "join: no data");
        assert_eq!(
            lines[1],
            "move: Average: 4ms - Count: 4 - Percentiles (5/25/50/75/95): 4ms/4ms/4ms/4ms/4ms"
        );
    }

    #[test]
    fn empty_batch_has_no_lines() {
        assert!(report(&HashMap::new()).is_empty());
    }
}
