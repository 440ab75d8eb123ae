/// Shape of a score list, for consumers that chart it.
///
/// Holds an equal-width histogram over [-1.0, 1.0] and the percentage share of each
/// category. Nothing here feeds back into the verdict.
use serde::Serialize;

use crate::aggregator::CategoryCounts;
use crate::scorer::SentimentScore;

pub const DEFAULT_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Percentages (0–100) per category. All zero when there are no scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryShares {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl CategoryShares {
    pub fn from_counts(counts: &CategoryCounts) -> Self {
        let total = counts.total();
        if total == 0 {
            return Self::default();
        }
        let pct = |n: usize| n as f64 * 100.0 / total as f64;
        Self {
            positive: pct(counts.positive),
            neutral: pct(counts.neutral),
            negative: pct(counts.negative),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub bins: Vec<HistogramBin>,
    pub shares: CategoryShares,
    /// Plain mean over every score, near-neutral ones included.
    pub raw_mean: f64,
}

impl Distribution {
    /// `bins` of 0 is treated as 1.
    pub fn from_scores(scores: &[SentimentScore], bins: usize) -> Self {
        let bins = bins.max(1);
        let width = 2.0 / bins as f64;

        let mut histogram: Vec<HistogramBin> = (0..bins)
            .map(|i| HistogramBin {
                lower: -1.0 + i as f64 * width,
                upper: -1.0 + (i + 1) as f64 * width,
                count: 0,
            })
            .collect();

        for score in scores {
            let idx = ((score.value() + 1.0) / width).floor() as usize;
            histogram[idx.min(bins - 1)].count += 1;
        }

        let raw_mean = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|s| s.value()).sum::<f64>() / scores.len() as f64
        };

        Self {
            bins: histogram,
            shares: CategoryShares::from_counts(&CategoryCounts::from_scores(scores)),
            raw_mean,
        }
    }
}
