/// Reduction of a score list into a reputation verdict.
///
/// The mean only uses decisive scores (|score| >= 0.05); with none, it is 0.0. Category
/// counts use every score, so they always add up to the length of the input.
use serde::Serialize;

use crate::scorer::{Category, SentimentScore};

pub const GOOD_THRESHOLD: f64 = 0.3;
pub const BAD_THRESHOLD: f64 = -0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    Good,
    Bad,
    Neutral,
}

impl Verdict {
    pub fn from_mean(mean: f64) -> Self {
        if mean > GOOD_THRESHOLD {
            Verdict::Good
        } else if mean < BAD_THRESHOLD {
            Verdict::Bad
        } else {
            Verdict::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Good => "Good",
            Verdict::Bad => "Bad",
            Verdict::Neutral => "Neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl CategoryCounts {
    pub fn from_scores(scores: &[SentimentScore]) -> Self {
        let positive = scores
            .iter()
            .filter(|s| s.category() == Category::Positive)
            .count();
        let negative = scores
            .iter()
            .filter(|s| s.category() == Category::Negative)
            .count();
        Self {
            positive,
            neutral: scores.len() - positive - negative,
            negative,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Positive => self.positive,
            Category::Neutral => self.neutral,
            Category::Negative => self.negative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateResult {
    mean_score: f64,
    verdict: Verdict,
    counts: CategoryCounts,
}

impl AggregateResult {
    pub fn mean_score(&self) -> f64 {
        self.mean_score
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn counts(&self) -> CategoryCounts {
        self.counts
    }
}

/// Arithmetic mean of the decisive scores, or 0.0 when there are none.
pub fn decisive_mean(scores: &[SentimentScore]) -> f64 {
    let (sum, n) = scores
        .iter()
        .filter(|s| !s.is_near_neutral())
        .fold((0.0, 0usize), |(sum, n), s| (sum + s.value(), n + 1));

    if n == 0 {
        return 0.0;
    }
    (sum / n as f64).clamp(-1.0, 1.0)
}

pub fn aggregate(scores: &[SentimentScore]) -> AggregateResult {
    let mean_score = decisive_mean(scores);
    AggregateResult {
        mean_score,
        verdict: Verdict::from_mean(mean_score),
        counts: CategoryCounts::from_scores(scores),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[f64]) -> Vec<SentimentScore> {
        values.iter().copied().map(SentimentScore::new).collect()
    }

    #[test]
    fn empty_input_is_neutral_zero() {
        let result = aggregate(&[]);
        assert_eq!(result.mean_score(), 0.0);
        assert_eq!(result.verdict(), Verdict::Neutral);
        assert_eq!(result.counts(), CategoryCounts::default());
    }

    #[test]
    fn all_near_neutral_forces_zero_mean() {
        let result = aggregate(&scores(&[0.04, -0.03, 0.049, -0.0001]));
        assert_eq!(result.mean_score(), 0.0);
        assert_eq!(result.verdict(), Verdict::Neutral);
        assert_eq!(
            result.counts(),
            CategoryCounts {
                positive: 0,
                neutral: 4,
                negative: 0
            }
        );
    }

    #[test]
    fn near_neutral_scores_count_but_do_not_dilute_mean() {
        // Mean over decisive scores only: (0.8 + 0.4) / 2 = 0.6.
        let result = aggregate(&scores(&[0.8, 0.01, 0.4, -0.02]));
        assert!((result.mean_score() - 0.6).abs() < 1e-12);
        assert_eq!(result.verdict(), Verdict::Good);
        assert_eq!(result.counts().neutral, 2);
        assert_eq!(result.counts().total(), 4);
    }

    #[test]
    fn boundary_score_enters_mean_but_counts_as_neutral() {
        let result = aggregate(&scores(&[0.05]));
        assert_eq!(result.mean_score(), 0.05);
        assert_eq!(result.counts().neutral, 1);
        assert_eq!(result.verdict(), Verdict::Neutral);
    }

    #[test]
    fn verdict_thresholds_are_strict() {
        assert_eq!(Verdict::from_mean(0.31), Verdict::Good);
        assert_eq!(Verdict::from_mean(0.3), Verdict::Neutral);
        assert_eq!(Verdict::from_mean(-0.3), Verdict::Neutral);
        assert_eq!(Verdict::from_mean(-0.31), Verdict::Bad);
    }

    #[test]
    fn mostly_negative_is_bad() {
        let result = aggregate(&scores(&[-0.9, -0.6, 0.2, -0.4]));
        assert_eq!(result.verdict(), Verdict::Bad);
        assert_eq!(result.counts().positive, 1);
        assert_eq!(result.counts().negative, 3);
    }

    #[test]
    fn mixed_scores_stay_neutral() {
        // 0.6249 and -0.4767 from a glowing and a scathing review.
        let result = aggregate(&scores(&[0.6249, -0.4767]));
        assert!((result.mean_score() - 0.0741).abs() < 1e-9);
        assert_eq!(result.verdict(), Verdict::Neutral);
    }

    #[test]
    fn counts_always_sum_to_input_length() {
        let samples: [&[f64]; 4] = [
            &[],
            &[1.0, -1.0, 0.0],
            &[0.05, -0.05, 0.051, -0.051, 0.3],
            &[0.2; 17],
        ];
        for sample in samples {
            let result = aggregate(&scores(sample));
            assert_eq!(result.counts().total(), sample.len());
            assert!((-1.0..=1.0).contains(&result.mean_score()));
        }
    }

    #[test]
    fn aggregation_is_idempotent() {
        let input = scores(&[0.7, -0.2, 0.03, 0.55, -0.9]);
        assert_eq!(aggregate(&input), aggregate(&input));
    }
}
