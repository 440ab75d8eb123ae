/// Sentiment scoring through an external oracle.
///
/// Each review is mapped to a compound score in [-1.0, 1.0]. Oracle calls are independent,
/// so they run concurrently up to a bound; the output keeps input order and length.
use std::fmt;
use std::str::FromStr;

use futures::{stream, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::extractor::Review;

/// Scores strictly inside (-NEAR_NEUTRAL_BAND, NEAR_NEUTRAL_BAND) are inconclusive.
pub const NEAR_NEUTRAL_BAND: f64 = 0.05;

pub const DEFAULT_SCORER_CONCURRENCY: usize = 8;

/// Maps text to a polarity in [-1.0, 1.0].
#[async_trait::async_trait]
pub trait SentimentOracle: Send + Sync {
    async fn score(&self, text: &str) -> f64;

    fn name(&self) -> &'static str {
        "oracle"
    }
}

/// A bounded compound score. NaN is treated as 0.0 and out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SentimentScore(f64);

impl SentimentScore {
    pub fn new(raw: f64) -> Self {
        if raw.is_nan() {
            return Self(0.0);
        }
        Self(raw.clamp(-1.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn category(self) -> Category {
        Category::from_score(self.0)
    }

    /// True when the score is too weak to count towards the mean.
    pub fn is_near_neutral(self) -> bool {
        self.0.abs() < NEAR_NEUTRAL_BAND
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Positive,
    Neutral,
    Negative,
}

impl Category {
    pub fn from_score(score: f64) -> Self {
        if score > NEAR_NEUTRAL_BAND {
            Category::Positive
        } else if score < -NEAR_NEUTRAL_BAND {
            Category::Negative
        } else {
            Category::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Positive => "Positive",
            Category::Neutral => "Neutral",
            Category::Negative => "Negative",
        }
    }
}

/// What happens to near-neutral scores before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NearNeutralPolicy {
    /// Keep every score for the category breakdown; only the mean ignores near-neutral ones.
    #[default]
    SuppressFromMean,
    /// Remove near-neutral scores from the score list altogether.
    Drop,
}

impl NearNeutralPolicy {
    pub fn apply(self, scores: Vec<SentimentScore>) -> Vec<SentimentScore> {
        match self {
            NearNeutralPolicy::SuppressFromMean => scores,
            NearNeutralPolicy::Drop => scores.into_iter().filter(|s| !s.is_near_neutral()).collect(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NearNeutralPolicy::SuppressFromMean => "suppress-from-mean",
            NearNeutralPolicy::Drop => "drop",
        }
    }
}

impl FromStr for NearNeutralPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suppress-from-mean" | "suppress" => Ok(NearNeutralPolicy::SuppressFromMean),
            "drop" => Ok(NearNeutralPolicy::Drop),
            other => Err(format!(
                "unknown near-neutral policy '{other}' (expected 'suppress-from-mean' or 'drop')"
            )),
        }
    }
}

impl fmt::Display for NearNeutralPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SentimentScorer {
    concurrency: usize,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new(DEFAULT_SCORER_CONCURRENCY)
    }
}

impl SentimentScorer {
    /// `concurrency` is the number of oracle calls in flight; 0 is treated as 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Score every review. Output index `i` is the score of `reviews[i]`.
    pub async fn score_all(
        &self,
        oracle: &dyn SentimentOracle,
        reviews: &[Review],
    ) -> Vec<SentimentScore> {
        // Boxed oracle futures are lazy, so `buffered` still bounds how many are in flight.
        let calls: Vec<_> = reviews
            .iter()
            .map(|review| oracle.score(review.text()))
            .collect();
        let scores: Vec<SentimentScore> = stream::iter(calls)
            .buffered(self.concurrency)
            .map(|raw| {
                if !(-1.0..=1.0).contains(&raw) {
                    warn!(raw, oracle = oracle.name(), "oracle score out of bounds, clamping");
                }
                SentimentScore::new(raw)
            })
            .collect()
            .await;

        debug!(reviews = reviews.len(), oracle = oracle.name(), "scoring finished");
        scores
    }
}
