use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use reputation_core::aggregator::CategoryCounts;
use reputation_core::distribution::{Distribution, DEFAULT_BINS};
use reputation_core::pipeline::RunReport;
use reputation_core::stabilizer::ScrollOutcome;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AnalyzeReputationParams {
    /// Name of the business as it appears on the review site, e.g. "amazon.com".
    /// Surrounding whitespace, case and a leading "www." are ignored.
    pub subject: String,
    /// Include the extracted review texts in the response (default: false).
    pub include_reviews: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct CategoryCountsView {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScrollSummary {
    /// One of "no_content", "stable", "cap_exhausted", "interrupted".
    pub state: String,
    pub scrolls: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistogramBinView {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DistributionView {
    pub bins: Vec<HistogramBinView>,
    /// Percentage of scores per category.
    pub positive_pct: f64,
    pub neutral_pct: f64,
    pub negative_pct: f64,
    /// Mean over all scores, near-neutral ones included.
    pub raw_mean: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReputationResponse {
    pub subject: String,
    /// "Good", "Bad" or "Neutral".
    pub reputation: String,
    /// Mean of the decisive scores (|score| >= 0.05), 0.0 when there are none.
    pub mean_score: f64,
    pub counts: CategoryCountsView,
    pub review_count: usize,
    /// Extraction stopped early; the result covers the reviews read before the failure.
    pub truncated: bool,
    pub scroll: ScrollSummary,
    pub near_neutral_policy: String,
    /// Per-review compound scores in [-1.0, 1.0], after the near-neutral policy.
    pub scores: Vec<f64>,
    pub distribution: DistributionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<String>>,
    /// True when no reviews were found for the subject.
    pub no_reviews: bool,
}

pub fn scroll_state(outcome: &ScrollOutcome) -> &'static str {
    match outcome {
        ScrollOutcome::NoContent => "no_content",
        ScrollOutcome::Stable { .. } => "stable",
        ScrollOutcome::CapExhausted { .. } => "cap_exhausted",
        ScrollOutcome::Interrupted { .. } => "interrupted",
    }
}

fn to_api_counts(counts: CategoryCounts) -> CategoryCountsView {
    CategoryCountsView {
        positive: counts.positive,
        neutral: counts.neutral,
        negative: counts.negative,
    }
}

fn to_api_distribution(d: Distribution) -> DistributionView {
    DistributionView {
        bins: d
            .bins
            .into_iter()
            .map(|b| HistogramBinView {
                lower: b.lower,
                upper: b.upper,
                count: b.count,
            })
            .collect(),
        positive_pct: d.shares.positive,
        neutral_pct: d.shares.neutral,
        negative_pct: d.shares.negative,
        raw_mean: d.raw_mean,
    }
}

pub fn to_api_response(report: &RunReport, include_reviews: bool) -> ReputationResponse {
    let aggregate = report.aggregate;
    ReputationResponse {
        subject: report.subject.to_string(),
        reputation: aggregate.verdict().as_str().to_string(),
        mean_score: aggregate.mean_score(),
        counts: to_api_counts(aggregate.counts()),
        review_count: report.reviews.len(),
        truncated: report.truncated,
        scroll: ScrollSummary {
            state: scroll_state(&report.scroll).to_string(),
            scrolls: report.scroll.scrolls(),
        },
        near_neutral_policy: report.policy.as_str().to_string(),
        scores: report.scores.iter().map(|s| s.value()).collect(),
        distribution: to_api_distribution(report.distribution(DEFAULT_BINS)),
        reviews: include_reviews
            .then(|| report.reviews.iter().map(|r| r.text().to_string()).collect()),
        no_reviews: report.no_reviews(),
    }
}

#[cfg(test)]
mod tests {
    use reputation_core::aggregator::aggregate;
    use reputation_core::extractor::filter_fragments;
    use reputation_core::scorer::{NearNeutralPolicy, SentimentScore};
    use reputation_core::subject::SubjectId;

    use super::*;

    fn report(values: &[f64], fragments: &[&str]) -> RunReport {
        let scores: Vec<SentimentScore> = values.iter().copied().map(SentimentScore::new).collect();
        RunReport {
            subject: SubjectId::parse("Example.com").unwrap(),
            scroll: ScrollOutcome::Stable { scrolls: 2 },
            reviews: filter_fragments(fragments),
            truncated: false,
            policy: NearNeutralPolicy::SuppressFromMean,
            aggregate: aggregate(&scores),
            scores,
        }
    }

    #[test]
    fn response_mirrors_report() {
        let r = report(
            &[0.8, 0.6, 0.01],
            &[
                "lovely people and quick delivery",
                "great prices on everything here",
                "it came in a box",
            ],
        );
        let resp = to_api_response(&r, false);

        assert_eq!(resp.subject, "example.com");
        assert_eq!(resp.reputation, "Good");
        assert!((resp.mean_score - 0.7).abs() < 1e-12);
        assert_eq!(resp.counts.positive, 2);
        assert_eq!(resp.counts.neutral, 1);
        assert_eq!(resp.review_count, 3);
        assert_eq!(resp.scroll.state, "stable");
        assert_eq!(resp.scroll.scrolls, 2);
        assert_eq!(resp.near_neutral_policy, "suppress-from-mean");
        assert_eq!(resp.scores, vec![0.8, 0.6, 0.01]);
        assert_eq!(resp.distribution.bins.len(), DEFAULT_BINS);
        assert!(resp.reviews.is_none());
        assert!(!resp.no_reviews);
    }

    #[test]
    fn reviews_are_included_on_request() {
        let r = report(&[0.8], &["lovely people and quick delivery"]);
        let resp = to_api_response(&r, true);
        assert_eq!(
            resp.reviews.as_deref(),
            Some(&["lovely people and quick delivery".to_string()][..])
        );
    }

    #[test]
    fn empty_report_flags_no_reviews() {
        let r = report(&[], &[]);
        let resp = to_api_response(&r, true);
        assert!(resp.no_reviews);
        assert_eq!(resp.reputation, "Neutral");
        assert_eq!(resp.mean_score, 0.0);
        assert_eq!(resp.reviews, Some(Vec::new()));

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["no_reviews"], true);
    }
}
