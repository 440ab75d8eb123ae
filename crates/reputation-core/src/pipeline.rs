/// One acquisition-and-classification run for a subject.
///
/// The content session is opened here and released as soon as acquisition (scroll
/// stabilization + extraction) is done, on every path. Scoring and aggregation run on the
/// extracted text after the session is gone.
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::{aggregate, AggregateResult};
use crate::distribution::Distribution;
use crate::error::PipelineError;
use crate::extractor::{ContentExtractor, ExtractionResult, Review};
use crate::provider::{ContentProvider, SessionLauncher};
use crate::scorer::{NearNeutralPolicy, SentimentOracle, SentimentScore, SentimentScorer};
use crate::stabilizer::{ScrollOutcome, ScrollStabilizer};
use crate::subject::SubjectId;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub subject: SubjectId,
    pub scroll: ScrollOutcome,
    pub reviews: Vec<Review>,
    /// Extraction stopped early on a provider error; `reviews` holds what was read.
    pub truncated: bool,
    pub policy: NearNeutralPolicy,
    /// Scores after the near-neutral policy was applied, in review order.
    pub scores: Vec<SentimentScore>,
    pub aggregate: AggregateResult,
}

impl RunReport {
    pub fn no_reviews(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn distribution(&self, bins: usize) -> Distribution {
        Distribution::from_scores(&self.scores, bins)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReputationPipeline {
    stabilizer: ScrollStabilizer,
    extractor: ContentExtractor,
    scorer: SentimentScorer,
    policy: NearNeutralPolicy,
}

impl ReputationPipeline {
    pub fn new(
        stabilizer: ScrollStabilizer,
        extractor: ContentExtractor,
        scorer: SentimentScorer,
        policy: NearNeutralPolicy,
    ) -> Self {
        Self {
            stabilizer,
            extractor,
            scorer,
            policy,
        }
    }

    pub fn policy(&self) -> NearNeutralPolicy {
        self.policy
    }

    /// Open a session for `subject`, acquire reviews, release the session, then score.
    ///
    /// Only a failure to open the session is returned as an error. Everything after that
    /// degrades to a defined result: no content, truncated extraction, neutral verdict.
    pub async fn run(
        &self,
        launcher: &dyn SessionLauncher,
        oracle: &dyn SentimentOracle,
        subject: &SubjectId,
    ) -> Result<RunReport, PipelineError> {
        info!(subject = %subject, "opening content session");
        let session = launcher.open(subject).await.map_err(PipelineError::Launch)?;

        let (scroll, extraction) = self.acquire(session.as_ref()).await;

        let _ = session.close().await.inspect_err(|e| {
            warn!(error = %e, subject = %subject, "failed to close content session");
        });

        Ok(self.classify(subject.clone(), scroll, extraction, oracle).await)
    }

    /// Stabilize the page and extract reviews from an already-open provider.
    pub async fn acquire(&self, provider: &dyn ContentProvider) -> (ScrollOutcome, ExtractionResult) {
        let scroll = self
            .stabilizer
            .stabilize(provider, self.extractor.selector())
            .await;

        if !scroll.has_content() {
            return (scroll, ExtractionResult::default());
        }

        let extraction = self.extractor.extract(provider).await;
        (scroll, extraction)
    }

    /// Score and aggregate extracted reviews.
    pub async fn classify(
        &self,
        subject: SubjectId,
        scroll: ScrollOutcome,
        extraction: ExtractionResult,
        oracle: &dyn SentimentOracle,
    ) -> RunReport {
        let scores = self.scorer.score_all(oracle, &extraction.reviews).await;
        let scores = self.policy.apply(scores);
        let aggregate = aggregate(&scores);

        info!(
            subject = %subject,
            scrolls = scroll.scrolls(),
            reviews = extraction.reviews.len(),
            truncated = extraction.truncated,
            scored = scores.len(),
            mean = aggregate.mean_score(),
            verdict = aggregate.verdict().as_str(),
            "reputation run complete"
        );

        RunReport {
            subject,
            scroll,
            reviews: extraction.reviews,
            truncated: extraction.truncated,
            policy: self.policy,
            scores,
            aggregate,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::aggregator::{CategoryCounts, Verdict};
    use crate::provider::FragmentSelector;
    use crate::testing::{OneShotLauncher, ScriptedProvider, TableOracle};

    fn pipeline(policy: NearNeutralPolicy) -> ReputationPipeline {
        ReputationPipeline::new(
            ScrollStabilizer::default().with_settle_delay(Duration::ZERO),
            ContentExtractor::new(FragmentSelector::default()),
            SentimentScorer::new(4),
            policy,
        )
    }

    fn subject() -> SubjectId {
        SubjectId::parse("www.example.com").unwrap()
    }

    #[tokio::test]
    async fn full_run_scores_reviews_and_closes_session() {
        let provider = ScriptedProvider::new(
            &[100, 250, 250],
            &[
                "this is a great product",
                "terrible experience overall and rude support",
                "ok",
            ],
        );
        let launcher = OneShotLauncher::new(provider);
        let log = launcher.log();
        let oracle = TableOracle::new(&[
            ("this is a great product", 0.6249),
            ("terrible experience overall and rude support", -0.7),
        ]);

        let report = pipeline(NearNeutralPolicy::default())
            .run(&launcher, &oracle, &subject())
            .await
            .unwrap();

        assert_eq!(report.subject.as_str(), "example.com");
        assert_eq!(log.opened_for.lock().unwrap().as_slice(), ["example.com"]);
        assert_eq!(report.scroll, ScrollOutcome::Stable { scrolls: 2 });
        assert_eq!(report.reviews.len(), 2);
        assert_eq!(report.scores.len(), 2);
        assert!(!report.truncated);
        assert_eq!(report.aggregate.verdict(), Verdict::Neutral);
        assert_eq!(log.closes(), 1);
    }

    #[tokio::test]
    async fn no_content_short_circuits_to_empty_result() {
        let provider = ScriptedProvider::new(&[100], &["never read because the page is empty"])
            .not_ready();
        let launcher = OneShotLauncher::new(provider);
        let log = launcher.log();

        let report = pipeline(NearNeutralPolicy::default())
            .run(&launcher, &TableOracle::new(&[]), &subject())
            .await
            .unwrap();

        assert_eq!(report.scroll, ScrollOutcome::NoContent);
        assert!(report.no_reviews());
        assert!(report.scores.is_empty());
        assert_eq!(report.aggregate.mean_score(), 0.0);
        assert_eq!(report.aggregate.verdict(), Verdict::Neutral);
        assert_eq!(report.aggregate.counts(), CategoryCounts::default());
        assert_eq!(log.closes(), 1);
    }

    #[tokio::test]
    async fn truncated_extraction_still_closes_and_scores_partial_list() {
        let provider = ScriptedProvider::new(&[10, 10], &["an honest and glowing review of it"])
            .failing_after("node detached");
        let launcher = OneShotLauncher::new(provider);
        let log = launcher.log();
        let oracle = TableOracle::new(&[("an honest and glowing review of it", 0.8)]);

        let report = pipeline(NearNeutralPolicy::default())
            .run(&launcher, &oracle, &subject())
            .await
            .unwrap();

        assert!(report.truncated);
        assert_eq!(report.reviews.len(), 1);
        assert_eq!(report.aggregate.verdict(), Verdict::Good);
        assert_eq!(log.closes(), 1);
    }

    #[tokio::test]
    async fn all_near_neutral_scores_yield_neutral_zero() {
        let provider = ScriptedProvider::new(
            &[5, 5],
            &["it arrived on a tuesday", "the box was brown cardboard"],
        );
        let launcher = OneShotLauncher::new(provider);
        let oracle = TableOracle::new(&[
            ("it arrived on a tuesday", 0.02),
            ("the box was brown cardboard", -0.01),
        ]);

        let report = pipeline(NearNeutralPolicy::SuppressFromMean)
            .run(&launcher, &oracle, &subject())
            .await
            .unwrap();

        assert_eq!(report.scores.len(), 2);
        assert_eq!(report.aggregate.mean_score(), 0.0);
        assert_eq!(report.aggregate.verdict(), Verdict::Neutral);
        assert_eq!(report.aggregate.counts().neutral, 2);
    }

    #[tokio::test]
    async fn drop_policy_removes_near_neutral_scores_from_report() {
        let provider = ScriptedProvider::new(
            &[5, 5],
            &["it arrived on a tuesday", "absolutely wonderful people to deal with"],
        );
        let launcher = OneShotLauncher::new(provider);
        let oracle = TableOracle::new(&[
            ("it arrived on a tuesday", 0.02),
            ("absolutely wonderful people to deal with", 0.9),
        ]);

        let report = pipeline(NearNeutralPolicy::Drop)
            .run(&launcher, &oracle, &subject())
            .await
            .unwrap();

        assert_eq!(report.reviews.len(), 2);
        assert_eq!(report.scores.len(), 1);
        assert_eq!(report.aggregate.counts().total(), 1);
        assert_eq!(report.aggregate.verdict(), Verdict::Good);
    }

    #[tokio::test]
    async fn launch_failure_is_the_only_error() {
        let launcher = OneShotLauncher::new(ScriptedProvider::new(&[], &[]));
        let p = pipeline(NearNeutralPolicy::default());
        let oracle = TableOracle::new(&[]);

        // First run consumes the only session; the second cannot open one.
        p.run(&launcher, &oracle, &subject()).await.unwrap();
        let err = p.run(&launcher, &oracle, &subject()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Launch(_)));
        assert_eq!(launcher.log().closes(), 1);
    }

    #[tokio::test]
    async fn scroll_failure_still_extracts_and_closes() {
        let provider = ScriptedProvider::new(
            &[100, 200, 300],
            &["the staff were helpful and kind", "slow delivery but good value"],
        )
        .failing_scroll_after(1);
        let launcher = OneShotLauncher::new(provider);
        let log = launcher.log();
        let oracle = TableOracle::new(&[
            ("the staff were helpful and kind", 0.7),
            ("slow delivery but good value", 0.4),
        ]);

        let report = pipeline(NearNeutralPolicy::default())
            .run(&launcher, &oracle, &subject())
            .await
            .unwrap();

        assert_eq!(report.scroll, ScrollOutcome::Interrupted { scrolls: 1 });
        assert_eq!(report.reviews.len(), 2);
        assert!(!report.truncated);
        assert_eq!(report.aggregate.verdict(), Verdict::Good);
        assert_eq!(log.scrolls(), vec![100]);
        assert_eq!(log.closes(), 1);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn run_future_is_send() {
        let launcher = OneShotLauncher::new(ScriptedProvider::new(&[], &[]));
        let oracle = TableOracle::new(&[]);
        let p = pipeline(NearNeutralPolicy::default());
        let subject = subject();
        assert_send(&p.run(&launcher, &oracle, &subject));
    }

    #[tokio::test]
    async fn report_distribution_matches_scores() {
        let provider = ScriptedProvider::new(&[1, 1], &["great great great great", "awful awful awful awful"]);
        let launcher = OneShotLauncher::new(provider);
        let oracle = TableOracle::new(&[
            ("great great great great", 0.9),
            ("awful awful awful awful", -0.9),
        ]);

        let report = pipeline(NearNeutralPolicy::default())
            .run(&launcher, &oracle, &subject())
            .await
            .unwrap();
        let distribution = report.distribution(20);

        assert_eq!(distribution.bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert_eq!(distribution.shares.positive, 50.0);
        assert_eq!(distribution.shares.negative, 50.0);
    }
}
