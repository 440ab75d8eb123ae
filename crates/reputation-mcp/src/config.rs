use std::str::FromStr;
use std::time::Duration;

use reputation_common::llm::LlmClientConfig;
use reputation_common::webdriver::WebDriverConfig;
use reputation_core::extractor::ContentExtractor;
use reputation_core::pipeline::ReputationPipeline;
use reputation_core::provider::FragmentSelector;
use reputation_core::scorer::{NearNeutralPolicy, SentimentScorer, DEFAULT_SCORER_CONCURRENCY};
use reputation_core::stabilizer::{
    ScrollStabilizer, DEFAULT_MAX_ITERATIONS, DEFAULT_READY_TIMEOUT, DEFAULT_SETTLE_DELAY,
};

use crate::error::AppError;

/// Which sentiment oracle scores the reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleKind {
    Lexicon,
    Llm,
}

impl FromStr for OracleKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexicon" => Ok(OracleKind::Lexicon),
            "llm" => Ok(OracleKind::Llm),
            other => Err(AppError::Config(format!(
                "SENTIMENT_ORACLE must be 'lexicon' or 'llm', got '{other}'"
            ))),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Every variable is optional except `SENTIMENT_MODEL`, which is required when
/// `SENTIMENT_ORACLE=llm`. Malformed values are rejected rather than silently defaulted.
#[derive(Debug, Clone)]
pub struct Config {
    pub webdriver: WebDriverConfig,
    /// CSS selector for the nodes holding review text.
    pub selector: FragmentSelector,
    pub max_scroll_iterations: u32,
    pub settle_delay: Duration,
    pub ready_timeout: Duration,
    pub scorer_concurrency: usize,
    pub policy: NearNeutralPolicy,
    pub oracle: OracleKind,
    /// Present iff `oracle` is `Llm`.
    pub llm: Option<LlmClientConfig>,
    /// Serve MCP over TCP on this address instead of stdio.
    pub mcp_tcp_listen_addr: Option<String>,
    /// Serve the HTML form on this address instead of MCP.
    pub http_listen_addr: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let selector = lookup("REVIEW_FRAGMENT_SELECTOR")
            .filter(|s| !s.trim().is_empty())
            .map(FragmentSelector::css)
            .unwrap_or_default();

        let max_scroll_iterations =
            parse_opt(&lookup, "SCROLL_MAX_ITERATIONS")?.unwrap_or(DEFAULT_MAX_ITERATIONS);
        let settle_delay = parse_opt(&lookup, "SCROLL_SETTLE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SETTLE_DELAY);
        let ready_timeout = parse_opt(&lookup, "READY_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_READY_TIMEOUT);

        let scorer_concurrency =
            parse_opt(&lookup, "SCORER_CONCURRENCY")?.unwrap_or(DEFAULT_SCORER_CONCURRENCY);
        if scorer_concurrency == 0 {
            return Err(AppError::Config(
                "SCORER_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        let policy = match lookup("NEAR_NEUTRAL_POLICY") {
            Some(raw) => raw.parse::<NearNeutralPolicy>().map_err(AppError::Config)?,
            None => NearNeutralPolicy::default(),
        };

        let oracle = match lookup("SENTIMENT_ORACLE") {
            Some(raw) => raw.parse::<OracleKind>()?,
            None => OracleKind::Lexicon,
        };

        let llm = match oracle {
            OracleKind::Lexicon => None,
            OracleKind::Llm => {
                let model = lookup("SENTIMENT_MODEL")
                    .filter(|m| !m.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::Config(
                            "SENTIMENT_MODEL environment variable is required when SENTIMENT_ORACLE=llm"
                                .to_string(),
                        )
                    })?;
                Some(
                    LlmClientConfig::from_lookup(model.trim().to_string(), &lookup)
                        .map_err(|e| AppError::Config(e.to_string()))?,
                )
            }
        };

        let webdriver =
            WebDriverConfig::from_lookup(&lookup).map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            webdriver,
            selector,
            max_scroll_iterations,
            settle_delay,
            ready_timeout,
            scorer_concurrency,
            policy,
            oracle,
            llm,
            mcp_tcp_listen_addr: lookup("MCP_TCP_LISTEN_ADDR"),
            http_listen_addr: lookup("HTTP_LISTEN_ADDR"),
        })
    }

    pub fn pipeline(&self) -> ReputationPipeline {
        ReputationPipeline::new(
            ScrollStabilizer::default()
                .with_max_iterations(self.max_scroll_iterations)
                .with_settle_delay(self.settle_delay)
                .with_ready_timeout(self.ready_timeout),
            ContentExtractor::new(self.selector.clone()),
            SentimentScorer::new(self.scorer_concurrency),
            self.policy,
        )
    }
}

fn parse_opt<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| AppError::Config(format!("{key} has an invalid value: '{raw}'")))
        })
        .transpose()
}
