/// Content extraction: turns raw page fragments into review texts.
///
/// A fragment is accepted as a review when, after trimming, it has strictly more than
/// `MIN_REVIEW_WORDS` whitespace-separated words. Document order is preserved and
/// duplicates are kept. A failure while walking fragments stops the walk; the reviews
/// collected so far are returned with `truncated` set.
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, warn};

use crate::provider::{ContentProvider, FragmentSelector};

/// Fragments with this many words or fewer are layout noise ("Reply", "Verified", dates).
pub const MIN_REVIEW_WORDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    text: String,
    word_count: usize,
}

impl Review {
    /// Accept a raw fragment as a review, or reject it as noise.
    pub fn from_fragment(raw: &str) -> Option<Self> {
        let text = raw.trim();
        let word_count = text.split_whitespace().count();
        (word_count > MIN_REVIEW_WORDS).then(|| Self {
            text: text.to_string(),
            word_count,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

/// Reviews read from the page, plus whether the walk stopped early.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub reviews: Vec<Review>,
    pub truncated: bool,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}

/// Filter an already-collected fragment list. Used where no provider is involved.
pub fn filter_fragments<I, S>(fragments: I) -> Vec<Review>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fragments
        .into_iter()
        .filter_map(|f| Review::from_fragment(f.as_ref()))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    selector: FragmentSelector,
}

impl ContentExtractor {
    pub fn new(selector: FragmentSelector) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &FragmentSelector {
        &self.selector
    }

    pub async fn extract(&self, provider: &dyn ContentProvider) -> ExtractionResult {
        let mut fragments = provider.fragments(&self.selector);
        let mut result = ExtractionResult::default();
        let mut seen = 0usize;

        while let Some(next) = fragments.next().await {
            match next {
                Ok(raw) => {
                    seen += 1;
                    if let Some(review) = Review::from_fragment(&raw) {
                        result.reviews.push(review);
                    }
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        fragments = seen,
                        collected = result.reviews.len(),
                        "fragment walk failed, keeping partial result"
                    );
                    result.truncated = true;
                    break;
                }
            }
        }

        debug!(
            fragments = seen,
            reviews = result.reviews.len(),
            truncated = result.truncated,
            "extraction finished"
        );
        result
    }
}
