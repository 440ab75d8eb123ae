/// Boundary between the pipeline and whatever loads the subject's rendered content.
///
/// A `SessionLauncher` opens one `ContentProvider` per pipeline run. The provider is a
/// scoped resource: the pipeline calls `close` on every exit path once a session has been
/// opened, and no session is shared between runs.
use std::time::Duration;

use futures::stream::BoxStream;

use crate::error::ProviderError;
use crate::subject::SubjectId;

/// Scalar "how much content is loaded" measure, e.g. the document scroll height in pixels.
pub type Extent = u64;

/// Names the fragments that carry review text on the source page.
///
/// The selector is a CSS selector understood by the content provider. The default matches
/// the paragraph nodes the review listing renders review bodies into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentSelector(String);

impl FragmentSelector {
    pub const DEFAULT_CSS: &'static str = "p[class*='typography_body']";

    pub fn css(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_css(&self) -> &str {
        &self.0
    }
}

impl Default for FragmentSelector {
    fn default() -> Self {
        Self::css(Self::DEFAULT_CSS)
    }
}

#[async_trait::async_trait]
pub trait ContentProvider: Send + Sync {
    /// Wait up to `timeout` for at least one fragment matching `selector` to be present.
    /// Returns `Ok(false)` when the wait times out.
    async fn ready(&self, selector: &FragmentSelector, timeout: Duration)
        -> Result<bool, ProviderError>;

    /// Current content extent.
    async fn extent(&self) -> Result<Extent, ProviderError>;

    /// Request that content up to `extent` be loaded (scroll to it).
    async fn scroll_to(&self, extent: Extent) -> Result<(), ProviderError>;

    /// Text of every fragment matching `selector`, in document order.
    ///
    /// The stream may yield an error part-way through; consumers decide whether to keep
    /// what was already read.
    fn fragments<'a>(
        &'a self,
        selector: &'a FragmentSelector,
    ) -> BoxStream<'a, Result<String, ProviderError>>;

    /// Release the underlying session. Called exactly once per opened session.
    async fn close(&self) -> Result<(), ProviderError>;
}

#[async_trait::async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Open a fresh session already pointed at the subject's listing page.
    async fn open(&self, subject: &SubjectId) -> Result<Box<dyn ContentProvider>, ProviderError>;
}
