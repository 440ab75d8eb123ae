// Shared fakes for the pipeline tests.
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};

use crate::error::ProviderError;
use crate::provider::{ContentProvider, Extent, FragmentSelector, SessionLauncher};
use crate::scorer::SentimentOracle;
use crate::subject::SubjectId;

/// Observations a test can make after the provider has been moved into the pipeline.
#[derive(Clone, Default)]
pub struct ProviderLog {
    pub scrolls: Arc<Mutex<Vec<Extent>>>,
    pub closes: Arc<AtomicUsize>,
    pub opened_for: Arc<Mutex<Vec<String>>>,
}

impl ProviderLog {
    pub fn scrolls(&self) -> Vec<Extent> {
        self.scrolls.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct ScriptedProvider {
    pub ready: Result<bool, String>,
    pub extents: Mutex<VecDeque<Extent>>,
    pub fragments: Vec<Result<String, String>>,
    /// Scrolls allowed before `scroll_to` starts failing.
    pub scroll_budget: Option<usize>,
    pub log: ProviderLog,
}

impl ScriptedProvider {
    pub fn new(extents: &[Extent], fragments: &[&str]) -> Self {
        Self {
            ready: Ok(true),
            extents: Mutex::new(extents.iter().copied().collect()),
            fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            scroll_budget: None,
            log: ProviderLog::default(),
        }
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = Ok(false);
        self
    }

    pub fn failing_after(mut self, message: &str) -> Self {
        self.fragments.push(Err(message.to_string()));
        self.fragments.push(Ok("this fragment is never reached by the walk".to_string()));
        self
    }

    pub fn failing_scroll_after(mut self, scrolls: usize) -> Self {
        self.scroll_budget = Some(scrolls);
        self
    }
}

#[async_trait::async_trait]
impl ContentProvider for ScriptedProvider {
    async fn ready(
        &self,
        _selector: &FragmentSelector,
        _timeout: Duration,
    ) -> Result<bool, ProviderError> {
        self.ready
            .clone()
            .map_err(|e| ProviderError::command("ready", e))
    }

    async fn extent(&self) -> Result<Extent, ProviderError> {
        self.extents
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::command("extent", "script exhausted"))
    }

    async fn scroll_to(&self, extent: Extent) -> Result<(), ProviderError> {
        let mut scrolls = self.log.scrolls.lock().unwrap();
        if self.scroll_budget.is_some_and(|budget| scrolls.len() >= budget) {
            return Err(ProviderError::command("scroll", "javascript error"));
        }
        scrolls.push(extent);
        Ok(())
    }

    fn fragments<'a>(
        &'a self,
        _selector: &'a FragmentSelector,
    ) -> BoxStream<'a, Result<String, ProviderError>> {
        stream::iter(
            self.fragments
                .iter()
                .cloned()
                .map(|f| f.map_err(ProviderError::StaleFragment)),
        )
        .boxed()
    }

    async fn close(&self) -> Result<(), ProviderError> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one pre-built provider, then refuses.
pub struct OneShotLauncher {
    provider: Mutex<Option<ScriptedProvider>>,
    log: ProviderLog,
}

impl OneShotLauncher {
    pub fn new(provider: ScriptedProvider) -> Self {
        let log = provider.log.clone();
        Self {
            provider: Mutex::new(Some(provider)),
            log,
        }
    }

    pub fn log(&self) -> ProviderLog {
        self.log.clone()
    }
}

#[async_trait::async_trait]
impl SessionLauncher for OneShotLauncher {
    async fn open(&self, subject: &SubjectId) -> Result<Box<dyn ContentProvider>, ProviderError> {
        self.log
            .opened_for
            .lock()
            .unwrap()
            .push(subject.as_str().to_string());
        let provider = self
            .provider
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ProviderError::Unavailable("launcher already used".to_string()))?;
        Ok(Box::new(provider))
    }
}

/// Looks scores up by exact text; unknown text scores 0.0.
pub struct TableOracle(pub HashMap<String, f64>);

impl TableOracle {
    pub fn new(entries: &[(&str, f64)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(text, score)| (text.to_string(), *score))
                .collect(),
        )
    }
}

#[async_trait::async_trait]
impl SentimentOracle for TableOracle {
    async fn score(&self, text: &str) -> f64 {
        self.0.get(text).copied().unwrap_or(0.0)
    }
}
