use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use reputation_core::error::ProviderError;
use reputation_core::provider::{ContentProvider, Extent, FragmentSelector, SessionLauncher};
use reputation_core::subject::SubjectId;

use crate::error::{parse_var, CommonError};

/// Key under which W3C WebDriver returns element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const EXTENT_SCRIPT: &str = "return document.body.scrollHeight;";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, arguments[0]);";

#[derive(Clone, Debug)]
pub struct WebDriverConfig {
    /// Base URL of the WebDriver endpoint (chromedriver, selenium, ...).
    pub endpoint: String,
    /// Listing URL prefix; the subject is appended.
    pub source_url: String,
    pub headless: bool,
    pub command_timeout: Duration,
    pub poll_interval: Duration,
}

impl WebDriverConfig {
    pub fn from_env() -> Result<Self, CommonError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CommonError> {
        let endpoint = lookup("WEBDRIVER_URL").unwrap_or_else(|| "http://localhost:4444".to_string());
        let source_url = lookup("REVIEW_SOURCE_URL")
            .unwrap_or_else(|| "https://www.trustpilot.com/review/".to_string());

        let headless = match lookup("BROWSER_HEADLESS") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| CommonError::Config {
                key: "BROWSER_HEADLESS".to_string(),
                value: raw.clone(),
            })?,
            None => true,
        };

        let command_timeout = parse_var(&lookup, "WEBDRIVER_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            source_url,
            headless,
            command_timeout,
            poll_interval: Duration::from_millis(500),
        })
    }

    pub fn listing_url(&self, subject: &SubjectId) -> String {
        if self.source_url.ends_with('/') {
            format!("{}{}", self.source_url, subject)
        } else {
            format!("{}/{}", self.source_url, subject)
        }
    }
}

/// Opens one browser session per pipeline run against a W3C WebDriver endpoint.
#[derive(Clone)]
pub struct WebDriverLauncher {
    config: WebDriverConfig,
    http: reqwest::Client,
}

impl WebDriverLauncher {
    pub fn new(config: WebDriverConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("reputation-common/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &WebDriverConfig {
        &self.config
    }

    async fn new_session(&self) -> Result<String, CommonError> {
        let url = format!("{}/session", self.config.endpoint);
        let body = json!({ "capabilities": capabilities(self.config.headless) });
        let value = send(
            &self.http,
            Method::POST,
            &url,
            Some(body),
            self.config.command_timeout,
        )
        .await?;
        session_id(&value)
    }
}

#[async_trait::async_trait]
impl SessionLauncher for WebDriverLauncher {
    async fn open(&self, subject: &SubjectId) -> Result<Box<dyn ContentProvider>, ProviderError> {
        let id = self
            .new_session()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let session = WebDriverSession {
            base: format!("{}/session/{}", self.config.endpoint, id),
            id,
            http: self.http.clone(),
            command_timeout: self.config.command_timeout,
            poll_interval: self.config.poll_interval,
            closed: AtomicBool::new(false),
        };

        let url = self.config.listing_url(subject);
        info!(session = %session.id, url = %url, "navigating to listing");
        if let Err(e) = session.command(Method::POST, "/url", Some(json!({ "url": url }))).await {
            if let Err(close_err) = session.close().await {
                warn!(error = %close_err, "failed to release session after navigation error");
            }
            return Err(ProviderError::Unavailable(format!("navigation failed: {e}")));
        }

        Ok(Box::new(session))
    }
}

pub struct WebDriverSession {
    id: String,
    base: String,
    http: reqwest::Client,
    command_timeout: Duration,
    poll_interval: Duration,
    closed: AtomicBool,
}

impl WebDriverSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, CommonError> {
        let url = format!("{}{}", self.base, path);
        send(&self.http, method, &url, body, self.command_timeout).await
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, CommonError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn find_elements(&self, selector: &FragmentSelector) -> Result<Vec<String>, CommonError> {
        let value = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "css selector", "value": selector.as_css() })),
            )
            .await?;
        element_ids(&value)
    }

    async fn element_text(&self, element: &str) -> Result<String, CommonError> {
        let value = self
            .command(Method::GET, &format!("/element/{element}/text"), None)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CommonError::Protocol(format!("element text was not a string: {value}")))
    }
}

#[async_trait::async_trait]
impl ContentProvider for WebDriverSession {
    async fn ready(
        &self,
        selector: &FragmentSelector,
        timeout: Duration,
    ) -> Result<bool, ProviderError> {
        // A single `/elements` call can hang for the full command timeout.
        let poll = async {
            loop {
                let found = self
                    .find_elements(selector)
                    .await
                    .map_err(|e| e.into_provider("find elements"))?;
                if !found.is_empty() {
                    debug!(session = %self.id, fragments = found.len(), "content ready");
                    return Ok::<bool, ProviderError>(true);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };
        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => {
                debug!(session = %self.id, timeout_ms = timeout.as_millis(), "readiness wait timed out");
                Ok(false)
            }
        }
    }

    async fn extent(&self) -> Result<Extent, ProviderError> {
        let value = self
            .execute(EXTENT_SCRIPT, Vec::new())
            .await
            .map_err(|e| e.into_provider("measure extent"))?;
        parse_extent(&value).map_err(|e| e.into_provider("measure extent"))
    }

    async fn scroll_to(&self, extent: Extent) -> Result<(), ProviderError> {
        self.execute(SCROLL_SCRIPT, vec![json!(extent)])
            .await
            .map(|_| ())
            .map_err(|e| e.into_provider("scroll"))
    }

    fn fragments<'a>(
        &'a self,
        selector: &'a FragmentSelector,
    ) -> BoxStream<'a, Result<String, ProviderError>> {
        stream::once(self.find_elements(selector))
            .flat_map(move |found| match found {
                Ok(ids) => stream::iter(ids)
                    .then(move |id| async move {
                        self.element_text(&id)
                            .await
                            .map_err(|e| e.into_provider("element text"))
                    })
                    .boxed(),
                Err(e) => {
                    stream::once(async move { Err::<String, _>(e.into_provider("find elements")) })
                        .boxed()
                }
            })
            .boxed()
    }

    async fn close(&self) -> Result<(), ProviderError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(session = %self.id, "deleting webdriver session");
        send(&self.http, Method::DELETE, &self.base, None, self.command_timeout)
            .await
            .map(|_| ())
            .map_err(|e| e.into_provider("delete session"))
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        // Best effort: a dropped session would otherwise keep a browser alive.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(session = %self.id, "session dropped outside a runtime, not released");
            return;
        };
        let http = self.http.clone();
        let url = self.base.clone();
        let timeout = self.command_timeout;
        handle.spawn(async move {
            if let Err(e) = send(&http, Method::DELETE, &url, None, timeout).await {
                warn!(error = %e, "failed to release dropped webdriver session");
            }
        });
    }
}

async fn send(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
    timeout: Duration,
) -> Result<Value, CommonError> {
    let mut req = http.request(method, url).timeout(timeout);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req.send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    parse_reply(status, &text)
}

#[derive(Debug, Deserialize)]
struct Reply {
    value: Value,
}

/// Unwrap the `{"value": ...}` envelope, turning W3C error objects into `CommonError`.
fn parse_reply(status: StatusCode, body: &str) -> Result<Value, CommonError> {
    let reply = match serde_json::from_str::<Reply>(body) {
        Ok(reply) => reply,
        Err(_) if !status.is_success() => {
            return Err(CommonError::UpstreamBody {
                status,
                body: body.chars().take(1024).collect(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    if status.is_success() {
        return Ok(reply.value);
    }

    let field = |name: &str| {
        reply
            .value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Err(CommonError::WebDriver {
        status,
        error: field("error"),
        message: field("message"),
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn capabilities(headless: bool) -> Value {
    let mut args = vec!["--disable-gpu", "--no-sandbox", "--disable-dev-shm-usage"];
    if headless {
        args.insert(0, "--headless=new");
    }
    json!({
        "alwaysMatch": {
            "browserName": "chrome",
            "goog:chromeOptions": { "args": args }
        }
    })
}

fn session_id(value: &Value) -> Result<String, CommonError> {
    value
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CommonError::Protocol("new session reply without sessionId".to_string()))
}

fn element_ids(value: &Value) -> Result<Vec<String>, CommonError> {
    let items = value
        .as_array()
        .ok_or_else(|| CommonError::Protocol(format!("expected element list, got {value}")))?;
    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| CommonError::Protocol(format!("not an element reference: {item}")))
        })
        .collect()
}

fn parse_extent(value: &Value) -> Result<Extent, CommonError> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
        .ok_or_else(|| CommonError::Protocol(format!("extent was not a non-negative number: {value}")))
}
