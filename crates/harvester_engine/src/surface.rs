use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("driver error: {0}")]
    Driver(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("handle is no longer attached to the document")]
    Detached,
}

/// Narrow view of a live page: element lookup, reads, scrolling through scripts.
///
/// `Handle` refers to a node of the current document. Virtualized lists may
/// recycle nodes at any time, so handles must not be kept across scroll steps.
#[async_trait::async_trait]
pub trait RenderSurface: Send + Sync {
    type Handle: Clone + Send + Sync;

    async fn navigate(&self, url: &str) -> Result<(), SurfaceError>;

    /// First document-wide match, if any.
    async fn locate(&self, selector: &Selector) -> Result<Option<Self::Handle>, SurfaceError>;

    async fn locate_all(
        &self,
        scope: &Self::Handle,
        selector: &Selector,
    ) -> Result<Vec<Self::Handle>, SurfaceError>;

    /// First match below `scope`, if any.
    async fn locate_within(
        &self,
        scope: &Self::Handle,
        selector: &Selector,
    ) -> Result<Option<Self::Handle>, SurfaceError>;

    async fn attribute(
        &self,
        handle: &Self::Handle,
        name: &str,
    ) -> Result<Option<String>, SurfaceError>;

    /// Rendered text, lines separated by `\n`.
    async fn text(&self, handle: &Self::Handle) -> Result<String, SurfaceError>;

    /// Rendered height in CSS pixels.
    async fn height(&self, handle: &Self::Handle) -> Result<f64, SurfaceError>;

    async fn click(&self, handle: &Self::Handle) -> Result<(), SurfaceError>;

    /// Runs a script in the page and returns its JSON-converted result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, SurfaceError>;

    async fn close(&self) -> Result<(), SurfaceError>;
}

/// Polls `predicate` until it reports true or `timeout` elapses.
///
/// Returns `Ok(false)` on timeout. The predicate is always evaluated at least
/// once, and once more at the deadline.
pub async fn wait_until<F, Fut>(
    timeout: Duration,
    poll_interval: Duration,
    mut predicate: F,
) -> Result<bool, SurfaceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, SurfaceError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if predicate().await? {
            return Ok(true);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}
