#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Mutex, Once};

use harvester_engine::{
    HarvestConfig, RenderSurface, Selector, SurfaceError, DOCUMENT_HEIGHT_SCRIPT,
    READY_STATE_SCRIPT, SCROLL_OFFSET_SCRIPT, VIEWPORT_HEIGHT_SCRIPT,
};
use serde_json::{json, Value};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub const PAGE_URL: &str = "https://jobs.example/offers";
pub const CONTAINER: &str = r#"[data-test-id="virtuoso-item-list"]"#;
pub const CONSENT: &str = "#cookiescript_close";

/// Tight timeouts so stalls resolve quickly under test.
pub fn fast_config() -> HarvestConfig {
    HarvestConfig {
        lookup_timeout_ms: 40,
        growth_wait_timeout_ms: 20,
        poll_interval_ms: 2,
        ..HarvestConfig::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Container,
    Row(u64),
    Wrapper(u64, usize),
    Anchor(u64),
    Consent,
}

#[derive(Debug, Clone)]
pub struct ListLayout {
    pub rows: u64,
    pub row_height: f64,
    pub viewport_height: f64,
    /// Rows rendered beyond each edge of the viewport.
    pub overscan: u64,
}

#[derive(Debug, Default)]
struct Page {
    url: Option<String>,
    offset: f64,
    scrolls: usize,
    /// Rows appended to the document so far.
    loaded: u64,
    empty_lookups_left: usize,
    consent_clicked: bool,
    closed: bool,
}

/// In-memory virtualized list: only rows intersecting the viewport (plus
/// overscan) exist, and every row nests `div > div > a` like the real page.
pub struct SimulatedList {
    layout: ListLayout,
    has_container: bool,
    has_consent: bool,
    broken_anchors: HashSet<u64>,
    scroll_limit: Option<usize>,
    growth_batch: Option<u64>,
    page: Mutex<Page>,
}

impl SimulatedList {
    pub fn new(layout: ListLayout) -> Self {
        Self {
            has_container: true,
            has_consent: false,
            broken_anchors: HashSet::new(),
            scroll_limit: None,
            growth_batch: None,
            page: Mutex::new(Page {
                loaded: layout.rows,
                ..Page::default()
            }),
            layout,
        }
    }

    pub fn without_container(mut self) -> Self {
        self.has_container = false;
        self
    }

    pub fn with_consent_banner(mut self) -> Self {
        self.has_consent = true;
        self
    }

    pub fn with_broken_anchor(mut self, row: u64) -> Self {
        self.broken_anchors.insert(row);
        self
    }

    /// Scroll requests after the first `scrolls` are ignored, like a list that stops loading.
    pub fn lock_scrolling_after(mut self, scrolls: usize) -> Self {
        self.scroll_limit = Some(scrolls);
        self
    }

    /// The first `lookups` row queries find an empty container, as while rows are still rendering.
    pub fn with_late_rows(self, lookups: usize) -> Self {
        self.page.lock().unwrap().empty_lookups_left = lookups;
        self
    }

    /// Starts with `initial` rows and appends `batch` more whenever the
    /// viewport reaches the end of the track, up to `layout.rows`.
    pub fn growing(mut self, initial: u64, batch: u64) -> Self {
        self.page.lock().unwrap().loaded = initial.min(self.layout.rows);
        self.growth_batch = Some(batch);
        self
    }

    pub fn consent_clicked(&self) -> bool {
        self.page.lock().unwrap().consent_clicked
    }

    pub fn scrolls(&self) -> usize {
        self.page.lock().unwrap().scrolls
    }

    pub fn is_closed(&self) -> bool {
        self.page.lock().unwrap().closed
    }

    fn document_height(&self) -> f64 {
        self.page.lock().unwrap().loaded as f64 * self.layout.row_height
    }

    fn window(&self) -> std::ops::Range<u64> {
        let (offset, loaded) = {
            let page = self.page.lock().unwrap();
            (page.offset, page.loaded)
        };
        let first = (offset / self.layout.row_height).floor() as u64;
        let last = ((offset + self.layout.viewport_height) / self.layout.row_height).ceil() as u64;
        first.saturating_sub(self.layout.overscan)..(last + self.layout.overscan).min(loaded)
    }

    fn is_materialized(&self, row: u64) -> bool {
        self.window().contains(&row)
    }

    fn ensure_attached(&self, node: &Node) -> Result<(), SurfaceError> {
        let row = match node {
            Node::Row(id) | Node::Wrapper(id, _) | Node::Anchor(id) => *id,
            Node::Container | Node::Consent => return Ok(()),
        };
        if self.is_materialized(row) {
            Ok(())
        } else {
            Err(SurfaceError::Detached)
        }
    }

    fn scroll(&self, px: f64) {
        let row_height = self.layout.row_height;
        let viewport = self.layout.viewport_height;
        let mut page = self.page.lock().unwrap();
        page.scrolls += 1;
        if self.scroll_limit.is_some_and(|limit| page.scrolls > limit) {
            return;
        }
        let max = (page.loaded as f64 * row_height - viewport).max(0.0);
        page.offset = (page.offset + px).clamp(0.0, max);

        if let Some(batch) = self.growth_batch {
            if page.offset + viewport >= page.loaded as f64 * row_height {
                page.loaded = (page.loaded + batch).min(self.layout.rows);
            }
        }
    }
}

fn parse_scroll(script: &str) -> Option<f64> {
    script
        .strip_prefix("window.scrollBy(0, ")?
        .strip_suffix(");")?
        .parse()
        .ok()
}

fn parse_row_lookup(xpath: &str) -> Option<u64> {
    xpath
        .strip_prefix("./div[@data-index=\"")?
        .strip_suffix("\"]")?
        .parse()
        .ok()
}

#[async_trait::async_trait]
impl RenderSurface for SimulatedList {
    type Handle = Node;

    async fn navigate(&self, url: &str) -> Result<(), SurfaceError> {
        self.page.lock().unwrap().url = Some(url.to_string());
        Ok(())
    }

    async fn locate(&self, selector: &Selector) -> Result<Option<Node>, SurfaceError> {
        let found = match selector {
            Selector::Css(css) if css == CONTAINER && self.has_container => Some(Node::Container),
            Selector::Css(css) if css == CONSENT && self.has_consent => Some(Node::Consent),
            _ => None,
        };
        Ok(found)
    }

    async fn locate_all(&self, scope: &Node, selector: &Selector) -> Result<Vec<Node>, SurfaceError> {
        match (scope, selector) {
            (Node::Container, Selector::XPath(xpath)) if xpath == "./div" => {
                {
                    let mut page = self.page.lock().unwrap();
                    if page.empty_lookups_left > 0 {
                        page.empty_lookups_left -= 1;
                        return Ok(Vec::new());
                    }
                }
                Ok(self.window().map(Node::Row).collect())
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn locate_within(
        &self,
        scope: &Node,
        selector: &Selector,
    ) -> Result<Option<Node>, SurfaceError> {
        self.ensure_attached(scope)?;
        let found = match (scope, selector) {
            (Node::Container, Selector::XPath(xpath)) => {
                parse_row_lookup(xpath).filter(|row| self.is_materialized(*row)).map(Node::Row)
            }
            (Node::Row(id), Selector::Css(css)) if css == "div" => Some(Node::Wrapper(*id, 1)),
            (Node::Wrapper(id, 1), Selector::Css(css)) if css == "div" => {
                Some(Node::Wrapper(*id, 2))
            }
            (Node::Wrapper(id, 2), Selector::Css(css))
                if css == "a" && !self.broken_anchors.contains(id) =>
            {
                Some(Node::Anchor(*id))
            }
            _ => None,
        };
        Ok(found)
    }

    async fn attribute(&self, handle: &Node, name: &str) -> Result<Option<String>, SurfaceError> {
        self.ensure_attached(handle)?;
        let value = match (handle, name) {
            (Node::Row(id), "data-index") => Some(id.to_string()),
            (Node::Anchor(id), "href") => Some(format!("/offers/{id}")),
            _ => None,
        };
        Ok(value)
    }

    async fn text(&self, handle: &Node) -> Result<String, SurfaceError> {
        self.ensure_attached(handle)?;
        match handle {
            Node::Wrapper(id, _) | Node::Anchor(id) => Ok(format!(
                "Engineer {id}\nFull time\nRemote\nCompany {id}\nApply"
            )),
            _ => Ok(String::new()),
        }
    }

    async fn height(&self, handle: &Node) -> Result<f64, SurfaceError> {
        self.ensure_attached(handle)?;
        Ok(self.layout.row_height)
    }

    async fn click(&self, handle: &Node) -> Result<(), SurfaceError> {
        if *handle == Node::Consent {
            self.page.lock().unwrap().consent_clicked = true;
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, SurfaceError> {
        if let Some(px) = parse_scroll(script) {
            self.scroll(px);
            return Ok(Value::Null);
        }
        let value = match script {
            READY_STATE_SCRIPT => json!("complete"),
            VIEWPORT_HEIGHT_SCRIPT => json!(self.layout.viewport_height),
            DOCUMENT_HEIGHT_SCRIPT => json!(self.document_height()),
            SCROLL_OFFSET_SCRIPT => json!(self.page.lock().unwrap().offset),
            other => return Err(SurfaceError::Driver(format!("unexpected script: {other}"))),
        };
        Ok(value)
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        self.page.lock().unwrap().closed = true;
        Ok(())
    }
}
