use std::time::Duration;

use harvester_core::{HarvestPolicy, RowIdentity, DEFAULT_ROW_HEIGHT_FALLBACK_PX};
use serde::{Deserialize, Serialize};

use crate::Selector;

/// Site-specific selectors and loop tunables, passed to the harvester explicitly.
///
/// Defaults describe a react-virtuoso job list: rows are the direct `div`
/// children of `[data-test-id="virtuoso-item-list"]`, carry `data-index`, and
/// hold the offer link two `div` levels down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// CSS selector of the scrollable list container.
    pub container_selector: String,
    /// XPath of a row relative to the container.
    pub row_xpath: String,
    pub identity_attribute: String,
    pub wrapper_tag: String,
    /// Nested wrappers between a row and the element holding link and text.
    pub wrapper_depth: usize,
    pub link_tag: String,
    pub link_attribute: String,
    pub title_line: usize,
    pub organization_line: usize,
    pub row_height_fallback_px: f64,
    /// Page-ready wait and container lookup.
    pub lookup_timeout_ms: u64,
    pub growth_wait_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub max_stall_retries: u32,
    /// Button clicked once after load to dismiss a cookie banner.
    pub consent_selector: Option<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            container_selector: r#"[data-test-id="virtuoso-item-list"]"#.to_string(),
            row_xpath: "./div".to_string(),
            identity_attribute: "data-index".to_string(),
            wrapper_tag: "div".to_string(),
            wrapper_depth: 2,
            link_tag: "a".to_string(),
            link_attribute: "href".to_string(),
            title_line: 0,
            organization_line: 3,
            row_height_fallback_px: DEFAULT_ROW_HEIGHT_FALLBACK_PX,
            lookup_timeout_ms: 10_000,
            growth_wait_timeout_ms: 3_000,
            poll_interval_ms: 100,
            max_stall_retries: 3,
            consent_selector: Some("#cookiescript_close".to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    #[error("`{0}` must be greater than zero")]
    NotPositive(&'static str),
    #[error("`title_line` and `organization_line` must differ")]
    SameLine,
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("container_selector", &self.container_selector),
            ("row_xpath", &self.row_xpath),
            ("identity_attribute", &self.identity_attribute),
            ("wrapper_tag", &self.wrapper_tag),
            ("link_tag", &self.link_tag),
            ("link_attribute", &self.link_attribute),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }
        if !(self.row_height_fallback_px.is_finite() && self.row_height_fallback_px > 0.0) {
            return Err(ConfigError::NotPositive("row_height_fallback_px"));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(ConfigError::NotPositive("lookup_timeout_ms"));
        }
        if self.growth_wait_timeout_ms == 0 {
            return Err(ConfigError::NotPositive("growth_wait_timeout_ms"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::NotPositive("poll_interval_ms"));
        }
        if self.title_line == self.organization_line {
            return Err(ConfigError::SameLine);
        }
        Ok(())
    }

    pub fn policy(&self) -> HarvestPolicy {
        HarvestPolicy {
            row_height_fallback_px: self.row_height_fallback_px,
            max_stall_retries: self.max_stall_retries,
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn growth_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.growth_wait_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn container(&self) -> Selector {
        Selector::css(&self.container_selector)
    }

    pub fn rows(&self) -> Selector {
        Selector::xpath(&self.row_xpath)
    }

    /// Container-relative XPath matching the row that carries `identity`.
    pub fn row_with_identity(&self, identity: RowIdentity) -> Selector {
        Selector::XPath(format!(
            "{}[@{}=\"{}\"]",
            self.row_xpath, self.identity_attribute, identity
        ))
    }

    pub fn consent(&self) -> Option<Selector> {
        self.consent_selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Selector::css)
    }
}
