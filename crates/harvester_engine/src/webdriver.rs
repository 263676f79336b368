//! [`RenderSurface`] backed by a W3C WebDriver session (`thirtyfour`).

use engine_logging::engine_info;
use serde::{Deserialize, Serialize};
use thirtyfour::error::WebDriverError;
use thirtyfour::{By, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver, WebElement};

use crate::{RenderSurface, Selector, SurfaceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Edge,
    Firefox,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    /// Address of a running chromedriver / msedgedriver / geckodriver.
    pub server_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub maximize_window: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9515".to_string(),
            browser: BrowserKind::Chrome,
            headless: false,
            maximize_window: true,
        }
    }
}

pub struct WebDriverSurface {
    driver: WebDriver,
}

impl WebDriverSurface {
    pub async fn connect(settings: &DriverSettings) -> Result<Self, SurfaceError> {
        let server_url = settings.server_url.clone();
        let driver = match settings.browser {
            BrowserKind::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                if settings.headless {
                    caps.set_headless().map_err(map_driver_error)?;
                }
                WebDriver::new(server_url, caps).await
            }
            BrowserKind::Edge => {
                let mut caps = DesiredCapabilities::edge();
                if settings.headless {
                    caps.set_headless().map_err(map_driver_error)?;
                }
                WebDriver::new(server_url, caps).await
            }
            BrowserKind::Firefox => {
                let mut caps = DesiredCapabilities::firefox();
                if settings.headless {
                    caps.set_headless().map_err(map_driver_error)?;
                }
                WebDriver::new(server_url, caps).await
            }
        }
        .map_err(map_driver_error)?;

        if settings.maximize_window {
            driver.maximize_window().await.map_err(map_driver_error)?;
        }
        engine_info!(
            "Connected to {:?} WebDriver at {}",
            settings.browser,
            settings.server_url
        );
        Ok(Self { driver })
    }

    pub fn from_driver(driver: WebDriver) -> Self {
        Self { driver }
    }
}

fn to_by(selector: &Selector) -> By {
    match selector {
        Selector::Css(css) => By::Css(css.clone()),
        Selector::XPath(xpath) => By::XPath(xpath.clone()),
    }
}

fn map_driver_error(err: WebDriverError) -> SurfaceError {
    match err {
        WebDriverError::StaleElementReference(_) => SurfaceError::Detached,
        other => SurfaceError::Driver(other.to_string()),
    }
}

#[async_trait::async_trait]
impl RenderSurface for WebDriverSurface {
    type Handle = WebElement;

    async fn navigate(&self, url: &str) -> Result<(), SurfaceError> {
        self.driver
            .goto(url.to_string())
            .await
            .map_err(|err| SurfaceError::Navigation {
                url: url.to_string(),
                message: err.to_string(),
            })
    }

    async fn locate(&self, selector: &Selector) -> Result<Option<WebElement>, SurfaceError> {
        let found = self
            .driver
            .find_all(to_by(selector))
            .await
            .map_err(map_driver_error)?;
        Ok(found.into_iter().next())
    }

    async fn locate_all(
        &self,
        scope: &WebElement,
        selector: &Selector,
    ) -> Result<Vec<WebElement>, SurfaceError> {
        scope.find_all(to_by(selector)).await.map_err(map_driver_error)
    }

    async fn locate_within(
        &self,
        scope: &WebElement,
        selector: &Selector,
    ) -> Result<Option<WebElement>, SurfaceError> {
        let found = scope
            .find_all(to_by(selector))
            .await
            .map_err(map_driver_error)?;
        Ok(found.into_iter().next())
    }

    async fn attribute(
        &self,
        handle: &WebElement,
        name: &str,
    ) -> Result<Option<String>, SurfaceError> {
        handle.attr(name.to_string()).await.map_err(map_driver_error)
    }

    async fn text(&self, handle: &WebElement) -> Result<String, SurfaceError> {
        handle.text().await.map_err(map_driver_error)
    }

    async fn height(&self, handle: &WebElement) -> Result<f64, SurfaceError> {
        let rect = handle.rect().await.map_err(map_driver_error)?;
        Ok(rect.height)
    }

    async fn click(&self, handle: &WebElement) -> Result<(), SurfaceError> {
        handle.click().await.map_err(map_driver_error)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, SurfaceError> {
        let ret = self
            .driver
            .execute(script.to_string(), Vec::<serde_json::Value>::new())
            .await
            .map_err(map_driver_error)?;
        Ok(ret.json().clone())
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        self.driver.clone().quit().await.map_err(map_driver_error)
    }
}
