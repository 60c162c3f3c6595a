//! WebDriver session and element access

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use async_trait::async_trait;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use tracing::{debug, info};

use topogui_common::config::{BrowserConfig, BrowserKind};
use topogui_common::Rect;

use crate::error::{E2eError, E2eResult};
use crate::poll::PollUntil;
use crate::waits::Probe;

/// Open a WebDriver session as described by `config`
pub async fn connect(config: &BrowserConfig) -> E2eResult<WebDriver> {
    info!(
        "Connecting to WebDriver at {} ({:?}, headless={})",
        config.webdriver_url, config.kind, config.headless
    );

    let driver = match config.kind {
        BrowserKind::Chrome => {
            let mut caps = DesiredCapabilities::chrome();
            if config.headless {
                caps.set_headless()?;
            }
            WebDriver::new(config.webdriver_url.as_str(), caps).await?
        }
        BrowserKind::Firefox => {
            let mut caps = DesiredCapabilities::firefox();
            if config.headless {
                caps.set_headless()?;
            }
            WebDriver::new(config.webdriver_url.as_str(), caps).await?
        }
    };

    if config.implicit_wait_ms > 0 {
        let timeouts = TimeoutConfiguration::new(
            None,
            None,
            Some(Duration::from_millis(config.implicit_wait_ms)),
        );
        driver.update_timeouts(timeouts).await?;
    }

    driver
        .set_window_rect(0, 0, config.window_width, config.window_height)
        .await?;

    Ok(driver)
}

/// True for errors caused by the DOM changing under a held element
pub fn is_stale(err: &E2eError) -> bool {
    matches!(
        err,
        E2eError::WebDriver(WebDriverError::StaleElementReference(_))
            | E2eError::WebDriver(WebDriverError::NoSuchElement(_))
    )
}

/// Turns a stale-element failure into `Ok(None)` so the read can be polled again
pub fn recover_stale<T>(result: E2eResult<Option<T>>) -> E2eResult<Option<T>> {
    match result {
        Err(e) if is_stale(&e) => {
            debug!("element went stale: {}", e);
            Ok(None)
        }
        other => other,
    }
}

/// Polls `read` until it yields a value, retrying reads that hit a
/// redrawn DOM. Any other error ends the poll.
pub async fn retry_stale<T, F, Fut>(poller: PollUntil, what: &str, mut read: F) -> E2eResult<T>
where
    T: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let value = poller
        .until(what, || {
            let next = read();
            async move { recover_stale(next.await) }
        })
        .await?;
    value.ok_or_else(|| E2eError::ElementNotFound(what.to_string()))
}

/// A strategy/value pair naming an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Locator::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    fn by(&self) -> By {
        match self {
            Locator::Id(v) => By::Id(v.clone()),
            Locator::Css(v) => By::Css(v.clone()),
            Locator::XPath(v) => By::XPath(v.clone()),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Id(v) => write!(f, "id={}", v),
            Locator::Css(v) => write!(f, "css={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
        }
    }
}

/// A locator bound to a session, resolved anew on every access
#[derive(Clone)]
pub struct Located {
    driver: WebDriver,
    locator: Locator,
}

impl Located {
    pub fn new(driver: &WebDriver, locator: Locator) -> Self {
        Self {
            driver: driver.clone(),
            locator,
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// The element, or `ElementNotFound`
    pub async fn find(&self) -> E2eResult<WebElement> {
        self.try_find()
            .await?
            .ok_or_else(|| E2eError::ElementNotFound(self.locator.to_string()))
    }

    /// The element, or `None` when nothing matches
    pub async fn try_find(&self) -> E2eResult<Option<WebElement>> {
        match self.driver.find(self.locator.by()).await {
            Ok(el) => Ok(Some(el)),
            Err(WebDriverError::NoSuchElement(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_all(&self) -> E2eResult<Vec<WebElement>> {
        match self.driver.find_all(self.locator.by()).await {
            Ok(els) => Ok(els),
            Err(WebDriverError::NoSuchElement(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn click(&self) -> E2eResult<()> {
        debug!("click {}", self.locator);
        self.find().await?.click().await?;
        Ok(())
    }

    /// Replace the content of an input
    pub async fn fill(&self, value: &str) -> E2eResult<()> {
        let el = self.find().await?;
        el.clear().await?;
        el.send_keys(value).await?;
        Ok(())
    }

    /// Current value of an input
    pub async fn value(&self) -> E2eResult<Option<String>> {
        Ok(self.find().await?.prop("value").await?)
    }

    pub async fn text(&self) -> E2eResult<String> {
        Ok(self.find().await?.text().await?)
    }

    pub async fn rect(&self) -> E2eResult<Rect> {
        rect(&self.find().await?).await
    }

    pub async fn is_displayed(&self) -> E2eResult<bool> {
        Ok(self.find().await?.is_displayed().await?)
    }
}

#[async_trait]
impl Probe for Located {
    async fn displayed(&self) -> E2eResult<bool> {
        match self.try_find().await? {
            Some(el) => Probe::displayed(&el).await,
            None => Ok(false),
        }
    }

    async fn text(&self) -> E2eResult<Option<String>> {
        match self.try_find().await? {
            Some(el) => Probe::text(&el).await,
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        self.locator.to_string()
    }
}

#[async_trait]
impl Probe for WebElement {
    async fn displayed(&self) -> E2eResult<bool> {
        match self.is_displayed().await {
            Ok(shown) => Ok(shown),
            Err(WebDriverError::StaleElementReference(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn text(&self) -> E2eResult<Option<String>> {
        match WebElement::text(self).await {
            Ok(text) => Ok(Some(text)),
            Err(WebDriverError::StaleElementReference(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("element {:?}", self.element_id())
    }
}

/// Position and size of an element
pub async fn rect(el: &WebElement) -> E2eResult<Rect> {
    let r = el.rect().await?;
    Ok(Rect::new(r.x, r.y, r.width, r.height))
}

/// Press on `el`, move by the offset and release
pub async fn drag_by_offset(driver: &WebDriver, el: &WebElement, dx: i64, dy: i64) -> E2eResult<()> {
    debug!("drag {:?} by ({}, {})", el.element_id(), dx, dy);
    driver
        .action_chain()
        .drag_and_drop_element_by_offset(el, dx, dy)
        .perform()
        .await?;
    Ok(())
}

/// Click `el`, then drag it by the offset
pub async fn click_and_drag(driver: &WebDriver, el: &WebElement, dx: i64, dy: i64) -> E2eResult<()> {
    driver
        .action_chain()
        .click_element(el)
        .drag_and_drop_element_by_offset(el, dx, dy)
        .perform()
        .await?;
    Ok(())
}

/// Hover `body` so its resize handle is active, then drag `handle`
pub async fn resize_by_offset(
    driver: &WebDriver,
    body: &WebElement,
    handle: &WebElement,
    dx: i64,
    dy: i64,
) -> E2eResult<()> {
    driver
        .action_chain()
        .move_to_element_center(body)
        .drag_and_drop_element_by_offset(handle, dx, dy)
        .perform()
        .await?;
    Ok(())
}
