//! Locators for the regions of the topology GUI
//!
//! Each region is a panel of the page (menu, connection dialog, topology
//! view, link list, flow list). Accessors return [`Located`] handles that
//! resolve against the live DOM every time they are used.

use std::future::Future;
use std::time::Duration;
use parking_lot::Mutex;
use thirtyfour::prelude::*;
use thirtyfour::ElementId;
use tracing::debug;

use topogui_common::types::{
    parse_switch_element_id, switch_element_id, switch_label, Dpid, FlowRowText, LinkRowText,
};

use crate::browser::{self, Located, Locator};
use crate::error::{E2eError, E2eResult};
use crate::poll::{PollUntil, Truthy};

/// A panel of the GUI with a body and a resize handle
pub trait Region {
    fn name(&self) -> &'static str;
    fn body(&self) -> Located;
    fn resize_handle(&self) -> Located;
}

/// A region that can be moved by its title bar
pub trait Draggable: Region {
    fn titlebar(&self) -> Located;
}

/// A region with its own close button
pub trait Closable: Region {
    fn close(&self) -> Located;
}

const ROW_CSS: &str = "table > tbody > tr.content-table-item";

pub struct Menu {
    driver: WebDriver,
}

impl Menu {
    pub fn new(driver: &WebDriver) -> Self {
        Self {
            driver: driver.clone(),
        }
    }

    fn at(&self, locator: Locator) -> Located {
        Located::new(&self.driver, locator)
    }

    /// Opens the connection dialog
    pub fn dialog(&self) -> Located {
        self.at(Locator::id("jquery-ui-dialog-opener"))
    }

    /// Re-runs the automatic topology layout
    pub fn redesign(&self) -> Located {
        self.at(Locator::id("menu-redesign"))
    }

    pub fn link_list(&self) -> Located {
        self.at(Locator::id("menu-link-status"))
    }

    pub fn flow_list(&self) -> Located {
        self.at(Locator::id("menu-flow-entries"))
    }
}

impl Region for Menu {
    fn name(&self) -> &'static str {
        "Menu"
    }

    fn body(&self) -> Located {
        self.at(Locator::id("menu"))
    }

    fn resize_handle(&self) -> Located {
        self.at(Locator::xpath("//div[@id='menu']/div[6]"))
    }
}

impl Draggable for Menu {
    fn titlebar(&self) -> Located {
        self.at(Locator::css("#menu > div.content-title"))
    }
}

/// The REST connection dialog shown on page load
pub struct Dialog {
    driver: WebDriver,
}

impl Dialog {
    pub fn new(driver: &WebDriver) -> Self {
        Self {
            driver: driver.clone(),
        }
    }

    fn at(&self, locator: Locator) -> Located {
        Located::new(&self.driver, locator)
    }

    pub fn host(&self) -> Located {
        self.at(Locator::id("jquery-ui-dialog-form-host"))
    }

    pub fn port(&self) -> Located {
        self.at(Locator::id("jquery-ui-dialog-form-port"))
    }

    pub fn launch(&self) -> Located {
        self.at(Locator::xpath("//button[@type='button']"))
    }

    pub fn cancel(&self) -> Located {
        self.at(Locator::xpath("(//button[@type='button'])[2]"))
    }
}

impl Region for Dialog {
    fn name(&self) -> &'static str {
        "Dialog"
    }

    fn body(&self) -> Located {
        self.at(Locator::id("jquery-ui-dialog"))
    }

    fn resize_handle(&self) -> Located {
        self.at(Locator::xpath("//div[7]"))
    }
}

impl Closable for Dialog {
    fn close(&self) -> Located {
        self.at(Locator::css("span.ui-icon.ui-icon-closethick"))
    }
}

/// The topology drawing
pub struct Topology {
    driver: WebDriver,
    /// Width of a switch node before it is selected
    unselected_width: Mutex<Option<f64>>,
}

impl Topology {
    pub fn new(driver: &WebDriver) -> Self {
        Self {
            driver: driver.clone(),
            unselected_width: Mutex::new(None),
        }
    }

    fn at(&self, locator: Locator) -> Located {
        Located::new(&self.driver, locator)
    }

    pub fn switches(&self) -> Located {
        self.at(Locator::css("#topology > div.content-body > div.switch"))
    }

    /// The node of switch `dpid`; fails when it is not drawn.
    ///
    /// The first switch looked up fixes the reference width used by
    /// [`Topology::is_selected`], so call this before selecting anything.
    pub async fn switch(&self, dpid: Dpid) -> E2eResult<WebElement> {
        let el = self
            .at(Locator::id(switch_element_id(dpid)))
            .try_find()
            .await?
            .ok_or_else(|| E2eError::ElementNotFound(format!("switch dpid={}", dpid)))?;

        if self.unselected_width.lock().is_none() {
            let w = browser::rect(&el).await?.width;
            debug!("unselected switch width {}", w);
            self.unselected_width.lock().get_or_insert(w);
        }
        Ok(el)
    }

    /// Selection draws a border, which makes the node wider
    pub async fn is_selected(&self, el: &WebElement) -> E2eResult<bool> {
        let reference = *self.unselected_width.lock();
        let reference = reference.ok_or_else(|| {
            E2eError::AssertionFailed("no unselected switch width recorded".to_string())
        })?;
        Ok(browser::rect(el).await?.width > reference)
    }

    pub async fn dpid_of(&self, el: &WebElement) -> E2eResult<Dpid> {
        let id = el.attr("id").await?.unwrap_or_default();
        parse_switch_element_id(&id)
            .ok_or_else(|| E2eError::AssertionFailed(format!("not a switch node: {:?}", id)))
    }

    pub fn switch_label(&self, dpid: Dpid) -> String {
        switch_label(dpid)
    }
}

impl Region for Topology {
    fn name(&self) -> &'static str {
        "Topology"
    }

    fn body(&self) -> Located {
        self.at(Locator::id("topology"))
    }

    fn resize_handle(&self) -> Located {
        self.at(Locator::xpath("//div[@id='topology']/div[5]"))
    }
}

impl Draggable for Topology {
    fn titlebar(&self) -> Located {
        self.at(Locator::css("#topology > div.content-title"))
    }
}

/// One row of the link list and its cells
#[derive(Debug, Clone)]
pub struct LinkRow {
    pub row: WebElement,
    pub no: WebElement,
    pub name: WebElement,
    pub peer: WebElement,
}

impl LinkRow {
    async fn locate(driver: &WebDriver, row: WebElement) -> E2eResult<Self> {
        let id = row.attr("id").await?.unwrap_or_default();
        let cell = |class: &str| Located::new(driver, Locator::css(format!("#{} > td.{}", id, class)));
        let no = cell("port-no").find().await?;
        let name = cell("port-name").find().await?;
        let peer = cell("port-peer").find().await?;
        Ok(Self { row, no, name, peer })
    }

    pub async fn text(&self) -> E2eResult<LinkRowText> {
        Ok(LinkRowText {
            no: self.no.text().await?,
            name: self.name.text().await?,
            peer: self.peer.text().await?,
        })
    }
}

/// Ports of the selected switch and their peers
pub struct LinkList {
    driver: WebDriver,
}

impl LinkList {
    pub fn new(driver: &WebDriver) -> Self {
        Self {
            driver: driver.clone(),
        }
    }

    fn at(&self, locator: Locator) -> Located {
        Located::new(&self.driver, locator)
    }

    pub fn scrollbar_x(&self) -> Located {
        self.at(Locator::css("#link-list-body > div.ps-scrollbar-x"))
    }

    pub fn scrollbar_y(&self) -> Located {
        self.at(Locator::css("#link-list-body > div.ps-scrollbar-y"))
    }

    fn row_elements(&self) -> Located {
        self.at(Locator::css(format!("#link-list > div.content-body > {}", ROW_CSS)))
    }

    pub async fn row_count(&self) -> E2eResult<usize> {
        Ok(self.row_elements().find_all().await?.len())
    }

    pub async fn rows(&self) -> E2eResult<Vec<LinkRow>> {
        let mut rows = Vec::new();
        for row in self.row_elements().find_all().await? {
            rows.push(LinkRow::locate(&self.driver, row).await?);
        }
        Ok(rows)
    }

    pub async fn row_texts(&self) -> E2eResult<Vec<LinkRowText>> {
        let mut texts = Vec::new();
        for row in self.rows().await? {
            texts.push(row.text().await?);
        }
        Ok(texts)
    }
}

impl Region for LinkList {
    fn name(&self) -> &'static str {
        "LinkList"
    }

    fn body(&self) -> Located {
        self.at(Locator::id("link-list"))
    }

    fn resize_handle(&self) -> Located {
        self.at(Locator::xpath("//div[@id='link-list']/div[6]"))
    }
}

impl Draggable for LinkList {
    fn titlebar(&self) -> Located {
        self.at(Locator::css("#link-list > div.content-title"))
    }
}

impl Closable for LinkList {
    fn close(&self) -> Located {
        self.at(Locator::xpath("//div[@id='link-list']/div/div[2]"))
    }
}

/// Flow entries of the selected switch
pub struct FlowList {
    driver: WebDriver,
}

impl FlowList {
    pub fn new(driver: &WebDriver) -> Self {
        Self {
            driver: driver.clone(),
        }
    }

    fn at(&self, locator: Locator) -> Located {
        Located::new(&self.driver, locator)
    }

    pub fn scrollbar_x(&self) -> Located {
        self.at(Locator::css("#flow-list-body > div.ps-scrollbar-x"))
    }

    pub fn scrollbar_y(&self) -> Located {
        self.at(Locator::css("#flow-list-body > div.ps-scrollbar-y"))
    }

    fn row_elements(&self) -> Located {
        self.at(Locator::css(format!("#flow-list > div.content-body > {}", ROW_CSS)))
    }

    pub async fn rows(&self) -> E2eResult<Vec<WebElement>> {
        self.row_elements().find_all().await
    }

    async fn read_row(&self, index: usize) -> E2eResult<Option<FlowRowText>> {
        let rows = self.rows().await?;
        let Some(row) = rows.get(index) else {
            return Ok(None);
        };
        let id = row.attr("id").await?.unwrap_or_default();
        let values = self
            .at(Locator::css(format!("#{} > td > div > span.flow-item-value", id)))
            .find_all()
            .await?;
        let [stats, rules, actions] = values.as_slice() else {
            return Ok(None);
        };
        Ok(Some(FlowRowText {
            stats: stats.text().await?,
            rules: rules.text().await?,
            actions: actions.text().await?,
        }))
    }

    /// Text of row `index`, retrying once if the list redraws under us
    pub async fn row_text(&self, index: usize, interval: Duration) -> E2eResult<FlowRowText> {
        let what = format!("flow-list row {}", index);
        let poller = PollUntil::new(2).interval(interval);
        browser::retry_stale(poller, &what, || self.read_row(index)).await
    }

    /// Brings row `index` into the visible part of the list
    pub async fn scroll_to_row(&self, index: usize) -> E2eResult<()> {
        let rows = self.rows().await?;
        let row = rows
            .get(index)
            .ok_or_else(|| E2eError::ElementNotFound(format!("flow-list row {}", index)))?;
        row.scroll_into_view().await?;
        Ok(())
    }

    async fn first_row_id(&self) -> E2eResult<Option<ElementId>> {
        Ok(self.rows().await?.first().map(|row| row.element_id()))
    }

    /// Waits until the list is redrawn.
    ///
    /// Returns `false` when the list is empty before and after the budget,
    /// which is what a switch without flows looks like.
    pub async fn wait_for_refreshed(&self, attempts: u32, interval: Duration) -> E2eResult<bool> {
        let old = self.first_row_id().await?;
        let poller = PollUntil::new(attempts).interval(interval);
        await_redraw(poller, old, || self.first_row_id()).await
    }
}

impl Region for FlowList {
    fn name(&self) -> &'static str {
        "FlowList"
    }

    fn body(&self) -> Located {
        self.at(Locator::id("flow-list"))
    }

    fn resize_handle(&self) -> Located {
        self.at(Locator::xpath("//div[@id='flow-list']/div[6]"))
    }
}

impl Draggable for FlowList {
    fn titlebar(&self) -> Located {
        self.at(Locator::css("#flow-list > div.content-title"))
    }
}

impl Closable for FlowList {
    fn close(&self) -> Located {
        self.at(Locator::xpath("//div[@id='flow-list']/div/div[2]"))
    }
}

/// State of the flow list compared with its first row before a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refresh {
    Redrawn,
    Empty,
    Pending,
}

impl Truthy for Refresh {
    fn is_truthy(&self) -> bool {
        *self == Refresh::Redrawn
    }
}

fn refresh_state<T: PartialEq>(old: Option<&T>, now: Option<&T>) -> Refresh {
    match (old, now) {
        (Some(_), None) => Refresh::Redrawn,
        (None, None) => Refresh::Empty,
        (old, Some(now)) if old != Some(now) => Refresh::Redrawn,
        _ => Refresh::Pending,
    }
}

/// Polls the first-row id until it differs from `old`. A list that was
/// empty and stays empty yields `false`; any other timeout is an error.
async fn await_redraw<T, F, Fut>(poller: PollUntil, old: Option<T>, mut first_row: F) -> E2eResult<bool>
where
    T: PartialEq,
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let polled = poller
        .until("flow-list redraw", || {
            let now = first_row();
            let old = old.as_ref();
            async move { now.await.map(|now| refresh_state(old, now.as_ref())) }
        })
        .await;

    match polled {
        Ok(_) => Ok(true),
        Err(E2eError::Timeout { .. }) if old.is_none() => {
            debug!("flow-list stayed empty");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
