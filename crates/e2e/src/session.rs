//! Browser session shared by all scenarios of a run
//!
//! One [`GuiSession`] owns the WebDriver connection, the region handles,
//! the REST client and, once a scenario asks for it, the emulator.

use std::sync::Arc;
use thirtyfour::prelude::*;
use tracing::{debug, info, warn};

use topogui_common::{Endpoint, HarnessConfig};

use crate::browser;
use crate::elements::{Dialog, FlowList, LinkList, Menu, Region, Topology};
use crate::emulator::{EmulatorControl, XmlRpcEmulator};
use crate::error::E2eResult;
use crate::poll::PollUntil;
use crate::rest::RestClient;
use crate::waits::DriverUtil;

/// Attempts granted to the controller to forget all links after the
/// emulator stops
pub const TEARDOWN_ATTEMPTS: u32 = 20;

pub struct GuiSession {
    config: HarnessConfig,
    driver: WebDriver,
    rest: RestClient,
    emulator: Option<Arc<dyn EmulatorControl>>,
    pub util: DriverUtil,
    pub menu: Menu,
    pub dialog: Dialog,
    pub topology: Topology,
    pub link_list: LinkList,
    pub flow_list: FlowList,
}

impl GuiSession {
    /// Opens the browser; no page is loaded until [`GuiSession::set_up`]
    pub async fn start(config: HarnessConfig) -> E2eResult<Self> {
        config.validate()?;
        let driver = browser::connect(&config.browser).await?;
        let rest = RestClient::new(config.rest.base_url())?;

        Ok(Self {
            util: DriverUtil::new(&config.poll),
            menu: Menu::new(&driver),
            dialog: Dialog::new(&driver),
            topology: Topology::new(&driver),
            link_list: LinkList::new(&driver),
            flow_list: FlowList::new(&driver),
            emulator: None,
            rest,
            driver,
            config,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn driver(&self) -> &WebDriver {
        &self.driver
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Loads the GUI and waits for the connection dialog it opens with
    pub async fn set_up(&mut self) -> E2eResult<()> {
        let url = format!("{}/", self.config.gui.base_url());
        debug!("Loading {}", url);
        self.driver.goto(url.as_str()).await?;
        self.util.wait_for_visible(&self.dialog.body()).await?;
        Ok(())
    }

    /// Stops the emulator if a scenario used one and waits until the
    /// controller has dropped every link
    pub async fn tear_down(&mut self) -> E2eResult<()> {
        let Some(emulator) = self.emulator.take() else {
            return Ok(());
        };
        let poller = self.util.with_timeout(TEARDOWN_ATTEMPTS).poller();
        drain_emulator(emulator.as_ref(), &self.rest, poller).await
    }

    /// The emulator, attached to the controller on first use
    pub async fn emulator(&mut self) -> E2eResult<Arc<dyn EmulatorControl>> {
        if let Some(emulator) = &self.emulator {
            return Ok(Arc::clone(emulator));
        }

        let url = self.config.emulator.base_url();
        info!("Attaching emulator at {}", url);
        let emulator = Arc::new(XmlRpcEmulator::new(url)?);
        attach_emulator(&mut self.emulator, emulator, &self.config.controller).await
    }

    /// Connects the GUI to the REST API through the dialog
    pub async fn rest_connect(&self) -> E2eResult<()> {
        let body = self.dialog.body();
        if !DriverUtil::is_displayed(&body).await? {
            self.menu.dialog().click().await?;
            self.util.wait_for_visible(&body).await?;
        }

        let rest = &self.config.rest;
        info!("Connecting GUI to REST API at {}", rest);
        self.dialog.host().fill(&rest.host).await?;
        self.dialog.port().fill(&rest.port.to_string()).await?;
        self.dialog.launch().click().await?;

        self.util
            .wait_for_text(&self.topology.body(), "Connected")
            .await?;
        Ok(())
    }

    /// Ends the browser session
    pub async fn quit(self) -> E2eResult<()> {
        if let Some(emulator) = &self.emulator {
            if let Err(e) = emulator.stop().await {
                warn!("Stopping emulator on quit failed: {}", e);
            }
        }
        self.driver.quit().await?;
        Ok(())
    }
}

/// Stores `emulator` in `slot`, then points it at `controller`.
///
/// The client stays in `slot` when `add_controller` fails, so tear-down
/// still stops whatever it started.
pub async fn attach_emulator(
    slot: &mut Option<Arc<dyn EmulatorControl>>,
    emulator: Arc<dyn EmulatorControl>,
    controller: &Endpoint,
) -> E2eResult<Arc<dyn EmulatorControl>> {
    *slot = Some(Arc::clone(&emulator));
    emulator.add_controller(&controller.host, controller.port).await?;
    Ok(emulator)
}

/// Stops `emulator`, then polls the REST API until no link remains.
///
/// An unreachable REST API counts as cleared.
pub async fn drain_emulator(
    emulator: &dyn EmulatorControl,
    rest: &RestClient,
    poller: PollUntil,
) -> E2eResult<()> {
    emulator.stop().await?;
    poller
        .until("links cleared from REST topology", || rest.links_cleared())
        .await?;
    Ok(())
}
