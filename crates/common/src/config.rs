//! Harness configuration
//!
//! Defaults reproduce the fixed addresses the GUI test bench has always
//! used; a TOML file and CLI flags can override any of them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::geometry::CenterFormula;

/// Top-level harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// GUI web application
    pub gui: Endpoint,

    /// Controller REST API
    pub rest: Endpoint,

    /// OpenFlow controller the emulated switches connect to
    pub controller: Endpoint,

    /// Emulator control process (XML-RPC)
    pub emulator: Endpoint,

    /// Browser / WebDriver settings
    pub browser: BrowserConfig,

    /// Polling settings
    pub poll: PollConfig,

    /// Layout assertions
    pub layout: LayoutConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            gui: Endpoint::new("127.0.0.1", 8000),
            rest: Endpoint::new("localhost", 8080),
            controller: Endpoint::new("127.0.0.1", 6633),
            emulator: Endpoint::new("127.0.0.1", 18000),
            browser: BrowserConfig::default(),
            poll: PollConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Parse a configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded harness config from {}", path.display());
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in [
            ("gui", &self.gui),
            ("rest", &self.rest),
            ("controller", &self.controller),
            ("emulator", &self.emulator),
        ] {
            if endpoint.host.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("{} host is empty", name)));
            }
        }
        if self.poll.interval_ms == 0 {
            return Err(Error::InvalidConfig("poll interval must be non-zero".to_string()));
        }
        if self.browser.webdriver_url.trim().is_empty() {
            return Err(Error::InvalidConfig("webdriver url is empty".to_string()));
        }
        if !(self.layout.distance_tolerance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "distance tolerance must be non-negative, got {}",
                self.layout.distance_tolerance
            )));
        }
        Ok(())
    }
}

/// A host/port pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `http://host:port`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

impl std::str::FromStr for BrowserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" => Ok(BrowserKind::Firefox),
            other => Err(Error::InvalidConfig(format!("unknown browser: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver server (chromedriver, geckodriver, selenium)
    pub webdriver_url: String,
    pub kind: BrowserKind,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Implicit wait applied to element lookups
    pub implicit_wait_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            kind: BrowserKind::Chrome,
            headless: true,
            window_width: 900,
            window_height: 900,
            implicit_wait_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Sleep between two attempts
    pub interval_ms: u64,
    /// Attempt budget of the wait helpers when the caller gives none
    pub default_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            default_attempts: 30,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub center_formula: CenterFormula,
    /// Pixels two layout distances may differ by and still count as equal
    pub distance_tolerance: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            center_formula: CenterFormula::Midpoint,
            distance_tolerance: 0.5,
        }
    }
}
