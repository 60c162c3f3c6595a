//! TopoGUI E2E Test Framework
//!
//! This crate drives the topology GUI through WebDriver and checks that it
//! reflects what the controller and the network emulator report:
//! - Opens one browser session per run and shares it across scenarios
//! - Mutates the emulated network over XML-RPC
//! - Installs flows through the controller REST API
//! - Polls the rendered page until it catches up, with a bounded budget
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    └── run_scenario(scenario) -> TestResult                 │
//! │          set_up -> scenario(&mut GuiSession) -> tear_down   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  GuiSession                                                 │
//! │    ├── WebDriver + regions (menu, dialog, topology,         │
//! │    │   link list, flow list)                                │
//! │    ├── DriverUtil (PollUntil waits)                         │
//! │    ├── RestClient (controller REST API)                     │
//! │    └── EmulatorControl (XML-RPC, attached on demand)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod elements;
pub mod emulator;
pub mod error;
pub mod poll;
pub mod rest;
pub mod runner;
pub mod scenarios;
pub mod session;
pub mod waits;

pub use emulator::{EmulatorControl, XmlRpcEmulator};
pub use error::{E2eError, E2eResult};
pub use poll::{wait_for_true, PollUntil, Truthy};
pub use rest::RestClient;
pub use runner::{RunnerConfig, TestResult, TestRunner, TestSuiteResult};
pub use session::GuiSession;
pub use waits::{DriverUtil, Probe};
