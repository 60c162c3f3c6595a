//! TopoGUI Common Library
//!
//! Browser-independent pieces of the topology GUI harness: configuration,
//! flow/link types as the controller REST API reports them, layout math and
//! the comparison of rendered list text against backend state.

pub mod checks;
pub mod config;
pub mod error;
pub mod geometry;
pub mod types;

pub use config::{BrowserKind, Endpoint, HarnessConfig};
pub use error::{Error, Result};
pub use geometry::{CenterFormula, Point, Rect};
pub use types::*;

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
