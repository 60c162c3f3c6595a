//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// The poll budget ran out without a truthy observation
    #[error("Timeout({attempts}) waiting for {what} (last: {last})")]
    Timeout {
        attempts: u32,
        what: String,
        last: String,
    },

    #[error("REST {method} {path} failed: code {status} reason {reason}: {body}")]
    Rest {
        method: String,
        path: String,
        status: u16,
        reason: String,
        headers: Vec<(String, String)>,
        body: String,
    },

    #[error("Emulator call {method} failed: {reason}")]
    Emulator { method: String, reason: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("WebDriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] topogui_common::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Fails with `AssertionFailed` unless `cond` holds
pub fn ensure(cond: bool, message: impl FnOnce() -> String) -> E2eResult<()> {
    if cond {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message()))
    }
}

/// Fails with `AssertionFailed` unless `actual == expected`
pub fn ensure_eq<T>(actual: T, expected: T, context: &str) -> E2eResult<()>
where
    T: PartialEq + std::fmt::Debug,
{
    ensure(actual == expected, || {
        format!("{}: {:?} != {:?}", context, actual, expected)
    })
}
