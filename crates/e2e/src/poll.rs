//! Bounded fixed-interval polling
//!
//! The GUI reacts to controller events asynchronously, so nearly every
//! assertion is phrased as "this becomes true within N attempts".
//! [`PollUntil`] counts attempts rather than watching a clock: a budget of
//! N with a 1 s interval takes at most N sleeps plus N predicate calls.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Truthiness of a predicate result
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for &str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

macro_rules! truthy_nonzero {
    ($($t:ty),*) => {
        $(impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

truthy_nonzero!(u8, u16, u32, u64, usize);

/// A bounded retry of a predicate
#[derive(Debug, Clone, Copy)]
pub struct PollUntil {
    attempts: u32,
    interval: Duration,
}

impl PollUntil {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    /// Poll at most `attempts` times, one second apart
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Evaluates `predicate` until it yields a truthy value and returns it.
    ///
    /// `what` names the predicate and its bound arguments for the timeout
    /// diagnostic. An `Err` from the predicate stops polling at once.
    pub async fn until<T, F, Fut>(&self, what: &str, mut predicate: F) -> E2eResult<T>
    where
        T: Truthy + Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<T>>,
    {
        let mut last: Option<T> = None;

        for attempt in 1..=self.attempts {
            let value = predicate().await?;
            if value.is_truthy() {
                debug!("{} satisfied after {} attempt(s)", what, attempt);
                return Ok(value);
            }
            debug!("{}: attempt {}/{} -> {:?}", what, attempt, self.attempts, value);
            last = Some(value);
            sleep(self.interval).await;
        }

        warn!("Timeout({}) waiting for {}", self.attempts, what);
        Err(E2eError::Timeout {
            attempts: self.attempts,
            what: what.to_string(),
            last: last
                .map(|v| format!("{:?}", v))
                .unwrap_or_else(|| "not evaluated".to_string()),
        })
    }
}

/// `PollUntil::new(attempts).until(what, predicate)` with the default interval
pub async fn wait_for_true<T, F, Fut>(attempts: u32, what: &str, predicate: F) -> E2eResult<T>
where
    T: Truthy + Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    PollUntil::new(attempts).until(what, predicate).await
}
