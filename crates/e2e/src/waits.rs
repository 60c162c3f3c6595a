//! Visibility and text waits built on [`PollUntil`]

use std::time::Duration;
use async_trait::async_trait;
use regex::Regex;

use topogui_common::config::PollConfig;

use crate::error::E2eResult;
use crate::poll::PollUntil;

/// Something whose visibility and text can be sampled.
///
/// A missing element is reported as hidden with no text rather than as an
/// error.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn displayed(&self) -> E2eResult<bool>;

    /// Rendered text; `None` when the element is gone
    async fn text(&self) -> E2eResult<Option<String>>;

    fn describe(&self) -> String {
        "element".to_string()
    }
}

/// Wait helpers with a shared attempt budget and interval
#[derive(Debug, Clone, Copy)]
pub struct DriverUtil {
    attempts: u32,
    interval: Duration,
}

impl Default for DriverUtil {
    fn default() -> Self {
        Self::new(&PollConfig::default())
    }
}

impl DriverUtil {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            attempts: config.default_attempts,
            interval: config.interval(),
        }
    }

    /// Same helpers with a different attempt budget
    pub fn with_timeout(&self, attempts: u32) -> Self {
        Self { attempts, ..*self }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A poller with this budget and interval
    pub fn poller(&self) -> PollUntil {
        PollUntil::new(self.attempts).interval(self.interval)
    }

    pub async fn is_displayed<P: Probe + ?Sized>(el: &P) -> E2eResult<bool> {
        el.displayed().await
    }

    pub async fn is_hidden<P: Probe + ?Sized>(el: &P) -> E2eResult<bool> {
        Ok(!Self::is_displayed(el).await?)
    }

    /// `pattern` occurs somewhere in the element's text
    pub async fn has_text<P: Probe + ?Sized>(el: &P, pattern: &Regex) -> E2eResult<bool> {
        Ok(el
            .text()
            .await?
            .map(|text| pattern.is_match(&text))
            .unwrap_or(false))
    }

    pub async fn has_not_text<P: Probe + ?Sized>(el: &P, pattern: &Regex) -> E2eResult<bool> {
        Ok(!Self::has_text(el, pattern).await?)
    }

    pub async fn wait_for_visible<P: Probe + ?Sized>(&self, el: &P) -> E2eResult<bool> {
        let what = format!("{} visible", el.describe());
        self.poller()
            .until(&what, || Self::is_displayed(el))
            .await
    }

    pub async fn wait_for_hidden<P: Probe + ?Sized>(&self, el: &P) -> E2eResult<bool> {
        let what = format!("{} hidden", el.describe());
        self.poller().until(&what, || Self::is_hidden(el)).await
    }

    pub async fn wait_for_text<P: Probe + ?Sized>(&self, el: &P, pattern: &str) -> E2eResult<bool> {
        let re = Regex::new(pattern)?;
        let what = format!("text '{}' in {}", pattern, el.describe());
        self.poller().until(&what, || Self::has_text(el, &re)).await
    }

    pub async fn wait_for_text_absent<P: Probe + ?Sized>(
        &self,
        el: &P,
        pattern: &str,
    ) -> E2eResult<bool> {
        let re = Regex::new(pattern)?;
        let what = format!("text '{}' gone from {}", pattern, el.describe());
        self.poller()
            .until(&what, || Self::has_not_text(el, &re))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Element whose state flips after a number of samples
    struct FakeElement {
        samples: AtomicU32,
        flip_after: u32,
        before: Option<(bool, &'static str)>,
        after: Option<(bool, &'static str)>,
        seen: Mutex<Vec<u32>>,
    }

    impl FakeElement {
        fn new(
            flip_after: u32,
            before: Option<(bool, &'static str)>,
            after: Option<(bool, &'static str)>,
        ) -> Self {
            Self {
                samples: AtomicU32::new(0),
                flip_after,
                before,
                after,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn state(&self) -> Option<(bool, &'static str)> {
            let n = self.samples.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen.lock().push(n);
            if n > self.flip_after {
                self.after
            } else {
                self.before
            }
        }

        fn samples(&self) -> u32 {
            self.samples.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Probe for FakeElement {
        async fn displayed(&self) -> E2eResult<bool> {
            Ok(self.state().map(|(shown, _)| shown).unwrap_or(false))
        }

        async fn text(&self) -> E2eResult<Option<String>> {
            Ok(self.state().map(|(_, text)| text.to_string()))
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    fn util(attempts: u32) -> DriverUtil {
        DriverUtil::default().with_timeout(attempts)
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_visible_after_render() {
        let el = FakeElement::new(2, Some((false, "")), Some((true, "")));
        let start = Instant::now();
        assert!(util(5).wait_for_visible(&el).await.unwrap());
        assert_eq!(el.samples(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_element_counts_as_hidden() {
        let el = FakeElement::new(0, None, None);
        assert!(util(3).wait_for_hidden(&el).await.unwrap());
        assert_eq!(el.samples(), 1);

        let el = FakeElement::new(0, None, None);
        let err = util(3).wait_for_visible(&el).await.unwrap_err();
        assert!(matches!(err, E2eError::Timeout { attempts: 3, .. }));
        assert_eq!(el.samples(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_and_hidden_are_negations() {
        for state in [None, Some((false, "")), Some((true, ""))] {
            let a = FakeElement::new(u32::MAX, state, state);
            let b = FakeElement::new(u32::MAX, state, state);
            let visible = util(1).wait_for_visible(&a).await.is_ok();
            let hidden = util(1).wait_for_hidden(&b).await.is_ok();
            assert_ne!(visible, hidden, "state {:?}", state);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_text_is_search() {
        let el = FakeElement::new(
            1,
            Some((true, "Disconnected")),
            Some((true, "status: Connected to localhost:8080")),
        );
        assert!(util(30).wait_for_text(&el, "Connected").await.unwrap());
        assert_eq!(el.samples(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_text_absent() {
        let el = FakeElement::new(3, Some((true, "dpid: 0x4")), Some((true, "dpid: 0x1")));
        assert!(util(10)
            .wait_for_text_absent(&el, "dpid: 0x4")
            .await
            .unwrap());
        assert_eq!(*el.seen.lock(), vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_timeout_names_pattern() {
        let el = FakeElement::new(u32::MAX, Some((true, "s2-eth1")), None);
        let err = util(2).wait_for_text(&el, "s4-eth1").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Timeout(2) waiting for text 's4-eth1' in fake (last: false)"
        );
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let el = FakeElement::new(0, Some((true, "x")), None);
        let err = util(2).wait_for_text(&el, "[").await.unwrap_err();
        assert!(matches!(err, E2eError::Pattern(_)));
        assert_eq!(el.samples(), 0);
    }
}
