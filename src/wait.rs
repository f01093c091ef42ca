//! Bounded polling waits
//!
//! Every wait in the suite polls at a fixed interval until its condition holds or the bound
//! elapses. Lookup failures that are expected while a page is still rendering
//! (`ElementNotFound`, `StaleElement`) count as "not yet"; any other error ends the wait.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::config::Config;
use crate::{Error, Result};

/// Default bound for page-level waits
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wait {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for Wait {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

impl Wait {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.wait_timeout(), config.poll_interval())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Poll `probe` until it yields `Some`
    ///
    /// `what` names the condition in the timeout error.
    pub async fn until<T, F, Fut>(&self, what: &str, mut probe: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut last_error: Option<Error> = None;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match probe().await {
                Ok(Some(value)) => {
                    debug!("{} after {} attempt(s)", what, attempts);
                    return Ok(value);
                }
                Ok(None) => last_error = None,
                Err(e) if e.is_transient_lookup() => last_error = Some(e),
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(Error::timeout(match last_error {
                    Some(e) => format!("{} within {:?} (last error: {})", what, self.timeout, e),
                    None => format!("{} within {:?}", what, self.timeout),
                }));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Poll `sample` until two consecutive samples are equal
    ///
    /// A `None` sample means the page is not in a comparable state yet and resets the
    /// comparison.
    pub async fn until_settled<T, F, Fut>(&self, what: &str, mut sample: F) -> Result<T>
    where
        T: PartialEq + Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut previous: Option<T> = None;
        let mut last_error: Option<Error> = None;

        loop {
            match sample().await {
                Ok(Some(current)) => {
                    if previous.as_ref() == Some(&current) {
                        debug!("{} settled at {:?}", what, current);
                        return Ok(current);
                    }
                    previous = Some(current);
                    last_error = None;
                }
                Ok(None) => previous = None,
                Err(e) if e.is_transient_lookup() => {
                    previous = None;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(Error::timeout(match (previous, last_error) {
                    (_, Some(e)) => format!("{} to settle within {:?} (last error: {})", what, self.timeout, e),
                    (Some(last), None) => format!("{} to settle within {:?} (last sample: {:?})", what, self.timeout, last),
                    (None, None) => format!("{} to settle within {:?}", what, self.timeout),
                }));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick() -> Wait {
        Wait::new(Duration::from_millis(200), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_until_returns_first_value() {
        let calls = AtomicU32::new(0);
        let value = quick()
            .until("counter reaches 3", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok((n >= 3).then_some(n))
            })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_until_retries_transient_lookups() {
        let calls = AtomicU32::new(0);
        let value = quick()
            .until("element appears", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::element_not_found("#search-q"))
                } else {
                    Ok(Some("ready"))
                }
            })
            .await
            .unwrap();
        assert_eq!(value, "ready");
    }

    #[tokio::test]
    async fn test_until_times_out() {
        let err = quick()
            .until("never", || async { Ok::<Option<()>, Error>(None) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(msg) if msg.starts_with("never within")));
    }

    #[tokio::test]
    async fn test_until_stops_on_hard_error() {
        let calls = AtomicU32::new(0);
        let err = quick()
            .until("script", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Option<()>, _>(Error::script_execution_failed("boom"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ScriptExecutionFailed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_until_settled_needs_two_equal_samples() {
        let samples = [150.0, 220.0, 300.0, 300.0, 300.0];
        let calls = AtomicU32::new(0);
        let width = quick()
            .until_settled("width", || async {
                let i = calls.fetch_add(1, Ordering::SeqCst) as usize;
                Ok(Some(samples[i.min(samples.len() - 1)]))
            })
            .await
            .unwrap();
        assert_eq!(width, 300.0);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
