//! Bounded retries with skip-code classification
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Status code in the skip set | Stop at once → `SkippedStatus` |
//! | Any other failure, attempts left | Log, run the exception hook, retry |
//! | Any other failure, no attempts left | `RetriesExhausted` with the last error |
//!
//! There is no backoff here: attempt timing is owned by the request spacer.

use crate::config::ScraperConfig;
use crate::operations::OperationHooks;
use crate::ScrapeError;
use std::collections::BTreeSet;
use std::future::Future;

/// Retry policy shared by every fetch of a run
#[derive(Debug, Clone)]
pub struct RetryController {
    max_retries: u32,
    skip_codes: BTreeSet<u16>,
}

impl RetryController {
    pub fn new(max_retries: u32, skip_codes: BTreeSet<u16>) -> Self {
        Self {
            max_retries,
            skip_codes,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.max_retries, config.skip_codes())
    }

    /// Overall number of attempts: the first one plus `max_retries`
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn skip_codes(&self) -> &BTreeSet<u16> {
        &self.skip_codes
    }

    /// Returns the code if this failure must not be retried
    pub fn skip_code(&self, error: &ScrapeError) -> Option<u16> {
        error
            .status_code()
            .filter(|code| self.skip_codes.contains(code))
    }

    /// Runs `factory` until it succeeds, hits a skip code, or runs out of attempts
    ///
    /// # Arguments
    ///
    /// * `factory` - Performs one attempt
    /// * `href` - Address the attempts are about, for logging and errors
    /// * `hooks` - Receives each failure that is about to be retried
    pub async fn attempt<F, Fut, T>(
        &self,
        mut factory: F,
        href: &str,
        hooks: Option<&dyn OperationHooks>,
    ) -> Result<T, ScrapeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempts = 0;

        loop {
            attempts += 1;

            let error = match factory().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if let Some(code) = self.skip_code(&error) {
                tracing::warn!("Skipping error {} for {}", code, href);
                return Err(ScrapeError::SkippedStatus {
                    url: href.to_string(),
                    code,
                    attempts,
                });
            }

            if attempts >= max_attempts {
                tracing::error!(
                    "Giving up on {} after {} attempts: {}",
                    href,
                    attempts,
                    error
                );
                return Err(ScrapeError::RetriesExhausted {
                    url: href.to_string(),
                    attempts,
                    source: Box::new(error),
                });
            }

            tracing::warn!("Retrying failed request...error: {}, href: {}", error, href);
            tracing::debug!("Retries {}", attempts);

            if let Some(hooks) = hooks {
                hooks
                    .exception(&error)
                    .await
                    .map_err(|e| ScrapeError::hook("exception", e))?;
            }
        }
    }
}
