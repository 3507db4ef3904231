use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{ClientError, TextGenerationClient};

/// Backoff policy for text-generation calls
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = fail fast)
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Timeout for each individual attempt
    pub call_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let base = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(retry as i32 - 1);
        let capped = base.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Wraps a client with a per-call timeout and bounded exponential backoff
pub struct RetryingClient<C> {
    inner: C,
    config: RetryConfig,
}

impl<C> RetryingClient<C> {
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: TextGenerationClient> TextGenerationClient for RetryingClient<C> {
    async fn complete(&self, prompt: &str) -> Result<String, ClientError> {
        let mut retry = 0;

        loop {
            let result =
                match tokio::time::timeout(self.config.call_timeout, self.inner.complete(prompt))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ClientError::Timeout(self.config.call_timeout.as_secs())),
                };

            match result {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && retry < self.config.max_retries => {
                    retry += 1;
                    let delay = self.config.delay_for_retry(retry);
                    warn!(
                        "Text generation failed ({}), retry {}/{} in {}ms",
                        err,
                        retry,
                        self.config.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    struct FlakyClient {
        responses: Mutex<VecDeque<Result<String, ClientError>>>,
        calls: Mutex<u32>,
    }

    impl FlakyClient {
        fn new(responses: Vec<Result<String, ClientError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TextGenerationClient for FlakyClient {
        async fn complete(&self, _prompt: &str) -> Result<String, ClientError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ClientError::EmptyResponse))
        }
    }

    struct SlowClient;

    #[async_trait]
    impl TextGenerationClient for SlowClient {
        async fn complete(&self, _prompt: &str) -> Result<String, ClientError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::ZERO,
            call_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_retry(1), Duration::from_millis(500));
        assert_eq!(config.delay_for_retry(2), Duration::from_millis(1000));
        assert_eq!(config.delay_for_retry(3), Duration::from_millis(2000));
        assert_eq!(config.delay_for_retry(10), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let client = RetryingClient::new(
            FlakyClient::new(vec![
                Err(ClientError::Transport("reset".into())),
                Err(ClientError::Api {
                    status: 503,
                    body: String::new(),
                }),
                Ok("ok".into()),
            ]),
            fast_config(2),
        );
        assert_eq!(client.complete("p").await.unwrap(), "ok");
        assert_eq!(client.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let client = RetryingClient::new(
            FlakyClient::new(vec![
                Err(ClientError::Transport("a".into())),
                Err(ClientError::Transport("b".into())),
                Ok("too late".into()),
            ]),
            fast_config(1),
        );
        assert!(matches!(
            client.complete("p").await,
            Err(ClientError::Transport(_))
        ));
        assert_eq!(client.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_auth_error_is_not_retried() {
        let client = RetryingClient::new(
            FlakyClient::new(vec![Err(ClientError::Auth("bad key".into())), Ok("ok".into())]),
            fast_config(3),
        );
        assert!(matches!(client.complete("p").await, Err(ClientError::Auth(_))));
        assert_eq!(client.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_call_timeout() {
        let config = RetryConfig {
            call_timeout: Duration::from_millis(20),
            ..RetryConfig::no_retry()
        };
        let client = RetryingClient::new(SlowClient, config);
        assert!(matches!(
            client.complete("p").await,
            Err(ClientError::Timeout(_))
        ));
    }
}
