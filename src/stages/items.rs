use std::future::Future;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::graph::StageId;
use crate::llm::TextGenerationClient;

/// Per-item execution settings shared by all stages
#[derive(Debug, Clone)]
pub struct ItemConfig {
    /// Concurrent text-generation calls within one stage
    pub concurrency: usize,
    /// Extra attempts when a response normalizes to nothing usable
    pub parse_retries: u32,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            parse_retries: 1,
        }
    }
}

/// Call the client and parse, re-asking when the response is unusable
///
/// Client failures propagate; a response that never parses gives `Ok(None)`.
pub async fn complete_with_parse_retry<T>(
    client: &dyn TextGenerationClient,
    stage: StageId,
    prompt: &str,
    parse_retries: u32,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, PipelineError> {
    for attempt in 0..=parse_retries {
        if attempt > 0 {
            debug!("Stage {}: parse retry {} of {}", stage, attempt, parse_retries);
        }

        let response = client
            .complete(prompt)
            .await
            .map_err(|e| PipelineError::client(stage, e))?;
        debug!("Stage {}: raw response: {}", stage, response);

        if let Some(parsed) = parse(&response) {
            return Ok(Some(parsed));
        }
        warn!("Stage {}: response could not be normalized", stage);
    }
    Ok(None)
}

/// Run `f` over `items` with bounded concurrency, keeping input order
///
/// The first error aborts the whole map.
pub async fn map_items_ordered<I, T, F, Fut>(
    items: I,
    concurrency: usize,
    f: F,
) -> Result<Vec<T>, PipelineError>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    stream::iter(items)
        .map(f)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::ClientError;

    struct Replies(Mutex<Vec<&'static str>>);

    #[async_trait]
    impl TextGenerationClient for Replies {
        async fn complete(&self, _prompt: &str) -> Result<String, ClientError> {
            let mut replies = self.0.lock().unwrap();
            if replies.is_empty() {
                return Err(ClientError::Transport("no more replies".into()));
            }
            Ok(replies.remove(0).to_string())
        }
    }

    fn parse_number(text: &str) -> Option<u32> {
        text.trim().parse().ok()
    }

    #[tokio::test]
    async fn test_parse_retry_recovers() {
        let client = Replies(Mutex::new(vec!["garbage", "42"]));
        let parsed =
            complete_with_parse_retry(&client, StageId::Risk, "p", 1, parse_number).await.unwrap();
        assert_eq!(parsed, Some(42));
    }

    #[tokio::test]
    async fn test_parse_retry_gives_up() {
        let client = Replies(Mutex::new(vec!["garbage", "more garbage", "7"]));
        let parsed =
            complete_with_parse_retry(&client, StageId::Risk, "p", 1, parse_number).await.unwrap();
        assert_eq!(parsed, None);
        assert_eq!(client.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_client_error_propagates() {
        let client = Replies(Mutex::new(vec![]));
        let result = complete_with_parse_retry(&client, StageId::Plan, "p", 3, parse_number).await;
        assert!(matches!(
            result,
            Err(PipelineError::Client {
                stage: StageId::Plan,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_map_keeps_input_order() {
        // Earlier items finish last
        let results = map_items_ordered(0..5u64, 5, |i| async move {
            tokio::time::sleep(Duration::from_millis(5 * (5 - i))).await;
            Ok(i * 10)
        })
        .await
        .unwrap();
        assert_eq!(results, vec![0, 10, 20, 30, 40]);
    }

    #[tokio::test]
    async fn test_map_stops_on_error() {
        let result = map_items_ordered(0..3u32, 2, |i| async move {
            if i == 1 {
                Err(PipelineError::client(
                    StageId::Checklist,
                    ClientError::Transport("down".into()),
                ))
            } else {
                Ok(i)
            }
        })
        .await;
        assert!(result.is_err());
    }
}
