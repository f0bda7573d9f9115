//! Concurrent, order-preserving batch embedding.

use super::Embedder;
use crate::error::{ApiError, Result};
use crate::retry::RetryPolicy;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Fetches embeddings for many texts with bounded concurrency.
///
/// Every text is fetched by its own task and retried on its own. Results are
/// slotted by input position, so completion order does not matter and
/// repeated texts each get their own row.
pub struct BatchEmbedder {
    embedder: Arc<dyn Embedder>,
    workers: usize,
    retry: RetryPolicy,
    progress: Option<ProgressBar>,
    show_progress: bool,
}

impl BatchEmbedder {
    /// Create a batcher running at most `workers` requests at once. Zero is treated as one.
    pub fn new(embedder: Arc<dyn Embedder>, workers: usize) -> Self {
        Self {
            embedder,
            workers: workers.max(1),
            retry: RetryPolicy::embedding(),
            progress: None,
            show_progress: false,
        }
    }

    /// Retry policy applied to each text.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Report completed tasks on this progress bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Draw a terminal progress bar when no bar was supplied.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Embed every text. Row `i` of the result belongs to `texts[i]`.
    ///
    /// If any text exhausts its retries, tasks already running or queued still
    /// run to completion; the batch then fails with the provider's typed error
    /// for the first failure seen.
    #[instrument(skip(self, texts), fields(count = texts.len(), provider = %self.embedder.provider()))]
    pub async fn embed_all(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let pb = self.progress_bar(texts.len());
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut first_error: Option<ApiError> = None;

        let mut stream = stream::iter(texts.iter().enumerate())
            .map(|(idx, text)| async move { (idx, self.embed_one(text, model).await) })
            .buffer_unordered(self.workers);

        while let Some((idx, result)) = stream.next().await {
            pb.inc(1);
            match result {
                Ok(embedding) => slots[idx] = Some(embedding),
                Err(e) => {
                    warn!(index = idx, "Embedding failed after retries: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        pb.finish_and_clear();

        if let Some(e) = first_error {
            return Err(e);
        }

        let rows = slots.into_iter().flatten().collect::<Vec<_>>();
        self.check_shape(&rows, texts.len())?;

        debug!("Generated {} embeddings", rows.len());
        Ok(rows)
    }

    async fn embed_one(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let provider = self.embedder.provider();
        self.retry
            .run_if(ApiError::is_retryable, |attempt| async move {
                let result = self.embedder.embed(text, model).await;
                if let Err(e) = &result {
                    warn!(attempt, "{} embedding error: {}", provider, e);
                }
                result
            })
            .await
            .map_err(|exhausted| exhausted.last.into_provider(provider))
    }

    fn check_shape(&self, rows: &[Vec<f32>], expected: usize) -> Result<()> {
        let provider = self.embedder.provider();
        if rows.len() != expected {
            return Err(provider.error(format!(
                "expected {} embeddings, got {}",
                expected,
                rows.len()
            )));
        }
        if let Some(first) = rows.first() {
            if let Some(bad) = rows.iter().position(|r| r.len() != first.len()) {
                return Err(provider.error(format!(
                    "embedding {} has {} dimensions, expected {}",
                    bad,
                    rows[bad].len(),
                    first.len()
                )));
            }
        }
        Ok(())
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        let pb = match &self.progress {
            Some(pb) => pb.clone(),
            None if self.show_progress => {
                let pb = ProgressBar::new(len as u64);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("  {spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
                {
                    pb.set_style(style.progress_chars("█▓░"));
                }
                pb.set_message(format!("Getting {} embeddings", self.embedder.provider()));
                pb
            }
            None => ProgressBar::hidden(),
        };
        pb.set_length(len as u64);
        pb.set_position(0);
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Provider;
    use crate::retry::Backoff;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns `[i, i, i]` for the i-th known text, finishing later texts first.
    struct StubEmbedder {
        vocabulary: Vec<&'static str>,
        failures_before_success: usize,
        always_fail: Vec<&'static str>,
        calls: Mutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl StubEmbedder {
        fn new(vocabulary: Vec<&'static str>) -> Self {
            Self {
                vocabulary,
                failures_before_success: 0,
                always_fail: Vec::new(),
                calls: Mutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn calls_for(&self, text: &str) -> usize {
            self.calls.lock().unwrap().get(text).copied().unwrap_or(0)
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str, _model: &str) -> Result<Vec<f32>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let call = {
                let mut calls = self.calls.lock().unwrap();
                let count = calls.entry(text.to_string()).or_insert(0);
                *count += 1;
                *count
            };

            let index = self
                .vocabulary
                .iter()
                .position(|v| *v == text)
                .expect("unknown text");
            let delay = (self.vocabulary.len() - index) as u64 * 5;
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.always_fail.contains(&text) || call <= self.failures_before_success {
                return Err(ApiError::Status {
                    status: 429,
                    message: format!("rate limited on {}", text),
                });
            }
            Ok(vec![index as f32; 3])
        }

        fn provider(&self) -> Provider {
            Provider::OpenAI
        }
    }

    fn strings(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    fn batcher(stub: Arc<StubEmbedder>, workers: usize, attempts: u32) -> BatchEmbedder {
        BatchEmbedder::new(stub, workers).with_retry(RetryPolicy::new(attempts, Backoff::none()))
    }

    #[tokio::test]
    async fn test_rows_follow_input_order() {
        let stub = Arc::new(StubEmbedder::new(vec!["a", "b", "c"]));
        let rows = batcher(stub, 3, 1)
            .embed_all(&strings(&["a", "b", "c"]), "stub")
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0]]
        );
    }

    #[tokio::test]
    async fn test_many_texts_keep_order() {
        let vocabulary: Vec<&'static str> = vec![
            "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8", "t9", "t10", "t11",
        ];
        let stub = Arc::new(StubEmbedder::new(vocabulary.clone()));
        let input = strings(&["t7", "t2", "t11", "t0", "t5", "t9", "t1"]);

        let rows = batcher(stub.clone(), 4, 1).embed_all(&input, "stub").await.unwrap();

        assert_eq!(rows.len(), input.len());
        for (row, text) in rows.iter().zip(&input) {
            let expected = vocabulary.iter().position(|v| v == text).unwrap() as f32;
            assert_eq!(row, &vec![expected; 3]);
        }
        assert!(stub.max_in_flight.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_duplicate_texts_each_get_a_row() {
        let stub = Arc::new(StubEmbedder::new(vec!["x", "y"]));
        let rows = batcher(stub.clone(), 2, 1)
            .embed_all(&strings(&["y", "x", "y"]), "stub")
            .await
            .unwrap();

        assert_eq!(rows, vec![vec![1.0; 3], vec![0.0; 3], vec![1.0; 3]]);
        assert_eq!(stub.calls_for("y"), 2);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let stub = Arc::new(StubEmbedder::new(vec!["a"]));
        let rows = batcher(stub.clone(), 2, 1).embed_all(&[], "stub").await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(stub.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_per_item() {
        let mut stub = StubEmbedder::new(vec!["a", "b"]);
        stub.failures_before_success = 2;
        let stub = Arc::new(stub);

        let rows = batcher(stub.clone(), 2, 6)
            .embed_all(&strings(&["a", "b"]), "stub")
            .await
            .unwrap();

        assert_eq!(rows, vec![vec![0.0; 3], vec![1.0; 3]]);
        assert_eq!(stub.calls_for("a"), 3);
        assert_eq!(stub.calls_for("b"), 3);
    }

    #[tokio::test]
    async fn test_exhausted_item_fails_batch_with_typed_error() {
        let mut stub = StubEmbedder::new(vec!["ok1", "bad", "ok2", "ok3"]);
        stub.always_fail = vec!["bad"];
        let stub = Arc::new(stub);

        let result = batcher(stub.clone(), 1, 3)
            .embed_all(&strings(&["ok1", "bad", "ok2", "ok3"]), "stub")
            .await;

        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, ApiError::OpenAI(ref m) if m.contains("rate limited on bad")));
        assert_eq!(stub.calls_for("bad"), 3);
        // Siblings queued behind the failure still ran.
        assert_eq!(stub.calls_for("ok2"), 1);
        assert_eq!(stub.calls_for("ok3"), 1);
    }

    #[tokio::test]
    async fn test_progress_counts_every_task() {
        let stub = Arc::new(StubEmbedder::new(vec!["a", "b", "c", "d"]));
        let pb = ProgressBar::hidden();

        batcher(stub, 2, 1)
            .with_progress(pb.clone())
            .embed_all(&strings(&["d", "c", "b", "a"]), "stub")
            .await
            .unwrap();

        assert_eq!(pb.length(), Some(4));
        assert_eq!(pb.position(), 4);
    }

    #[test]
    fn test_zero_workers_means_one() {
        let stub = Arc::new(StubEmbedder::new(vec![]));
        assert_eq!(BatchEmbedder::new(stub, 0).workers(), 1);
    }

    struct RaggedEmbedder;

    #[async_trait]
    impl Embedder for RaggedEmbedder {
        async fn embed(&self, text: &str, _model: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; text.len()])
        }

        fn provider(&self) -> Provider {
            Provider::Palm
        }
    }

    #[tokio::test]
    async fn test_ragged_rows_are_rejected() {
        let result = BatchEmbedder::new(Arc::new(RaggedEmbedder), 2)
            .embed_all(&strings(&["ab", "abc"]), "stub")
            .await;
        assert!(matches!(result, Err(ApiError::Palm(_))));
    }
}
