// 📤 Batch Dispatcher
// Slices banner requests into API-sized batches and retries each with backoff

use std::time::Duration;

use backoff::backoff::Backoff;
use tracing::{debug, error, warn};

use crate::client::ShowAdsClient;
use crate::config::Config;
use crate::models::{BannerRequest, API_BATCH_LIMIT};
use crate::transport::{doubling_backoff, Transport};

// ============================================================================
// SEAMS
// ============================================================================

/// Anything that can take one bulk submission
pub trait BulkSink {
    fn send_bulk(&mut self, requests: &[BannerRequest]) -> bool;
}

impl<T: Transport> BulkSink for ShowAdsClient<T> {
    fn send_bulk(&mut self, requests: &[BannerRequest]) -> bool {
        ShowAdsClient::send_bulk(self, requests)
    }
}

/// Blocking wait between attempts
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ============================================================================
// BATCHING
// ============================================================================

/// Configured batch size clamped to the API cap (and to at least 1)
pub fn effective_batch_size(configured: usize) -> usize {
    configured.clamp(1, API_BATCH_LIMIT)
}

/// Contiguous, order-preserving batches of at most the effective size
pub fn batches(requests: &[BannerRequest], configured: usize) -> std::slice::Chunks<'_, BannerRequest> {
    requests.chunks(effective_batch_size(configured))
}

// ============================================================================
// DISPATCHER
// ============================================================================

pub struct BatchDispatcher<S: Sleeper = ThreadSleeper> {
    batch_size: usize,
    max_retries: u32,
    retry_delay: Duration,
    sleeper: S,
}

impl BatchDispatcher<ThreadSleeper> {
    pub fn new(config: &Config) -> Self {
        Self::with_sleeper(config, ThreadSleeper)
    }
}

impl<S: Sleeper> BatchDispatcher<S> {
    pub fn with_sleeper(config: &Config, sleeper: S) -> Self {
        BatchDispatcher {
            batch_size: config.batch_size,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            sleeper,
        }
    }

    /// Wait before retry `retry_index` (0-based): `retry_delay * 2^retry_index`, capped at two minutes
    pub fn backoff_delay(&self, retry_index: u32) -> Duration {
        let mut schedule = doubling_backoff(self.retry_delay);
        let mut wait = self.retry_delay;
        for _ in 0..=retry_index {
            wait = schedule.next_backoff().unwrap_or(wait);
        }
        wait
    }

    /// Send every batch, stopping at the first batch that exhausts its attempts
    ///
    /// Returns true only if all batches were accepted.
    pub fn dispatch<K: BulkSink>(&self, sink: &mut K, requests: &[BannerRequest]) -> bool {
        let batch_size = effective_batch_size(self.batch_size);
        let total_batches = requests.len().div_ceil(batch_size);

        debug!(
            "Sending {} banner requests in batches of {}",
            requests.len(),
            batch_size
        );

        for (index, batch) in batches(requests, self.batch_size).enumerate() {
            let batch_num = index + 1;
            debug!(
                "Processing batch {}/{} with {} requests",
                batch_num,
                total_batches,
                batch.len()
            );

            if !self.send_with_retry(sink, batch, batch_num) {
                return false;
            }
        }

        true
    }

    fn send_with_retry<K: BulkSink>(&self, sink: &mut K, batch: &[BannerRequest], batch_num: usize) -> bool {
        let max_attempts = self.max_retries.saturating_add(1);
        let mut schedule = doubling_backoff(self.retry_delay);

        for attempt in 0..max_attempts {
            if sink.send_bulk(batch) {
                return true;
            }

            if attempt + 1 < max_attempts {
                let wait = schedule.next_backoff().unwrap_or(self.retry_delay);
                warn!(
                    "Batch {} failed (attempt {}/{}), retrying in {:?}...",
                    batch_num,
                    attempt + 1,
                    max_attempts,
                    wait
                );
                self.sleeper.sleep(wait);
            }
        }

        error!("Batch {} failed after {} attempts", batch_num, max_attempts);
        false
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Sleeper that records waits instead of blocking
    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        pub waits: RefCell<Vec<Duration>>,
    }

    impl Sleeper for &RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.waits.borrow_mut().push(duration);
        }
    }

    /// Sink that replays scripted outcomes (default: success) and records batch sizes
    #[derive(Default)]
    struct FakeSink {
        outcomes: VecDeque<bool>,
        sent: Vec<usize>,
    }

    impl FakeSink {
        fn scripted(outcomes: &[bool]) -> Self {
            FakeSink {
                outcomes: outcomes.iter().copied().collect(),
                sent: Vec::new(),
            }
        }
    }

    impl BulkSink for FakeSink {
        fn send_bulk(&mut self, requests: &[BannerRequest]) -> bool {
            self.sent.push(requests.len());
            self.outcomes.pop_front().unwrap_or(true)
        }
    }

    fn requests(n: usize) -> Vec<BannerRequest> {
        (0..n)
            .map(|i| BannerRequest {
                visitor_cookie: format!("cookie-{}", i),
                banner_id: (i % 100) as i64,
            })
            .collect()
    }

    fn config(batch_size: usize, max_retries: u32, retry_delay_secs: u64) -> Config {
        Config {
            batch_size,
            max_retries,
            retry_delay: Duration::from_secs(retry_delay_secs),
            ..Config::default()
        }
    }

    #[test]
    fn test_batches_split_in_order() {
        let requests = requests(250);
        let sizes: Vec<usize> = batches(&requests, 100).map(|b| b.len()).collect();

        assert_eq!(sizes, vec![100, 100, 50]);

        let first: Vec<&str> = batches(&requests, 100)
            .map(|b| b[0].visitor_cookie.as_str())
            .collect();
        assert_eq!(first, vec!["cookie-0", "cookie-100", "cookie-200"]);
    }

    #[test]
    fn test_api_cap_overrides_configured_size() {
        let requests = requests(2000);
        let sizes: Vec<usize> = batches(&requests, 1500).map(|b| b.len()).collect();

        assert_eq!(sizes, vec![1000, 1000]);
        assert_eq!(effective_batch_size(1500), 1000);
        assert_eq!(effective_batch_size(0), 1);
    }

    #[test]
    fn test_dispatch_all_batches_succeed() {
        let sleeper = RecordingSleeper::default();
        let dispatcher = BatchDispatcher::with_sleeper(&config(100, 2, 1), &sleeper);
        let mut sink = FakeSink::default();

        assert!(dispatcher.dispatch(&mut sink, &requests(250)));
        assert_eq!(sink.sent, vec![100, 100, 50]);
        assert!(sleeper.waits.borrow().is_empty());
    }

    #[test]
    fn test_retry_with_exponential_backoff_then_success() {
        let sleeper = RecordingSleeper::default();
        let dispatcher = BatchDispatcher::with_sleeper(&config(100, 2, 1), &sleeper);
        let mut sink = FakeSink::scripted(&[false, false, true]);

        assert!(dispatcher.dispatch(&mut sink, &requests(10)));
        assert_eq!(sink.sent.len(), 3);
        assert_eq!(
            *sleeper.waits.borrow(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn test_exhausted_batch_stops_remaining_batches() {
        let sleeper = RecordingSleeper::default();
        let dispatcher = BatchDispatcher::with_sleeper(&config(100, 2, 1), &sleeper);
        let mut sink = FakeSink::scripted(&[false, false, false]);

        assert!(!dispatcher.dispatch(&mut sink, &requests(250)));
        // Three attempts of the first batch, nothing after
        assert_eq!(sink.sent, vec![100, 100, 100]);
        assert_eq!(sleeper.waits.borrow().len(), 2);
    }

    #[test]
    fn test_failure_in_later_batch() {
        let sleeper = RecordingSleeper::default();
        let dispatcher = BatchDispatcher::with_sleeper(&config(100, 0, 1), &sleeper);
        let mut sink = FakeSink::scripted(&[true, false]);

        assert!(!dispatcher.dispatch(&mut sink, &requests(250)));
        assert_eq!(sink.sent, vec![100, 100]);
        assert!(sleeper.waits.borrow().is_empty());
    }

    #[test]
    fn test_empty_input_is_success() {
        let sleeper = RecordingSleeper::default();
        let dispatcher = BatchDispatcher::with_sleeper(&config(100, 2, 1), &sleeper);
        let mut sink = FakeSink::default();

        assert!(dispatcher.dispatch(&mut sink, &[]));
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_backoff_delay() {
        let dispatcher = BatchDispatcher::with_sleeper(&config(100, 3, 2), ThreadSleeper);

        assert_eq!(dispatcher.backoff_delay(0), Duration::from_secs(2));
        assert_eq!(dispatcher.backoff_delay(1), Duration::from_secs(4));
        assert_eq!(dispatcher.backoff_delay(2), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_is_capped() {
        let dispatcher = BatchDispatcher::with_sleeper(&config(100, 10, 60), ThreadSleeper);

        assert_eq!(dispatcher.backoff_delay(1), Duration::from_secs(120));
        assert_eq!(dispatcher.backoff_delay(5), Duration::from_secs(120));
    }

    #[test]
    fn test_retry_waits_follow_doubling_schedule() {
        let sleeper = RecordingSleeper::default();
        let dispatcher = BatchDispatcher::with_sleeper(&config(100, 3, 1), &sleeper);
        let mut sink = FakeSink::scripted(&[false, false, false, false]);

        assert!(!dispatcher.dispatch(&mut sink, &requests(5)));
        assert_eq!(
            *sleeper.waits.borrow(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }
}
