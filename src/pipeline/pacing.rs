//! Rate-limited, single-concurrency task runner.
//!
//! OCR calls for one document must go out one at a time, in page order, with
//! a fixed pause between consecutive calls to stay under the service's rate
//! limit. [`Pacer`] owns that policy: it drains a sequence of tasks, awaits
//! each to completion, and sleeps `spacing` between tasks but never after the
//! last one.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Sequential task runner with a minimum gap between tasks.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    spacing: Duration,
}

/// Results of a paced run, in input order.
#[derive(Debug)]
pub struct Paced<R> {
    pub results: Vec<R>,
    /// Pauses issued: `n - 1` for `n > 0` tasks.
    pub delays: usize,
}

impl Pacer {
    pub fn new(spacing: Duration) -> Self {
        Self { spacing }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Run `task` over every item in order, one at a time.
    pub async fn run<I, T, F, Fut, R>(&self, items: I, mut task: F) -> Paced<R>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let mut items = items.into_iter().peekable();
        let mut results = Vec::with_capacity(items.size_hint().0);
        let mut delays = 0;

        while let Some(item) = items.next() {
            results.push(task(item).await);
            if items.peek().is_some() {
                sleep(self.spacing).await;
                delays += 1;
            }
        }

        Paced { results, delays }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn issues_n_minus_one_delays() {
        let pacer = Pacer::from_millis(500);
        let start = Instant::now();
        let paced = pacer.run(1..=4, |n| async move { n * 10 }).await;

        assert_eq!(paced.results, vec![10, 20, 30, 40]);
        assert_eq!(paced.delays, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn single_and_empty_runs_never_sleep() {
        let pacer = Pacer::from_millis(500);
        let start = Instant::now();

        let one = pacer.run(vec!["only"], |s| async move { s.len() }).await;
        assert_eq!(one.delays, 0);

        let none = pacer.run(Vec::<u8>::new(), |b| async move { b }).await;
        assert!(none.results.is_empty());
        assert_eq!(none.delays, 0);

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_never_overlap_and_keep_order() {
        let pacer = Pacer::from_millis(100);
        let log = Arc::new(Mutex::new(Vec::new()));

        pacer
            .run(0..3, |i| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(format!("start {i}"));
                    sleep(Duration::from_millis(30)).await;
                    log.lock().unwrap().push(format!("end {i}"));
                }
            })
            .await;

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec!["start 0", "end 0", "start 1", "end 1", "start 2", "end 2"]
        );
    }
}
