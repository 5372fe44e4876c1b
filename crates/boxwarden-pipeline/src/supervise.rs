//! Panic-capture + backoff restart discipline shared by every long-running
//! pipeline task (§5 "Panic discipline").

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Run `make_task` under a supervising loop: if the spawned task panics, the
/// panic is captured and logged at ERROR, then the task is restarted after an
/// exponential backoff (mirroring the reachability-probe backoff in
/// `boxwarden-data`) unless `cancellation` has fired. A task that returns
/// normally (cooperative exit on cancellation) ends the loop without
/// restarting.
pub async fn supervise<F, Fut>(name: &'static str, cancellation: CancellationToken, mut make_task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut backoff = INITIAL_BACKOFF;
    loop {
        if cancellation.is_cancelled() {
            return;
        }

        let handle = tokio::spawn(make_task());
        match handle.await {
            Ok(()) => return,
            Err(join_error) if join_error.is_panic() => {
                tracing::error!(task = name, error = %join_error, "task panicked; restarting after backoff");
                if cancellation.is_cancelled() {
                    return;
                }
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            Err(join_error) => {
                tracing::warn!(task = name, error = %join_error, "task aborted");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn restarts_after_panic_and_stops_once_cancelled() {
        let attempts = Arc::new(AtomicU32::new(0));
        let cancellation = CancellationToken::new();

        let task_attempts = Arc::clone(&attempts);
        let task_cancellation = cancellation.clone();
        supervise("test-task", cancellation.clone(), move || {
            let attempts = Arc::clone(&task_attempts);
            let cancellation = task_cancellation.clone();
            async move {
                let count = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if count < 3 {
                    panic!("synthetic failure");
                }
                cancellation.cancel();
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
