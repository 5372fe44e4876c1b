//! Generic call-site decorator shared by the repository and backend clients.
//!
//! # Design
//! - Wraps any fallible async call with a span and a counter increment.
//! - Never alters the `Result` it wraps; callers see the same error type,
//!   only observed, never translated.

use std::future::Future;

use tracing::Instrument;

use crate::metrics::Metrics;

/// Records a span and a `{operation, outcome}` counter around a fallible call.
///
/// `label` is the low-cardinality dimension recorded alongside `operation`
/// (the backend kind for backend calls, unused for the repository).
pub async fn instrumented<T, E, Fut, F>(
    metrics: &Metrics,
    record: impl Fn(&Metrics, &str, &str),
    label: &str,
    operation: &'static str,
    call: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let span = tracing::info_span!("call", label = %label, operation = %operation);
    let result = call().instrument(span).await;
    let outcome = if result.is_ok() { "ok" } else { "error" };
    record(metrics, operation, outcome);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn instrumented_preserves_ok_result() {
        let metrics = Metrics::new().expect("metrics");
        let result: Result<u8, &'static str> = instrumented(
            &metrics,
            |metrics, operation, outcome| metrics.inc_repository_call(operation, outcome),
            "sqlite",
            "claim_transfer",
            || async { Ok(7) },
        )
        .await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn instrumented_preserves_err_result() {
        let metrics = Metrics::new().expect("metrics");
        let result: Result<u8, &'static str> = instrumented(
            &metrics,
            |metrics, operation, outcome| metrics.inc_repository_call(operation, outcome),
            "sqlite",
            "claim_transfer",
            || async { Err("boom") },
        )
        .await;
        assert_eq!(result, Err("boom"));
    }
}
