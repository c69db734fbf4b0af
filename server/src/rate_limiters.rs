use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use leaky_bucket::RateLimiter;
use lib_email_clients::gmail::api_quota::GMAIL_QUOTA_PER_SECOND;
use tokio::time::Duration;

/// Leaky bucket sized to the provider's per-user quota. Acquired per API
/// call by the wire client, with the cost of each method in quota units.
pub fn gmail_quota_limiter() -> Arc<RateLimiter> {
    Arc::new(
        RateLimiter::builder()
            .initial(GMAIL_QUOTA_PER_SECOND)
            .interval(Duration::from_secs(1))
            .refill(GMAIL_QUOTA_PER_SECOND)
            .build(),
    )
}

/// Outcome of a bounded-concurrency batch run. Every input item lands in
/// exactly one of `results` / `errors`; ordering follows completion, not
/// submission.
pub struct BatchOutcome<I, T> {
    pub results: Vec<T>,
    pub errors: Vec<BatchError<I>>,
}

pub struct BatchError<I> {
    pub item: I,
    pub error: anyhow::Error,
}

/// Run `mapper` over `items` with at most `concurrency` in flight. A single
/// item's failure never aborts the batch.
pub async fn bounded_batch<I, T, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    mapper: F,
) -> BatchOutcome<I, T>
where
    I: Clone,
    F: Fn(I) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let concurrency = concurrency.max(1);

    let outcomes = stream::iter(items.into_iter().map(|item| {
        let fut = mapper(item.clone());
        async move { (item, fut.await) }
    }))
    .buffer_unordered(concurrency)
    .collect::<Vec<_>>()
    .await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (item, outcome) in outcomes {
        match outcome {
            Ok(value) => results.push(value),
            Err(error) => errors.push(BatchError { item, error }),
        }
    }

    BatchOutcome { results, errors }
}
