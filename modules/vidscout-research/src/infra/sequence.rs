//! Ordered, one-at-a-time processing of a batch.
//!
//! Items are awaited strictly in series. Nothing here spawns or joins
//! concurrently: the transcript provider and the language model are called at
//! most once at a time per request.

use std::future::Future;

/// Run `f` over every item in order and keep every outcome, including failures.
/// One item failing never stops the batch.
pub async fn collect_in_order<I, T, R, F, Fut>(items: I, mut f: F) -> Vec<R>
where
    I: IntoIterator<Item = T>,
    F: FnMut(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    let mut results = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        results.push(f(index, item).await);
    }
    results
}

/// Like [`collect_in_order`], but stops at the first `Err` and returns it.
pub async fn try_collect_in_order<I, T, R, E, F, Fut>(items: I, mut f: F) -> Result<Vec<R>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(usize, T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let mut results = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        results.push(f(index, item).await?);
    }
    Ok(results)
}
