//! Sequential repeat loop.
//!
//! Calls an operation with a parameter, asks a continuation for the next
//! parameter, and stops when the continuation returns `None`. The next
//! parameter is itself a future, so the continuation can wait (for a backoff,
//! a page cursor, ...) before the next iteration starts. Iterations never
//! overlap.

use std::future::{Future, IntoFuture};

/// Runs `operation` until `next_parameter` signals the end, folding every
/// result into an accumulator.
///
/// `next_parameter` receives each result and its 1-based iteration number.
/// It is asked before `collect` consumes the result.
pub async fn repeat_fold<P, R, A, Op, OpFut, Next, NextFut, Collect>(
    initial: P,
    init: A,
    mut operation: Op,
    mut next_parameter: Next,
    mut collect: Collect,
) -> A
where
    Op: FnMut(P) -> OpFut,
    OpFut: IntoFuture<Output = R>,
    Next: FnMut(&R, u32) -> Option<NextFut>,
    NextFut: Future<Output = P>,
    Collect: FnMut(A, R) -> A,
{
    let mut parameter = initial;
    let mut acc = init;
    let mut iteration: u32 = 0;
    loop {
        iteration = iteration.saturating_add(1);
        let result = operation(parameter).await;
        let next = next_parameter(&result, iteration);
        acc = collect(acc, result);
        match next {
            Some(pending) => parameter = pending.await,
            None => return acc,
        }
    }
}

/// Runs `operation` until `next_parameter` signals the end and returns every
/// result in order.
///
/// ```
/// use franken_deferred::combinator::repeat;
/// use franken_deferred::runtime::LocalRuntime;
///
/// // Paginate through three pages of two items.
/// let rt = LocalRuntime::virtual_time();
/// let pages = rt
///     .block_on(repeat(
///         0_u32,
///         |page| async move { (page * 2..page * 2 + 2).collect::<Vec<_>>() },
///         |items: &Vec<u32>, iteration| {
///             (iteration < 3).then(|| std::future::ready(items[1] / 2 + 1))
///         },
///     ))
///     .unwrap();
/// assert_eq!(pages, vec![vec![0, 1], vec![2, 3], vec![4, 5]]);
/// ```
pub async fn repeat<P, R, Op, OpFut, Next, NextFut>(
    initial: P,
    operation: Op,
    next_parameter: Next,
) -> Vec<R>
where
    Op: FnMut(P) -> OpFut,
    OpFut: IntoFuture<Output = R>,
    Next: FnMut(&R, u32) -> Option<NextFut>,
    NextFut: Future<Output = P>,
{
    repeat_fold(initial, Vec::new(), operation, next_parameter, |mut all, result| {
        all.push(result);
        all
    })
    .await
}
