use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::errors::TreeResult;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Bounded-parallel async traversal of a tree-shaped structure.
///
/// `process_node` is invoked once per visited `(index, node)` pair and returns the children to
/// continue into; a leaf returns an empty vector. At most `n_workers` invocations run
/// concurrently. Visitation order is unspecified — this is a worklist, not a DFS/BFS guarantee.
/// Any error returned by a callback invocation cancels the remaining in-flight work and is
/// propagated to the caller.
///
/// The whole traversal is driven in-place (no `tokio::spawn`), so `process_node` may freely
/// borrow from the caller's stack frame instead of requiring owned/`'static` captures.
pub async fn traverse_tree<'a, T, F, Fut>(root: (u64, T), n_workers: usize, process_node: F) -> TreeResult<()>
where
    T: Send + 'a,
    F: Fn(u64, T) -> Fut + Send + Sync + 'a,
    Fut: Future<Output = TreeResult<Vec<(u64, T)>>> + Send + 'a,
{
    let semaphore = Arc::new(Semaphore::new(n_workers.max(1)));
    let process_node = &process_node;

    let mut in_flight: FuturesUnordered<BoxFuture<'a, TreeResult<Vec<(u64, T)>>>> = FuturesUnordered::new();
    in_flight.push(spawn_visit(root, Arc::clone(&semaphore), process_node));

    while let Some(result) = in_flight.next().await {
        let children = result?;
        for child in children {
            in_flight.push(spawn_visit(child, Arc::clone(&semaphore), process_node));
        }
    }
    Ok(())
}

fn spawn_visit<'a, T, F, Fut>(
    node: (u64, T),
    semaphore: Arc<Semaphore>,
    process_node: &'a F,
) -> BoxFuture<'a, TreeResult<Vec<(u64, T)>>>
where
    T: Send + 'a,
    F: Fn(u64, T) -> Fut + Send + Sync + 'a,
    Fut: Future<Output = TreeResult<Vec<(u64, T)>>> + Send + 'a,
{
    Box::pin(async move {
        let _permit = semaphore.acquire_owned().await.expect("traversal semaphore is never closed");
        process_node(node.0, node.1).await
    })
}
