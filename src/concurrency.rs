//! Concurrency helper: limit the number of platforms processed in parallel.

use rayon::prelude::*;

/// Run `f` over `items` with at most `limit` in flight, keeping every result
/// in input order. A failing item never stops the others.
pub fn map_limited<T, R, F>(items: &[T], limit: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Sync + Fn(&T) -> R,
{
    if limit <= 1 {
        return items.iter().map(&f).collect();
    }
    let mut out = Vec::with_capacity(items.len());
    for chunk in items.chunks(limit) {
        out.extend(chunk.par_iter().map(&f).collect::<Vec<_>>());
    }
    out
}
