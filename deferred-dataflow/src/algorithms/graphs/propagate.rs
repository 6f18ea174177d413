//! Directed label reachability.

use crate::collection::Collection;
use crate::operators::{Delay, Iterate, Join, Reduce};
use crate::timestamp::{Pair, Timestamp};
use crate::Data;

/// Propagates labels forward, retaining the minimum label.
pub fn propagate<T, N, L>(edges: &Collection<T, (N, N)>, nodes: &Collection<T, (N, L)>) -> Collection<T, (N, L)>
where
    T: Timestamp,
    N: Data,
    L: Data,
{
    nodes.filter(|_| false)
         .iterate(|inner| {
             let edges = edges.enter(&inner.scope());
             let nodes = nodes.enter(&inner.scope());

             inner.join_map(&edges, |_k, l, d| (d.clone(), l.clone()))
                  .concat(&nodes)
                  .min()
         })
}

/// Propagates labels forward, retaining the minimum label.
///
/// Seed labels are introduced at the round `logic` assigns them, so that labels with small
/// values spread before larger ones and fewer labels are overwritten.
pub fn propagate_at<T, N, L, F>(edges: &Collection<T, (N, N)>, nodes: &Collection<T, (N, L)>, logic: F) -> Collection<T, (N, L)>
where
    T: Timestamp,
    N: Data,
    L: Data,
    F: Fn(&L) -> u64 + 'static,
{
    nodes.filter(|_| false)
         .iterate(|inner| {
             let edges = edges.enter(&inner.scope());
             let nodes = nodes
                 .enter(&inner.scope())
                 .delay(move |(_, label), time| Pair::new(time.outer.clone(), logic(label)));

             inner.join_map(&edges, |_k, l, d| (d.clone(), l.clone()))
                  .concat(&nodes)
                  .min()
         })
}
