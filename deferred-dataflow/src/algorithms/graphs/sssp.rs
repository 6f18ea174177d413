//! Single-source shortest paths, ordered by distance.
//!
//! Candidate distances are delayed to the round equal to the distance itself, so the iteration
//! considers candidates in increasing order of distance: by the time a node's distance is settled
//! in some round, every shorter candidate has already been seen, and longer candidates arriving
//! later do not change it. This is the order Dijkstra's algorithm visits nodes in, and it does the
//! same for every later change to the edges.
//!
//! Distances are `u64` and edge weights must be positive.

use std::fmt::Debug;

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::operators::{Delay, DelayFn, Iterate, Join, JoinFn, Reduce, ReduceFn};
use crate::timestamp::{Pair, Round, Timestamp};
use crate::{Data, Diff};

/// Checks that an edge `(src, (dst, weight))` has a positive weight.
pub fn validate_edge<N: Debug>(edge: &(N, (N, u64))) -> Result<()> {
    let (src, (dst, weight)) = edge;
    if *weight == 0 {
        return Err(Error::Configuration(format!("edge {:?} -> {:?} has non-positive weight", src, dst)));
    }
    Ok(())
}

/// Extends a path to `src` along the edge `(src, (dst, weight))`.
struct ExtendPath;

impl<N: Clone> JoinFn<N, u64, (N, u64), (N, u64)> for ExtendPath {
    fn join(&mut self, _src: &N, dist: &u64, edge: &(N, u64)) -> (N, u64) {
        (edge.0.clone(), dist.saturating_add(edge.1))
    }
}

/// Delays a candidate distance to the round equal to the distance.
struct DistanceDelay;

impl<N, T: Timestamp> DelayFn<(N, u64), Pair<T, Round>> for DistanceDelay {
    fn delay(&mut self, candidate: &(N, u64), time: &Pair<T, Round>) -> Pair<T, Round> {
        Pair::new(time.outer.clone(), candidate.1)
    }
}

/// Retains the least candidate distance.
///
/// Equal distances reached along different paths are the same record `(node, dist)`, so there is
/// no tie to break among them.
struct MinDistance;

impl<N> ReduceFn<N, u64, u64> for MinDistance {
    fn reduce(&mut self, _node: &N, input: &[(&u64, Diff)], output: &mut Vec<(u64, Diff)>) {
        output.push((*input[0].0, 1));
    }
}

/// Returns pairs `(node, dist)` giving the length of the shortest path to each node from any root.
///
/// Nodes unreachable from the roots are absent. Edges are `(src, (dst, weight))`, and should
/// satisfy `validate_edge`.
pub fn sssp<T, N>(edges: &Collection<T, (N, (N, u64))>, roots: &Collection<T, N>) -> Collection<T, (N, u64)>
where
    T: Timestamp,
    N: Data,
{
    // initialize roots as reaching themselves at distance 0
    let nodes = roots.map(|x| (x, 0));

    // repeatedly update minimal distances, considering candidates in order of distance
    nodes.iterate(|inner| {

        let edges = edges.enter(&inner.scope());
        let nodes = nodes.enter(&inner.scope());

        inner.join_core(&edges, ExtendPath)
             .concat(&nodes)
             .delay_core(DistanceDelay)
             .reduce_core("MinDistance", MinDistance)
    })
}

/// As `sssp`, but relaxing all candidates in every round, without ordering them by distance.
///
/// The result is the same; the work done differs, as a node may take several successively
/// shorter distances before settling.
pub fn sssp_rounds<T, N>(edges: &Collection<T, (N, (N, u64))>, roots: &Collection<T, N>) -> Collection<T, (N, u64)>
where
    T: Timestamp,
    N: Data,
{
    let nodes = roots.map(|x| (x, 0));

    nodes.iterate(|inner| {

        let edges = edges.enter(&inner.scope());
        let nodes = nodes.enter(&inner.scope());

        inner.join_core(&edges, ExtendPath)
             .concat(&nodes)
             .reduce_core("MinDistance", MinDistance)
    })
}

#[cfg(test)]
mod tests {

    use super::validate_edge;
    use crate::error::Error;

    #[test]
    fn rejects_zero_weights() {
        assert!(validate_edge(&('a', ('b', 3))).is_ok());
        assert!(matches!(validate_edge(&('a', ('b', 0))), Err(Error::Configuration(_))));
    }
}
