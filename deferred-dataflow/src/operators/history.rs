//! Per-key update histories kept by `join` and `reduce`.
//!
//! A history records every update an operator has seen for one key. Left alone it grows without
//! bound, even when updates cancel, because each update carries its own time. Once no time less
//! than some frontier can arrive at the operator, updates at times distinguishable only below the
//! frontier can be merged: each time is advanced by the frontier, after which cancelling updates
//! share a time and consolidate away.

use timely::progress::frontier::AntichainRef;

use crate::consolidation::consolidate_updates;
use crate::lattice::Lattice;
use crate::timestamp::Timestamp;
use crate::Diff;

/// Updates recorded for one key, as `(val, time, diff)`.
pub(crate) type History<V, T> = Vec<(V, T, Diff)>;

/// Appends an update to a key's history, compacting the history when its length has doubled.
///
/// `frontier` must bound from below every time at which the history will be read.
pub(crate) fn record<V: Ord, T: Timestamp>(history: &mut History<V, T>, val: V, time: &T, diff: Diff, frontier: AntichainRef<T>) {
    history.push((val, time.clone(), diff));
    if history.len().is_power_of_two() && history.len() > 8 {
        compact(history, frontier);
    }
}

/// Advances every time in `history` by `frontier` and consolidates.
///
/// Accumulations at times greater or equal to an element of `frontier` are unchanged.
pub(crate) fn compact<V: Ord, T: Lattice + Ord>(history: &mut History<V, T>, frontier: AntichainRef<T>) {
    for (_, time, _) in history.iter_mut() {
        time.advance_by(frontier);
    }
    consolidate_updates(history);
}
