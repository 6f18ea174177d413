//! Consolidation of vectors of updates.
//!
//! Batches moving between operators may mention the same record several times, with counts
//! that partially or entirely cancel. Consolidation sorts a batch and accumulates the counts of
//! equal records, discarding those that accumulate to zero. Operators consolidate before they
//! emit, so that a record inserted and retracted at the same time produces no output at all.

use crate::difference::Semigroup;

/// Sorts and consolidates `vec`.
///
/// Runs of entries with identical first elements are accumulated into one entry; should the
/// accumulation be zero, the entry is discarded.
///
/// # Examples
///
/// ```
/// use deferred_dataflow::consolidation::consolidate;
///
/// let mut batch = vec![("b", 2), ("a", 1), ("b", -2), ("a", 3)];
/// consolidate(&mut batch);
/// assert_eq!(batch, vec![("a", 4)]);
/// ```
pub fn consolidate<T: Ord, R: Semigroup>(vec: &mut Vec<(T, R)>) {
    consolidate_from(vec, 0);
}

/// Sorts and consolidates `vec[offset..]`, leaving `vec[..offset]` untouched.
pub fn consolidate_from<T: Ord, R: Semigroup>(vec: &mut Vec<(T, R)>, offset: usize) {
    let length = consolidate_slice(&mut vec[offset..]);
    vec.truncate(offset + length);
}

/// Sorts and consolidates a slice, returning the length of the valid prefix.
pub fn consolidate_slice<T: Ord, R: Semigroup>(slice: &mut [(T, R)]) -> usize {
    slice.sort_by(|x, y| x.0.cmp(&y.0));
    compact_sorted(slice, |x, y| x.0 == y.0, |x| &mut x.1)
}

/// Sorts and consolidates `vec` of `(data, time, diff)` updates.
///
/// Runs of entries with identical data and time are accumulated into one entry; should the
/// accumulation be zero, the entry is discarded.
pub fn consolidate_updates<D: Ord, T: Ord, R: Semigroup>(vec: &mut Vec<(D, T, R)>) {
    consolidate_updates_from(vec, 0);
}

/// Sorts and consolidates `vec[offset..]` of `(data, time, diff)` updates.
pub fn consolidate_updates_from<D: Ord, T: Ord, R: Semigroup>(vec: &mut Vec<(D, T, R)>, offset: usize) {
    let length = consolidate_updates_slice(&mut vec[offset..]);
    vec.truncate(offset + length);
}

/// Sorts and consolidates a slice of updates, returning the length of the valid prefix.
pub fn consolidate_updates_slice<D: Ord, T: Ord, R: Semigroup>(slice: &mut [(D, T, R)]) -> usize {
    slice.sort_unstable_by(|x, y| (&x.0, &x.1).cmp(&(&y.0, &y.1)));
    compact_sorted(slice, |x, y| x.0 == y.0 && x.1 == y.1, |x| &mut x.2)
}

/// Accumulates adjacent equal entries of a sorted slice into a prefix of non-zero entries.
fn compact_sorted<E, R, S, W>(slice: &mut [E], equal: S, diff: W) -> usize
where
    R: Semigroup,
    S: Fn(&E, &E) -> bool,
    W: Fn(&mut E) -> &mut R,
{
    // `offset` indexes the entry being accumulated into; entries before it are final.
    let mut offset = 0;
    for index in 1 .. slice.len() {
        let (done, rest) = slice.split_at_mut(index);
        if equal(&done[offset], &rest[0]) {
            let addend = diff(&mut rest[0]).clone();
            diff(&mut done[offset]).plus_equals(&addend);
        }
        else {
            if !diff(&mut done[offset]).is_zero() {
                offset += 1;
            }
            slice.swap(offset, index);
        }
    }
    if offset < slice.len() && !diff(&mut slice[offset]).is_zero() {
        offset += 1;
    }
    offset
}
