//! Graph algorithms over collections of edges.
//!
//! Each algorithm is an ordinary dataflow fragment: it reads collections of edges and seed
//! records and returns a collection, which is maintained incrementally as its inputs change.

pub mod propagate;
pub mod sssp;
