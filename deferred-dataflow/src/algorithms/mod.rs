//! Algorithms built from the generic operators.

pub mod graphs;
