//! Dataflow operators specific to deferred dataflow.
//!
//! Stateless operators (`map`, `filter`, `concat`, and friends) are methods of `Collection`. The
//! operators here keep state across times or change the times of records, and are provided as
//! extension traits on collections.

pub use self::capture::{Capture, CaptureCursor, CaptureHandle, ProbeHandle};
pub use self::delay::{Delay, DelayClosure, DelayFn};
pub use self::iterate::{Iterate, Variable};
pub use self::join::{Join, JoinClosure, JoinFn};
pub use self::reduce::{Count, Reduce, ReduceClosure, ReduceFn, Threshold};

pub mod capture;
pub mod delay;
pub(crate) mod generic;
pub(crate) mod history;
pub mod iterate;
pub mod join;
pub mod reduce;
