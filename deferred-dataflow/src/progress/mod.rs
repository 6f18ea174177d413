//! Progress tracking: which times may still appear where.
//!
//! Every unit of outstanding work holds its time at the location that will perform it, input
//! sessions hold their current time, and iteration scopes hold the outer times at which inner work
//! remains. A time is complete at a location once no hold that can reach the location is less
//! than or equal to it.

pub mod frontier;
pub mod tracker;

pub use self::frontier::LocationFrontier;
pub use self::tracker::Tracker;
