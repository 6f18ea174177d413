//! The dataflow runtime: scopes, the operators they host, and the channels between them.

pub mod channels;
pub mod operate;
pub mod scope;

pub use self::operate::{Notifier, Operate};
pub use self::scope::Scope;
