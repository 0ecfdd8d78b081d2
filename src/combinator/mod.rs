//! Combinators that decorate and join calls.
//!
//! Every decorator is one [`Wrapped`] struct holding the inner call plus a
//! [`Relay`] strategy:
//!
//! - [`MapResult`]: transform the outcome
//! - [`Once`]: ignore every start after the first
//! - [`Intercept`]: observe the outcome without changing it
//! - [`MainContext`]: deliver the outcome on the main context
//! - [`Timeout`]: race the call against a deadline
//! - [`SyncWait`]: block the starting thread until completion
//! - [`Sequence`]: continue with a call built from the outcome
//!
//! [`group`] joins a keyed set of calls and [`after`] schedules a delayed
//! trigger. The ergonomic surface is [`CallExt`](crate::call::CallExt).

pub mod delay;
pub mod group;
pub mod intercept;
pub mod main_context;
pub mod map;
pub mod once;
pub mod sequence;
pub mod sync;
pub mod timeout;
pub mod wrapped;

pub use delay::{Delay, after};
pub use group::{Group, GroupOutcome, group};
pub use intercept::Intercept;
pub use main_context::MainContext;
pub use map::MapResult;
pub use once::Once;
pub use sequence::{NextCall, Sequence};
pub use sync::SyncWait;
pub use timeout::Timeout;
pub use wrapped::{PassThrough, Relay, Wrapped};
