//! Lifecall: composable, cancellable callback calls bound to an owner's lifetime.
//!
//! # Overview
//!
//! A [`Call`] is a unit of asynchronous work that delivers exactly one
//! [`Outcome`] to a callback, or nothing at all if it is cancelled first.
//! Calls compose: decorators transform, guard, time-limit, re-route or chain
//! them, and a group joins a keyed set of them. Calls can be deposited into a
//! [`Lifetime`], which cancels everything it holds when the owner dies and
//! evicts finished work under low-resource pressure.
//!
//! # Core Guarantees
//!
//! - **At most one delivery**: a start produces at most one callback invocation
//! - **Cancel wins**: once `cancel` returns, the callback of the cancelled
//!   attempt never runs
//! - **No owner, no work**: when an owner dies every deposited resource gets
//!   exactly one `will_remove`
//! - **Deterministic testing**: [`LabExecutor`] drives the work queue, the main
//!   context and virtual time by hand
//!
//! # Module Structure
//!
//! - [`call`]: The call contract, concrete calls and the decorator surface
//! - [`combinator`]: Decorators, group join and delayed triggers
//! - [`lifetime`]: Depositables, the deposit registry and the death notifier
//! - [`runtime`]: Executors: threaded runtime and deterministic lab executor
//! - [`sync`]: Reentrant lock and blocking semaphore
//! - [`types`]: Outcomes, identifiers and system pressure
//! - [`error`](mod@error): Error types
//! - [`tracing_compat`]: Optional tracing integration (requires `tracing-integration` feature)
//!
//! # Example
//!
//! ```
//! use lifecall::{Call, CallExt, ComposableCall, LabExecutor, Lifetime, Outcome};
//!
//! let lab = LabExecutor::new();
//! let owner = Lifetime::new();
//!
//! let call = ComposableCall::new(lab.dispatcher(), Outcome::value(20))
//!     .into_ref()
//!     .map_result(|outcome| outcome.map(|v| v + 1))
//!     .deposit(&owner, Some("answer"));
//! call.start(Box::new(|outcome| assert_eq!(outcome, Outcome::value(21))));
//! lab.run_until_idle();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]

// Macro definitions must precede their users.
pub mod tracing_compat;

pub mod call;
pub mod combinator;
pub mod error;
pub mod lifetime;
pub mod runtime;
pub mod sync;
pub mod types;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use call::{BaseCall, Call, CallExt, CallRef, Callback, ComposableCall};
pub use combinator::{Delay, GroupOutcome, after, group};
pub use error::{CallError, ConfigError, ErrorKind};
pub use lifetime::{DeathNotifier, Depositable, Lifetime, ObserverHandle};
pub use runtime::{Dispatcher, LabExecutor, RuntimeBuilder, RuntimeConfig, ThreadedRuntime};
pub use types::{Outcome, SystemPressure};
