//! Core types for lifecall.
//!
//! - [`id`]: Timestamps (`Time`) and identifier generation
//! - [`outcome`]: Two-valued outcome delivered by a completed call
//! - [`pressure`]: Low-resource-pressure state and broadcast

pub mod id;
pub mod outcome;
pub mod pressure;

pub use id::{Time, generate_id};
pub use outcome::Outcome;
pub use pressure::{
    DEFAULT_PRESSURE_THRESHOLD, PressureListener, PressureSubscription, SystemPressure,
};
