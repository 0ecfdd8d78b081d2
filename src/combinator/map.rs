//! Outcome transformation.
//!
//! The transform runs on whatever thread delivered the inner outcome. A panic
//! inside it is a contract violation and unwinds through that thread; it is
//! not turned into an error outcome.

use super::wrapped::Relay;
use crate::call::{CallRef, Sink};
use crate::types::Outcome;
use std::sync::Arc;

type Transform<T, U> = Arc<dyn Fn(Outcome<T>) -> Outcome<U> + Send + Sync + 'static>;

/// Relay applying a transform to the inner outcome.
pub struct MapResult<T, U> {
    transform: Transform<T, U>,
}

impl<T, U> MapResult<T, U> {
    /// Creates the relay.
    pub fn new(transform: impl Fn(Outcome<T>) -> Outcome<U> + Send + Sync + 'static) -> Self {
        Self {
            transform: Arc::new(transform),
        }
    }
}

impl<T: Send + 'static, U: Send + 'static> Relay<T, U> for MapResult<T, U> {
    const NAME: &'static str = "map_result";

    fn launch(&self, inner: &CallRef<T>, sink: Sink<U>) {
        let transform = Arc::clone(&self.transform);
        inner.start(Box::new(move |outcome| {
            sink.finish(transform(outcome));
        }));
    }
}
