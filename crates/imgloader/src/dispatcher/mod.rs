//! Resolution dispatcher and the serialized execution context it runs on.
//!
//! ## Structure
//!
//! - [`context`] - the context thread and its receive loop.
//! - [`prefetch`] - the prefetch path (cache only).
//! - [`get_size`] - the get-size path (cache for remote URIs, direct stream
//!   and decode for everything else).
//! - [`request`] - messages sent from the module to the context.
//!
//! Every request ends in [`settle`], which converts collaborator failures
//! into the operation's typed rejection and settles the promise exactly once.

mod config;
pub(crate) mod context;
pub(crate) mod get_size;
pub(crate) mod prefetch;
pub(crate) mod request;

pub use config::*;

use crate::{
    error::BoxError,
    promise::Resolver,
    telemetry::record_resolution_duration,
};
use std::time::Instant;

/// The collaborators a context drives.
///
/// Moved onto the context thread when the module starts and shared by every
/// request from then on.
#[derive(Debug)]
pub struct Collaborators<C, S, F> {
    pub cache: C,
    pub streams: S,
    pub images: F,
}

/// Settles `resolver` with `outcome`.
///
/// A collaborator error becomes the operation's failure kind, its message
/// copied verbatim.
pub(crate) fn settle<T>(resolver: Resolver<T>, outcome: Result<T, BoxError>, started: Instant) {
    let op = resolver.operation();
    record_resolution_duration(op, started.elapsed().as_secs_f64() * 1_000.0);

    match outcome {
        Ok(value) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(%op, "request resolved");
            resolver.resolve(value);
        }
        Err(source) => {
            let err = op.failure(source.to_string());
            #[cfg(feature = "tracing")]
            tracing::warn!(%op, code = err.code(), "request rejected: {err}");
            resolver.reject(err);
        }
    }
}
