//! Request metrics.
//!
//! With the `metrics` feature, the functions below record into OpenTelemetry
//! instruments registered by [`init_metric_handles`]. Until that is called,
//! or without the feature, they compile to no-ops.
//!
//! | Instrument            | Kind           | Attributes  |
//! | --------------------- | -------------- | ----------- |
//! | `requests`            | counter        | `operation` |
//! | `failures`            | counter        | `code`      |
//! | `inflight`            | up-down counter| `operation` |
//! | `resolution_duration` | histogram (ms) | `operation` |
//!
//! `failures` counts every rejection, including invalid URIs and requests
//! dropped or refused before they ran.

#[cfg(feature = "metrics")]
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter, UpDownCounter},
};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

use crate::{error::ErrorKind, types::Operation};

#[cfg(feature = "metrics")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static FAILURES: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static INFLIGHT: OnceLock<UpDownCounter<i64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static RESOLUTION_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();

/// Registers the request instruments on `meter`.
///
/// Only the first call takes effect.
#[cfg(feature = "metrics")]
pub fn init_metric_handles(meter: Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("requests")
            .with_description("Image loader requests received")
            .build(),
    );

    let _ = FAILURES.set(
        meter
            .u64_counter("failures")
            .with_description("Rejected image loader requests")
            .build(),
    );

    let _ = INFLIGHT.set(
        meter
            .i64_up_down_counter("inflight")
            .with_description("Requests running on the execution context")
            .build(),
    );

    let _ = RESOLUTION_DURATION_MS.set(
        meter
            .f64_histogram("resolution_duration")
            .with_unit("ms")
            .with_description("Time from dispatch to settlement")
            .build(),
    );
}

#[cfg(feature = "metrics")]
fn operation_attrs(op: Operation) -> [KeyValue; 1] {
    [KeyValue::new("operation", op.name())]
}

#[cfg(feature = "metrics")]
pub(crate) fn increment_requests(op: Operation) {
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &operation_attrs(op));
    }
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn increment_requests(_op: Operation) {}

#[cfg(feature = "metrics")]
pub(crate) fn increment_failures(kind: ErrorKind) {
    if let Some(counter) = FAILURES.get() {
        counter.add(1, &[KeyValue::new("code", kind.code())]);
    }
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn increment_failures(_kind: ErrorKind) {}

/// Counts a request as in flight until dropped, which also covers requests
/// that panic or are dropped with the context.
#[derive(Debug)]
pub(crate) struct InflightGuard {
    op: Operation,
}

impl InflightGuard {
    pub(crate) fn enter(op: Operation) -> Self {
        increment_inflight(op);
        Self { op }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        decrement_inflight(self.op);
    }
}

#[cfg(feature = "metrics")]
fn increment_inflight(op: Operation) {
    if let Some(counter) = INFLIGHT.get() {
        counter.add(1, &operation_attrs(op));
    }
}

#[cfg(not(feature = "metrics"))]
fn increment_inflight(_op: Operation) {}

#[cfg(feature = "metrics")]
fn decrement_inflight(op: Operation) {
    if let Some(counter) = INFLIGHT.get() {
        counter.add(-1, &operation_attrs(op));
    }
}

#[cfg(not(feature = "metrics"))]
fn decrement_inflight(_op: Operation) {}

#[cfg(feature = "metrics")]
pub(crate) fn record_resolution_duration(op: Operation, duration_ms: f64) {
    if let Some(histogram) = RESOLUTION_DURATION_MS.get() {
        histogram.record(duration_ms, &operation_attrs(op));
    }
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_resolution_duration(_op: Operation, _duration_ms: f64) {}
