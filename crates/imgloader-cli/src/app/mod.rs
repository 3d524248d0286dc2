//! Concrete collaborators and the ambient plumbing of the `imgloader` binary.
//!
//! ## Structure
//!
//! - [`config`] - CLI arguments, environment fallbacks and validation.
//! - [`cache`] - On-disk, content-addressed image cache fetched over HTTP.
//! - [`streams`] - Local file streams for non-network URIs.
//! - [`image`] - Header-only decodable image used for local URIs.
//! - [`report`] - One JSON line per URI on stdout.
//! - [`telemetry`] - Log output and optional OpenTelemetry export.

pub mod cache;
pub mod config;
pub mod image;
pub mod report;
pub mod streams;
pub mod telemetry;
