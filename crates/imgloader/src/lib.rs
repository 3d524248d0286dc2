#![doc = include_str!("../README.md")]

mod collaborator;
mod dispatcher;
mod error;
mod module;
mod promise;
mod telemetry;
mod types;
mod validate;

pub use crate::collaborator::*;
pub use crate::dispatcher::{Collaborators, ContextConfig};
pub use crate::error::*;
pub use crate::module::*;
pub use crate::promise::*;
#[cfg(feature = "metrics")]
pub use crate::telemetry::init_metric_handles;
pub use crate::types::*;
pub use crate::validate::*;
