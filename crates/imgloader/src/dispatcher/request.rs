use crate::{promise::Resolver, types::ImageDimensions, validate::ValidUri};
use tokio::sync::oneshot;

/// A message sent from the module to the execution context.
#[derive(Debug)]
pub(crate) enum WorkRequest {
    /// Fetch and persist `uri`, then settle with `true`.
    Prefetch {
        uri: ValidUri,
        resolver: Resolver<bool>,
    },

    /// Resolve the dimensions of the image behind `uri`.
    GetSize {
        uri: ValidUri,
        resolver: Resolver<ImageDimensions>,
    },

    /// Stop accepting work, drain, and acknowledge via `response`.
    Shutdown { response: oneshot::Sender<()> },
}

impl WorkRequest {
    /// Rejects a request that will never run with its operation's failure
    /// kind. A shutdown request is simply dropped.
    pub(crate) fn reject(self, message: &str) {
        match self {
            Self::Prefetch { resolver, .. } => {
                let err = resolver.operation().failure(message);
                resolver.reject(err);
            }
            Self::GetSize { resolver, .. } => {
                let err = resolver.operation().failure(message);
                resolver.reject(err);
            }
            Self::Shutdown { .. } => {}
        }
    }
}
