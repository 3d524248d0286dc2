//! The inbound call surface.
//!
//! [`ImageLoaderModule`] is what a bridge registers with its calling runtime.
//! Both operations validate on the caller's thread and hand everything else
//! to the execution context, returning a [`Promise`] right away.

use crate::{
    collaborator::{ImageCache, ImageFactory, StreamSource},
    dispatcher::{
        Collaborators, ContextConfig,
        context::spawn_context,
        request::WorkRequest,
    },
    promise::{self, Promise},
    telemetry::increment_requests,
    types::{ImageDimensions, Operation},
    validate::validate,
};
use core::time::Duration;
use std::io;
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

pub use crate::dispatcher::context::SHUTTING_DOWN_MESSAGE;

/// Extra time shutdown waits for the context's acknowledgement on top of its
/// drain timeout.
const SHUTDOWN_ACK_GRACE: Duration = Duration::from_secs(1);

/// Image prefetch and size resolution behind a promise contract.
///
/// Cheap to share behind an `Arc`; every method takes `&self`. Dropping the
/// last handle stops the context once in-flight requests have drained.
#[derive(Debug)]
pub struct ImageLoaderModule {
    sender: mpsc::UnboundedSender<WorkRequest>,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl ImageLoaderModule {
    /// The name the module is registered under.
    pub const NAME: &'static str = "ImageLoader";

    /// Starts the execution context and moves `collaborators` onto it.
    ///
    /// # Errors
    ///
    /// Returns an error if the context runtime or thread cannot be created.
    pub fn start<C, S, F>(
        collaborators: Collaborators<C, S, F>,
        config: ContextConfig,
    ) -> io::Result<Self>
    where
        C: ImageCache + Send,
        S: StreamSource + Send,
        F: ImageFactory<S::Stream> + Send,
    {
        let sender = spawn_context(collaborators, &config)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(thread = %config.thread_name, "Image loader started");

        Ok(Self {
            sender,
            shutdown_token: CancellationToken::new(),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    pub const fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Makes sure the image behind `uri` is fetched and persisted.
    ///
    /// Settles with `true`, or rejects with `E_INVALID_URI` (already settled
    /// when this returns) or `E_PREFETCH_FAILURE`.
    pub fn prefetch_image(&self, uri: Option<&str>) -> Promise<bool> {
        let op = Operation::Prefetch;
        increment_requests(op);

        let (resolver, promise) = promise::channel(op);
        match validate(uri, op) {
            Ok(uri) => self.submit(WorkRequest::Prefetch { uri, resolver }),
            Err(err) => resolver.reject(err),
        }
        promise
    }

    /// Resolves the pixel dimensions of the image behind `uri`.
    ///
    /// Settles with `{ width, height }`, or rejects with `E_INVALID_URI`
    /// (already settled when this returns) or `E_GET_SIZE_FAILURE`.
    pub fn get_size(&self, uri: Option<&str>) -> Promise<ImageDimensions> {
        let op = Operation::GetSize;
        increment_requests(op);

        let (resolver, promise) = promise::channel(op);
        match validate(uri, op) {
            Ok(uri) => self.submit(WorkRequest::GetSize { uri, resolver }),
            Err(err) => resolver.reject(err),
        }
        promise
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Gracefully stops the execution context.
    ///
    /// - Refuses new requests.
    /// - Lets in-flight requests settle, up to the configured shutdown
    ///   timeout; the rest are rejected.
    /// - Waits for the context to acknowledge.
    ///
    /// Calling it again is a no-op. Must be awaited inside a Tokio runtime with
    /// the time driver enabled.
    pub async fn shutdown(&self) {
        if self.shutdown_token.is_cancelled() {
            return;
        }

        // === Phase 0: Stop accepting new requests ===
        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new requests");
        self.shutdown_token.cancel();

        // === Phase 1: Ask the context to drain and stop ===
        let (tx, rx) = oneshot::channel();
        if let Err(_e) = self.sender.send(WorkRequest::Shutdown { response: tx }) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Execution context already stopped: {_e}");
            return;
        }

        // === Phase 2: Wait for the acknowledgement ===
        match timeout(self.shutdown_timeout + SHUTDOWN_ACK_GRACE, rx).await {
            Ok(Ok(())) => {
                #[cfg(feature = "tracing")]
                tracing::info!("Image loader shutdown complete");
            }
            Ok(Err(_e)) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Execution context stopped without acknowledging: {_e}");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Execution context shutdown timed out");
            }
        }
    }

    /// Queues `request` without blocking the caller. The queue is unbounded,
    /// so the only refusal is a context that is stopping or gone.
    fn submit(&self, request: WorkRequest) {
        if self.shutdown_token.is_cancelled() {
            request.reject(SHUTTING_DOWN_MESSAGE);
            return;
        }

        if let Err(mpsc::error::SendError(request)) = self.sender.send(request) {
            request.reject(SHUTTING_DOWN_MESSAGE);
        }
    }
}
