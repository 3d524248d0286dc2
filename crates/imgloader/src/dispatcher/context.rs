use super::{
    Collaborators, ContextConfig, get_size::handle_get_size, prefetch::handle_prefetch,
    request::WorkRequest,
};
use crate::collaborator::{ImageCache, ImageFactory, StreamSource};
use core::time::Duration;
use std::{io, rc::Rc};
use tokio::{
    runtime,
    sync::mpsc,
    task::LocalSet,
    time::timeout,
};
use tokio_util::task::TaskTracker;

/// Message queued requests are rejected with once the context stops.
pub const SHUTTING_DOWN_MESSAGE: &str = "image loader is shutting down";

/// Starts the serialized execution context on a dedicated thread.
///
/// The thread drives a current-thread runtime with a [`LocalSet`]; every
/// request becomes a local task, so requests interleave at their await points
/// but never run in parallel, and nothing created on the context can leave
/// it.
///
/// # Errors
///
/// Returns an error if the runtime cannot be built or the thread cannot be
/// spawned.
pub(crate) fn spawn_context<C, S, F>(
    collaborators: Collaborators<C, S, F>,
    config: &ContextConfig,
) -> io::Result<mpsc::UnboundedSender<WorkRequest>>
where
    C: ImageCache + Send,
    S: StreamSource + Send,
    F: ImageFactory<S::Stream> + Send,
{
    let (tx, rx) = mpsc::unbounded_channel();

    // Built here so that a failure surfaces to the caller instead of killing
    // the thread.
    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let shutdown_timeout = config.shutdown_timeout;

    std::thread::Builder::new()
        .name(config.thread_name.clone())
        .spawn(move || {
            let local = LocalSet::new();
            local.block_on(&runtime, context_loop(rx, collaborators, shutdown_timeout));
        })?;

    Ok(tx)
}

/// Receives [`WorkRequest`]s and spawns one local task per request until a
/// shutdown request arrives or every sender is gone.
///
/// On the way out, in-flight requests get `shutdown_timeout` to settle and
/// whatever is still queued is rejected.
pub(crate) async fn context_loop<C, S, F>(
    mut rx: mpsc::UnboundedReceiver<WorkRequest>,
    collaborators: Collaborators<C, S, F>,
    shutdown_timeout: Duration,
) where
    C: ImageCache,
    S: StreamSource,
    F: ImageFactory<S::Stream>,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Execution context started");

    let Collaborators {
        cache,
        streams,
        images,
    } = collaborators;
    let cache = Rc::new(cache);
    let streams = Rc::new(streams);
    let images = Rc::new(images);

    let tracker = TaskTracker::new();
    let mut shutdown_ack = None;

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Prefetch { uri, resolver } => {
                tracker.spawn_local(handle_prefetch(Rc::clone(&cache), uri, resolver));
            }
            WorkRequest::GetSize { uri, resolver } => {
                tracker.spawn_local(handle_get_size(
                    Rc::clone(&cache),
                    Rc::clone(&streams),
                    Rc::clone(&images),
                    uri,
                    resolver,
                ));
            }
            WorkRequest::Shutdown { response } => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Execution context received shutdown signal");
                shutdown_ack = Some(response);
                break;
            }
        }
    }

    // === Drain in-flight requests ===
    tracker.close();
    #[cfg(feature = "tracing")]
    tracing::debug!("Draining {} in-flight requests", tracker.len());

    if timeout(shutdown_timeout, tracker.wait()).await.is_err() {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            "Drain timed out ({} requests still in flight)",
            tracker.len()
        );
    }

    // === Reject whatever is still queued ===
    rx.close();
    while let Ok(work) = rx.try_recv() {
        work.reject(SHUTTING_DOWN_MESSAGE);
    }

    if let Some(response) = shutdown_ack {
        if response.send(()).is_err() {
            #[cfg(feature = "tracing")]
            tracing::error!("Execution context failed to acknowledge shutdown");
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Execution context stopped");
    // Tasks that outlived the drain are dropped with the `LocalSet`, and their
    // resolvers reject from `Drop`.
}
