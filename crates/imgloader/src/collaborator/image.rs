//! Decodable image objects and their load-status events.
//!
//! An image reports decode progress as a sequence of [`LoadStatus`] events.
//! Waiting for completion follows a subscribe-first pattern: the dispatcher
//! calls [`DecodableImage::load_events`] *before* feeding the stream, and the
//! returned [`LoadEvents`] buffers everything emitted from then on. A decoder
//! that finishes synchronously inside `set_source` therefore cannot outrun the
//! waiter.

use crate::error::BoxError;
use core::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::UnboundedReceiverStream};

/// Message a wait fails with when the image stops emitting events before it
/// reported completion.
pub const LOAD_EVENTS_ENDED: &str = "image load events ended before the image finished loading";

/// A load-status event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Started,
    Progress,
    /// Decode completed; dimensions can be read.
    Ended,
    /// Decode failed with a message.
    Failed(String),
}

/// Builds decodable images on the execution context.
///
/// The factory travels to the context when it starts; the images it creates
/// never leave it.
pub trait ImageFactory<S>: 'static {
    type Image: DecodableImage<S>;

    fn create(&self) -> Self::Image;
}

/// A UI-affine image object fed from a stream `S`.
///
/// Implementations may hold `!Send` state; they are created, fed and read on
/// the execution context only.
pub trait DecodableImage<S> {
    /// Subscribes to this image's load-status events.
    ///
    /// Events emitted after this call are buffered until read.
    fn load_events(&self) -> LoadEvents;

    /// Feeds `stream` to the decoder.
    ///
    /// Completion is reported through [`LoadStatus::Ended`], which may be
    /// emitted before this future resolves.
    ///
    /// # Errors
    ///
    /// Any failure reading or decoding the stream.
    fn set_source(&self, stream: &mut S) -> impl Future<Output = Result<(), BoxError>>;

    fn pixel_width(&self) -> u32;

    fn pixel_height(&self) -> u32;
}

/// Fan-out emitter for [`LoadStatus`] events.
///
/// Embed one in a [`DecodableImage`] implementation: hand out
/// [`subscribe`](Self::subscribe) from `load_events` and call
/// [`emit`](Self::emit) from the decoder. Each subscriber gets its own
/// unbounded queue; subscribers that went away are pruned on the next emit.
#[derive(Debug, Default)]
pub struct LoadEventSource {
    subscribers: RefCell<Vec<mpsc::UnboundedSender<LoadStatus>>>,
}

impl LoadEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> LoadEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.borrow_mut().push(tx);
        LoadEvents {
            inner: UnboundedReceiverStream::new(rx),
        }
    }

    pub fn emit(&self, status: LoadStatus) {
        self.subscribers
            .borrow_mut()
            .retain(|tx| tx.send(status.clone()).is_ok());
    }

    /// Ends every subscription. Pending waits fail with
    /// [`LOAD_EVENTS_ENDED`] unless they already saw a terminal event.
    pub fn close(&self) {
        self.subscribers.borrow_mut().clear();
    }
}

/// A buffered subscription to an image's load-status events.
#[derive(Debug)]
pub struct LoadEvents {
    inner: UnboundedReceiverStream<LoadStatus>,
}

impl LoadEvents {
    /// Waits for the first terminal event.
    ///
    /// Resolves on the first [`LoadStatus::Ended`], including one emitted
    /// before this future was first polled.
    ///
    /// # Errors
    ///
    /// - The message of a [`LoadStatus::Failed`] event, verbatim.
    /// - [`LOAD_EVENTS_ENDED`] if the source went away first.
    pub async fn load_end(mut self) -> Result<(), BoxError> {
        while let Some(status) = self.next().await {
            match status {
                LoadStatus::Ended => return Ok(()),
                LoadStatus::Failed(message) => return Err(message.into()),
                LoadStatus::Started | LoadStatus::Progress => {}
            }
        }
        Err(LOAD_EVENTS_ENDED.into())
    }
}

impl Stream for LoadEvents {
    type Item = LoadStatus;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_end_emitted_before_the_wait() {
        let source = LoadEventSource::new();
        let events = source.subscribe();

        source.emit(LoadStatus::Started);
        source.emit(LoadStatus::Progress);
        source.emit(LoadStatus::Ended);

        assert!(events.load_end().await.is_ok());
    }

    #[tokio::test]
    async fn first_terminal_event_wins() {
        let source = LoadEventSource::new();
        let events = source.subscribe();

        source.emit(LoadStatus::Failed("corrupt header".into()));
        source.emit(LoadStatus::Ended);

        let err = events.load_end().await.unwrap_err();
        assert_eq!(err.to_string(), "corrupt header");
    }

    #[tokio::test]
    async fn closed_source_ends_the_wait() {
        let source = LoadEventSource::new();
        let events = source.subscribe();

        source.emit(LoadStatus::Started);
        source.close();

        let err = events.load_end().await.unwrap_err();
        assert_eq!(err.to_string(), LOAD_EVENTS_ENDED);
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_events() {
        let source = LoadEventSource::new();
        source.emit(LoadStatus::Ended);

        let mut events = source.subscribe();
        source.emit(LoadStatus::Progress);
        source.close();

        assert_eq!(events.next().await, Some(LoadStatus::Progress));
        assert_eq!(events.next().await, None);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let source = LoadEventSource::new();
        let kept = source.subscribe();
        drop(source.subscribe());

        source.emit(LoadStatus::Started);
        assert_eq!(source.subscribers.borrow().len(), 1);
        drop(kept);
    }
}
