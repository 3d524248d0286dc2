//! Single-assignment settlement channel.
//!
//! A [`Resolver`] / [`Promise`] pair wraps a [`oneshot`] channel. The resolver
//! is consumed by [`Resolver::resolve`] or [`Resolver::reject`], so settling
//! twice does not compile. A resolver that is dropped unsettled (a panicking
//! collaborator, a context that stopped before running the request) rejects
//! from its destructor, so a promise never hangs.

use crate::{error::Error, telemetry::increment_failures, types::Operation};
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::oneshot;

/// Message a promise settles with when its resolver was dropped unsettled.
pub const DROPPED_MESSAGE: &str = "request was dropped before it settled";

type Outcome<T> = Result<T, Error>;

/// Creates a connected [`Resolver`] / [`Promise`] pair for `op`.
pub fn channel<T>(op: Operation) -> (Resolver<T>, Promise<T>) {
    let (tx, rx) = oneshot::channel();
    let promise = Promise { rx: Some(rx), op };
    (Resolver { tx: Some(tx), op }, promise)
}

/// The producing half. Settles its [`Promise`] exactly once.
#[derive(Debug)]
pub struct Resolver<T> {
    // Only `None` once settled; every public path consumes `self`.
    tx: Option<oneshot::Sender<Outcome<T>>>,
    op: Operation,
}

impl<T> Resolver<T> {
    pub fn resolve(mut self, value: T) {
        self.settle(Ok(value));
    }

    pub fn reject(mut self, err: Error) {
        self.settle(Err(err));
    }

    /// The operation this resolver settles.
    pub const fn operation(&self) -> Operation {
        self.op
    }

    /// Returns `true` if the [`Promise`] has been dropped and nobody is
    /// waiting for the outcome anymore.
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_none_or(oneshot::Sender::is_closed)
    }

    fn settle(&mut self, outcome: Outcome<T>) {
        if let Some(tx) = self.tx.take() {
            if let Err(err) = &outcome {
                increment_failures(err.kind());
            }
            if tx.send(outcome).is_err() {
                #[cfg(feature = "tracing")]
                tracing::trace!(op = %self.op, "promise dropped before settlement");
            }
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            #[cfg(feature = "tracing")]
            tracing::warn!(op = %self.op, "resolver dropped unsettled");
            let err = self.op.failure(DROPPED_MESSAGE);
            self.settle(Err(err));
        }
    }
}

/// The consuming half: a future resolving to the settled outcome.
#[derive(Debug)]
#[must_use = "a promise does nothing unless awaited or polled"]
pub struct Promise<T> {
    // `None` once the outcome has been handed out.
    rx: Option<oneshot::Receiver<Outcome<T>>>,
    op: Operation,
}

impl<T> Promise<T> {
    /// A promise that is already rejected with `err`.
    pub fn rejected(op: Operation, err: Error) -> Self {
        let (resolver, promise) = channel(op);
        resolver.reject(err);
        promise
    }

    /// The operation this promise belongs to.
    pub const fn operation(&self) -> Operation {
        self.op
    }

    /// Takes the outcome if the promise has already settled, without waiting.
    ///
    /// Returns `None` while the request is still in flight. The outcome is
    /// handed out once; later calls and polls report the promise as dropped.
    pub fn try_settled(&mut self) -> Option<Outcome<T>> {
        let Some(rx) = self.rx.as_mut() else {
            return Some(Err(self.dropped()));
        };

        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(self.dropped()),
        };
        self.rx = None;
        Some(outcome)
    }

    fn dropped(&self) -> Error {
        self.op.failure(DROPPED_MESSAGE)
    }
}

impl<T> Future for Promise<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(Err(self.dropped()));
        };

        let outcome = match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => outcome,
            Poll::Ready(Err(_)) => Err(self.dropped()),
            Poll::Pending => return Poll::Pending,
        };
        self.rx = None;
        Poll::Ready(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn resolves_with_value() {
        let (resolver, promise) = channel(Operation::Prefetch);
        resolver.resolve(true);
        assert_eq!(promise.await, Ok(true));
    }

    #[tokio::test]
    async fn rejects_with_error() {
        let (resolver, promise) = channel::<bool>(Operation::Prefetch);
        resolver.reject(Operation::Prefetch.failure("timeout"));

        let err = promise.await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrefetchFailure);
        assert_eq!(err.message(), "timeout");
    }

    #[tokio::test]
    async fn dropped_resolver_rejects_with_operation_kind() {
        let (resolver, promise) = channel::<u32>(Operation::GetSize);
        drop(resolver);

        let err = promise.await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeResolutionFailure);
        assert_eq!(err.message(), DROPPED_MESSAGE);
    }

    #[tokio::test]
    async fn resolver_moved_across_threads() {
        let (resolver, promise) = channel(Operation::GetSize);
        std::thread::spawn(move || resolver.resolve(7_u32))
            .join()
            .unwrap();
        assert_eq!(promise.await, Ok(7));
    }

    #[test]
    fn try_settled_is_none_while_pending() {
        let (resolver, mut promise) = channel::<bool>(Operation::Prefetch);
        assert!(promise.try_settled().is_none());
        resolver.resolve(true);
        assert_eq!(promise.try_settled(), Some(Ok(true)));
    }

    #[tokio::test]
    async fn outcome_is_handed_out_once() {
        let (resolver, mut promise) = channel::<bool>(Operation::Prefetch);
        resolver.resolve(true);
        assert_eq!(promise.try_settled(), Some(Ok(true)));

        let again = promise.try_settled().unwrap().unwrap_err();
        assert_eq!(again.message(), DROPPED_MESSAGE);

        let err = promise.await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrefetchFailure);
        assert_eq!(err.message(), DROPPED_MESSAGE);
    }

    #[tokio::test]
    async fn awaiting_a_polled_promise_again_reports_it_dropped() {
        let (resolver, mut promise) = channel::<u32>(Operation::GetSize);
        resolver.resolve(3);
        assert_eq!((&mut promise).await, Ok(3));

        let err = promise.await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeResolutionFailure);
        assert_eq!(err.message(), DROPPED_MESSAGE);
    }

    #[test]
    fn rejected_is_settled_immediately() {
        let err = Error::new(ErrorKind::InvalidUri, "empty");
        let mut promise = Promise::<bool>::rejected(Operation::Prefetch, err.clone());
        assert_eq!(promise.try_settled(), Some(Err(err)));
    }

    #[test]
    fn is_closed_tracks_the_promise() {
        let (resolver, promise) = channel::<bool>(Operation::Prefetch);
        assert!(!resolver.is_closed());
        drop(promise);
        assert!(resolver.is_closed());
        // Settling into a dropped promise is harmless.
        resolver.resolve(true);
    }
}
