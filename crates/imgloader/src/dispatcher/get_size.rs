use super::settle;
use crate::{
    collaborator::{DecodableImage, ImageCache, ImageFactory, StreamSource},
    error::BoxError,
    promise::Resolver,
    telemetry::InflightGuard,
    types::ImageDimensions,
    validate::ValidUri,
};
use core::fmt;
use std::{rc::Rc, time::Instant};
use url::Url;

/// Which collaborator resolves a URI. Decided once per request; there is no
/// fallback from one branch to the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SchemeClass {
    /// Network-fetchable: resolved through the cache.
    Remote,
    /// Everything else: opened and decoded directly.
    Local,
}

impl SchemeClass {
    pub(crate) fn classify<S: StreamSource>(streams: &S, uri: &str) -> Self {
        if streams.is_remote_scheme(uri) {
            Self::Remote
        } else {
            Self::Local
        }
    }
}

/// Progress of a local-branch request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LocalState {
    Created,
    StreamOpening,
    Decoding,
    Succeeded,
    Failed,
}

impl LocalState {
    const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::StreamOpening)
                | (Self::StreamOpening, Self::Decoding | Self::Failed)
                | (Self::Decoding, Self::Succeeded | Self::Failed)
        )
    }
}

impl fmt::Display for LocalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::StreamOpening => "stream-opening",
            Self::Decoding => "decoding",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        })
    }
}

/// Handles a get-size request on the execution context.
///
/// Remote URIs go to the cache's decode path; everything else is opened with
/// the stream source and decoded by a fresh image. Every failure settles as
/// `E_GET_SIZE_FAILURE`.
#[cfg_attr(feature = "tracing", tracing::instrument(name = "get_size", skip_all, fields(uri = %uri)))]
pub(crate) async fn handle_get_size<C, S, F>(
    cache: Rc<C>,
    streams: Rc<S>,
    images: Rc<F>,
    uri: ValidUri,
    resolver: Resolver<ImageDimensions>,
) where
    C: ImageCache,
    S: StreamSource,
    F: ImageFactory<S::Stream>,
{
    let started = Instant::now();
    let _inflight = InflightGuard::enter(resolver.operation());

    let class = SchemeClass::classify(&*streams, uri.as_str());
    #[cfg(feature = "tracing")]
    tracing::trace!(?class, "classified");

    let outcome = match class {
        SchemeClass::Remote => resolve_remote(&*cache, &uri).await,
        SchemeClass::Local => resolve_local(&*streams, &*images, &uri).await,
    };
    settle(resolver, outcome, started);
}

async fn resolve_remote<C: ImageCache>(
    cache: &C,
    uri: &ValidUri,
) -> Result<ImageDimensions, BoxError> {
    let uri = Url::parse(uri.as_str())?;
    let handle = cache.ensure_present_decoded(&uri, true).await?;
    Ok(handle.into())
}

async fn resolve_local<S, F>(
    streams: &S,
    images: &F,
    uri: &ValidUri,
) -> Result<ImageDimensions, BoxError>
where
    S: StreamSource,
    F: ImageFactory<S::Stream>,
{
    let mut state = LocalState::Created;
    let outcome = decode_local(streams, images, uri, &mut state).await;

    let terminal = if outcome.is_ok() {
        LocalState::Succeeded
    } else {
        LocalState::Failed
    };
    advance(&mut state, terminal);
    outcome
}

/// Opens, feeds and waits. The stream lives in this frame only, so it is
/// released exactly once on every path past a successful open, and never
/// when opening fails.
async fn decode_local<S, F>(
    streams: &S,
    images: &F,
    uri: &ValidUri,
    state: &mut LocalState,
) -> Result<ImageDimensions, BoxError>
where
    S: StreamSource,
    F: ImageFactory<S::Stream>,
{
    let image = images.create();
    // Subscribe before feeding so a synchronous decoder cannot emit load-end
    // before anyone listens.
    let load_end = image.load_events().load_end();

    advance(state, LocalState::StreamOpening);
    let mut stream = streams.open_stream(uri.as_str()).await?;

    advance(state, LocalState::Decoding);
    image.set_source(&mut stream).await?;
    load_end.await?;
    drop(stream);

    Ok(ImageDimensions::new(image.pixel_width(), image.pixel_height()))
}

fn advance(state: &mut LocalState, next: LocalState) {
    debug_assert!(
        state.can_advance_to(next),
        "invalid transition {state} -> {next}"
    );
    #[cfg(feature = "tracing")]
    tracing::trace!("{state} -> {next}");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_the_local_state_machine() {
        use LocalState::*;

        assert!(Created.can_advance_to(StreamOpening));
        assert!(StreamOpening.can_advance_to(Decoding));
        assert!(StreamOpening.can_advance_to(Failed));
        assert!(Decoding.can_advance_to(Succeeded));
        assert!(Decoding.can_advance_to(Failed));

        assert!(!Created.can_advance_to(Decoding));
        assert!(!StreamOpening.can_advance_to(Succeeded));
        assert!(!Succeeded.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Succeeded));
    }
}
