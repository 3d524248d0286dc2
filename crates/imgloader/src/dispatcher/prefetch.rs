use super::settle;
use crate::{
    collaborator::ImageCache, error::BoxError, promise::Resolver, telemetry::InflightGuard,
    validate::ValidUri,
};
use std::{rc::Rc, time::Instant};
use url::Url;

/// Handles a prefetch request on the execution context.
///
/// Asks the cache to fetch, persist and warm the image, then settles with
/// `true`. Every failure, including a URI that does not parse, settles as
/// `E_PREFETCH_FAILURE`.
#[cfg_attr(feature = "tracing", tracing::instrument(name = "prefetch", skip_all, fields(uri = %uri)))]
pub(crate) async fn handle_prefetch<C>(cache: Rc<C>, uri: ValidUri, resolver: Resolver<bool>)
where
    C: ImageCache,
{
    let started = Instant::now();
    let _inflight = InflightGuard::enter(resolver.operation());

    // TODO: honour cancellation once the bridge can signal it; a dispatched
    // prefetch currently always runs to completion.
    let outcome = prefetch(&*cache, &uri).await;
    settle(resolver, outcome, started);
}

async fn prefetch<C: ImageCache>(cache: &C, uri: &ValidUri) -> Result<bool, BoxError> {
    let uri = Url::parse(uri.as_str())?;
    cache.ensure_present(&uri, true, true).await?;
    Ok(true)
}
