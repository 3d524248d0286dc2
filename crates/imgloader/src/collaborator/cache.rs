use crate::{error::BoxError, types::DecodedHandle};
use core::future::Future;
use url::Url;

/// Content-addressable image store keyed by URI.
///
/// Shared by every request in flight. The dispatcher adds no locking around
/// it: coalescing duplicate fetches for the same URI, eviction and retries are
/// up to the implementation.
pub trait ImageCache: 'static {
    /// Makes sure the image behind `uri` is fetched.
    ///
    /// - `warm`: also keep a decoded in-memory form, so a later
    ///   [`ensure_present_decoded`](Self::ensure_present_decoded) on the same
    ///   URI is cheap.
    /// - `persist`: store the bytes durably.
    ///
    /// # Errors
    ///
    /// Any network, decode or storage failure. Its `Display` output becomes
    /// the rejection message.
    fn ensure_present(
        &self,
        uri: &Url,
        warm: bool,
        persist: bool,
    ) -> impl Future<Output = Result<(), BoxError>>;

    /// Makes sure the image behind `uri` is present and returns its decoded
    /// handle.
    ///
    /// # Errors
    ///
    /// Any network, decode or storage failure.
    fn ensure_present_decoded(
        &self,
        uri: &Url,
        persist: bool,
    ) -> impl Future<Output = Result<DecodedHandle, BoxError>>;
}
