use crate::error::BoxError;
use core::future::Future;

/// Opens byte streams for URIs the cache does not handle.
pub trait StreamSource: 'static {
    /// The stream handed to [`DecodableImage::set_source`].
    ///
    /// Dropping it releases the underlying resource.
    ///
    /// [`DecodableImage::set_source`]: crate::DecodableImage::set_source
    type Stream;

    /// Whether `uri` is network-fetchable and therefore goes through the
    /// cache. Defaults to [`is_http_uri`].
    fn is_remote_scheme(&self, uri: &str) -> bool {
        is_http_uri(uri)
    }

    /// Opens a stream over the bytes behind `uri`.
    ///
    /// # Errors
    ///
    /// Any failure to locate or open the resource.
    fn open_stream(&self, uri: &str) -> impl Future<Output = Result<Self::Stream, BoxError>>;
}

/// Returns `true` for `http:` and `https:` URIs, ignoring scheme case.
pub fn is_http_uri(uri: &str) -> bool {
    match uri.split_once(':') {
        Some((scheme, _)) => {
            scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_schemes_are_remote() {
        assert!(is_http_uri("http://example.com/a.png"));
        assert!(is_http_uri("https://example.com/a.png"));
        assert!(is_http_uri("HTTPS://example.com/a.png"));
    }

    #[test]
    fn everything_else_is_local() {
        assert!(!is_http_uri("file:///local/a.png"));
        assert!(!is_http_uri("ms-appx:///Assets/a.png"));
        assert!(!is_http_uri("data:image/png;base64,AAAA"));
        assert!(!is_http_uri("/local/a.png"));
        assert!(!is_http_uri("httpx://example.com"));
        assert!(!is_http_uri(""));
    }
}
