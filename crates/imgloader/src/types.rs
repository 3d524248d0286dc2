use crate::error::{Error, ErrorKind};
use core::fmt;

/// Pixel dimensions of a decoded image.
///
/// Settles a successful `get_size` call. With the `serde` feature it
/// serializes as `{"width": .., "height": ..}`, the shape the calling runtime
/// expects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A decoded image as returned by the cache.
///
/// Only its dimensions are read; pixel data stays with the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecodedHandle {
    pub width: u32,
    pub height: u32,
}

impl From<DecodedHandle> for ImageDimensions {
    fn from(handle: DecodedHandle) -> Self {
        Self::new(handle.width, handle.height)
    }
}

/// The inbound operation a request belongs to.
///
/// Decides the wording of validation failures and the kind every
/// asynchronous failure is reported with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Prefetch,
    GetSize,
}

impl Operation {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Prefetch => "prefetch",
            Self::GetSize => "get_size",
        }
    }

    /// The kind any failure after validation is reported with.
    pub const fn failure_kind(self) -> ErrorKind {
        match self {
            Self::Prefetch => ErrorKind::PrefetchFailure,
            Self::GetSize => ErrorKind::SizeResolutionFailure,
        }
    }

    pub fn failure(self, message: impl Into<String>) -> Error {
        Error::new(self.failure_kind(), message)
    }

    pub(crate) const fn empty_uri_message(self) -> &'static str {
        match self {
            Self::Prefetch => "Cannot prefetch an image for an empty URI.",
            Self::GetSize => "Cannot get the size of an image for an empty URI.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
